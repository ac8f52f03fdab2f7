//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the catch-all proxy handler
//! - Wire up middleware (tracing, request ID)
//! - Start one health prober per backend
//! - Serve until shutdown, then join the probers

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    response::Response,
    routing::any,
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::config::{HealthCheckSettings, Settings};
use crate::health::{self, PassiveHealth};
use crate::http::dispatch::Dispatcher;
use crate::http::forward::Forwarder;
use crate::http::request;
use crate::lifecycle::Shutdown;
use crate::load_balancer::BackendPool;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
}

/// HTTP server for the balancer.
pub struct HttpServer {
    router: Router,
    pool: Arc<BackendPool>,
    health_check: HealthCheckSettings,
}

impl HttpServer {
    /// Create a new HTTP server with the given settings.
    pub fn new(settings: &Settings) -> Self {
        let pool = Arc::new(BackendPool::new(settings.servers.iter().cloned()));

        let dispatcher = Dispatcher::new(pool.clone(), Forwarder::new())
            .expose_backend_header(settings.expose_backend_header)
            .passive_health(PassiveHealth::new(settings.mark_unhealthy_on_forward_error));

        let state = AppState {
            dispatcher: Arc::new(dispatcher),
        };

        Self {
            router: Self::build_router(state),
            pool,
            health_check: settings.health_check,
        }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(proxy_handler))
            .route("/", any(proxy_handler))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(request::set_request_id_layer())
                    .layer(TraceLayer::new_for_http())
                    .layer(request::propagate_request_id_layer()),
            )
    }

    /// The backend pool shared by the dispatcher and the probers.
    pub fn pool(&self) -> Arc<BackendPool> {
        self.pool.clone()
    }

    /// Run the server, accepting connections on the given listener until
    /// `shutdown` is triggered.
    pub async fn run(self, listener: TcpListener, shutdown: Shutdown) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            backends = self.pool.len(),
            "HTTP server starting"
        );

        let probers = health::spawn_probers(self.pool.backends(), self.health_check, &shutdown);

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        let mut server_shutdown = shutdown.subscribe();

        let served = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                server_shutdown.recv().await;
            })
            .await;

        // Probers only exit on the shutdown signal; make sure they see it even
        // when the server stopped on its own.
        shutdown.trigger();
        for handle in probers {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "Health prober task failed");
            }
        }

        served?;
        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Catch-all proxy handler.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let client_ip = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());

    state.dispatcher.dispatch(request, client_ip).await
}
