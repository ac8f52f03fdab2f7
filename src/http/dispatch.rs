//! Request dispatching.
//!
//! Selects a backend for each inbound request and forwards the request to it.
//! The only failure the dispatcher itself produces is the 503 returned when no
//! backend is healthy; forwarding failures become a 502 and are never retried
//! on another backend.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::body::Body;
use axum::http::Request;
use axum::response::Response;

use crate::health::PassiveHealth;
use crate::http::forward::Forwarder;
use crate::http::{request, response};
use crate::load_balancer::BackendPool;
use crate::observability::metrics;

/// Ties backend selection to forwarding.
#[derive(Clone)]
pub struct Dispatcher {
    pool: Arc<BackendPool>,
    forwarder: Forwarder,
    expose_backend_header: bool,
    passive: PassiveHealth,
}

impl Dispatcher {
    pub fn new(pool: Arc<BackendPool>, forwarder: Forwarder) -> Self {
        Self {
            pool,
            forwarder,
            expose_backend_header: true,
            passive: PassiveHealth::default(),
        }
    }

    /// Toggle the `X-Forwarded-Server` response header.
    pub fn expose_backend_header(mut self, enabled: bool) -> Self {
        self.expose_backend_header = enabled;
        self
    }

    pub fn passive_health(mut self, passive: PassiveHealth) -> Self {
        self.passive = passive;
        self
    }

    pub fn pool(&self) -> &Arc<BackendPool> {
        &self.pool
    }

    /// Select a backend and forward `request` to it.
    pub async fn dispatch(&self, request: Request<Body>, client_ip: Option<IpAddr>) -> Response {
        let start_time = Instant::now();
        let request_id = request::request_id(&request);
        let method = request.method().to_string();

        let Some(backend) = self.pool.select() else {
            tracing::debug!(
                request_id = %request_id,
                backend_count = self.pool.len(),
                "No healthy server available"
            );
            metrics::record_no_healthy_backend();
            return response::no_healthy_backend();
        };

        tracing::debug!(
            request_id = %request_id,
            method = %method,
            path = %request.uri().path(),
            backend = %backend,
            "Forwarding request"
        );

        let mut response = match self.forwarder.forward(backend.url(), request, client_ip).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(request_id = %request_id, backend = %backend, error = %e, "Upstream error");
                self.passive.record_failure(&backend);
                response::bad_gateway()
            }
        };

        if self.expose_backend_header {
            response::annotate_backend(&mut response, &backend);
        }

        metrics::record_request(&method, response.status().as_u16(), backend.address(), start_time);
        response
    }
}
