//! Shared utilities for integration and load testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU16, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Method, Request, StatusCode},
    response::{IntoResponse, Response},
    Router,
};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use rr_balancer::config::{validation::validate_config, BalancerConfig, Settings};
use rr_balancer::load_balancer::BackendPool;
use rr_balancer::{HttpServer, Shutdown};

/// A request as seen by a mock backend.
#[derive(Debug, Clone)]
pub struct SeenRequest {
    pub method: Method,
    pub path_and_query: String,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

#[derive(Clone)]
struct MockState {
    name: &'static str,
    status: Arc<AtomicU16>,
    hits: Arc<AtomicUsize>,
    last: Arc<Mutex<Option<SeenRequest>>>,
}

/// A programmable mock backend. Answers every request with its name as body.
pub struct MockBackend {
    pub name: &'static str,
    pub addr: SocketAddr,
    state: MockState,
}

impl MockBackend {
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Status returned to every request, probes included.
    pub fn set_status(&self, status: u16) {
        self.state.status.store(status, Ordering::SeqCst);
    }

    /// Non-probe requests served so far.
    pub fn hits(&self) -> usize {
        self.state.hits.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<SeenRequest> {
        self.state.last.lock().unwrap().clone()
    }
}

async fn mock_handler(State(state): State<MockState>, request: Request<Body>) -> Response {
    let (parts, body) = request.into_parts();
    let body = axum::body::to_bytes(body, usize::MAX).await.unwrap_or_default();

    if parts.method != Method::HEAD {
        state.hits.fetch_add(1, Ordering::SeqCst);
        *state.last.lock().unwrap() = Some(SeenRequest {
            method: parts.method.clone(),
            path_and_query: parts
                .uri
                .path_and_query()
                .map(|pq| pq.to_string())
                .unwrap_or_default(),
            headers: parts.headers.clone(),
            body: body.to_vec(),
        });
    }

    let status = StatusCode::from_u16(state.status.load(Ordering::SeqCst)).unwrap_or(StatusCode::OK);
    (status, [("x-backend-name", state.name)], state.name).into_response()
}

/// Start a mock backend on an ephemeral port.
pub async fn start_backend(name: &'static str) -> MockBackend {
    let state = MockState {
        name,
        status: Arc::new(AtomicU16::new(200)),
        hits: Arc::new(AtomicUsize::new(0)),
        last: Arc::new(Mutex::new(None)),
    };

    let app = Router::new().fallback(mock_handler).with_state(state.clone());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    MockBackend { name, addr, state }
}

/// URL of a loopback port nothing listens on.
pub async fn closed_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    format!("http://{}", listener.local_addr().unwrap())
}

/// Validated settings for `servers` probed every `interval`.
pub fn settings(servers: &[String], interval: &str) -> Settings {
    settings_with(servers, interval, |_| {})
}

pub fn settings_with(servers: &[String], interval: &str, tweak: impl FnOnce(&mut BalancerConfig)) -> Settings {
    let mut config = BalancerConfig {
        port: "127.0.0.1:0".to_string(),
        health_check_interval: interval.to_string(),
        servers: servers.to_vec(),
        ..BalancerConfig::default()
    };
    tweak(&mut config);
    validate_config(&config).expect("test config must be valid")
}

/// A balancer running in the background.
pub struct RunningBalancer {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub pool: Arc<BackendPool>,
    pub handle: JoinHandle<Result<(), std::io::Error>>,
}

impl RunningBalancer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

/// Start the balancer on an ephemeral port.
pub async fn start_balancer(settings: Settings) -> RunningBalancer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server = HttpServer::new(&settings);
    let pool = server.pool();
    let handle = tokio::spawn(server.run(listener, shutdown.clone()));

    RunningBalancer { addr, shutdown, pool, handle }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}
