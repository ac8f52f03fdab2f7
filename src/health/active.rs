//! Active health checking.
//!
//! # Responsibilities
//! - Periodically probe one backend with an HTTP HEAD request
//! - Update that backend's health flag from the single probe result

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use hyper_util::{
    client::legacy::{Client, connect::HttpConnector},
    rt::TokioExecutor,
};
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use url::Url;
use axum::body::Body;
use crate::config::HealthCheckSettings;
use crate::lifecycle::{Shutdown, ShutdownSignal};
use crate::load_balancer::Backend;
use crate::observability::metrics;

const PROBE_USER_AGENT: &str = "rr-balancer-health-check";
/// Redirect hops followed before a probe gives up.
const MAX_REDIRECTS: usize = 10;

/// Result of a single probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// Backend answered `200 OK`.
    Healthy,
    /// Backend answered with any other status.
    BadStatus(StatusCode),
    /// Connection or protocol error.
    Transport(String),
    /// No response within the probe timeout.
    TimedOut,
    /// Redirect chain longer than [`MAX_REDIRECTS`].
    TooManyRedirects,
}

impl ProbeOutcome {
    pub fn is_healthy(&self) -> bool {
        matches!(self, ProbeOutcome::Healthy)
    }
}

/// Periodic prober for a single backend.
pub struct HealthProber {
    backend: Arc<Backend>,
    interval: Duration,
    timeout: Duration,
    client: Client<HttpConnector, Body>,
}

impl HealthProber {
    pub fn new(backend: Arc<Backend>, settings: HealthCheckSettings) -> Self {
        let client = Client::builder(TokioExecutor::new())
            .build(HttpConnector::new());
        Self::with_client(backend, settings, client)
    }

    /// Build a prober that shares an existing HTTP client.
    pub fn with_client(
        backend: Arc<Backend>,
        settings: HealthCheckSettings,
        client: Client<HttpConnector, Body>,
    ) -> Self {
        Self {
            backend,
            interval: settings.interval,
            timeout: settings.probe_timeout(),
            client,
        }
    }

    /// Probe every interval until shutdown is signalled.
    ///
    /// The first probe fires one interval after start. A probe in flight is
    /// abandoned when shutdown arrives.
    pub async fn run(self, mut shutdown: ShutdownSignal) {
        tracing::debug!(
            backend = %self.backend,
            interval = ?self.interval,
            timeout = ?self.timeout,
            "Health prober starting"
        );

        let mut ticker = time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = shutdown.recv() => break,
            }
            tokio::select! {
                _ = self.check() => {}
                _ = shutdown.recv() => break,
            }
        }

        tracing::debug!(backend = %self.backend, "Health prober stopped");
    }

    /// Run one probe and apply its result to the backend.
    pub async fn check(&self) -> ProbeOutcome {
        let outcome = self.probe().await;
        let addr = self.backend.address();

        match &outcome {
            ProbeOutcome::Healthy => {}
            ProbeOutcome::BadStatus(status) => {
                tracing::warn!(backend = %addr, status = %status, "Health check failed: non-success status");
            }
            ProbeOutcome::Transport(error) => {
                tracing::warn!(backend = %addr, error = %error, "Health check failed: connection error");
            }
            ProbeOutcome::TimedOut => {
                tracing::warn!(backend = %addr, timeout = ?self.timeout, "Health check failed: timeout");
            }
            ProbeOutcome::TooManyRedirects => {
                tracing::warn!(backend = %addr, max = MAX_REDIRECTS, "Health check failed: too many redirects");
            }
        }

        let healthy = outcome.is_healthy();
        let was_healthy = self.backend.set_healthy(healthy);
        if was_healthy != healthy {
            if healthy {
                tracing::info!(backend = %addr, "Backend marked healthy");
            } else {
                tracing::info!(backend = %addr, "Backend marked unhealthy");
            }
        }

        metrics::record_backend_health(addr, healthy);
        outcome
    }

    /// Issue a HEAD request without touching the health flag.
    ///
    /// Redirects are followed (up to [`MAX_REDIRECTS`] hops) and only the
    /// final status is judged. The whole chain shares one timeout.
    pub async fn probe(&self) -> ProbeOutcome {
        match time::timeout(self.timeout, self.follow_redirects()).await {
            Ok(outcome) => outcome,
            Err(_) => ProbeOutcome::TimedOut,
        }
    }

    async fn follow_redirects(&self) -> ProbeOutcome {
        let mut target = self.backend.url().clone();

        for _ in 0..=MAX_REDIRECTS {
            let request = match Request::builder()
                .method(Method::HEAD)
                .uri(target.as_str())
                .header(header::USER_AGENT, PROBE_USER_AGENT)
                .body(Body::empty())
            {
                Ok(req) => req,
                Err(e) => return ProbeOutcome::Transport(e.to_string()),
            };

            let response = match self.client.request(request).await {
                Ok(response) => response,
                Err(e) => return ProbeOutcome::Transport(e.to_string()),
            };

            let status = response.status();
            if status == StatusCode::OK {
                return ProbeOutcome::Healthy;
            }

            // A redirect without a usable Location is judged on its own status.
            match redirect_target(&target, status, response.headers()) {
                Some(next) => {
                    tracing::trace!(backend = %self.backend, from = %target, to = %next, "Following redirect");
                    target = next;
                }
                None => return ProbeOutcome::BadStatus(status),
            }
        }

        ProbeOutcome::TooManyRedirects
    }
}

/// Resolve the `Location` of a redirect response against the current URL.
fn redirect_target(current: &Url, status: StatusCode, headers: &HeaderMap) -> Option<Url> {
    if !matches!(
        status,
        StatusCode::MOVED_PERMANENTLY
            | StatusCode::FOUND
            | StatusCode::SEE_OTHER
            | StatusCode::TEMPORARY_REDIRECT
            | StatusCode::PERMANENT_REDIRECT
    ) {
        return None;
    }
    let location = headers.get(header::LOCATION)?.to_str().ok()?;
    current.join(location).ok()
}

/// Spawn one prober per backend, each subscribed to `shutdown`.
///
/// The returned handles complete once shutdown has been triggered.
pub fn spawn_probers(
    backends: &[Arc<Backend>],
    settings: HealthCheckSettings,
    shutdown: &Shutdown,
) -> Vec<JoinHandle<()>> {
    if settings.timeout > settings.interval {
        tracing::warn!(
            timeout = ?settings.timeout,
            interval = ?settings.interval,
            "Health check timeout exceeds interval, capping timeout at interval"
        );
    }

    tracing::info!(
        backends = backends.len(),
        interval = ?settings.interval,
        "Starting health probers"
    );

    let client = Client::builder(TokioExecutor::new())
        .build(HttpConnector::new());

    backends
        .iter()
        .map(|backend| {
            let prober = HealthProber::with_client(backend.clone(), settings, client.clone());
            tokio::spawn(prober.run(shutdown.subscribe()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;
    use std::sync::atomic::{AtomicU16, Ordering};
    use std::sync::Mutex;
    use axum::{
        extract::State,
        http::Request as HttpRequest,
        response::{IntoResponse, Redirect},
        routing::any,
        Router,
    };

    #[derive(Clone)]
    struct MockState {
        status: Arc<AtomicU16>,
        delay: Duration,
        methods: Arc<Mutex<Vec<Method>>>,
    }

    async fn mock_handler(State(state): State<MockState>, req: HttpRequest<Body>) -> impl IntoResponse {
        state.methods.lock().unwrap().push(req.method().clone());
        if !state.delay.is_zero() {
            tokio::time::sleep(state.delay).await;
        }
        let status = StatusCode::from_u16(state.status.load(Ordering::SeqCst)).unwrap();
        (status, "mock")
    }

    async fn start_mock(status: u16, delay: Duration) -> (SocketAddr, MockState) {
        let state = MockState {
            status: Arc::new(AtomicU16::new(status)),
            delay,
            methods: Arc::new(Mutex::new(Vec::new())),
        };
        let app = Router::new().fallback(mock_handler).with_state(state.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        (addr, state)
    }

    async fn closed_addr() -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    }

    fn backend_for(addr: SocketAddr) -> Arc<Backend> {
        Arc::new(Backend::new(Url::parse(&format!("http://{addr}")).unwrap()))
    }

    fn settings(interval_ms: u64, timeout_ms: u64) -> HealthCheckSettings {
        HealthCheckSettings {
            interval: Duration::from_millis(interval_ms),
            timeout: Duration::from_millis(timeout_ms),
        }
    }

    #[tokio::test]
    async fn test_probe_healthy_uses_head() {
        let (addr, state) = start_mock(200, Duration::ZERO).await;
        let prober = HealthProber::new(backend_for(addr), settings(1000, 500));

        assert_eq!(prober.probe().await, ProbeOutcome::Healthy);
        assert_eq!(state.methods.lock().unwrap().as_slice(), &[Method::HEAD]);
    }

    #[tokio::test]
    async fn test_non_ok_status_is_unhealthy() {
        let (addr, state) = start_mock(500, Duration::ZERO).await;
        let backend = backend_for(addr);
        let prober = HealthProber::new(backend.clone(), settings(1000, 500));

        assert_eq!(prober.check().await, ProbeOutcome::BadStatus(StatusCode::INTERNAL_SERVER_ERROR));
        assert!(!backend.is_healthy());

        // 204 is a success class status but still not 200
        state.status.store(204, Ordering::SeqCst);
        assert_eq!(prober.check().await, ProbeOutcome::BadStatus(StatusCode::NO_CONTENT));
        assert!(!backend.is_healthy());

        state.status.store(200, Ordering::SeqCst);
        assert_eq!(prober.check().await, ProbeOutcome::Healthy);
        assert!(backend.is_healthy());
    }

    async fn start_redirecting_mock() -> SocketAddr {
        let app = Router::new()
            .route("/", any(|| async { Redirect::permanent("/health") }))
            .route("/health", any(|| async { Redirect::to("/ready") }))
            .route("/ready", any(|| async { StatusCode::OK }))
            .route("/loop", any(|| async { Redirect::temporary("/loop") }))
            .route("/gone", any(|| async { StatusCode::NOT_FOUND }))
            .route("/to-gone", any(|| async { Redirect::permanent("/gone") }));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        addr
    }

    #[tokio::test]
    async fn test_redirect_to_ok_is_healthy() {
        let addr = start_redirecting_mock().await;
        let backend = backend_for(addr);
        backend.set_healthy(false);
        let prober = HealthProber::new(backend.clone(), settings(1000, 500));

        assert_eq!(prober.check().await, ProbeOutcome::Healthy);
        assert!(backend.is_healthy());
    }

    #[tokio::test]
    async fn test_redirect_final_status_decides() {
        let addr = start_redirecting_mock().await;

        let backend = Arc::new(Backend::new(Url::parse(&format!("http://{addr}/to-gone")).unwrap()));
        let prober = HealthProber::new(backend.clone(), settings(1000, 500));
        assert_eq!(prober.check().await, ProbeOutcome::BadStatus(StatusCode::NOT_FOUND));
        assert!(!backend.is_healthy());

        let backend = Arc::new(Backend::new(Url::parse(&format!("http://{addr}/loop")).unwrap()));
        let prober = HealthProber::new(backend.clone(), settings(1000, 500));
        assert_eq!(prober.check().await, ProbeOutcome::TooManyRedirects);
        assert!(!backend.is_healthy());
    }

    #[test]
    fn test_redirect_target_resolution() {
        let current = Url::parse("http://10.0.0.1:8080/a/b").unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(header::LOCATION, "/health".parse().unwrap());

        assert_eq!(
            redirect_target(&current, StatusCode::FOUND, &headers).unwrap().as_str(),
            "http://10.0.0.1:8080/health"
        );
        assert_eq!(
            redirect_target(&current, StatusCode::TEMPORARY_REDIRECT, &headers).unwrap().as_str(),
            "http://10.0.0.1:8080/health"
        );
        // Not a redirect status, or no Location: nothing to follow.
        assert!(redirect_target(&current, StatusCode::NOT_MODIFIED, &headers).is_none());
        assert!(redirect_target(&current, StatusCode::FOUND, &HeaderMap::new()).is_none());

        headers.insert(header::LOCATION, "http://other:9000/up".parse().unwrap());
        assert_eq!(
            redirect_target(&current, StatusCode::MOVED_PERMANENTLY, &headers).unwrap().as_str(),
            "http://other:9000/up"
        );
    }

    #[tokio::test]
    async fn test_connection_refused_is_unhealthy() {
        let backend = backend_for(closed_addr().await);
        let prober = HealthProber::new(backend.clone(), settings(1000, 500));

        assert!(matches!(prober.check().await, ProbeOutcome::Transport(_)));
        assert!(!backend.is_healthy());
    }

    #[tokio::test]
    async fn test_slow_backend_times_out() {
        let (addr, _state) = start_mock(200, Duration::from_millis(500)).await;
        let backend = backend_for(addr);
        let prober = HealthProber::new(backend.clone(), settings(1000, 50));

        assert_eq!(prober.check().await, ProbeOutcome::TimedOut);
        assert!(!backend.is_healthy());
    }

    #[tokio::test]
    async fn test_run_tracks_state_and_stops_on_shutdown() {
        let (addr, state) = start_mock(503, Duration::ZERO).await;
        let backend = backend_for(addr);
        let shutdown = Shutdown::new();

        let handles = spawn_probers(&[backend.clone()], settings(50, 40), &shutdown);
        assert_eq!(handles.len(), 1);

        tokio::time::sleep(Duration::from_millis(250)).await;
        assert!(!backend.is_healthy());

        state.status.store(200, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(250)).await;
        assert!(backend.is_healthy());

        shutdown.trigger();
        for handle in handles {
            tokio::time::timeout(Duration::from_secs(1), handle)
                .await
                .expect("prober did not stop")
                .unwrap();
        }
        assert_eq!(shutdown.receiver_count(), 0);
    }

    #[tokio::test]
    async fn test_first_probe_waits_one_interval() {
        let backend = backend_for(closed_addr().await);
        let shutdown = Shutdown::new();
        let handles = spawn_probers(&[backend.clone()], settings(300, 100), &shutdown);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(backend.is_healthy(), "no probe should have run yet");

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert!(!backend.is_healthy());

        shutdown.trigger();
        for handle in handles {
            handle.await.unwrap();
        }
    }
}
