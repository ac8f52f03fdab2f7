//! Metrics collection and exposition.
//!
//! # Metrics
//! - `balancer_requests_total` (counter): forwarded requests by method, status, backend
//! - `balancer_request_duration_seconds` (histogram): forwarding latency
//! - `balancer_backend_health` (gauge): 1=healthy, 0=unhealthy
//! - `balancer_no_healthy_backend_total` (counter): requests answered with 503
//!
//! Recording is a no-op until [`init_metrics`] installs the Prometheus recorder.

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and serve it on `addr`.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

/// Record a forwarded request.
pub fn record_request(method: &str, status: u16, backend: &str, start: Instant) {
    metrics::counter!(
        "balancer_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
        "backend" => backend.to_string()
    )
    .increment(1);
    metrics::histogram!(
        "balancer_request_duration_seconds",
        "method" => method.to_string(),
        "backend" => backend.to_string()
    )
    .record(start.elapsed().as_secs_f64());
}

/// Record the result of a health probe.
pub fn record_backend_health(backend: &str, healthy: bool) {
    metrics::gauge!("balancer_backend_health", "backend" => backend.to_string())
        .set(if healthy { 1.0 } else { 0.0 });
}

/// Record a request rejected because no backend was healthy.
pub fn record_no_healthy_backend() {
    metrics::counter!("balancer_no_healthy_backend_total").increment(1);
}
