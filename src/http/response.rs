//! Response handling and transformation.
//!
//! # Responsibilities
//! - Tag forwarded responses with the backend that served them
//! - Build the plain-text failure responses of the dispatch path

use axum::http::{header::{self, HeaderName, HeaderValue}, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::load_balancer::Backend;

/// Identifies the backend that served a request. Reveals internal topology,
/// so it is gated by `exposeBackendHeader`.
pub const X_FORWARDED_SERVER: HeaderName = HeaderName::from_static("x-forwarded-server");

pub const NO_HEALTHY_BACKEND: &str = "No healthy server available";
pub const UPSTREAM_FAILED: &str = "Upstream request failed";

/// 503 returned when every backend is unhealthy.
pub fn no_healthy_backend() -> Response {
    plain_text(StatusCode::SERVICE_UNAVAILABLE, NO_HEALTHY_BACKEND)
}

/// 502 returned when the chosen backend could not be reached.
pub fn bad_gateway() -> Response {
    plain_text(StatusCode::BAD_GATEWAY, UPSTREAM_FAILED)
}

fn plain_text(status: StatusCode, message: &str) -> Response {
    (
        status,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        format!("{message}\n"),
    )
        .into_response()
}

/// Add `X-Forwarded-Server: <backend address>`.
pub fn annotate_backend(response: &mut Response, backend: &Backend) {
    if let Ok(value) = HeaderValue::from_str(backend.address()) {
        response.headers_mut().append(X_FORWARDED_SERVER, value);
    }
}
