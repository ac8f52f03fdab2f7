//! Request forwarding to a single backend.
//!
//! # Responsibilities
//! - Rewrite the request URI onto the backend URL
//! - Pass method, headers and a streamed body through
//! - Return the backend response untouched apart from hop-by-hop headers

use std::net::IpAddr;

use axum::body::Body;
use axum::http::{uri::InvalidUri, Request, Response, Uri, Version};
use hyper::body::Incoming;
use hyper_util::{
    client::legacy::{Client, connect::HttpConnector},
    rt::TokioExecutor,
};
use url::{Position, Url};

use crate::http::request::{append_forwarded_for, strip_hop_by_hop};

/// Error forwarding a request.
#[derive(Debug, thiserror::Error)]
pub enum ForwardError {
    #[error("invalid upstream uri: {0}")]
    InvalidTarget(#[from] InvalidUri),
    #[error("upstream request failed: {0}")]
    Upstream(#[from] hyper_util::client::legacy::Error),
}

/// HTTP client that forwards requests to backend URLs.
#[derive(Clone)]
pub struct Forwarder {
    client: Client<HttpConnector, Body>,
}

impl Forwarder {
    pub fn new() -> Self {
        let client = Client::builder(TokioExecutor::new())
            .build(HttpConnector::new());
        Self { client }
    }

    /// Forward `request` to `target`.
    pub async fn forward(
        &self,
        target: &Url,
        request: Request<Body>,
        client_ip: Option<IpAddr>,
    ) -> Result<Response<Body>, ForwardError> {
        let (mut parts, body) = request.into_parts();

        parts.uri = upstream_uri(target, &parts.uri)?;
        parts.version = Version::HTTP_11;
        strip_hop_by_hop(&mut parts.headers);
        if let Some(ip) = client_ip {
            append_forwarded_for(&mut parts.headers, ip);
        }

        let response = self.client.request(Request::from_parts(parts, body)).await?;
        Ok(into_client_response(response))
    }
}

impl Default for Forwarder {
    fn default() -> Self {
        Self::new()
    }
}

fn into_client_response(response: Response<Incoming>) -> Response<Body> {
    let (mut parts, body) = response.into_parts();
    strip_hop_by_hop(&mut parts.headers);
    Response::from_parts(parts, Body::new(body))
}

/// Build the backend URI: target scheme and authority, joined path, merged query.
pub fn upstream_uri(target: &Url, uri: &Uri) -> Result<Uri, InvalidUri> {
    let authority = &target[Position::BeforeHost..Position::AfterPort];
    let path = join_paths(target.path(), uri.path());

    let query = match (
        target.query().filter(|q| !q.is_empty()),
        uri.query().filter(|q| !q.is_empty()),
    ) {
        (Some(a), Some(b)) => Some(format!("{a}&{b}")),
        (Some(a), None) => Some(a.to_string()),
        (None, Some(b)) => Some(b.to_string()),
        (None, None) => None,
    };

    let mut out = format!("{}://{}{}", target.scheme(), authority, path);
    if let Some(query) = query {
        out.push('?');
        out.push_str(&query);
    }
    out.parse()
}

/// Join two paths with exactly one slash between them.
fn join_paths(base: &str, path: &str) -> String {
    match (base.ends_with('/'), path.starts_with('/')) {
        (true, true) => format!("{}{}", base, &path[1..]),
        (false, false) => format!("{base}/{path}"),
        _ => format!("{base}{path}"),
    }
}
