//! Backend abstraction.
//!
//! # Responsibilities
//! - Represent a single backend server
//! - Track health state (Healthy/Unhealthy) behind the backend's own lock

use parking_lot::Mutex;
use std::fmt;
use url::Url;

/// A single backend server.
///
/// Created once at startup and shared via `Arc`. The health flag is only
/// reachable through [`Backend::is_healthy`] and [`Backend::set_healthy`].
#[derive(Debug)]
pub struct Backend {
    /// Address as reported to clients and logs (no trailing slash).
    address: String,
    /// Parsed target URL used for forwarding and probing.
    url: Url,
    healthy: Mutex<bool>,
}

impl Backend {
    /// Create a new backend. Backends start out healthy.
    pub fn new(url: Url) -> Self {
        let address = if url.path() == "/" && url.query().is_none() {
            url.as_str().trim_end_matches('/').to_string()
        } else {
            url.as_str().to_string()
        };

        Self {
            address,
            url,
            healthy: Mutex::new(true),
        }
    }

    /// Endpoint identifier, e.g. `http://127.0.0.1:8081`.
    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Return true if the backend is eligible for selection.
    pub fn is_healthy(&self) -> bool {
        *self.healthy.lock()
    }

    /// Set the health flag, returning the previous value.
    pub fn set_healthy(&self, healthy: bool) -> bool {
        let mut guard = self.healthy.lock();
        std::mem::replace(&mut *guard, healthy)
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.address)
    }
}
