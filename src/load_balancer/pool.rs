//! Backend pool management.
//!
//! # Responsibilities
//! - Own the ordered backend set built from configuration
//! - Apply the load balancing algorithm to select backends
//! - Hand out shared references for health checking

use std::sync::Arc;
use url::Url;
use crate::load_balancer::{LoadBalancer, backend::Backend, round_robin::RoundRobin};

/// The fixed backend set and the strategy that picks from it.
#[derive(Debug)]
pub struct BackendPool {
    backends: Vec<Arc<Backend>>,
    balancer: Box<dyn LoadBalancer>,
}

impl BackendPool {
    /// Create a round-robin pool; order follows `servers`.
    pub fn new(servers: impl IntoIterator<Item = Url>) -> Self {
        Self::with_balancer(servers, Box::new(RoundRobin::new()))
    }

    pub fn with_balancer(servers: impl IntoIterator<Item = Url>, balancer: Box<dyn LoadBalancer>) -> Self {
        let backends: Vec<Arc<Backend>> = servers
            .into_iter()
            .map(|url| Arc::new(Backend::new(url)))
            .collect();

        for backend in &backends {
            tracing::debug!(address = %backend.address(), "Backend registered");
        }

        Self { backends, balancer }
    }

    /// Select the next healthy backend.
    pub fn select(&self) -> Option<Arc<Backend>> {
        self.balancer.next_server(&self.backends)
    }

    /// All backends in configuration order (for health checking).
    pub fn backends(&self) -> &[Arc<Backend>] {
        &self.backends
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }

    /// Number of backends currently marked healthy.
    pub fn healthy_count(&self) -> usize {
        self.backends.iter().filter(|b| b.is_healthy()).count()
    }
}
