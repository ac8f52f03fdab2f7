//! Passive health checking (failure detection).
//!
//! # Responsibilities
//! - Observe forwarding failures reported by the dispatcher
//! - Optionally evict the backend immediately instead of waiting for the next probe
//!
//! # Design Decisions
//! - Off by default: only probes decide health unless enabled
//! - Only transport failures count; any HTTP status from the backend is passed through
//! - The next successful active probe restores the backend

use crate::load_balancer::Backend;
use crate::observability::metrics;

/// Policy applied when a forwarded request fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassiveHealth {
    enabled: bool,
}

impl PassiveHealth {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Report a forwarding failure. Returns true if the backend was marked unhealthy.
    pub fn record_failure(&self, backend: &Backend) -> bool {
        if !self.enabled {
            return false;
        }

        if backend.set_healthy(false) {
            tracing::warn!(backend = %backend, "Backend marked unhealthy after forwarding failure");
        }
        metrics::record_backend_health(backend.address(), false);
        true
    }
}
