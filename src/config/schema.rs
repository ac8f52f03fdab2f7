//! Configuration schema definitions.
//!
//! This module defines the on-disk configuration structure for the balancer.
//! Keys are camelCase so that the classic `{port, healthCheckInterval, servers}`
//! file loads unchanged.

use serde::{Deserialize, Serialize};

/// Root configuration as read from disk.
///
/// Values are kept as strings here; `validation.rs` turns them into typed
/// [`Settings`](crate::config::Settings).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BalancerConfig {
    /// Listen port (":8080", "8080" or "host:port").
    pub port: String,

    /// Interval between health probes (e.g. "10s").
    pub health_check_interval: String,

    /// Timeout for a single health probe (e.g. "5s").
    pub health_check_timeout: String,

    /// Backend server URLs, in round-robin order.
    pub servers: Vec<String>,

    /// Add `X-Forwarded-Server` to forwarded responses.
    pub expose_backend_header: bool,

    /// Mark a backend unhealthy as soon as a forwarded request to it fails.
    pub mark_unhealthy_on_forward_error: bool,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl Default for BalancerConfig {
    fn default() -> Self {
        Self {
            port: ":8080".to_string(),
            health_check_interval: "10s".to_string(),
            health_check_timeout: "5s".to_string(),
            servers: Vec::new(),
            expose_backend_header: true,
            mark_unhealthy_on_forward_error: false,
            observability: ObservabilityConfig::default(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ObservabilityConfig {
    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
