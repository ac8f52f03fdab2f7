//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Resolve string values into typed [`Settings`]
//! - Validate value ranges (intervals > 0, ports valid, URLs absolute)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: BalancerConfig → Result<Settings, Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::{SocketAddr, ToSocketAddrs};
use std::time::Duration;

use url::Url;

use crate::config::duration::{parse_duration, DurationError};
use crate::config::schema::BalancerConfig;

/// A single semantic problem found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("invalid port {value:?}: {reason}")]
    InvalidPort { value: String, reason: String },
    #[error("invalid healthCheckInterval: {0}")]
    InvalidInterval(#[source] DurationError),
    #[error("healthCheckInterval must be greater than zero")]
    ZeroInterval,
    #[error("invalid healthCheckTimeout: {0}")]
    InvalidTimeout(#[source] DurationError),
    #[error("healthCheckTimeout must be greater than zero")]
    ZeroTimeout,
    #[error("at least one server is required")]
    NoServers,
    #[error("invalid server url {value:?}: {reason}")]
    InvalidServerUrl { value: String, reason: String },
    #[error("unsupported scheme {scheme:?} in server url {value:?} (only http is supported)")]
    UnsupportedScheme { value: String, scheme: String },
    #[error("invalid metrics address {value:?}: {reason}")]
    InvalidMetricsAddress { value: String, reason: String },
}

/// Health probe timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthCheckSettings {
    /// Time between probes of one backend.
    pub interval: Duration,
    /// Deadline for a single probe.
    pub timeout: Duration,
}

impl HealthCheckSettings {
    /// Probe timeout, capped at the interval so probes never pile up.
    pub fn probe_timeout(&self) -> Duration {
        self.timeout.min(self.interval)
    }
}

impl Default for HealthCheckSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            timeout: Duration::from_secs(5),
        }
    }
}

/// Validated, typed configuration.
#[derive(Debug, Clone)]
pub struct Settings {
    pub listen_addr: SocketAddr,
    pub health_check: HealthCheckSettings,
    /// Backends in configuration order.
    pub servers: Vec<Url>,
    pub expose_backend_header: bool,
    pub mark_unhealthy_on_forward_error: bool,
    /// Prometheus exporter address, when metrics are enabled.
    pub metrics_address: Option<SocketAddr>,
}

/// Validate a raw configuration and resolve it into [`Settings`].
pub fn validate_config(config: &BalancerConfig) -> Result<Settings, Vec<ValidationError>> {
    let mut errors = Vec::new();

    let listen_addr = parse_listen_addr(&config.port).map_err(|e| errors.push(e)).ok();

    let interval = match parse_duration(&config.health_check_interval) {
        Ok(d) if d.is_zero() => {
            errors.push(ValidationError::ZeroInterval);
            None
        }
        Ok(d) => Some(d),
        Err(e) => {
            errors.push(ValidationError::InvalidInterval(e));
            None
        }
    };

    let timeout = match parse_duration(&config.health_check_timeout) {
        Ok(d) if d.is_zero() => {
            errors.push(ValidationError::ZeroTimeout);
            None
        }
        Ok(d) => Some(d),
        Err(e) => {
            errors.push(ValidationError::InvalidTimeout(e));
            None
        }
    };

    if config.servers.is_empty() {
        errors.push(ValidationError::NoServers);
    }
    let servers: Vec<Url> = config
        .servers
        .iter()
        .filter_map(|s| parse_server_url(s).map_err(|e| errors.push(e)).ok())
        .collect();

    let metrics_address = if config.observability.metrics_enabled {
        let value = &config.observability.metrics_address;
        match value.parse::<SocketAddr>() {
            Ok(addr) => Some(addr),
            Err(e) => {
                errors.push(ValidationError::InvalidMetricsAddress {
                    value: value.clone(),
                    reason: e.to_string(),
                });
                None
            }
        }
    } else {
        None
    };

    match (listen_addr, interval, timeout) {
        (Some(listen_addr), Some(interval), Some(timeout)) if errors.is_empty() => Ok(Settings {
            listen_addr,
            health_check: HealthCheckSettings { interval, timeout },
            servers,
            expose_backend_header: config.expose_backend_header,
            mark_unhealthy_on_forward_error: config.mark_unhealthy_on_forward_error,
            metrics_address,
        }),
        _ => Err(errors),
    }
}

/// Accepts ":8080", "8080" and "host:port". An empty host means every
/// interface, IPv4 and IPv6.
fn parse_listen_addr(port: &str) -> Result<SocketAddr, ValidationError> {
    let value = port.trim();
    let candidate = if let Some(rest) = value.strip_prefix(':') {
        format!("[::]:{rest}")
    } else if !value.is_empty() && value.chars().all(|c| c.is_ascii_digit()) {
        format!("[::]:{value}")
    } else {
        value.to_string()
    };

    let invalid = |reason: String| ValidationError::InvalidPort {
        value: port.to_string(),
        reason,
    };

    if let Ok(addr) = candidate.parse::<SocketAddr>() {
        return Ok(addr);
    }
    candidate
        .to_socket_addrs()
        .map_err(|e| invalid(e.to_string()))?
        .next()
        .ok_or_else(|| invalid("no address resolved".to_string()))
}

fn parse_server_url(value: &str) -> Result<Url, ValidationError> {
    let url = Url::parse(value.trim()).map_err(|e| ValidationError::InvalidServerUrl {
        value: value.to_string(),
        reason: e.to_string(),
    })?;

    if url.scheme() != "http" {
        return Err(ValidationError::UnsupportedScheme {
            value: value.to_string(),
            scheme: url.scheme().to_string(),
        });
    }
    if url.host_str().is_none() {
        return Err(ValidationError::InvalidServerUrl {
            value: value.to_string(),
            reason: "missing host".to_string(),
        });
    }
    Ok(url)
}
