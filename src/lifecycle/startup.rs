//! Startup orchestration.
//!
//! # Responsibilities
//! - Load and validate configuration
//! - Start the metrics exporter when enabled
//! - Bind the listener and hand it to the HTTP server
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Listener binds last (traffic only when ready)

use std::io::ErrorKind;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::path::Path;

use metrics_exporter_prometheus::BuildError;
use tokio::net::TcpListener;

use crate::config::{load_config, ConfigError, Settings};
use crate::http::HttpServer;
use crate::lifecycle::{signals, Shutdown};
use crate::observability::metrics;

/// Error that aborts startup or serving.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to start metrics exporter: {0}")]
    Metrics(#[from] BuildError),
    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),
}

/// Load configuration from `path` and serve until SIGINT/SIGTERM.
pub async fn run(path: &Path) -> Result<(), StartupError> {
    let settings = load_config(path)?;

    tracing::info!(
        config = %path.display(),
        listen_address = %settings.listen_addr,
        servers = settings.servers.len(),
        health_check_interval = ?settings.health_check.interval,
        "Configuration loaded"
    );

    let shutdown = Shutdown::new();
    signals::spawn_signal_handler(shutdown.clone());

    serve(settings, shutdown).await
}

/// Start all subsystems from validated settings and serve until `shutdown` fires.
pub async fn serve(settings: Settings, shutdown: Shutdown) -> Result<(), StartupError> {
    if let Some(addr) = settings.metrics_address {
        metrics::init_metrics(addr)?;
    }

    let listener = bind_listener(settings.listen_addr).await?;

    let server = HttpServer::new(&settings);
    server.run(listener, shutdown).await.map_err(StartupError::Serve)
}

/// Bind the proxy listener.
///
/// The wildcard `[::]` listens on IPv4 and IPv6 where the host allows
/// dual-stack sockets. Hosts without IPv6 get `0.0.0.0` instead.
async fn bind_listener(addr: SocketAddr) -> Result<TcpListener, StartupError> {
    match TcpListener::bind(addr).await {
        Ok(listener) => Ok(listener),
        Err(e) if addr.ip() == IpAddr::V6(Ipv6Addr::UNSPECIFIED) && e.kind() != ErrorKind::AddrInUse => {
            let fallback = SocketAddr::from((Ipv4Addr::UNSPECIFIED, addr.port()));
            tracing::warn!(error = %e, address = %fallback, "IPv6 unavailable, listening on IPv4 only");
            TcpListener::bind(fallback)
                .await
                .map_err(|source| StartupError::Bind { addr: fallback, source })
        }
        Err(source) => Err(StartupError::Bind { addr, source }),
    }
}
