//! Round-robin HTTP load balancer.
//!
//! Forwards every inbound request to the next healthy backend in configuration
//! order. Each backend is probed with `HEAD` on a fixed interval; a failed
//! probe removes it from rotation until a later probe succeeds.
//!
//! # Architecture Overview
//!
//! ```text
//!                     ┌──────────────────────────────────────────────┐
//!                     │                 LOAD BALANCER                │
//!   Client Request    │  ┌─────────┐   ┌──────────┐   ┌───────────┐  │
//!   ──────────────────┼─▶│  http   │──▶│ dispatch │──▶│ forward   │──┼──▶ Backend
//!                     │  │ server  │   └────┬─────┘   └───────────┘  │
//!                     │  └─────────┘        │                        │
//!                     │                     ▼                        │
//!                     │              ┌─────────────┐                 │
//!                     │              │ round robin │                 │
//!                     │              │  + pool     │                 │
//!                     │              └──────┬──────┘                 │
//!                     │                     │ reads health           │
//!                     │              ┌──────▼──────┐   HEAD probes   │
//!                     │              │  backends   │◀────────────────┼─── health probers
//!                     │              └─────────────┘                 │    (one per backend)
//!                     └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;

use rr_balancer::lifecycle::startup;
use rr_balancer::observability::logging;

#[derive(Parser)]
#[command(name = "rr-balancer")]
#[command(about = "Round-robin HTTP load balancer with active health checks", long_about = None)]
struct Cli {
    /// Path to the configuration file (JSON, or TOML with a .toml extension).
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,

    /// Log filter used when RUST_LOG is not set.
    #[arg(long, default_value = logging::DEFAULT_LOG_LEVEL)]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    logging::init_logging(&cli.log_level)?;

    tracing::info!("rr-balancer v{} starting", env!("CARGO_PKG_VERSION"));

    if let Err(e) = startup::run(&cli.config).await {
        tracing::error!(error = %e, "Load balancer failed");
        return Err(e.into());
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
