//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Active health checks (active.rs):
//!     One task per backend
//!     → Periodic timer
//!     → HEAD probe with timeout
//!     → Backend::set_healthy
//!
//! Passive health checks (passive.rs, opt-in):
//!     Forwarding failure observed by the dispatcher
//!     → Backend::set_healthy(false)
//! ```
//!
//! # Design Decisions
//! - Health state is per-backend, guarded by the backend's own lock
//! - No hysteresis: each probe result fully determines the state
//! - Probers stop on the shutdown signal and are joined by the server

pub mod active;
pub mod passive;

pub use active::{spawn_probers, HealthProber, ProbeOutcome};
pub use passive::PassiveHealth;
