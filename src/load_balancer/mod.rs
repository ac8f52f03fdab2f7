//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound request
//!     → pool.rs (fixed, ordered backend set)
//!     → round_robin.rs (rotate through backends, skip unhealthy)
//!     → backend.rs (health flag read under the backend's lock)
//!     → Return backend or None
//! ```
//!
//! # Design Decisions
//! - Backend set is fixed at startup; iteration needs no lock
//! - Selector owns its cursor; backends own their health flag
//! - Unhealthy backends excluded from selection

use std::fmt::Debug;
use std::sync::Arc;

pub mod backend;
pub mod pool;
pub mod round_robin;

pub use backend::Backend;
pub use pool::BackendPool;
pub use round_robin::RoundRobin;

/// A backend selection strategy.
pub trait LoadBalancer: Debug + Send + Sync {
    /// Pick the next backend to receive a request, or `None` if no backend is eligible.
    fn next_server(&self, backends: &[Arc<Backend>]) -> Option<Arc<Backend>>;
}
