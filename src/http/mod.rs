//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, trace spans)
//!     → dispatch.rs (pick backend via load_balancer)
//!     → forward.rs (rewrite URI, stream request to backend)
//!     → response.rs (X-Forwarded-Server, 502/503 bodies)
//!     → Send to client
//! ```

pub mod dispatch;
pub mod forward;
pub mod request;
pub mod response;
pub mod server;

pub use dispatch::Dispatcher;
pub use forward::{ForwardError, Forwarder};
pub use request::X_REQUEST_ID;
pub use response::X_FORWARDED_SERVER;
pub use server::HttpServer;
