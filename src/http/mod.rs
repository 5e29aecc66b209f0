//! HTTP exposition subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware)
//!     → request.rs (request ID assigned and echoed)
//!     → handlers.rs
//!         liveness  → health::aggregator → JSON + 200/500
//!         readiness → health::readiness  → JSON + 200/503/500
//!         metrics   → Prometheus handle  → text exposition
//! ```

pub mod handlers;
pub mod request;
pub mod server;

pub use request::{RequestIdExt, X_REQUEST_ID};
pub use server::{AppState, TechServer};
