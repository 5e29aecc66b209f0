//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Config → Logging → Trace settings → Metrics recorder → Bind → Serve
//!
//! Shutdown (shutdown.rs):
//!     Trigger → Readiness InProgress → Stop accepting → Drain → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered startup: logging first so later steps can report
//! - Fail fast: any startup error is returned to the host

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use signals::wait_for_signal;
pub use startup::{StartupError, Tech, TechOptions};
