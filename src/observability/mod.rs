//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events via `tracing`)
//!     → metrics.rs (counters, gauges, histograms via `metrics`)
//!     → tracing.rs (request spans with trace context)
//!
//! Consumers:
//!     → stdout (JSON or colorized console)
//!     → Metrics endpoint (Prometheus scrape)
//!     → Trace collector (whatever layer the host attaches)
//! ```
//!
//! # Design Decisions
//! - The global subscriber and metrics recorder are installed once at startup
//! - Request ID and trace ID flow into every request span
//! - Metrics are cheap and safe to record before a recorder exists

pub mod logging;
pub mod metrics;
pub mod tracing;
