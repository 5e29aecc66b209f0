//! Liveness and readiness subsystem.
//!
//! # Data Flow
//! ```text
//! Liveness (aggregator.rs):
//!     GET /liveness
//!     → registry.rs snapshot
//!     → one task per check, each bounded by its own deadline
//!     → Success / Failure / Timeout per check
//!     → Healthy (200) iff every check succeeded, else 500
//!
//! Readiness (readiness.rs):
//!     GET /readiness
//!     → process-wide Ready / InProgress / Error flag
//!     → 200 / 503 / 500
//! ```
//!
//! # Design Decisions
//! - Checks are trait objects supplied by the hosting service
//! - Outcomes are data; the aggregator itself never fails
//! - Readiness is independent of liveness

pub mod aggregator;
pub mod check;
pub mod readiness;
pub mod registry;

pub use aggregator::{run_all, AggregateResult, Outcome, UnitReport, UnitStatus, Verdict};
pub use check::{BoxError, CheckResult, FnCheck, LiveContext, LivenessCheck};
pub use readiness::{Readiness, ReadinessState};
pub use registry::LivenessRegistry;
