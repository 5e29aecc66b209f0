//! Observability bootstrap for services.
//!
//! Wires structured logging, trace context, Prometheus metrics and a probe
//! HTTP surface (liveness, readiness, metrics) from one TOML config.
//!
//! ```no_run
//! use tech_observability::config::load_default;
//! use tech_observability::health::{CheckResult, FnCheck};
//! use tech_observability::lifecycle::{wait_for_signal, Tech, TechOptions};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let tech = Tech::start(load_default()?, TechOptions::default()).await?;
//! tech.registry()
//!     .register(FnCheck::new("db", |_ctx| async { CheckResult::Ok(()) }));
//! tech.readiness().mark_ready();
//!
//! wait_for_signal().await;
//! tech.shutdown().await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod observability;

pub use config::TechConfig;
pub use health::{LivenessCheck, LivenessRegistry, Readiness};
pub use http::TechServer;
pub use lifecycle::{Shutdown, Tech, TechOptions};
