//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! embedded tech.config.toml
//!     + service config file (TOML, `[tech]` table)
//!     → loader.rs (deep merge, env overrides, zero-value defaults)
//!     → validation.rs (semantic checks)
//!     → TechConfig (validated, immutable)
//!     → shared by value/Arc with all subsystems
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, load_default, ConfigError};
pub use schema::{HttpConfig, LogEncoding, LoggerConfig, ServiceConfig, TechConfig, TracerConfig};
pub use validation::ValidationError;
