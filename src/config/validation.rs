//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (sampling ratio, log level)
//! - Detect conflicting probe paths
//!
//! Validation returns every error found, not just the first.

use std::str::FromStr;

use crate::config::schema::TechConfig;

/// A single semantic problem with a loaded configuration.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("{field} must start with '/', got {value:?}")]
    PathNotAbsolute { field: &'static str, value: String },

    #[error("{first} and {second} both use path {path:?}")]
    DuplicatePath {
        first: &'static str,
        second: &'static str,
        path: String,
    },

    #[error("tracer.ratio must be within [0, 1], got {0}")]
    RatioOutOfRange(f64),

    #[error("logger.level {0:?} is not a known level")]
    UnknownLogLevel(String),

    #[error("tracer.host must not be empty")]
    EmptyTracerHost,
}

/// Check a normalized configuration.
pub fn validate_config(config: &TechConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let paths = [
        ("http.liveness_path", &config.http.liveness_path),
        ("http.readiness_path", &config.http.readiness_path),
        ("http.metrics_path", &config.http.metrics_path),
    ];

    for (field, value) in paths {
        if !value.starts_with('/') {
            errors.push(ValidationError::PathNotAbsolute {
                field,
                value: value.clone(),
            });
        }
    }

    for (i, (first, a)) in paths.iter().enumerate() {
        for (second, b) in &paths[i + 1..] {
            if a == b {
                errors.push(ValidationError::DuplicatePath {
                    first: *first,
                    second: *second,
                    path: a.to_string(),
                });
            }
        }
    }

    let ratio = config.tracer.ratio;
    if !(0.0..=1.0).contains(&ratio) {
        errors.push(ValidationError::RatioOutOfRange(ratio));
    }

    if tracing::Level::from_str(&config.logger.level).is_err() {
        errors.push(ValidationError::UnknownLogLevel(config.logger.level.clone()));
    }

    if config.tracer.host.trim().is_empty() {
        errors.push(ValidationError::EmptyTracerHost);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
