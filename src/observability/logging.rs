//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the global `tracing` subscriber once at startup
//! - Select JSON (machine) or colorized console (human) output
//! - Resolve the level from config, the service debug flag and `RUST_LOG`
//!
//! # Design Decisions
//! - `RUST_LOG` wins over config so operators can raise verbosity without a redeploy
//! - `service.debug` forces debug level over `logger.level`

use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter};

use crate::config::{LogEncoding, LoggerConfig, ServiceConfig};

/// Level directive derived from configuration alone.
pub fn configured_level(service: &ServiceConfig, logger: &LoggerConfig) -> String {
    if service.debug {
        "debug".to_string()
    } else {
        logger.level.to_ascii_lowercase()
    }
}

/// Install the global subscriber.
///
/// Returns an error if a subscriber is already installed.
pub fn init_logging(service: &ServiceConfig, logger: &LoggerConfig) -> Result<(), TryInitError> {
    let level = configured_level(service, logger);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&level));

    let registry = tracing_subscriber::registry().with(filter);
    match logger.encoding {
        LogEncoding::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(false),
            )
            .try_init()?,
        LogEncoding::Console => registry
            .with(fmt::layer().with_ansi(true).with_target(false))
            .try_init()?,
    }

    tracing::info!(
        service = %service.name,
        level = %level,
        encoding = ?logger.encoding,
        "Logging initialized"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_from_config() {
        let service = ServiceConfig::default();
        let logger = LoggerConfig {
            encoding: LogEncoding::Json,
            level: "WARN".into(),
        };
        assert_eq!(configured_level(&service, &logger), "warn");
    }

    #[test]
    fn test_debug_flag_forces_debug() {
        let service = ServiceConfig {
            name: "orders".into(),
            debug: true,
        };
        let logger = LoggerConfig::default();
        assert_eq!(configured_level(&service, &logger), "debug");
    }
}
