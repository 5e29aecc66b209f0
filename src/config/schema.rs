//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the
//! observability layer. All types derive Serde traits for deserialization
//! from the `[tech]` table of a TOML file.

use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_LIVENESS_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_LIVENESS_PATH: &str = "/liveness";
pub const DEFAULT_READINESS_PATH: &str = "/readiness";
pub const DEFAULT_METRICS_PATH: &str = "/metrics";
pub const DEFAULT_TRACE_RATIO: f64 = 0.01;

/// Root configuration, the contents of the `[tech]` table.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct TechConfig {
    /// Service identity.
    pub service: ServiceConfig,

    /// Log output settings.
    pub logger: LoggerConfig,

    /// Trace context and sampling settings.
    pub tracer: TracerConfig,

    /// Probe and metrics HTTP surface.
    pub http: HttpConfig,
}

/// Service identity shared by logs, spans and metrics.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ServiceConfig {
    /// Service name attached to request spans.
    pub name: String,

    /// Forces debug-level logging regardless of `logger.level`.
    pub debug: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "service".to_string(),
            debug: false,
        }
    }
}

/// Log output encoding.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogEncoding {
    /// One JSON object per line.
    Json,
    /// Colorized human-readable output.
    #[default]
    #[serde(other)]
    Console,
}

/// Logger configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct LoggerConfig {
    pub encoding: LogEncoding,

    /// Log level (trace, debug, info, warn, error).
    pub level: String,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            encoding: LogEncoding::Console,
            level: "info".to_string(),
        }
    }
}

/// Tracer configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct TracerConfig {
    /// Collector endpoint (`host:port` or a full URL).
    pub host: String,

    /// Fraction of new traces to sample, in `[0, 1]`. Zero means default.
    pub ratio: f64,
}

impl Default for TracerConfig {
    fn default() -> Self {
        Self {
            host: "localhost:4318".to_string(),
            ratio: DEFAULT_TRACE_RATIO,
        }
    }
}

/// HTTP surface configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct HttpConfig {
    /// Listen port. Zero means default.
    pub port: u16,

    /// Whole-request timeout in seconds. Zero means default.
    pub timeout_secs: u64,

    /// Deadline given to each liveness check in milliseconds. Zero means default.
    pub liveness_timeout_ms: u64,

    pub liveness_path: String,
    pub readiness_path: String,
    pub metrics_path: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            liveness_timeout_ms: DEFAULT_LIVENESS_TIMEOUT_MS,
            liveness_path: DEFAULT_LIVENESS_PATH.to_string(),
            readiness_path: DEFAULT_READINESS_PATH.to_string(),
            metrics_path: DEFAULT_METRICS_PATH.to_string(),
        }
    }
}

impl HttpConfig {
    /// Per-check deadline handed to the liveness aggregator.
    pub fn liveness_timeout(&self) -> Duration {
        Duration::from_millis(self.liveness_timeout_ms)
    }

    /// Whole-request timeout for the probe server.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl TechConfig {
    /// Replace zero and empty values with their defaults.
    ///
    /// Explicitly written zeros in a config file mean "unset", so this runs
    /// after all overlays and before validation.
    pub fn normalize(&mut self) {
        let http = &mut self.http;
        if http.port == 0 {
            http.port = DEFAULT_PORT;
        }
        if http.timeout_secs == 0 {
            http.timeout_secs = DEFAULT_TIMEOUT_SECS;
        }
        if http.liveness_timeout_ms == 0 {
            http.liveness_timeout_ms = DEFAULT_LIVENESS_TIMEOUT_MS;
        }
        if http.liveness_path.is_empty() {
            http.liveness_path = DEFAULT_LIVENESS_PATH.to_string();
        }
        if http.readiness_path.is_empty() {
            http.readiness_path = DEFAULT_READINESS_PATH.to_string();
        }
        if http.metrics_path.is_empty() {
            http.metrics_path = DEFAULT_METRICS_PATH.to_string();
        }
        if self.tracer.ratio == 0.0 {
            self.tracer.ratio = DEFAULT_TRACE_RATIO;
        }
    }
}
