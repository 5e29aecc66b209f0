//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Install the Prometheus recorder behind the `metrics` facade
//! - Define probe metrics (check outcomes, latency, readiness)
//! - Render the scrape body for the metrics endpoint
//!
//! # Metrics
//! - `liveness_checks_total` (counter): check runs by check name, outcome
//! - `liveness_check_duration_seconds` (histogram): per-check latency
//! - `readiness_state` (gauge): 0=ready, 1=in progress, 2=error
//! - `probe_requests_total` (counter): probe server requests by path, status
//! - `probe_request_duration_seconds` (histogram): probe server latency
//!
//! Recording is a no-op until a recorder is installed, so library code can
//! record unconditionally.

use std::time::{Duration, Instant};

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

use crate::health::readiness::ReadinessState;

/// Install the global Prometheus recorder and return a handle for rendering.
///
/// Fails if a recorder is already installed in this process.
pub fn install_recorder() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    tracing::info!("Prometheus recorder installed");
    Ok(handle)
}

/// Handle backed by a recorder that is not installed globally.
///
/// Renders an empty scrape body; used where a handle is required but the
/// process-wide recorder belongs to someone else (tests, embedded use).
pub fn detached_handle() -> PrometheusHandle {
    PrometheusBuilder::new().build_recorder().handle()
}

pub fn record_liveness_check(check: &str, outcome: &'static str, duration: Duration) {
    counter!(
        "liveness_checks_total",
        "check" => check.to_string(),
        "outcome" => outcome
    )
    .increment(1);
    histogram!("liveness_check_duration_seconds", "check" => check.to_string())
        .record(duration.as_secs_f64());
}

pub fn record_readiness(state: ReadinessState) {
    gauge!("readiness_state").set(state as u8 as f64);
}

pub fn record_request(path: &str, status: u16, start: Instant) {
    counter!(
        "probe_requests_total",
        "path" => path.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("probe_request_duration_seconds", "path" => path.to_string())
        .record(start.elapsed().as_secs_f64());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_without_recorder_is_noop() {
        record_liveness_check("db", "success", Duration::from_millis(3));
        record_readiness(ReadinessState::Ready);
        record_request("/liveness", 200, Instant::now());
    }

    #[test]
    fn test_local_recorder_renders_liveness_metrics() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();

        metrics::with_local_recorder(&recorder, || {
            record_liveness_check("db", "timeout", Duration::from_millis(50));
            record_readiness(ReadinessState::Error);
        });

        let rendered = handle.render();
        assert!(rendered.contains("liveness_checks_total"));
        assert!(rendered.contains("check=\"db\""));
        assert!(rendered.contains("outcome=\"timeout\""));
        assert!(rendered.contains("readiness_state"));
    }
}
