//! Probe endpoint handlers.

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::health::{run_all, AggregateResult, ReadinessState};
use crate::http::request::RequestIdExt;
use crate::http::server::AppState;

const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4";

/// Readiness response body.
#[derive(Debug, Serialize)]
pub struct ReadinessStatus {
    pub status: &'static str,
}

/// Liveness verdict to HTTP status: 200 only when every check succeeded.
pub fn liveness_status(result: &AggregateResult) -> StatusCode {
    if result.is_healthy() {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

pub fn readiness_status(state: ReadinessState) -> StatusCode {
    match state {
        ReadinessState::Ready => StatusCode::OK,
        ReadinessState::InProgress => StatusCode::SERVICE_UNAVAILABLE,
        ReadinessState::Error => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Runs every registered liveness check and reports each outcome.
pub async fn liveness(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let checks = state.registry.snapshot();
    tracing::debug!(
        request_id = headers.request_id().unwrap_or("unknown"),
        checks = checks.len(),
        timeout = ?state.liveness_timeout,
        "Running liveness checks"
    );

    let result = run_all(checks, state.liveness_timeout).await;
    let status = liveness_status(&result);

    match serde_json::to_vec(&result.to_body()) {
        Ok(body) => (
            status,
            [(header::CONTENT_TYPE, "application/json")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialize liveness response");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Reports the process-wide readiness flag.
pub async fn readiness(State(state): State<AppState>) -> Response {
    let current = state.readiness.get();
    (
        readiness_status(current),
        Json(ReadinessStatus {
            status: current.as_str(),
        }),
    )
        .into_response()
}

/// Prometheus scrape endpoint.
pub async fn metrics(State(state): State<AppState>) -> Response {
    (
        [(header::CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE)],
        state.metrics.render(),
    )
        .into_response()
}
