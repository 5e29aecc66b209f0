//! Probe server setup.
//!
//! # Responsibilities
//! - Create the Axum Router for liveness, readiness and metrics
//! - Wire up middleware (request ID, trace spans, request timeout, metrics)
//! - Keep liveness outside the request timeout
//! - Serve until the shutdown signal fires

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::MatchedPath,
    http::{Request, StatusCode},
    middleware::{self, Next},
    response::Response,
    routing::get,
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::HttpConfig;
use crate::health::{LivenessRegistry, Readiness};
use crate::http::handlers;
use crate::http::request::{propagate_request_id_layer, set_request_id_layer};
use crate::observability::metrics;
use crate::observability::tracing::TraceSettings;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<LivenessRegistry>,
    pub readiness: Arc<Readiness>,
    pub metrics: PrometheusHandle,
    pub liveness_timeout: Duration,
}

/// HTTP server exposing the probe endpoints.
pub struct TechServer {
    router: Router,
    config: HttpConfig,
}

impl TechServer {
    /// Create a server for the given (normalized) HTTP configuration.
    pub fn new(
        config: HttpConfig,
        registry: Arc<LivenessRegistry>,
        readiness: Arc<Readiness>,
        metrics: PrometheusHandle,
        trace: Arc<TraceSettings>,
    ) -> Self {
        let state = AppState {
            registry,
            readiness,
            metrics,
            liveness_timeout: config.liveness_timeout(),
        };

        let router = Self::build_router(&config, state, trace);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    ///
    /// Liveness is left out of the request timeout: each check carries its
    /// own deadline, and the aggregate must always reach the caller.
    fn build_router(config: &HttpConfig, state: AppState, trace: Arc<TraceSettings>) -> Router {
        let bounded = Router::new()
            .route(&config.readiness_path, get(handlers::readiness))
            .route(&config.metrics_path, get(handlers::metrics))
            .route_layer(TimeoutLayer::with_status_code(
                StatusCode::REQUEST_TIMEOUT,
                config.request_timeout(),
            ));

        Router::new()
            .route(&config.liveness_path, get(handlers::liveness))
            .merge(bounded)
            .with_state(state)
            .layer(middleware::from_fn(track_requests))
            .layer(TraceLayer::new_for_http().make_span_with(move |request: &Request<Body>| {
                trace.make_span(request)
            }))
            .layer(propagate_request_id_layer())
            .layer(set_request_id_layer())
    }

    /// A clone of the router, for embedding or driving in tests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn config(&self) -> &HttpConfig {
        &self.config
    }

    /// Serve on `listener` until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            liveness = %self.config.liveness_path,
            readiness = %self.config.readiness_path,
            metrics = %self.config.metrics_path,
            "Probe server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Probe server received shutdown signal");
            })
            .await?;

        tracing::info!("Probe server stopped");
        Ok(())
    }
}

async fn track_requests(request: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    let response = next.run(request).await;
    metrics::record_request(&path, response.status().as_u16(), start);
    response
}
