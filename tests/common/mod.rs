//! Shared utilities for integration tests.

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use tech_observability::config::{load_default, TechConfig};
use tech_observability::health::{
    BoxError, CheckResult, LiveContext, LivenessCheck, LivenessRegistry, Readiness,
};
use tech_observability::observability::metrics;
use tech_observability::observability::tracing::TraceSettings;
use tech_observability::TechServer;

/// Scripted liveness check.
pub enum Script {
    Pass,
    Fail(&'static str),
    Hang,
}

pub struct ScriptedCheck {
    pub name: &'static str,
    pub script: Script,
}

impl LivenessCheck for ScriptedCheck {
    fn name(&self) -> &str {
        self.name
    }

    fn live<'a>(&'a self, _ctx: &'a LiveContext) -> BoxFuture<'a, CheckResult> {
        Box::pin(async move {
            match self.script {
                Script::Pass => Ok(()),
                Script::Fail(msg) => Err(BoxError::from(msg)),
                Script::Hang => std::future::pending().await,
            }
        })
    }
}

pub fn check(name: &'static str, script: Script) -> ScriptedCheck {
    ScriptedCheck { name, script }
}

/// Defaults with a short liveness deadline.
#[allow(dead_code)]
pub fn test_config(liveness_timeout: Duration) -> TechConfig {
    let mut config = load_default().unwrap();
    config.http.liveness_timeout_ms = liveness_timeout.as_millis() as u64;
    config
}

/// A probe server with detached metrics, plus its shared state.
#[allow(dead_code)]
pub fn build_server(config: &TechConfig) -> (TechServer, Arc<LivenessRegistry>, Arc<Readiness>) {
    let registry = Arc::new(LivenessRegistry::new());
    let readiness = Arc::new(Readiness::new());
    let trace = Arc::new(TraceSettings::new(&config.service, &config.tracer, "test").unwrap());
    let server = TechServer::new(
        config.http.clone(),
        registry.clone(),
        readiness.clone(),
        metrics::detached_handle(),
        trace,
    );
    (server, registry, readiness)
}
