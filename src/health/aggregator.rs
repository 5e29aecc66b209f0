//! Liveness aggregation.
//!
//! # Responsibilities
//! - Run every registered check concurrently, one task per check
//! - Bound each check by its own deadline
//! - Fold per-check outcomes into one verdict
//!
//! # Resolution
//! A check that returns before its deadline keeps its result, even if the
//! deadline has passed by the time the task records it. A check still
//! pending at the deadline is recorded as [`Outcome::Timeout`] and its
//! future is dropped. A check that panics is recorded as a failure.
//!
//! Timeouts are per check. The whole call returns once every task has
//! reported, i.e. no later than the timeout plus scheduling overhead.

use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use futures_util::FutureExt;
use serde::Serialize;
use tokio::task::JoinSet;
use tokio::time::Instant;

use crate::health::check::{LiveContext, LivenessCheck};
use crate::observability::metrics;

/// Marker carried by every timeout message.
pub const DEADLINE_EXCEEDED: &str = "deadline exceeded";

/// Result of one check in one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure { message: String },
    Timeout { elapsed: Duration },
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success)
    }

    /// Error text for the response; `None` on success.
    pub fn error_message(&self) -> Option<String> {
        match self {
            Outcome::Success => None,
            Outcome::Failure { message } => Some(message.clone()),
            Outcome::Timeout { elapsed } => Some(format!(
                "context {} after {}ms (timeout)",
                DEADLINE_EXCEEDED,
                elapsed.as_millis()
            )),
        }
    }

    /// Metric label.
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Success => "success",
            Outcome::Failure { .. } => "failure",
            Outcome::Timeout { .. } => "timeout",
        }
    }
}

/// Outcome of one check plus its diagnostics.
#[derive(Debug, Clone)]
pub struct UnitReport {
    pub outcome: Outcome,
    pub details: Option<serde_json::Value>,
    pub duration: Duration,
}

/// Wire shape of one entry in the liveness response.
#[derive(Debug, Serialize)]
pub struct UnitStatus {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl From<&UnitReport> for UnitStatus {
    fn from(report: &UnitReport) -> Self {
        Self {
            success: report.outcome.is_success(),
            error: report.outcome.error_message(),
            details: report.details.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Healthy,
    Unhealthy,
}

/// All outcomes of one aggregation run.
#[derive(Debug, Clone)]
pub struct AggregateResult {
    pub units: BTreeMap<String, UnitReport>,
    pub overall: Verdict,
}

impl AggregateResult {
    fn from_units(units: BTreeMap<String, UnitReport>) -> Self {
        let overall = if units.values().all(|r| r.outcome.is_success()) {
            Verdict::Healthy
        } else {
            Verdict::Unhealthy
        };
        Self { units, overall }
    }

    pub fn is_healthy(&self) -> bool {
        self.overall == Verdict::Healthy
    }

    pub fn outcome(&self, name: &str) -> Option<&Outcome> {
        self.units.get(name).map(|r| &r.outcome)
    }

    /// Response body: name → status.
    pub fn to_body(&self) -> BTreeMap<&str, UnitStatus> {
        self.units
            .iter()
            .map(|(name, report)| (name.as_str(), UnitStatus::from(report)))
            .collect()
    }
}

/// Run every check concurrently, each bounded by `per_unit_timeout`.
///
/// The timeout is used as given; callers substitute defaults.
pub async fn run_all(
    units: Vec<Arc<dyn LivenessCheck>>,
    per_unit_timeout: Duration,
) -> AggregateResult {
    let results: Arc<DashMap<String, UnitReport>> = Arc::new(DashMap::with_capacity(units.len()));
    let mut names = Vec::with_capacity(units.len());
    let mut tasks = JoinSet::new();

    for (index, check) in units.into_iter().enumerate() {
        let name = unit_name(check.as_ref(), index);
        names.push(name.clone());
        let results = results.clone();
        tasks.spawn(async move {
            let report = run_one(check.as_ref(), per_unit_timeout).await;
            record(&name, &report);
            if results.insert(name.clone(), report).is_some() {
                tracing::warn!(check = %name, "Duplicate liveness check name, keeping last result");
            }
        });
    }

    while let Some(joined) = tasks.join_next().await {
        if let Err(e) = joined {
            tracing::error!(error = %e, "Liveness task did not complete");
        }
    }

    // All tasks are joined; the map has no other writers.
    let mut units: BTreeMap<String, UnitReport> = results
        .iter()
        .map(|entry| (entry.key().clone(), entry.value().clone()))
        .collect();
    fill_missing(&names, &mut units);

    AggregateResult::from_units(units)
}

/// Name of a check, or a positional fallback if `name()` panics.
fn unit_name(check: &dyn LivenessCheck, index: usize) -> String {
    match std::panic::catch_unwind(AssertUnwindSafe(|| check.name().to_string())) {
        Ok(name) => name,
        Err(panic) => {
            let name = format!("check-{index}");
            tracing::error!(
                check = %name,
                panic = %panic_message(panic.as_ref()),
                "Liveness check name panicked"
            );
            name
        }
    }
}

/// Give every unit whose task never reported a failure entry.
fn fill_missing(names: &[String], units: &mut BTreeMap<String, UnitReport>) {
    for name in names {
        if units.contains_key(name) {
            continue;
        }
        let report = UnitReport {
            outcome: Outcome::Failure {
                message: "check task did not complete".to_string(),
            },
            details: None,
            duration: Duration::ZERO,
        };
        record(name, &report);
        units.insert(name.clone(), report);
    }
}

async fn run_one(check: &dyn LivenessCheck, per_unit_timeout: Duration) -> UnitReport {
    let ctx = LiveContext::with_timeout(per_unit_timeout);
    let started = Instant::now();

    let call = AssertUnwindSafe(async { check.live(&ctx).await }).catch_unwind();
    let mut outcome = match tokio::time::timeout(per_unit_timeout, call).await {
        Ok(Ok(Ok(()))) => Outcome::Success,
        Ok(Ok(Err(e))) => Outcome::Failure {
            message: e.to_string(),
        },
        Ok(Err(panic)) => Outcome::Failure {
            message: format!("check panicked: {}", panic_message(panic.as_ref())),
        },
        Err(_) => Outcome::Timeout {
            elapsed: started.elapsed(),
        },
    };

    let details = match std::panic::catch_unwind(AssertUnwindSafe(|| check.details())) {
        Ok(details) => details,
        Err(panic) => {
            let message = format!("check details panicked: {}", panic_message(panic.as_ref()));
            tracing::error!(error = %message, "Liveness check details failed");
            outcome = match outcome {
                Outcome::Success => Outcome::Failure { message },
                other => other,
            };
            None
        }
    };

    UnitReport {
        outcome,
        details,
        duration: started.elapsed(),
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

fn record(name: &str, report: &UnitReport) {
    metrics::record_liveness_check(name, report.outcome.label(), report.duration);
    match &report.outcome {
        Outcome::Success => {
            tracing::debug!(check = name, duration = ?report.duration, "Liveness check passed");
        }
        Outcome::Failure { message } => {
            tracing::warn!(check = name, error = %message, "Liveness check failed");
        }
        Outcome::Timeout { elapsed } => {
            tracing::warn!(check = name, elapsed = ?elapsed, "Liveness check timed out");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::check::{BoxError, CheckResult};
    use futures_util::future::BoxFuture;
    use std::sync::atomic::{AtomicUsize, Ordering};

    enum Behavior {
        Pass,
        Fail(&'static str),
        Hang,
        Sleep(Duration, Option<&'static str>),
        Panic,
    }

    struct TestCheck {
        name: String,
        behavior: Behavior,
        calls: AtomicUsize,
    }

    impl TestCheck {
        fn new(name: &str, behavior: Behavior) -> Arc<dyn LivenessCheck> {
            Arc::new(Self {
                name: name.to_string(),
                behavior,
                calls: AtomicUsize::new(0),
            })
        }
    }

    impl LivenessCheck for TestCheck {
        fn name(&self) -> &str {
            &self.name
        }

        fn live<'a>(&'a self, _ctx: &'a LiveContext) -> BoxFuture<'a, CheckResult> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Box::pin(async move {
                match &self.behavior {
                    Behavior::Pass => Ok(()),
                    Behavior::Fail(msg) => Err(BoxError::from(*msg)),
                    Behavior::Hang => std::future::pending().await,
                    Behavior::Sleep(d, err) => {
                        tokio::time::sleep(*d).await;
                        match err {
                            Some(msg) => Err(BoxError::from(*msg)),
                            None => Ok(()),
                        }
                    }
                    Behavior::Panic => panic!("pool poisoned"),
                }
            })
        }

        fn details(&self) -> Option<serde_json::Value> {
            (self.name == "db").then(|| serde_json::json!({ "pool_size": 4 }))
        }
    }

    #[tokio::test]
    async fn test_empty_set_is_healthy() {
        let result = run_all(Vec::new(), Duration::from_millis(50)).await;
        assert!(result.is_healthy());
        assert!(result.units.is_empty());
        assert_eq!(serde_json::to_string(&result.to_body()).unwrap(), "{}");
    }

    #[tokio::test]
    async fn test_all_success_is_healthy() {
        let units = vec![
            TestCheck::new("db", Behavior::Pass),
            TestCheck::new("cache", Behavior::Pass),
        ];

        let result = run_all(units, Duration::from_secs(1)).await;

        assert_eq!(result.overall, Verdict::Healthy);
        assert_eq!(result.outcome("db"), Some(&Outcome::Success));
        assert_eq!(result.outcome("cache"), Some(&Outcome::Success));
    }

    #[tokio::test]
    async fn test_failure_keeps_message() {
        let units = vec![
            TestCheck::new("db", Behavior::Pass),
            TestCheck::new("cache", Behavior::Fail("connection refused")),
        ];

        let result = run_all(units, Duration::from_secs(1)).await;

        assert_eq!(result.overall, Verdict::Unhealthy);
        assert_eq!(
            result.outcome("cache"),
            Some(&Outcome::Failure {
                message: "connection refused".into()
            })
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_hung_check_times_out_within_deadline() {
        let timeout = Duration::from_millis(50);
        let units = vec![
            TestCheck::new("queue", Behavior::Hang),
            TestCheck::new("slow", Behavior::Sleep(Duration::from_secs(30), None)),
            TestCheck::new("db", Behavior::Pass),
        ];

        let started = std::time::Instant::now();
        let result = run_all(units, timeout).await;
        let elapsed = started.elapsed();

        assert!(elapsed >= timeout);
        assert!(elapsed < Duration::from_secs(1), "took {:?}", elapsed);
        assert!(matches!(result.outcome("queue"), Some(Outcome::Timeout { .. })));
        assert!(matches!(result.outcome("slow"), Some(Outcome::Timeout { .. })));
        assert_eq!(result.outcome("db"), Some(&Outcome::Success));
        assert!(!result.is_healthy());
    }

    #[tokio::test]
    async fn test_result_before_deadline_is_final() {
        let units = vec![
            TestCheck::new("late-ok", Behavior::Sleep(Duration::from_millis(20), None)),
            TestCheck::new(
                "late-err",
                Behavior::Sleep(Duration::from_millis(20), Some("disk full")),
            ),
        ];

        let result = run_all(units, Duration::from_millis(500)).await;

        assert_eq!(result.outcome("late-ok"), Some(&Outcome::Success));
        assert_eq!(
            result.outcome("late-err"),
            Some(&Outcome::Failure {
                message: "disk full".into()
            })
        );
    }

    #[tokio::test]
    async fn test_panicking_check_is_isolated() {
        let units = vec![
            TestCheck::new("db", Behavior::Pass),
            TestCheck::new("worker", Behavior::Panic),
        ];

        let result = run_all(units, Duration::from_secs(1)).await;

        assert_eq!(result.units.len(), 2);
        assert_eq!(result.outcome("db"), Some(&Outcome::Success));
        match result.outcome("worker") {
            Some(Outcome::Failure { message }) => {
                assert!(message.contains("panicked"));
                assert!(message.contains("pool poisoned"));
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    /// Passes `live` but panics in whichever accessor is selected.
    struct Crashing {
        in_name: bool,
    }

    impl LivenessCheck for Crashing {
        fn name(&self) -> &str {
            if self.in_name {
                panic!("name boom");
            }
            "crashing"
        }

        fn live<'a>(&'a self, _ctx: &'a LiveContext) -> BoxFuture<'a, CheckResult> {
            Box::pin(async { Ok(()) })
        }

        fn details(&self) -> Option<serde_json::Value> {
            panic!("details boom")
        }
    }

    #[tokio::test]
    async fn test_panicking_details_is_isolated() {
        let units: Vec<Arc<dyn LivenessCheck>> = vec![
            TestCheck::new("db", Behavior::Pass),
            Arc::new(Crashing { in_name: false }),
        ];

        let result = run_all(units, Duration::from_millis(100)).await;

        assert_eq!(result.units.len(), 2);
        assert!(!result.is_healthy());
        assert_eq!(result.outcome("db"), Some(&Outcome::Success));
        match result.outcome("crashing") {
            Some(Outcome::Failure { message }) => assert!(message.contains("details boom")),
            other => panic!("unexpected outcome {:?}", other),
        }
        assert!(result.units["crashing"].details.is_none());
    }

    #[tokio::test]
    async fn test_panicking_name_gets_positional_entry() {
        let units: Vec<Arc<dyn LivenessCheck>> = vec![
            TestCheck::new("db", Behavior::Pass),
            Arc::new(Crashing { in_name: true }),
        ];

        let result = run_all(units, Duration::from_millis(100)).await;

        assert_eq!(result.units.len(), 2);
        assert!(!result.is_healthy());
        assert!(matches!(
            result.outcome("check-1"),
            Some(Outcome::Failure { .. })
        ));
    }

    #[test]
    fn test_unjoined_task_becomes_failure() {
        let names = vec!["db".to_string(), "queue".to_string()];
        let mut units = BTreeMap::new();
        units.insert(
            "db".to_string(),
            UnitReport {
                outcome: Outcome::Success,
                details: None,
                duration: Duration::from_millis(1),
            },
        );

        fill_missing(&names, &mut units);
        let result = AggregateResult::from_units(units);

        assert_eq!(result.units.len(), 2);
        assert_eq!(result.outcome("db"), Some(&Outcome::Success));
        assert_eq!(
            result.outcome("queue"),
            Some(&Outcome::Failure {
                message: "check task did not complete".into()
            })
        );
        assert!(!result.is_healthy());
    }

    #[tokio::test]
    async fn test_details_passed_through() {
        let result = run_all(vec![TestCheck::new("db", Behavior::Pass)], Duration::from_secs(1)).await;
        let body = serde_json::to_value(result.to_body()).unwrap();
        assert_eq!(
            body,
            serde_json::json!({ "db": { "success": true, "details": { "pool_size": 4 } } })
        );
    }

    #[tokio::test]
    async fn test_repeated_runs_are_identical() {
        let units = vec![
            TestCheck::new("a", Behavior::Pass),
            TestCheck::new("b", Behavior::Pass),
        ];

        let first = run_all(units.clone(), Duration::from_secs(1)).await;
        let second = run_all(units, Duration::from_secs(1)).await;

        assert_eq!(first.overall, second.overall);
        assert_eq!(
            serde_json::to_value(first.to_body()).unwrap(),
            serde_json::to_value(second.to_body()).unwrap()
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_thousand_units_no_lost_writes() {
        for _ in 0..5 {
            let units: Vec<_> = (0..1000)
                .map(|i| TestCheck::new(&format!("unit-{i}"), Behavior::Pass))
                .collect();

            let result = run_all(units, Duration::from_secs(5)).await;

            assert_eq!(result.units.len(), 1000);
            assert!(result.is_healthy());
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_mixed_scenario() {
        let units = vec![
            TestCheck::new("db", Behavior::Pass),
            TestCheck::new("cache", Behavior::Fail("connection refused")),
            TestCheck::new("queue", Behavior::Hang),
        ];

        let started = std::time::Instant::now();
        let result = run_all(units, Duration::from_millis(50)).await;
        assert!(started.elapsed() < Duration::from_millis(500));

        let body = serde_json::to_value(result.to_body()).unwrap();
        assert_eq!(body["db"]["success"], true);
        assert_eq!(body["cache"]["success"], false);
        assert_eq!(body["cache"]["error"], "connection refused");
        assert_eq!(body["queue"]["success"], false);
        assert!(body["queue"]["error"]
            .as_str()
            .unwrap()
            .contains(DEADLINE_EXCEEDED));
        assert_eq!(result.overall, Verdict::Unhealthy);
    }

    #[tokio::test]
    async fn test_each_check_called_once() {
        let check = Arc::new(TestCheck {
            name: "db".into(),
            behavior: Behavior::Pass,
            calls: AtomicUsize::new(0),
        });

        run_all(vec![check.clone() as Arc<dyn LivenessCheck>], Duration::from_secs(1)).await;

        assert_eq!(check.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_timeout_message_carries_marker() {
        let outcome = Outcome::Timeout {
            elapsed: Duration::from_millis(50),
        };
        assert_eq!(
            outcome.error_message().unwrap(),
            "context deadline exceeded after 50ms (timeout)"
        );
        assert_eq!(outcome.label(), "timeout");
    }
}
