//! Liveness check capability.
//!
//! Services implement [`LivenessCheck`] for every internal dependency whose
//! failure means the process should be restarted (database pool, broker
//! connection, worker loop, ...). The probe server never constructs checks;
//! it only consumes what was registered.

use std::time::Duration;

use futures_util::future::BoxFuture;
use tokio::time::Instant;

/// Error returned by a failing check. Any error type converts into it, as
/// does a plain message: `Err("connection refused".into())`.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result of a single [`LivenessCheck::live`] call.
pub type CheckResult = Result<(), BoxError>;

/// Deadline information handed to a running check.
///
/// When the deadline passes the aggregator stops polling the check's future
/// and drops it, so a check only needs this to bound work it hands off
/// elsewhere (blocking threads, remote calls with their own timeouts).
#[derive(Debug, Clone, Copy)]
pub struct LiveContext {
    started: Instant,
    deadline: Instant,
}

impl LiveContext {
    /// Context whose deadline is `timeout` from now.
    pub fn with_timeout(timeout: Duration) -> Self {
        let started = Instant::now();
        Self {
            started,
            deadline: started + timeout,
        }
    }

    /// Instant after which the check is reported as timed out.
    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Time left before the deadline; zero once it has passed.
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.deadline
    }

    /// Time since the check was started.
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

/// A pluggable liveness check.
///
/// `name` identifies the check in the aggregate response and must be unique
/// within a registry. `details` may return any serializable diagnostic
/// payload; it is passed through to the response untouched.
pub trait LivenessCheck: Send + Sync {
    fn name(&self) -> &str;

    fn live<'a>(&'a self, ctx: &'a LiveContext) -> BoxFuture<'a, CheckResult>;

    fn details(&self) -> Option<serde_json::Value> {
        None
    }
}

/// Adapter turning an async closure into a [`LivenessCheck`].
///
/// ```
/// use tech_observability::health::{CheckResult, FnCheck};
///
/// let check = FnCheck::new("cache", |_ctx| async { CheckResult::Ok(()) });
/// ```
pub struct FnCheck<F> {
    name: String,
    f: F,
}

impl<F, Fut> FnCheck<F>
where
    F: Fn(LiveContext) -> Fut + Send + Sync,
    Fut: std::future::Future<Output = CheckResult> + Send + 'static,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }
}

impl<F, Fut> LivenessCheck for FnCheck<F>
where
    F: Fn(LiveContext) -> Fut + Send + Sync,
    Fut: std::future::Future<Output = CheckResult> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn live<'a>(&'a self, ctx: &'a LiveContext) -> BoxFuture<'a, CheckResult> {
        Box::pin((self.f)(*ctx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_context_deadline() {
        let ctx = LiveContext::with_timeout(Duration::from_millis(20));
        assert!(!ctx.is_expired());
        assert!(ctx.remaining() <= Duration::from_millis(20));

        tokio::time::sleep(Duration::from_millis(30)).await;

        assert!(ctx.is_expired());
        assert_eq!(ctx.remaining(), Duration::ZERO);
        assert!(ctx.elapsed() >= Duration::from_millis(20));
    }

    #[tokio::test]
    async fn test_fn_check_runs_closure() {
        let ok = FnCheck::new("ok", |_ctx| async { CheckResult::Ok(()) });
        let failing = FnCheck::new("bad", |_ctx| async { CheckResult::Err("boom".into()) });
        let ctx = LiveContext::with_timeout(Duration::from_secs(1));

        assert_eq!(ok.name(), "ok");
        assert!(ok.live(&ctx).await.is_ok());
        assert_eq!(failing.live(&ctx).await.unwrap_err().to_string(), "boom");
        assert!(ok.details().is_none());
    }
}
