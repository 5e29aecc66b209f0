//! Registry of liveness checks.
//!
//! Checks are registered by the hosting service at startup (or later, as
//! subsystems come up). The liveness endpoint reads a point-in-time snapshot
//! per request, so registration never blocks a running probe.

use std::sync::{Arc, RwLock};

use crate::health::check::LivenessCheck;

#[derive(Default)]
pub struct LivenessRegistry {
    checks: RwLock<Vec<Arc<dyn LivenessCheck>>>,
}

impl LivenessRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a check.
    pub fn register<C>(&self, check: C)
    where
        C: LivenessCheck + 'static,
    {
        self.register_arc(Arc::new(check));
    }

    /// Register a check that is shared with other owners.
    pub fn register_arc(&self, check: Arc<dyn LivenessCheck>) {
        let mut checks = self.checks.write().unwrap_or_else(|e| e.into_inner());
        if checks.iter().any(|c| c.name() == check.name()) {
            tracing::warn!(
                check = check.name(),
                "Liveness check registered twice under the same name"
            );
        }
        tracing::debug!(check = check.name(), "Liveness check registered");
        checks.push(check);
    }

    /// Remove every check with the given name. Returns whether any was removed.
    pub fn deregister(&self, name: &str) -> bool {
        let mut checks = self.checks.write().unwrap_or_else(|e| e.into_inner());
        let before = checks.len();
        checks.retain(|c| c.name() != name);
        before != checks.len()
    }

    /// Point-in-time copy of the registered checks.
    pub fn snapshot(&self) -> Vec<Arc<dyn LivenessCheck>> {
        self.checks
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn len(&self) -> usize {
        self.checks.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for LivenessRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let checks = self.checks.read().unwrap_or_else(|e| e.into_inner());
        f.debug_list()
            .entries(checks.iter().map(|c| c.name()))
            .finish()
    }
}
