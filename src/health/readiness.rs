//! Process-wide readiness state.
//!
//! # States
//! - Ready: traffic may be routed to this process
//! - InProgress: still starting up or draining (503)
//! - Error: startup failed or a fatal condition was hit (500)
//!
//! The state is set by the hosting service and read per request by the
//! readiness endpoint. It is independent of liveness.

use std::sync::atomic::{AtomicU8, Ordering};

use crate::observability::metrics;

/// Readiness state enum.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadinessState {
    Ready = 0,
    InProgress = 1,
    Error = 2,
}

impl From<u8> for ReadinessState {
    fn from(val: u8) -> Self {
        match val {
            0 => ReadinessState::Ready,
            2 => ReadinessState::Error,
            _ => ReadinessState::InProgress,
        }
    }
}

impl ReadinessState {
    /// Status string reported in the readiness response body.
    pub fn as_str(&self) -> &'static str {
        match self {
            ReadinessState::Ready => "ready",
            ReadinessState::InProgress => "unavailable",
            ReadinessState::Error => "error",
        }
    }
}

/// Shared readiness flag. Starts in [`ReadinessState::InProgress`].
#[derive(Debug)]
pub struct Readiness {
    state: AtomicU8,
}

impl Readiness {
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(ReadinessState::InProgress as u8),
        }
    }

    pub fn get(&self) -> ReadinessState {
        ReadinessState::from(self.state.load(Ordering::Acquire))
    }

    pub fn set(&self, state: ReadinessState) {
        let previous = ReadinessState::from(self.state.swap(state as u8, Ordering::AcqRel));
        if previous != state {
            tracing::info!(
                from = previous.as_str(),
                to = state.as_str(),
                "Readiness state changed"
            );
        }
        metrics::record_readiness(state);
    }

    pub fn mark_ready(&self) {
        self.set(ReadinessState::Ready);
    }

    pub fn mark_in_progress(&self) {
        self.set(ReadinessState::InProgress);
    }

    pub fn mark_error(&self) {
        self.set(ReadinessState::Error);
    }

    pub fn is_ready(&self) -> bool {
        self.get() == ReadinessState::Ready
    }
}

impl Default for Readiness {
    fn default() -> Self {
        Self::new()
    }
}
