//! Backend readiness state machine.
//!
//! ```text
//! Unloaded ──► Ready ──► PermanentlyUnavailable
//!     │                        ▲
//!     └────────────────────────┘
//! ```
//!
//! There is no edge back to `Ready`: a broken native resource is never
//! retried within a process lifetime.

use std::sync::atomic::{AtomicU8, Ordering};

const UNLOADED: u8 = 0;
const READY: u8 = 1;
const UNAVAILABLE: u8 = 2;

/// Readiness of an accelerator backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// Initialization has not been attempted
    Unloaded,
    /// Loaded and accepting batch calls
    Ready,
    /// Failed to load or failed unrecoverably; never retried
    PermanentlyUnavailable,
}

impl std::fmt::Display for Readiness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Readiness::Unloaded => write!(f, "unloaded"),
            Readiness::Ready => write!(f, "ready"),
            Readiness::PermanentlyUnavailable => write!(f, "permanently unavailable"),
        }
    }
}

/// Atomic holder for [`Readiness`] that only permits the legal transitions.
#[derive(Debug)]
pub struct ReadinessCell {
    state: AtomicU8,
}

impl ReadinessCell {
    pub const fn new() -> Self {
        Self {
            state: AtomicU8::new(UNLOADED),
        }
    }

    pub fn get(&self) -> Readiness {
        match self.state.load(Ordering::Acquire) {
            UNLOADED => Readiness::Unloaded,
            READY => Readiness::Ready,
            _ => Readiness::PermanentlyUnavailable,
        }
    }

    /// `Unloaded -> Ready`. Returns `false` if the cell was in any other state.
    pub fn mark_ready(&self) -> bool {
        self.state
            .compare_exchange(UNLOADED, READY, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// `Unloaded | Ready -> PermanentlyUnavailable`.
    ///
    /// Returns `true` only for the call that performed the transition.
    pub fn mark_unavailable(&self) -> bool {
        self.state
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |state| {
                (state != UNAVAILABLE).then_some(UNAVAILABLE)
            })
            .is_ok()
    }
}

impl Default for ReadinessCell {
    fn default() -> Self {
        Self::new()
    }
}
