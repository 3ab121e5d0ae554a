//! Coordinator lifecycle state and the cooperative cancellation token.
//!
//! Cancellation and rollback are two distinct signals. The `AbortHandle` is
//! the cancellation side only: a flag observed by conditional writes whose
//! update function has not yet executed. Whether compensation must run is
//! decided separately, from the joined write outcomes plus this flag's final
//! state. An already-applied write is never affected by cancellation; it is
//! undone by the rollback phase instead.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Lifecycle of one coordinator instance.
///
/// `Unset` loops on `set()`; `commit()` moves to `Committing` exactly once;
/// `Committed` is terminal whether the outcome was success or
/// failure-after-rollback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitState {
    /// Accepting `set()` calls; commit not yet requested.
    Unset,
    /// Commit in flight.
    Committing,
    /// Terminal. The instance is not reusable.
    Committed,
}

/// Cooperative cancellation token, cheap to clone and safe to trip from any
/// task at any time.
#[derive(Debug, Clone, Default)]
pub struct AbortHandle {
    flag: Arc<AtomicBool>,
}

impl AbortHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Trip the flag. Idempotent; only prevents writes whose update
    /// function has not yet run.
    pub fn abort(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation has been requested.
    pub fn is_aborted(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}
