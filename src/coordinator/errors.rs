//! Coordinator error types.
//!
//! Two families share one enum, distinguished by when they surface:
//!
//! - Usage errors (`AlreadyCommitted`, `EmptyWriteSet`, `InvalidPayload`)
//!   are programming errors, reported synchronously before any store
//!   interaction.
//! - Runtime failures (`Store`, `CounterContended`, `RolledBack`) resolve
//!   through the commit future after the outcome, including any
//!   compensation, has fully settled.

use thiserror::Error;

use crate::store::StoreError;

/// Result type for coordinator operations.
pub type MultiWriteResult<T> = Result<T, MultiWriteError>;

/// Errors surfaced by [`MultiWrite`](super::MultiWrite).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MultiWriteError {
    /// The instance already committed; coordinators are single-use.
    #[error("already committed; create a new coordinator for each transaction")]
    AlreadyCommitted,

    /// `commit()` was called but `set()` never was.
    #[error("commit() called but set() was never called")]
    EmptyWriteSet,

    /// Payloads must be structured records; scalars and arrays are rejected.
    #[error("payload for {path} must be an object; scalars and arrays are not allowed")]
    InvalidPayload {
        /// Display form of the offending target path.
        path: String,
    },

    /// The version counter increment was not applied (concurrent
    /// contention). No target writes were attempted, so no compensation ran.
    #[error("version counter contended for key {key}")]
    CounterContended {
        /// The derived version key whose counter was contended.
        key: String,
    },

    /// A store error, surfaced verbatim. Any applied writes were compensated
    /// before this resolved.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// No store error occurred, but one or more writes declined (stale
    /// version, malformed existing value, or cancellation) and the write set
    /// was compensated.
    #[error("commit rolled back")]
    RolledBack,
}

impl MultiWriteError {
    /// Whether this is a usage error: a misuse of the API reported before
    /// any store interaction.
    pub fn is_usage(&self) -> bool {
        matches!(
            self,
            MultiWriteError::AlreadyCommitted
                | MultiWriteError::EmptyWriteSet
                | MultiWriteError::InvalidPayload { .. }
        )
    }
}
