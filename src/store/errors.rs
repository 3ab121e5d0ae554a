//! Store error types.

use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors reported by the underlying store.
///
/// These are runtime failures surfaced verbatim to the caller; usage errors
/// never originate here.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// The backend reported a failure for this operation.
    #[error("store backend error: {0}")]
    Backend(String),

    /// The store could not be reached or its state is unusable.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}
