//! The single-key conditional update contract.
//!
//! Per PROTOCOL.md §2, the store exposes exactly one mutation primitive:
//! `conditional_update(path, fn)`, which reads the current value at `path`,
//! invokes `fn` on it, and atomically commits the returned value only if the
//! key has not changed since the read. This is the only atomicity guarantee
//! the coordinator can rely on; everything else is built on top of it.

use std::future::Future;
use std::pin::Pin;

use serde_json::Value;

use super::errors::StoreResult;
use super::path::StorePath;

/// What the update function decided to do with the current value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateDecision {
    /// Commit this value at the path.
    Apply(Value),
    /// Remove the value at the path entirely.
    Remove,
    /// Leave the path untouched. Resolves as `applied = false` with no
    /// error; this is a valid no-op outcome, not a failure.
    Skip,
}

/// Resolution of one conditional update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateOutcome {
    /// Whether the update function's decision was committed.
    pub applied: bool,
    /// The value stored at the path after the operation settled.
    pub value: Option<Value>,
}

/// The update function handed to the store.
///
/// `FnMut` rather than `FnOnce`: a contending store may re-read and re-invoke
/// the function before it manages to commit. Implementations must treat every
/// invocation as authoritative and discard state from earlier attempts.
pub type UpdateFn = Box<dyn FnMut(Option<&Value>) -> UpdateDecision + Send>;

/// A key-addressed store whose only native atomicity primitive is a
/// single-key compare-and-swap transaction.
pub trait ConditionalStore: Send + Sync {
    /// Apply `update` to the current value at `path`, committing the result
    /// only if the key is unchanged since it was read. Resolution is always
    /// asynchronous.
    fn conditional_update(
        &self,
        path: &StorePath,
        update: UpdateFn,
    ) -> Pin<Box<dyn Future<Output = StoreResult<UpdateOutcome>> + Send + '_>>;
}
