//! Version token allocation.
//!
//! Per PROTOCOL.md §3, tokens come from a compare-and-increment on the
//! counter record at `counter_root/<version_key>`, treating an absent
//! counter as zero. Allocation is never retried: a store error or a lost
//! increment fails the whole commit before any target write is attempted.
//!
//! The compensating decrement is conditional on the counter still holding
//! this transaction's token. If a newer transaction already advanced it,
//! the revert is irrelevant and skipped silently.

use serde_json::Value;

use crate::observability::{Event, Logger};
use crate::store::{ConditionalStore, StorePath, StoreResult, UpdateDecision, UpdateFn};

/// How an allocation attempt resolved (store errors surface separately).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocationOutcome {
    /// The counter was incremented to this token.
    Allocated(u64),
    /// The increment was not applied: a concurrent transaction won the
    /// compare-and-swap. Soft failure; the commit is abandoned, not retried.
    Contended,
}

/// Allocates and compensates version tokens under a counter root path.
#[derive(Debug, Clone)]
pub struct VersionAllocator {
    counter_root: StorePath,
}

impl VersionAllocator {
    pub fn new(counter_root: StorePath) -> Self {
        Self { counter_root }
    }

    /// The counter record's path for a version key. The key is already
    /// percent-escaped, so it is a single child segment.
    pub fn counter_path(&self, key: &str) -> StorePath {
        self.counter_root.child(key)
    }

    /// Compare-and-increment the counter for `key`, yielding the token.
    pub async fn allocate(
        &self,
        store: &dyn ConditionalStore,
        key: &str,
    ) -> StoreResult<AllocationOutcome> {
        let path = self.counter_path(key);
        let update: UpdateFn = Box::new(|current| {
            let next = current.and_then(Value::as_u64).unwrap_or(0) + 1;
            UpdateDecision::Apply(Value::from(next))
        });

        let outcome = store.conditional_update(&path, update).await?;
        if !outcome.applied {
            return Ok(AllocationOutcome::Contended);
        }
        // The committed value is the one the update function returned; a
        // counter that is no longer a bare integer reads the same as losing
        // the race.
        match outcome.value.as_ref().and_then(Value::as_u64) {
            Some(token) => Ok(AllocationOutcome::Allocated(token)),
            None => Ok(AllocationOutcome::Contended),
        }
    }

    /// Conditionally decrement the counter back below `token`. Best-effort:
    /// outcomes are logged with distinct events, never escalated.
    pub async fn compensate(
        &self,
        store: &dyn ConditionalStore,
        logger: &Logger,
        key: &str,
        token: u64,
    ) {
        let path = self.counter_path(key);
        let update: UpdateFn = Box::new(move |current| {
            match current.and_then(Value::as_u64) {
                Some(value) if value == token => {
                    UpdateDecision::Apply(Value::from(token.saturating_sub(1)))
                }
                // Someone already advanced the counter; reverting would
                // clobber their allocation.
                _ => UpdateDecision::Skip,
            }
        });

        let key_label = key.to_string();
        let token_label = token.to_string();
        match store.conditional_update(&path, update).await {
            Err(err) => {
                let detail = err.to_string();
                logger.error(
                    Event::CounterRevertFailed,
                    &[
                        ("error", &detail),
                        ("key", &key_label),
                        ("token", &token_label),
                    ],
                );
            }
            Ok(outcome) if outcome.applied => {
                logger.info(
                    Event::CounterReverted,
                    &[("key", &key_label), ("token", &token_label)],
                );
            }
            Ok(_) => {
                logger.info(
                    Event::CounterRevertIrrelevant,
                    &[("key", &key_label), ("token", &token_label)],
                );
            }
        }
    }
}
