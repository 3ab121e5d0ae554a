//! The write coordinator.
//!
//! `MultiWrite` gives callers an all-or-nothing illusion over several
//! independently-stored records when the store's only native atomicity
//! primitive is a single-key compare-and-swap. Per PROTOCOL.md §1, the
//! illusion is built in software:
//!
//! 1. derive a version key from the ordered target paths,
//! 2. compare-and-increment the counter at that key to allocate a token,
//! 3. issue one concurrent conditional write per target, each stamped with
//!    the token,
//! 4. join, and
//! 5. on any failure, rejection, or explicit abort, compensate every write
//!    that did succeed.
//!
//! State machine: `Unset` loops on `set()`; `commit()` transitions to
//! `Committing` exactly once; `Committed` is terminal for both success and
//! failure-after-rollback. One commit per instance; token and state reuse
//! is a usage error by construction.
//!
//! This is best-effort compensation, not consensus: a crash between the
//! commit phase and outcome delivery can leave state partially applied
//! with no automatic recovery.

use std::sync::Arc;

use serde_json::{json, Map, Value};
use uuid::Uuid;

use crate::observability::{Event, Logger};
use crate::store::{ConditionalStore, StoreError, StorePath};

use super::allocator::{AllocationOutcome, VersionAllocator};
use super::errors::{MultiWriteError, MultiWriteResult};
use super::join::FanIn;
use super::rollback;
use super::state::{AbortHandle, CommitState};
use super::version_key;
use super::writer::{self, WriteOutcome, WriteStatus, COUNTER_FIELD, KEY_FIELD};

/// One queued element of the write set.
#[derive(Debug)]
struct PendingWrite {
    path: StorePath,
    payload: Map<String, Value>,
}

/// Coordinates one multi-path conditional write set.
///
/// Single-use: construct, `set()` targets, `commit().await` once. The
/// instance exclusively owns its write set and state for its lifetime.
pub struct MultiWrite {
    store: Arc<dyn ConditionalStore>,
    allocator: VersionAllocator,
    logger: Arc<Logger>,
    abort: AbortHandle,
    state: CommitState,
    writes: Vec<PendingWrite>,
    txn_id: Uuid,
}

impl std::fmt::Debug for MultiWrite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MultiWrite")
            .field("state", &self.state)
            .field("writes", &self.writes)
            .field("txn_id", &self.txn_id)
            .finish_non_exhaustive()
    }
}

impl MultiWrite {
    /// A coordinator whose version counters live under `counter_root`.
    /// Logging is disabled; use [`with_logger`](Self::with_logger) to
    /// observe the protocol.
    pub fn new(store: Arc<dyn ConditionalStore>, counter_root: StorePath) -> Self {
        Self::with_logger(store, counter_root, Arc::new(Logger::disabled()))
    }

    /// A coordinator with an injected logger.
    pub fn with_logger(
        store: Arc<dyn ConditionalStore>,
        counter_root: StorePath,
        logger: Arc<Logger>,
    ) -> Self {
        Self {
            store,
            allocator: VersionAllocator::new(counter_root),
            logger,
            abort: AbortHandle::new(),
            state: CommitState::Unset,
            writes: Vec::new(),
            txn_id: Uuid::new_v4(),
        }
    }

    /// The version key a write set over `paths` commits under. Pure;
    /// exposed so callers can predict or inspect the derived key.
    pub fn version_key(paths: &[StorePath]) -> String {
        version_key::version_key(paths)
    }

    /// Current lifecycle state.
    pub fn state(&self) -> CommitState {
        self.state
    }

    /// A cancellation handle for this commit, cheap to clone into other
    /// tasks. Tripping it only prevents writes whose update function has
    /// not yet executed; applied writes are undone by rollback instead.
    pub fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }

    /// Request cooperative cancellation. Chainable and safe at any time,
    /// before or during `commit()`.
    pub fn abort(&self) -> &Self {
        self.abort.abort();
        self
    }

    /// Queue `payload` to be written at `path`. Chainable; callable any
    /// number of times before `commit()`.
    ///
    /// Fails with [`MultiWriteError::AlreadyCommitted`] once `commit()` has
    /// been called, and with [`MultiWriteError::InvalidPayload`] unless the
    /// payload is an object (scalars and arrays are rejected; the protocol
    /// needs record fields to stamp).
    pub fn set(&mut self, path: StorePath, payload: Value) -> MultiWriteResult<&mut Self> {
        if self.state != CommitState::Unset {
            return Err(MultiWriteError::AlreadyCommitted);
        }
        match payload {
            Value::Object(map) => {
                self.writes.push(PendingWrite { path, payload: map });
                Ok(self)
            }
            _ => Err(MultiWriteError::InvalidPayload {
                path: path.to_string(),
            }),
        }
    }

    /// Commit the write set, resolving exactly once with the allocated
    /// token or the failure, after any compensation has fully settled.
    ///
    /// Usage errors (second commit, empty write set) are reported before
    /// any store interaction. A store error during token allocation fails
    /// the commit immediately with no target writes attempted. After
    /// fan-out, any store error, optimistic rejection, or cancellation
    /// triggers the rollback phase; the caller then sees the first store
    /// error, or [`MultiWriteError::RolledBack`] when no hard error
    /// occurred.
    pub async fn commit(&mut self) -> MultiWriteResult<u64> {
        if self.state != CommitState::Unset {
            return Err(MultiWriteError::AlreadyCommitted);
        }
        if self.writes.is_empty() {
            return Err(MultiWriteError::EmptyWriteSet);
        }
        self.state = CommitState::Committing;

        let paths: Vec<StorePath> = self.writes.iter().map(|write| write.path.clone()).collect();
        let key = version_key::version_key(&paths);
        let txn = self.txn_id.to_string();
        let count = self.writes.len().to_string();
        self.logger.info(
            Event::CommitStart,
            &[("key", &key), ("paths", &count), ("txn", &txn)],
        );

        let token = match self.allocator.allocate(self.store.as_ref(), &key).await {
            Err(err) => {
                let detail = err.to_string();
                self.logger.error(
                    Event::CounterFailed,
                    &[("error", &detail), ("key", &key), ("txn", &txn)],
                );
                return self.fail(&key, &txn, err.into());
            }
            Ok(AllocationOutcome::Contended) => {
                self.logger
                    .warn(Event::CounterContended, &[("key", &key), ("txn", &txn)]);
                return self.fail(&key, &txn, MultiWriteError::CounterContended { key: key.clone() });
            }
            Ok(AllocationOutcome::Allocated(token)) => token,
        };
        let token_label = token.to_string();
        self.logger.trace(
            Event::CounterAllocated,
            &[("key", &key), ("token", &token_label), ("txn", &txn)],
        );

        // Fan out one conditional write per target. No ordering between
        // them; the join barrier is the only synchronization point.
        let (fan_in, slots) = FanIn::new(self.writes.len());
        for (write, slot) in self.writes.iter().zip(slots) {
            let mut payload = write.payload.clone();
            payload.insert(COUNTER_FIELD.to_string(), json!(token));
            payload.insert(KEY_FIELD.to_string(), json!(key.clone()));

            let store = Arc::clone(&self.store);
            let logger = Arc::clone(&self.logger);
            let abort = self.abort.clone();
            let path = write.path.clone();
            tokio::spawn(async move {
                let outcome = writer::execute(
                    store.as_ref(),
                    &logger,
                    path,
                    Value::Object(payload),
                    token,
                    &abort,
                )
                .await;
                slot.complete(outcome);
            });
        }

        let outcomes: Vec<WriteOutcome> = fan_in
            .join()
            .await
            .into_iter()
            .enumerate()
            .map(|(index, outcome)| {
                outcome.unwrap_or_else(|| WriteOutcome {
                    path: self.writes[index].path.clone(),
                    status: WriteStatus::Failed(StoreError::Unavailable(
                        "write task abandoned".to_string(),
                    )),
                })
            })
            .collect();

        // Rollback is decided here, from the joined outcomes plus the
        // cancellation token's final state; the flag itself never undoes
        // anything.
        let first_error = outcomes.iter().find_map(|outcome| outcome.error().cloned());
        let any_rejected = outcomes.iter().any(|outcome| !outcome.applied());
        if first_error.is_none() && !any_rejected && !self.abort.is_aborted() {
            self.state = CommitState::Committed;
            self.logger.info(
                Event::CommitComplete,
                &[("key", &key), ("token", &token_label), ("txn", &txn)],
            );
            return Ok(token);
        }

        let applied: Vec<(StorePath, Option<Value>)> = outcomes
            .into_iter()
            .filter_map(|outcome| match outcome.status {
                WriteStatus::Applied { prior } => Some((outcome.path, prior)),
                _ => None,
            })
            .collect();

        rollback::run(
            Arc::clone(&self.store),
            self.allocator.clone(),
            Arc::clone(&self.logger),
            key.clone(),
            token,
            applied,
        )
        .await;

        let error = match first_error {
            Some(err) => MultiWriteError::Store(err),
            None => MultiWriteError::RolledBack,
        };
        self.fail(&key, &txn, error)
    }

    /// Terminal failure path: mark committed, log, and surface the error.
    fn fail(&mut self, key: &str, txn: &str, error: MultiWriteError) -> MultiWriteResult<u64> {
        self.state = CommitState::Committed;
        let detail = error.to_string();
        self.logger.warn(
            Event::CommitFailed,
            &[("error", &detail), ("key", key), ("txn", txn)],
        );
        Err(error)
    }
}
