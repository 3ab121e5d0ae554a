//! Per-path optimistic conditional writes.
//!
//! Per PROTOCOL.md §4, every target in the write set gets one conditional
//! update, stamped with the transaction's version token. The update function
//! is the optimistic-concurrency guard: it declines rather than applies
//! whenever committing would overwrite work a newer transaction already did,
//! whenever the existing value is not a record it can reason about, or
//! whenever cancellation was requested before it ran.
//!
//! A decline is not an error. It does, however, doom the transaction: the
//! caller trips the shared cancellation flag so sibling writes that have not
//! yet executed stand down, and the join phase schedules compensation for
//! the siblings that already applied.

use std::sync::{Arc, Mutex};

use serde_json::{json, Value};

use crate::observability::{Event, Logger};
use crate::store::{ConditionalStore, StoreError, StorePath, UpdateDecision, UpdateFn};

use super::state::AbortHandle;

/// Payload field carrying the version token.
pub const COUNTER_FIELD: &str = "update_counter";

/// Payload field carrying the version key.
pub const KEY_FIELD: &str = "update_key";

/// Why a write declined without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclineReason {
    /// Cancellation was requested before the update function ran.
    Cancelled,
    /// The stored `update_counter` is already at or past this transaction's
    /// token: a newer or concurrent transaction advanced the path first and
    /// this edit lost.
    Stale,
    /// The stored value is not a record. Existing malformed data is
    /// preserved, never clobbered.
    MalformedValue,
    /// The store itself gave up on the compare-and-swap (concurrent edit).
    Contended,
}

impl DeclineReason {
    /// Stable label used in log output.
    pub fn as_str(&self) -> &'static str {
        match self {
            DeclineReason::Cancelled => "cancelled",
            DeclineReason::Stale => "stale_counter",
            DeclineReason::MalformedValue => "malformed_value",
            DeclineReason::Contended => "concurrent_edit",
        }
    }
}

/// How one write operation resolved.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteStatus {
    /// The stamped payload was committed. `prior` is the pre-image needed to
    /// restore the path if the transaction rolls back (`None`: the path was
    /// absent).
    Applied { prior: Option<Value> },
    /// Nothing was changed at the path.
    Declined(DeclineReason),
    /// The store reported an error.
    Failed(StoreError),
}

/// One write operation's path and resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteOutcome {
    pub path: StorePath,
    pub status: WriteStatus,
}

impl WriteOutcome {
    /// Whether the payload was committed.
    pub fn applied(&self) -> bool {
        matches!(self.status, WriteStatus::Applied { .. })
    }

    /// The store error, if this operation failed hard.
    pub fn error(&self) -> Option<&StoreError> {
        match &self.status {
            WriteStatus::Failed(err) => Some(err),
            _ => None,
        }
    }
}

/// State smuggled out of the update function: the pre-image snapshot and
/// the decline reason of the latest invocation. Reset on every invocation
/// since a contending store may re-run the function.
#[derive(Debug, Default)]
struct Probe {
    prior: Option<Value>,
    decline: Option<DeclineReason>,
}

/// Execute one conditional write, stamped with `token`.
///
/// `payload` must already carry `update_counter` and `update_key`. On any
/// failure or decline the shared `abort` flag is tripped so sibling writes
/// that have not yet executed stand down.
pub(crate) async fn execute(
    store: &dyn ConditionalStore,
    logger: &Logger,
    path: StorePath,
    payload: Value,
    token: u64,
    abort: &AbortHandle,
) -> WriteOutcome {
    let probe = Arc::new(Mutex::new(Probe::default()));

    let update: UpdateFn = Box::new({
        let probe = Arc::clone(&probe);
        let abort = abort.clone();
        move |current| {
            let Ok(mut probe) = probe.lock() else {
                return UpdateDecision::Skip;
            };
            *probe = Probe::default();

            if abort.is_aborted() {
                probe.decline = Some(DeclineReason::Cancelled);
                return UpdateDecision::Skip;
            }

            probe.prior = current.cloned();

            // An absent value competes as a record whose counter is zero.
            let compare = match current {
                Some(value) => value.clone(),
                None => json!({ COUNTER_FIELD: 0 }),
            };
            let Some(record) = compare.as_object() else {
                probe.decline = Some(DeclineReason::MalformedValue);
                return UpdateDecision::Skip;
            };

            // Numeric comparison: a counter field that is not a number does
            // not guard the record, matching how these records were stamped
            // historically.
            if let Some(existing) = record.get(COUNTER_FIELD).and_then(Value::as_f64) {
                if existing >= token as f64 {
                    probe.decline = Some(DeclineReason::Stale);
                    return UpdateDecision::Skip;
                }
            }

            UpdateDecision::Apply(payload.clone())
        }
    });

    let path_label = path.to_string();
    let token_label = token.to_string();
    match store.conditional_update(&path, update).await {
        Err(err) => {
            abort.abort();
            let detail = err.to_string();
            logger.error(
                Event::WriteFailed,
                &[
                    ("error", &detail),
                    ("path", &path_label),
                    ("token", &token_label),
                ],
            );
            WriteOutcome {
                path,
                status: WriteStatus::Failed(err),
            }
        }
        Ok(outcome) if outcome.applied => {
            logger.trace(
                Event::WriteApplied,
                &[("path", &path_label), ("token", &token_label)],
            );
            let prior = probe.lock().ok().and_then(|mut probe| probe.prior.take());
            WriteOutcome {
                path,
                status: WriteStatus::Applied { prior },
            }
        }
        Ok(_) => {
            abort.abort();
            let reason = probe
                .lock()
                .ok()
                .and_then(|probe| probe.decline)
                .unwrap_or(DeclineReason::Contended);
            logger.warn(
                Event::WriteDeclined,
                &[
                    ("path", &path_label),
                    ("reason", reason.as_str()),
                    ("token", &token_label),
                ],
            );
            WriteOutcome {
                path,
                status: WriteStatus::Declined(reason),
            }
        }
    }
}
