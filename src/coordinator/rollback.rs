//! Compensating rollback.
//!
//! Per PROTOCOL.md §5: when the join phase observes any failure or the
//! cancellation flag, the coordinator undoes what it can. Two independent
//! compensations run concurrently and settle through the same fan-in
//! barrier as the commit writes:
//!
//! 1. the counter is conditionally decremented if it still holds this
//!    transaction's token, and
//! 2. every write that applied is conditionally restored to its pre-image
//!    if the path's `update_counter` is still this transaction's token.
//!
//! Both are best-effort. A counter or path a newer transaction already
//! advanced is skipped silently: reverting it would itself be an unsafe
//! overwrite. Compensation failures are logged and swallowed; they never
//! block delivering the original outcome to the caller.

use std::sync::Arc;

use serde_json::Value;

use crate::observability::{Event, Logger};
use crate::store::{ConditionalStore, StorePath, UpdateDecision, UpdateFn};

use super::allocator::VersionAllocator;
use super::join::FanIn;
use super::writer::COUNTER_FIELD;

/// Undo the counter and every applied write, then resolve. `applied` holds
/// the path and pre-image of each write that committed.
pub(crate) async fn run(
    store: Arc<dyn ConditionalStore>,
    allocator: VersionAllocator,
    logger: Arc<Logger>,
    key: String,
    token: u64,
    applied: Vec<(StorePath, Option<Value>)>,
) {
    let applied_label = applied.len().to_string();
    let token_label = token.to_string();
    logger.info(
        Event::RollbackStart,
        &[
            ("applied", &applied_label),
            ("key", &key),
            ("token", &token_label),
        ],
    );

    let (fan_in, mut slots) = FanIn::new(1 + applied.len());

    let counter_slot = slots.remove(0);
    {
        let store = Arc::clone(&store);
        let logger = Arc::clone(&logger);
        let allocator = allocator.clone();
        let key = key.clone();
        tokio::spawn(async move {
            allocator
                .compensate(store.as_ref(), &logger, &key, token)
                .await;
            counter_slot.complete(());
        });
    }

    for ((path, prior), slot) in applied.into_iter().zip(slots) {
        let store = Arc::clone(&store);
        let logger = Arc::clone(&logger);
        tokio::spawn(async move {
            restore_path(store.as_ref(), &logger, path, prior, token).await;
            slot.complete(());
        });
    }

    fan_in.join().await;
    logger.info(
        Event::RollbackComplete,
        &[("key", &key), ("token", &token_label)],
    );
}

/// Conditionally restore one path's pre-image. Applies only while the
/// stored `update_counter` is still this transaction's token; an absent
/// pre-image restores by removing the value.
async fn restore_path(
    store: &dyn ConditionalStore,
    logger: &Logger,
    path: StorePath,
    prior: Option<Value>,
    token: u64,
) {
    let update: UpdateFn = Box::new({
        let prior = prior.clone();
        move |current| {
            let still_ours = current
                .and_then(|value| value.as_object())
                .and_then(|record| record.get(COUNTER_FIELD))
                .and_then(Value::as_u64)
                == Some(token);
            if !still_ours {
                return UpdateDecision::Skip;
            }
            match prior.clone() {
                Some(value) => UpdateDecision::Apply(value),
                None => UpdateDecision::Remove,
            }
        }
    });

    let path_label = path.to_string();
    let token_label = token.to_string();
    match store.conditional_update(&path, update).await {
        Err(err) => {
            let detail = err.to_string();
            logger.error(
                Event::PathRevertFailed,
                &[
                    ("error", &detail),
                    ("path", &path_label),
                    ("token", &token_label),
                ],
            );
        }
        Ok(outcome) if outcome.applied => {
            logger.info(
                Event::PathReverted,
                &[("path", &path_label), ("token", &token_label)],
            );
        }
        Ok(_) => {
            logger.info(
                Event::PathRevertSkipped,
                &[("path", &path_label), ("token", &token_label)],
            );
        }
    }
}
