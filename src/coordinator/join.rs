//! Fan-out/fan-in synchronization.
//!
//! A barrier over a fixed number of concurrent store operations. Each
//! operation owns an indexed completion slot; the aggregating join resolves
//! exactly once with every result in its slot's position, preserving
//! per-path correlation regardless of completion order.
//!
//! Completing a slot is infallible and exactly-once (the slot is consumed).
//! Joining after some or all operations already finished is fine: results
//! are buffered. A slot dropped without completion resolves as `None` so an
//! abandoned operation can never hang the join.

use futures_util::future::join_all;
use tokio::sync::oneshot;

/// One operation's completion slot.
#[derive(Debug)]
pub struct CompletionSlot<T> {
    index: usize,
    tx: oneshot::Sender<T>,
}

impl<T> CompletionSlot<T> {
    /// Position this slot's result will occupy in the joined output.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Deliver this operation's result. Consumes the slot.
    pub fn complete(self, value: T) {
        // Send only fails if the join side is gone, in which case nobody is
        // waiting for the result anyway.
        let _ = self.tx.send(value);
    }
}

/// The aggregating side of the barrier.
#[derive(Debug)]
pub struct FanIn<T> {
    receivers: Vec<oneshot::Receiver<T>>,
}

impl<T> FanIn<T> {
    /// A barrier over `count` operations, with one completion slot per
    /// operation. Zero is allowed; the join resolves immediately.
    pub fn new(count: usize) -> (Self, Vec<CompletionSlot<T>>) {
        let mut receivers = Vec::with_capacity(count);
        let mut slots = Vec::with_capacity(count);
        for index in 0..count {
            let (tx, rx) = oneshot::channel();
            receivers.push(rx);
            slots.push(CompletionSlot { index, tx });
        }
        (Self { receivers }, slots)
    }

    /// Wait for every slot to resolve. Resolves exactly once, with results
    /// indexed by slot. `None` marks a slot abandoned without completion.
    pub async fn join(self) -> Vec<Option<T>> {
        join_all(
            self.receivers
                .into_iter()
                .map(|rx| async move { rx.await.ok() }),
        )
        .await
    }
}
