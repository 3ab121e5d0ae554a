//! In-memory conditional store.
//!
//! Backs the test suites and the CLI demo. Values live in a lock-guarded map
//! keyed by path string; each conditional update resolves asynchronously.
//! Faults and delays can be injected per path to script failure scenarios:
//! an injected error is consumed by exactly one conditional update, and an
//! injected delay postpones the update function's execution so tests can
//! control the interleaving of concurrent writes.

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::Value;

use super::conditional::{ConditionalStore, UpdateDecision, UpdateFn, UpdateOutcome};
use super::errors::{StoreError, StoreResult};
use super::path::StorePath;

/// One journaled store operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JournalEntry {
    /// Path the operation targeted.
    pub path: String,
    /// Whether the update function's decision was committed. Injected
    /// faults journal as `applied = false`.
    pub applied: bool,
}

#[derive(Default)]
struct MemoryInner {
    values: HashMap<String, Value>,
    faults: HashMap<String, VecDeque<StoreError>>,
    delays: HashMap<String, Duration>,
    journal: Vec<JournalEntry>,
}

/// A lock-guarded in-memory store implementing [`ConditionalStore`].
///
/// Clones share the same underlying state.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryInner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Place `value` at `path` without going through the conditional
    /// update protocol. Used to seed fixtures.
    pub fn seed(&self, path: &StorePath, value: Value) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.values.insert(path.to_string(), value);
        }
    }

    /// Read the current value at `path`.
    pub fn get(&self, path: &StorePath) -> Option<Value> {
        self.inner
            .lock()
            .ok()
            .and_then(|inner| inner.values.get(&path.to_string()).cloned())
    }

    /// Queue an error for `path`. The next conditional update against that
    /// path fails with it; later updates see the store healthy again.
    pub fn inject_fault(&self, path: &StorePath, error: StoreError) {
        if let Ok(mut inner) = self.inner.lock() {
            inner
                .faults
                .entry(path.to_string())
                .or_default()
                .push_back(error);
        }
    }

    /// Delay every conditional update against `path` by `delay` before its
    /// update function runs.
    pub fn inject_delay(&self, path: &StorePath, delay: Duration) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.delays.insert(path.to_string(), delay);
        }
    }

    /// Every operation performed so far, in resolution order.
    pub fn journal(&self) -> Vec<JournalEntry> {
        self.inner
            .lock()
            .map(|inner| inner.journal.clone())
            .unwrap_or_default()
    }

    /// Number of operations performed so far.
    pub fn operation_count(&self) -> usize {
        self.inner
            .lock()
            .map(|inner| inner.journal.len())
            .unwrap_or(0)
    }
}

impl ConditionalStore for MemoryStore {
    fn conditional_update(
        &self,
        path: &StorePath,
        mut update: UpdateFn,
    ) -> Pin<Box<dyn Future<Output = StoreResult<UpdateOutcome>> + Send + '_>> {
        let inner = Arc::clone(&self.inner);
        let key = path.to_string();
        Box::pin(async move {
            let delay = inner
                .lock()
                .ok()
                .and_then(|guard| guard.delays.get(&key).copied());
            match delay {
                Some(delay) => tokio::time::sleep(delay).await,
                // Resolution is asynchronous even without a scripted delay.
                None => tokio::task::yield_now().await,
            }

            let mut guard = inner
                .lock()
                .map_err(|_| StoreError::Unavailable("store lock poisoned".to_string()))?;

            let fault = guard
                .faults
                .get_mut(&key)
                .and_then(|queue| queue.pop_front());
            if let Some(error) = fault {
                guard.journal.push(JournalEntry {
                    path: key,
                    applied: false,
                });
                return Err(error);
            }

            // The lock is held across read-decide-commit, so the update
            // function always sees an unchanged value: applied is decided
            // solely by the function's own decision.
            let decision = update(guard.values.get(&key));
            let outcome = match decision {
                UpdateDecision::Apply(value) => {
                    guard.values.insert(key.clone(), value.clone());
                    UpdateOutcome {
                        applied: true,
                        value: Some(value),
                    }
                }
                UpdateDecision::Remove => {
                    guard.values.remove(&key);
                    UpdateOutcome {
                        applied: true,
                        value: None,
                    }
                }
                UpdateDecision::Skip => UpdateOutcome {
                    applied: false,
                    value: guard.values.get(&key).cloned(),
                },
            };
            guard.journal.push(JournalEntry {
                path: key,
                applied: outcome.applied,
            });
            Ok(outcome)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_apply_commits_value() {
        let store = MemoryStore::new();
        let path = StorePath::parse("/data/a");

        let outcome = store
            .conditional_update(&path, Box::new(|_| UpdateDecision::Apply(json!({"x": 1}))))
            .await
            .unwrap();

        assert!(outcome.applied);
        assert_eq!(store.get(&path), Some(json!({"x": 1})));
    }

    #[tokio::test]
    async fn test_skip_is_not_an_error() {
        let store = MemoryStore::new();
        let path = StorePath::parse("/data/a");
        store.seed(&path, json!({"x": 1}));

        let outcome = store
            .conditional_update(&path, Box::new(|_| UpdateDecision::Skip))
            .await
            .unwrap();

        assert!(!outcome.applied);
        assert_eq!(outcome.value, Some(json!({"x": 1})));
        assert_eq!(store.get(&path), Some(json!({"x": 1})));
    }

    #[tokio::test]
    async fn test_remove_deletes_value() {
        let store = MemoryStore::new();
        let path = StorePath::parse("/data/a");
        store.seed(&path, json!({"x": 1}));

        let outcome = store
            .conditional_update(&path, Box::new(|_| UpdateDecision::Remove))
            .await
            .unwrap();

        assert!(outcome.applied);
        assert_eq!(outcome.value, None);
        assert_eq!(store.get(&path), None);
    }

    #[tokio::test]
    async fn test_update_fn_sees_current_value() {
        let store = MemoryStore::new();
        let path = StorePath::parse("/counters/k");
        store.seed(&path, json!(4));

        let outcome = store
            .conditional_update(
                &path,
                Box::new(|current| {
                    let next = current.and_then(|v| v.as_u64()).unwrap_or(0) + 1;
                    UpdateDecision::Apply(json!(next))
                }),
            )
            .await
            .unwrap();

        assert_eq!(outcome.value, Some(json!(5)));
    }

    #[tokio::test]
    async fn test_injected_fault_consumed_once() {
        let store = MemoryStore::new();
        let path = StorePath::parse("/data/a");
        store.inject_fault(&path, StoreError::Backend("boom".to_string()));

        let first = store
            .conditional_update(&path, Box::new(|_| UpdateDecision::Apply(json!({}))))
            .await;
        assert_eq!(first, Err(StoreError::Backend("boom".to_string())));

        let second = store
            .conditional_update(&path, Box::new(|_| UpdateDecision::Apply(json!({}))))
            .await
            .unwrap();
        assert!(second.applied);
    }

    #[tokio::test]
    async fn test_journal_records_operations_in_order() {
        let store = MemoryStore::new();
        let a = StorePath::parse("/data/a");
        let b = StorePath::parse("/data/b");

        store
            .conditional_update(&a, Box::new(|_| UpdateDecision::Apply(json!({}))))
            .await
            .unwrap();
        store
            .conditional_update(&b, Box::new(|_| UpdateDecision::Skip))
            .await
            .unwrap();

        assert_eq!(
            store.journal(),
            vec![
                JournalEntry {
                    path: "/data/a".to_string(),
                    applied: true
                },
                JournalEntry {
                    path: "/data/b".to_string(),
                    applied: false
                },
            ]
        );
    }
}
