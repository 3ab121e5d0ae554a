//! Rollback protocol tests
//!
//! Failure-path properties of the write coordinator:
//! - a store error on any target surfaces verbatim, after compensation
//! - an optimistic rejection surfaces as the rolled-back sentinel
//! - applied siblings are restored to their exact pre-image
//! - the counter is decremented back only while it still holds the token

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use multiwrite::coordinator::{MultiWrite, MultiWriteError, COUNTER_FIELD};
use multiwrite::observability::{Event, Logger, Severity};
use multiwrite::store::{MemoryStore, StoreError, StorePath};

fn counter_root() -> StorePath {
    StorePath::parse("/update_counters")
}

fn coordinator(store: &MemoryStore) -> MultiWrite {
    MultiWrite::new(Arc::new(store.clone()), counter_root())
}

fn counter_path(paths: &[StorePath]) -> StorePath {
    counter_root().child(MultiWrite::version_key(paths))
}

// =============================================================================
// Store errors
// =============================================================================

/// One of two writes fails with a store error: the commit resolves with
/// that error, the applied sibling is restored to its exact pre-image, and
/// the counter is decremented back.
#[tokio::test]
async fn test_store_error_restores_applied_sibling() {
    let store = MemoryStore::new();
    let a = StorePath::parse("/data/a");
    let b = StorePath::parse("/data/b");
    let pre_image = json!({"hello": "old"});
    store.seed(&a, pre_image.clone());
    // Delay b so a has applied before the error propagates.
    store.inject_delay(&b, Duration::from_millis(50));
    store.inject_fault(&b, StoreError::Backend("disk failure".to_string()));

    let mut writer = coordinator(&store);
    writer
        .set(a.clone(), json!({"hello": "new"}))
        .unwrap()
        .set(b.clone(), json!({"foo": "bar"}))
        .unwrap();

    let result = writer.commit().await;

    assert_eq!(
        result,
        Err(MultiWriteError::Store(StoreError::Backend(
            "disk failure".to_string()
        )))
    );
    assert_eq!(store.get(&a), Some(pre_image));
    assert_eq!(store.get(&b), None);
    assert_eq!(
        store.get(&counter_path(&[a, b])),
        Some(json!(0))
    );
}

/// A pre-image that was absent is restored by removing the value.
#[tokio::test]
async fn test_absent_pre_image_restored_by_removal() {
    let store = MemoryStore::new();
    let a = StorePath::parse("/data/a");
    let b = StorePath::parse("/data/b");
    store.inject_delay(&b, Duration::from_millis(50));
    store.inject_fault(&b, StoreError::Backend("disk failure".to_string()));

    let mut writer = coordinator(&store);
    writer
        .set(a.clone(), json!({"hello": "world"}))
        .unwrap()
        .set(b.clone(), json!({"foo": "bar"}))
        .unwrap();

    let result = writer.commit().await;

    assert!(matches!(result, Err(MultiWriteError::Store(_))));
    assert_eq!(store.get(&a), None);
}

// =============================================================================
// Optimistic rejection
// =============================================================================

/// A target whose counter already reached the token declines; the commit
/// resolves with the rolled-back sentinel and nothing is corrupted.
#[tokio::test]
async fn test_stale_target_rolls_back() {
    let store = MemoryStore::new();
    let a = StorePath::parse("/data/a");
    let b = StorePath::parse("/data/b");
    let pre_image_a = json!({"hello": "old"});
    let newer_b = json!({"hello": "newer", COUNTER_FIELD: 5});
    store.seed(&a, pre_image_a.clone());
    store.seed(&b, newer_b.clone());

    let mut writer = coordinator(&store);
    writer
        .set(a.clone(), json!({"hello": "mine"}))
        .unwrap()
        .set(b.clone(), json!({"hello": "mine"}))
        .unwrap();

    let result = writer.commit().await;

    assert_eq!(result, Err(MultiWriteError::RolledBack));
    assert_eq!(store.get(&a), Some(pre_image_a));
    assert_eq!(store.get(&b), Some(newer_b));
    assert_eq!(store.get(&counter_path(&[a, b])), Some(json!(0)));
}

/// A malformed existing value declines the write and is preserved, never
/// clobbered; the rest of the write set rolls back around it.
#[tokio::test]
async fn test_malformed_target_preserved() {
    let store = MemoryStore::new();
    let a = StorePath::parse("/data/a");
    let b = StorePath::parse("/data/b");
    store.seed(&b, json!("legacy scalar"));

    let mut writer = coordinator(&store);
    writer
        .set(a.clone(), json!({"hello": "world"}))
        .unwrap()
        .set(b.clone(), json!({"foo": "bar"}))
        .unwrap();

    let result = writer.commit().await;

    assert_eq!(result, Err(MultiWriteError::RolledBack));
    assert_eq!(store.get(&b), Some(json!("legacy scalar")));
    assert_eq!(store.get(&a), None);
}

// =============================================================================
// Cooperative cancellation
// =============================================================================

/// Abort before commit: every write declines before taking effect, and the
/// allocated token is compensated.
#[tokio::test]
async fn test_abort_before_commit_cancels_all_writes() {
    let store = MemoryStore::new();
    let a = StorePath::parse("/data/a");
    let b = StorePath::parse("/data/b");

    let mut writer = coordinator(&store);
    writer
        .set(a.clone(), json!({"x": 1}))
        .unwrap()
        .set(b.clone(), json!({"y": 2}))
        .unwrap();
    writer.abort();

    let result = writer.commit().await;

    assert_eq!(result, Err(MultiWriteError::RolledBack));
    assert_eq!(store.get(&a), None);
    assert_eq!(store.get(&b), None);
    assert_eq!(store.get(&counter_path(&[a, b])), Some(json!(0)));
}

/// One failure cancels sibling writes that have not executed yet: the
/// delayed sibling declines as cancelled instead of applying.
#[tokio::test]
async fn test_failure_cancels_unexecuted_sibling() {
    let store = MemoryStore::new();
    let (logger, logs) = Logger::captured(Severity::Trace);
    let a = StorePath::parse("/data/a");
    let b = StorePath::parse("/data/b");
    // a declines immediately: its stored counter is far ahead.
    store.seed(&a, json!({"hello": "newer", COUNTER_FIELD: 50}));
    // b would apply, but only runs after a's decline tripped the flag.
    store.inject_delay(&b, Duration::from_millis(50));

    let mut writer = MultiWrite::with_logger(
        Arc::new(store.clone()),
        counter_root(),
        Arc::new(logger),
    );
    writer
        .set(a.clone(), json!({"hello": "mine"}))
        .unwrap()
        .set(b.clone(), json!({"foo": "bar"}))
        .unwrap();

    let result = writer.commit().await;

    assert_eq!(result, Err(MultiWriteError::RolledBack));
    assert_eq!(store.get(&b), None);
    assert!(logs
        .lines()
        .iter()
        .any(|line| line.contains("\"reason\":\"cancelled\"")));
}

// =============================================================================
// Rollback idempotence and observability
// =============================================================================

/// Rollback settles fully (counter and paths) before the outcome resolves.
#[tokio::test]
async fn test_rollback_events_precede_resolution() {
    let store = MemoryStore::new();
    let (logger, logs) = Logger::captured(Severity::Trace);
    let a = StorePath::parse("/data/a");
    let b = StorePath::parse("/data/b");
    store.inject_delay(&b, Duration::from_millis(50));
    store.inject_fault(&b, StoreError::Backend("boom".to_string()));

    let mut writer = MultiWrite::with_logger(
        Arc::new(store.clone()),
        counter_root(),
        Arc::new(logger),
    );
    writer
        .set(a.clone(), json!({"x": 1}))
        .unwrap()
        .set(b.clone(), json!({"y": 2}))
        .unwrap();
    let result = writer.commit().await;

    assert!(result.is_err());
    // By the time commit resolved, both rollback phases had settled.
    assert!(logs.contains_event(Event::RollbackStart));
    assert!(logs.contains_event(Event::RollbackComplete));
    assert!(logs.contains_event(Event::CounterReverted));
    assert!(logs.contains_event(Event::PathReverted));
    assert!(logs.contains_event(Event::CommitFailed));
}

/// A third party advanced the counter between allocation and rollback:
/// the counter compensation is irrelevant and mutates nothing.
#[tokio::test]
async fn test_rollback_skips_counter_advanced_by_third_party() {
    let store = MemoryStore::new();
    let (logger, logs) = Logger::captured(Severity::Trace);
    let a = StorePath::parse("/data/a");
    let b = StorePath::parse("/data/b");
    let key_path = counter_path(&[a.clone(), b.clone()]);
    // b declines (stale), forcing rollback; the counter meanwhile reads as
    // if another transaction already advanced it past our token.
    store.seed(&key_path, json!(9));
    store.seed(&b, json!({"hello": "newer", COUNTER_FIELD: 50}));

    let mut writer = MultiWrite::with_logger(
        Arc::new(store.clone()),
        counter_root(),
        Arc::new(logger),
    );
    writer
        .set(a.clone(), json!({"x": 1}))
        .unwrap()
        .set(b.clone(), json!({"y": 2}))
        .unwrap();

    // Token allocated is 10; a third party bumps the counter mid-flight.
    store.inject_delay(&a, Duration::from_millis(50));
    let handle = {
        let store = store.clone();
        let key_path = key_path.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            store.seed(&key_path, json!(11));
        })
    };

    let result = writer.commit().await;
    handle.await.unwrap();

    assert_eq!(result, Err(MultiWriteError::RolledBack));
    // Counter kept the third party's value; revert was skipped as
    // irrelevant.
    assert_eq!(store.get(&key_path), Some(json!(11)));
    assert!(logs.contains_event(Event::CounterRevertIrrelevant));
}
