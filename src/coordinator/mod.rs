//! The write coordination core.
//!
//! This module provides:
//! - `MultiWrite` - single-use multi-path commit orchestration
//! - `VersionAllocator` - counter compare-and-increment token allocation
//! - `FanIn` / `CompletionSlot` - fan-out/fan-in synchronization
//! - `WriteOutcome` / `WriteStatus` / `DeclineReason` - per-path results
//! - `AbortHandle` / `CommitState` - cancellation and lifecycle
//! - `version_key` - deterministic, order-sensitive key derivation
//!
//! Rollback is internal: it runs inside `commit()` and surfaces only as
//! the resolved outcome and its log events.

mod allocator;
mod errors;
mod join;
mod multi_write;
mod rollback;
mod state;
mod version_key;
mod writer;

pub use allocator::{AllocationOutcome, VersionAllocator};
pub use errors::{MultiWriteError, MultiWriteResult};
pub use join::{CompletionSlot, FanIn};
pub use multi_write::MultiWrite;
pub use state::{AbortHandle, CommitState};
pub use version_key::version_key;
pub use writer::{DeclineReason, WriteOutcome, WriteStatus, COUNTER_FIELD, KEY_FIELD};
