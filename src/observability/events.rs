//! Observable coordinator events.
//!
//! Events are explicit and typed; every log line carries exactly one event
//! code. Rollback outcomes get distinct codes (reverted / irrelevant /
//! failed) even though they surface identically to the caller, so operators
//! can tell them apart after the fact.

use std::fmt;

/// Observable events emitted during a commit attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Commit lifecycle
    /// Commit accepted; version key derived.
    CommitStart,
    /// Commit fully applied; token returned to the caller.
    CommitComplete,
    /// Commit resolved with an error after any compensation settled.
    CommitFailed,

    // Version counter
    /// Counter incremented; token allocated.
    CounterAllocated,
    /// Counter increment was not applied (concurrent contention).
    CounterContended,
    /// Counter increment failed with a store error.
    CounterFailed,

    // Per-path writes
    /// A target payload was committed.
    WriteApplied,
    /// A target write declined (stale counter, malformed value, or
    /// cancellation); nothing was changed at the path.
    WriteDeclined,
    /// A target write failed with a store error.
    WriteFailed,

    // Rollback
    /// Compensation phase started.
    RollbackStart,
    /// Compensation phase fully settled.
    RollbackComplete,
    /// Counter restored to its pre-allocation value.
    CounterReverted,
    /// Counter already advanced past the token; revert skipped.
    CounterRevertIrrelevant,
    /// Counter revert itself failed. Logged only, never escalated.
    CounterRevertFailed,
    /// A path's pre-image was restored.
    PathReverted,
    /// A path was already overwritten by a newer transaction; revert skipped.
    PathRevertSkipped,
    /// A path revert itself failed. Logged only, never escalated.
    PathRevertFailed,
}

impl Event {
    /// Stable event code used in log output.
    pub fn code(&self) -> &'static str {
        match self {
            Event::CommitStart => "MW_COMMIT_START",
            Event::CommitComplete => "MW_COMMIT_COMPLETE",
            Event::CommitFailed => "MW_COMMIT_FAILED",
            Event::CounterAllocated => "MW_COUNTER_ALLOCATED",
            Event::CounterContended => "MW_COUNTER_CONTENDED",
            Event::CounterFailed => "MW_COUNTER_FAILED",
            Event::WriteApplied => "MW_WRITE_APPLIED",
            Event::WriteDeclined => "MW_WRITE_DECLINED",
            Event::WriteFailed => "MW_WRITE_FAILED",
            Event::RollbackStart => "MW_ROLLBACK_START",
            Event::RollbackComplete => "MW_ROLLBACK_COMPLETE",
            Event::CounterReverted => "MW_COUNTER_REVERTED",
            Event::CounterRevertIrrelevant => "MW_COUNTER_REVERT_IRRELEVANT",
            Event::CounterRevertFailed => "MW_COUNTER_REVERT_FAILED",
            Event::PathReverted => "MW_PATH_REVERTED",
            Event::PathRevertSkipped => "MW_PATH_REVERT_SKIPPED",
            Event::PathRevertFailed => "MW_PATH_REVERT_FAILED",
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
