//! Observability subsystem.
//!
//! Structured JSON logging with typed event codes. Principles:
//!
//! 1. Observability is read-only: no side effects on the commit protocol
//! 2. Logging must never raise
//! 3. Deterministic field ordering
//! 4. The logger is injected, not process-global
//!
//! # Usage
//!
//! ```ignore
//! use multiwrite::observability::{Event, Logger, Severity};
//!
//! let logger = Logger::new(Severity::Info);
//! logger.info(Event::CommitStart, &[("key", "data%2Fa"), ("paths", "2")]);
//! ```

mod events;
mod logger;

pub use events::Event;
pub use logger::{CapturedLogs, Logger, Severity};
