//! Store boundary: the conditional-update contract, path handles, and the
//! in-memory implementation used by tests and the CLI demo.

mod conditional;
mod errors;
mod memory;
mod path;

pub use conditional::{ConditionalStore, UpdateDecision, UpdateFn, UpdateOutcome};
pub use errors::{StoreError, StoreResult};
pub use memory::{JournalEntry, MemoryStore};
pub use path::StorePath;
