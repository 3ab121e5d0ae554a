//! multiwrite - optimistic multi-path write coordination for single-key
//! compare-and-swap stores
//!
//! The store commits one key at a time; `MultiWrite` layers an
//! all-or-nothing illusion over several keys by allocating a shared version
//! token, writing every target conditionally against it, and compensating
//! every applied write when any of them cannot commit. See PROTOCOL.md for
//! the full protocol.

pub mod cli;
pub mod coordinator;
pub mod observability;
pub mod store;
