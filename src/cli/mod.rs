//! CLI module.
//!
//! Thin demo glue with no authority over the protocol: it loads a
//! write-set document, commits it against an in-memory store, and prints
//! the outcome. Commands:
//! - run: commit a write-set document and print the allocated token
//! - key: print the version key a write-set document commits under

mod args;
mod commands;
mod errors;

pub use args::{Cli, Command};
pub use commands::{run, run_command, WriteSetDocument, WriteSpec};
pub use errors::{CliError, CliResult};
