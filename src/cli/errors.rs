//! CLI-specific error types.

use std::io;

use thiserror::Error;

use crate::coordinator::MultiWriteError;

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

/// Errors surfaced by the CLI.
#[derive(Debug, Error)]
pub enum CliError {
    /// Could not read the write-set document.
    #[error("cannot read write-set document: {0}")]
    Io(#[from] io::Error),

    /// The write-set document is not valid JSON or has the wrong shape.
    #[error("invalid write-set document: {0}")]
    Parse(#[from] serde_json::Error),

    /// The document contains no writes.
    #[error("write-set document contains no writes")]
    EmptyDocument,

    /// Unknown log level argument.
    #[error("unknown log level: {0}")]
    BadLogLevel(String),

    /// The commit itself failed.
    #[error(transparent)]
    Commit(#[from] MultiWriteError),
}
