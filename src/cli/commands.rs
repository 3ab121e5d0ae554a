//! CLI command implementations
//!
//! The CLI is a thin client: it seeds an in-memory store from the
//! document, hands the write set to the coordinator, and reports the
//! outcome. All protocol decisions stay in the coordinator.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Value};

use crate::coordinator::MultiWrite;
use crate::observability::{Logger, Severity};
use crate::store::{MemoryStore, StorePath};

use super::args::{Cli, Command};
use super::errors::{CliError, CliResult};

/// Write-set document structure.
///
/// ```json
/// {
///   "seed": { "/data/a": { "hello": "world", "update_counter": 1 } },
///   "writes": [
///     { "path": "/data/a", "payload": { "hello": "again" } },
///     { "path": "/data/b", "payload": { "foo": "bar" } }
///   ]
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct WriteSetDocument {
    /// Values placed in the store before the commit runs, keyed by path.
    #[serde(default)]
    pub seed: BTreeMap<String, Value>,

    /// The write set, in order.
    pub writes: Vec<WriteSpec>,
}

/// One target of the write set.
#[derive(Debug, Clone, Deserialize)]
pub struct WriteSpec {
    pub path: String,
    pub payload: Value,
}

/// Parse arguments and dispatch.
pub fn run() -> CliResult<()> {
    run_command(Cli::parse_args().command)
}

/// Dispatch a single parsed command.
pub fn run_command(command: Command) -> CliResult<()> {
    match command {
        Command::Run {
            file,
            counter_root,
            log_level,
        } => run_write_set(&file, &counter_root, &log_level),
        Command::Key { file } => print_key(&file),
    }
}

fn load_document(path: &Path) -> CliResult<WriteSetDocument> {
    let raw = fs::read_to_string(path)?;
    let document: WriteSetDocument = serde_json::from_str(&raw)?;
    if document.writes.is_empty() {
        return Err(CliError::EmptyDocument);
    }
    Ok(document)
}

fn parse_logger(level: &str) -> CliResult<Logger> {
    if level.eq_ignore_ascii_case("off") {
        return Ok(Logger::disabled());
    }
    let severity: Severity = level
        .parse()
        .map_err(|_| CliError::BadLogLevel(level.to_string()))?;
    Ok(Logger::new(severity))
}

fn run_write_set(file: &Path, counter_root: &str, log_level: &str) -> CliResult<()> {
    let document = load_document(file)?;
    let logger = parse_logger(log_level)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(async move {
        let store = MemoryStore::new();
        for (path, value) in &document.seed {
            store.seed(&StorePath::parse(path), value.clone());
        }

        let mut writer = MultiWrite::with_logger(
            Arc::new(store.clone()),
            StorePath::parse(counter_root),
            Arc::new(logger),
        );
        for spec in &document.writes {
            writer.set(StorePath::parse(&spec.path), spec.payload.clone())?;
        }
        let token = writer.commit().await?;

        println!("{}", json!({ "token": token }));
        Ok(())
    })
}

fn print_key(file: &Path) -> CliResult<()> {
    let document = load_document(file)?;
    let paths: Vec<StorePath> = document
        .writes
        .iter()
        .map(|spec| StorePath::parse(&spec.path))
        .collect();

    println!("{}", json!({ "key": MultiWrite::version_key(&paths) }));
    Ok(())
}
