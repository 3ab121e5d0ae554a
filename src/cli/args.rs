//! CLI argument definitions using clap
//!
//! Commands:
//! - multiwrite run --file <writes.json> [--counter-root <path>] [--log-level <level>]
//! - multiwrite key --file <writes.json>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// multiwrite - optimistic multi-path write coordination demo
#[derive(Parser, Debug)]
#[command(name = "multiwrite")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Commit a write-set document against an in-memory store
    Run {
        /// Path to the write-set document
        #[arg(long)]
        file: PathBuf,

        /// Path the version counters live under
        #[arg(long, default_value = "/update_counters")]
        counter_root: String,

        /// Minimum log severity (trace, info, warn, error, off)
        #[arg(long, default_value = "warn")]
        log_level: String,
    },

    /// Print the version key the document's write set commits under
    Key {
        /// Path to the write-set document
        #[arg(long)]
        file: PathBuf,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
