//! # CLI Interface
//!
//! Command-line structure for `sealchain-node`, via `clap` derive.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::logging::LogFormat;

/// Host process for a Sealchain ledger.
///
/// Opens (or creates) a ledger in the data directory and runs one command
/// against it.
#[derive(Parser, Debug)]
#[command(
    name = "sealchain-node",
    about = "Append-only hash-linked ledger",
    version,
    propagate_version = true
)]
pub struct SealchainCli {
    /// Directory holding the ledger database. Created if missing.
    #[arg(
        long,
        short = 'd',
        global = true,
        env = "SEALCHAIN_DATA_DIR",
        default_value = sealchain_protocol::config::DEFAULT_DATA_DIR
    )]
    pub data_dir: PathBuf,

    /// Log output format (logs go to stderr).
    #[arg(
        long,
        global = true,
        env = "SEALCHAIN_LOG_FORMAT",
        value_enum,
        default_value_t = LogFormat::Pretty
    )]
    pub log_format: LogFormat,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the ledger and its genesis block if they do not exist.
    Init,
    /// Seal a new block with the given body.
    Seal(SealArgs),
    /// Print the block at a height as JSON.
    Show(ShowArgs),
    /// Print the current height (-1 for an empty ledger).
    Height,
    /// Validate the whole chain. Exits non-zero on any violation.
    Validate,
    /// Seal two demonstration blocks and validate the chain.
    Demo,
    /// Print version information and exit.
    Version,
}

/// Arguments for `seal`.
#[derive(Parser, Debug)]
pub struct SealArgs {
    /// Block body.
    pub body: String,
}

/// Arguments for `show`.
#[derive(Parser, Debug)]
pub struct ShowArgs {
    /// Block height.
    pub height: u64,
}
