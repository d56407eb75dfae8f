// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Sealchain Node
//!
//! Entry point for the `sealchain-node` binary. Parses CLI arguments,
//! initializes logging, opens the ledger in the data directory, and runs a
//! single command against it.
//!
//! - `init`     — create the ledger and seed genesis
//! - `seal`     — append one block
//! - `show`     — print a block
//! - `height`   — print the height pointer
//! - `validate` — scan the chain for tampering
//! - `demo`     — seal two blocks and validate
//! - `version`  — print build version information

mod cli;
mod logging;

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde::Serialize;
use std::path::Path;

use sealchain_protocol::storage::{Block, Ledger, SledStore};
use sealchain_protocol::validation::Validator;

use cli::{Commands, SealchainCli};

/// Bodies sealed by `demo`.
const DEMO_BODIES: [&str; 2] = ["second block", "third block"];

fn main() -> Result<()> {
    let cli = SealchainCli::parse();

    if matches!(cli.command, Commands::Version) {
        print_version();
        return Ok(());
    }

    logging::init_logging("sealchain_node=info,sealchain_protocol=info", cli.log_format);
    run(cli.command, &cli.data_dir)
}

/// Execute one command against the ledger in `data_dir`.
fn run(command: Commands, data_dir: &Path) -> Result<()> {
    let ledger = open_ledger(data_dir)?;

    match command {
        Commands::Init => {
            let genesis = ledger.ensure_genesis().context("failed to seed genesis")?;
            println!("Ledger ready at {}", data_dir.display());
            println!("  Height       : {}", display_height(ledger.current_height()?));
            println!("  Genesis hash : {}", genesis.hash);
        }
        Commands::Seal(args) => {
            ledger.ensure_genesis().context("failed to seed genesis")?;
            let block = ledger.seal(args.body).context("seal failed")?;
            print_json(&BlockView::from(block))?;
        }
        Commands::Show(args) => {
            let block = ledger
                .fetch(args.height)
                .with_context(|| format!("cannot read block {}", args.height))?;
            print_json(&BlockView::from(block))?;
        }
        Commands::Height => {
            println!("{}", display_height(ledger.current_height()?));
        }
        Commands::Validate => validate(&ledger)?,
        Commands::Demo => {
            ledger.ensure_genesis().context("failed to seed genesis")?;
            for body in DEMO_BODIES {
                let block = ledger.seal(body).context("seal failed")?;
                println!("Block #{} {}", block.height, block.hash);
            }
            validate(&ledger)?;
        }
        Commands::Version => print_version(),
    }

    Ok(())
}

/// Open the sled store under `data_dir/db` and report any unsealed writes
/// left behind by an interrupted seal.
fn open_ledger(data_dir: &Path) -> Result<Ledger<SledStore>> {
    let db_path = data_dir.join("db");
    std::fs::create_dir_all(&db_path)
        .with_context(|| format!("failed to create database directory: {}", db_path.display()))?;

    let store = SledStore::open(&db_path)
        .with_context(|| format!("failed to open database at {}", db_path.display()))?;
    tracing::info!(path = %db_path.display(), recovered = store.was_recovered(), "database opened");

    let ledger = Ledger::new(store);
    let orphans = ledger.unsealed_heights()?;
    if !orphans.is_empty() {
        tracing::warn!(
            count = orphans.len(),
            "found blocks from interrupted seals; they will be overwritten"
        );
    }
    Ok(ledger)
}

fn validate(ledger: &Ledger<SledStore>) -> Result<()> {
    let report = Validator::new(ledger).report().context("validation failed")?;
    print_json(&report)?;

    if report.is_valid() {
        println!("No errors detected");
        Ok(())
    } else {
        bail!(
            "errors at blocks: {:?}",
            report.offending_heights()
        )
    }
}

/// JSON shape printed for a block: the stored fields plus a readable time.
#[derive(Serialize)]
struct BlockView {
    #[serde(flatten)]
    block: Block,
    sealed_at: Option<String>,
}

impl From<Block> for BlockView {
    fn from(block: Block) -> Self {
        let sealed_at = chrono::DateTime::from_timestamp(block.timestamp, 0).map(|t| t.to_rfc3339());
        Self { block, sealed_at }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Height pointer as printed: `-1` stands for an empty ledger.
fn display_height(height: Option<u64>) -> String {
    height.map_or_else(|| "-1".to_string(), |h| h.to_string())
}

/// Prints version information to stdout.
fn print_version() {
    println!("sealchain-node {}", env!("CARGO_PKG_VERSION"));
    println!("protocol       {}", sealchain_protocol::config::PROTOCOL_VERSION);
    println!("hash           {}", sealchain_protocol::config::HASH_ALGORITHM);
}
