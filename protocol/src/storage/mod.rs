//! # Storage Module
//!
//! Persistence for the ledger. This module owns the block type, the
//! key-value contract the ledger is written against, two implementations of
//! that contract, and the ledger itself.
//!
//! ## Architecture
//!
//! ```text
//! block.rs   — Block structure, canonical encoding, hash/verify operations
//! chain.rs   — Ledger: height tracking, sealing, fetching, genesis
//! db.rs      — sled-backed Store
//! memory.rs  — in-memory Store for tests and throwaway ledgers
//! ```
//!
//! ## Key Layout
//!
//! | Key                  | Value                               |
//! |----------------------|-------------------------------------|
//! | `"0"`, `"1"`, ...    | canonical JSON of the block         |
//! | `"height"`           | last sealed height, decimal string  |
//!
//! Keys are plain strings. Nothing in the ledger relies on the store's
//! iteration order.

pub mod block;
pub mod chain;
pub mod db;
pub mod memory;

pub use block::Block;
pub use chain::{Ledger, LedgerError, LedgerResult};
pub use db::SledStore;
pub use memory::MemoryStore;

// ---------------------------------------------------------------------------
// Error Type
// ---------------------------------------------------------------------------

/// Errors raised by a [`Store`] backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    #[error("store I/O error: {0}")]
    Io(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

// ---------------------------------------------------------------------------
// Store Contract
// ---------------------------------------------------------------------------

/// The key-value contract the ledger consumes.
///
/// Each `put` must be atomic with respect to concurrent `get`s on the same
/// key: a reader sees either the old value or the new one, never a mix.
pub trait Store: Send + Sync {
    /// Insert or replace the value under `key`.
    fn put(&self, key: &str, value: &[u8]) -> StoreResult<()>;

    /// Read the value under `key`. `Ok(None)` means the key is absent.
    fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>>;

    /// Every key-value pair currently stored, in unspecified order.
    fn scan(&self) -> StoreResult<Vec<(String, Vec<u8>)>>;

    /// Block until previous writes are durable. No-op for volatile stores.
    fn flush(&self) -> StoreResult<()> {
        Ok(())
    }
}

/// Store key for the block at `height`.
pub fn block_key(height: u64) -> String {
    height.to_string()
}

/// Parse a store key back into a block height. Reserved keys yield `None`.
pub fn parse_block_key(key: &str) -> Option<u64> {
    // Reject "+1", "01" and friends so a key maps to exactly one height.
    if key.is_empty() || !key.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if key.len() > 1 && key.starts_with('0') {
        return None;
    }
    key.parse().ok()
}
