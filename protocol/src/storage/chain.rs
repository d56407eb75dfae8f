//! # Ledger
//!
//! The ledger assigns heights, links each block to its predecessor, seals
//! blocks, and persists them through a [`Store`]. It holds no authoritative
//! copy of the chain: every read goes to the store.
//!
//! ## Sealing
//!
//! ```text
//! lock ─► read "height" ─► fetch predecessor ─► build + hash ─► put block ─► put "height" ─► unlock
//! ```
//!
//! The whole sequence runs under one exclusive section, so two seals never
//! interleave and [`Ledger::ensure_genesis`] cannot race itself into two
//! genesis blocks. Reads take no lock.
//!
//! ## Crash Semantics
//!
//! The block write and the pointer write are two separate store operations.
//! The pointer is the commit marker: a block stored above the pointer was
//! never sealed, is reported by [`Ledger::unsealed_heights`], and is
//! overwritten by the next seal.

use parking_lot::{Mutex, RwLock};

use super::block::Block;
use super::{block_key, parse_block_key, Store, StoreError};
use crate::config::{LedgerConfig, HEIGHT_KEY};

// ---------------------------------------------------------------------------
// Error Type
// ---------------------------------------------------------------------------

/// Errors returned by ledger operations.
///
/// Integrity findings are not errors; see [`crate::validation`].
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// No sealed block at this height.
    #[error("block {height} not found")]
    NotFound { height: u64 },

    /// A seal could not find the block it must link to.
    #[error("cannot seal block {height}: predecessor {predecessor} is missing")]
    Linkage { height: u64, predecessor: u64 },

    #[error("store read failed: {0}")]
    StoreRead(#[source] StoreError),

    #[error("store write failed: {0}")]
    StoreWrite(#[source] StoreError),

    /// A stored value does not decode.
    #[error("corrupt value under key {key:?}: {reason}")]
    Corrupt { key: String, reason: String },

    #[error("ledger height exhausted")]
    HeightOverflow,
}

pub type LedgerResult<T> = Result<T, LedgerError>;

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

/// Append-only, hash-linked ledger over a [`Store`].
///
/// Construct one per store and share it by reference (or `Arc`). Multiple
/// `Ledger` values over the same store defeat the seal lock.
#[derive(Debug)]
pub struct Ledger<S: Store> {
    store: S,
    config: LedgerConfig,
    /// Exclusive section around read-height → write-height.
    seal_lock: Mutex<()>,
    /// Blocks sealed by this instance, in seal order. Inspection only.
    sealed: RwLock<Vec<Block>>,
}

impl<S: Store> Ledger<S> {
    /// Wrap a store with the default configuration.
    pub fn new(store: S) -> Self {
        Self::with_config(store, LedgerConfig::default())
    }

    /// Wrap a store with an explicit configuration.
    pub fn with_config(store: S, config: LedgerConfig) -> Self {
        Self {
            store,
            config,
            seal_lock: Mutex::new(()),
            sealed: RwLock::new(Vec::new()),
        }
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    // -- Reads --------------------------------------------------------------

    /// Height of the last fully sealed block, or `None` for an empty ledger.
    pub fn current_height(&self) -> LedgerResult<Option<u64>> {
        let Some(bytes) = self.store.get(HEIGHT_KEY).map_err(LedgerError::StoreRead)? else {
            return Ok(None);
        };

        let text = std::str::from_utf8(&bytes).map_err(|e| LedgerError::Corrupt {
            key: HEIGHT_KEY.to_string(),
            reason: e.to_string(),
        })?;
        let height = text.trim().parse::<u64>().map_err(|e| LedgerError::Corrupt {
            key: HEIGHT_KEY.to_string(),
            reason: format!("{text:?}: {e}"),
        })?;
        Ok(Some(height))
    }

    /// Read and decode the sealed block at `height`.
    ///
    /// Heights above the pointer are `NotFound` even if a block is stored
    /// there: such a block was never sealed.
    pub fn fetch(&self, height: u64) -> LedgerResult<Block> {
        match self.current_height()? {
            Some(current) if height <= current => {}
            _ => return Err(LedgerError::NotFound { height }),
        }

        let bytes = self
            .fetch_raw(height)?
            .ok_or(LedgerError::NotFound { height })?;
        Block::decode(&bytes).map_err(|e| LedgerError::Corrupt {
            key: block_key(height),
            reason: e.to_string(),
        })
    }

    /// Raw stored bytes under the block key for `height`, ignoring the
    /// height pointer.
    pub fn fetch_raw(&self, height: u64) -> LedgerResult<Option<Vec<u8>>> {
        self.store
            .get(&block_key(height))
            .map_err(LedgerError::StoreRead)
    }

    /// The most recently sealed block, if any.
    pub fn tip(&self) -> LedgerResult<Option<Block>> {
        match self.current_height()? {
            Some(height) => self.fetch(height).map(Some),
            None => Ok(None),
        }
    }

    /// Sealed blocks in `start..=end`, ascending. `end` is clamped to the
    /// current height.
    pub fn fetch_range(&self, start: u64, end: u64) -> LedgerResult<Vec<Block>> {
        let Some(current) = self.current_height()? else {
            return Ok(Vec::new());
        };
        let end = end.min(current);
        if start > end {
            return Ok(Vec::new());
        }
        (start..=end).map(|height| self.fetch(height)).collect()
    }

    /// Number of block keys in the store, sealed or not. Full scan.
    pub fn stored_block_count(&self) -> LedgerResult<usize> {
        let entries = self.store.scan().map_err(LedgerError::StoreRead)?;
        Ok(entries
            .iter()
            .filter(|(key, _)| parse_block_key(key).is_some())
            .count())
    }

    /// Heights of blocks present in the store above the height pointer,
    /// ascending. These are writes whose seal never completed.
    pub fn unsealed_heights(&self) -> LedgerResult<Vec<u64>> {
        let current = self.current_height()?;
        let entries = self.store.scan().map_err(LedgerError::StoreRead)?;

        let mut orphans: Vec<u64> = entries
            .iter()
            .filter_map(|(key, _)| parse_block_key(key))
            .filter(|height| current.map_or(true, |c| *height > c))
            .collect();
        orphans.sort_unstable();

        for height in &orphans {
            tracing::warn!(height, ?current, "block stored above height pointer (unsealed)");
        }
        Ok(orphans)
    }

    /// Blocks sealed through this instance, oldest first. Always empty
    /// unless [`LedgerConfig::cache_sealed`] is set.
    pub fn sealed_this_session(&self) -> Vec<Block> {
        self.sealed.read().clone()
    }

    // -- Writes -------------------------------------------------------------

    /// Seal `body` into a new block at the next height and persist it.
    ///
    /// On an empty ledger this produces height 0 with an empty
    /// `previous_hash`. On a write failure nothing is committed; retry the
    /// whole seal, never part of it. A flush failure is reported after both
    /// writes have reached the store, so the seal is visible but may not
    /// survive a crash.
    pub fn seal(&self, body: impl Into<String>) -> LedgerResult<Block> {
        let _guard = self.seal_lock.lock();
        let current = self.current_height()?;
        self.seal_locked(body.into(), current)
    }

    /// Seal the genesis block if the ledger is empty; otherwise return the
    /// existing block at height 0.
    pub fn ensure_genesis(&self) -> LedgerResult<Block> {
        let _guard = self.seal_lock.lock();
        match self.current_height()? {
            Some(_) => self.fetch(0),
            None => {
                let genesis = self.seal_locked(self.config.genesis_body.clone(), None)?;
                tracing::info!(hash = %genesis.hash, "genesis block sealed");
                Ok(genesis)
            }
        }
    }

    /// Body of a seal. Caller holds `seal_lock`.
    fn seal_locked(&self, body: String, current: Option<u64>) -> LedgerResult<Block> {
        let (height, previous_hash) = match current {
            None => (0, String::new()),
            Some(prev) => {
                let height = prev.checked_add(1).ok_or(LedgerError::HeightOverflow)?;
                let parent = match self.fetch(prev) {
                    Ok(parent) => parent,
                    Err(LedgerError::NotFound { .. }) => {
                        return Err(LedgerError::Linkage {
                            height,
                            predecessor: prev,
                        })
                    }
                    Err(e) => return Err(e),
                };
                (height, parent.hash)
            }
        };

        let timestamp = chrono::Utc::now().timestamp();
        let block = Block::seal(height, body, timestamp, previous_hash);

        self.store
            .put(&block_key(height), &block.encode())
            .map_err(LedgerError::StoreWrite)?;
        self.store
            .put(HEIGHT_KEY, height.to_string().as_bytes())
            .map_err(LedgerError::StoreWrite)?;
        if self.config.flush_on_seal {
            self.store.flush().map_err(LedgerError::StoreWrite)?;
        }

        tracing::info!(height, hash = %block.hash, "block sealed");

        if self.config.cache_sealed {
            self.sealed.write().push(block.clone());
        }
        Ok(block)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GENESIS_BODY;
    use crate::storage::MemoryStore;
    use std::sync::Arc;
    use std::thread;

    fn ledger() -> Ledger<MemoryStore> {
        Ledger::new(MemoryStore::new())
    }

    fn caching_ledger() -> Ledger<MemoryStore> {
        let config = LedgerConfig {
            cache_sealed: true,
            ..LedgerConfig::default()
        };
        Ledger::with_config(MemoryStore::new(), config)
    }

    #[test]
    fn empty_ledger_has_no_height() {
        let ledger = ledger();
        assert_eq!(ledger.current_height().unwrap(), None);
        assert!(ledger.tip().unwrap().is_none());
        assert!(matches!(ledger.fetch(0), Err(LedgerError::NotFound { height: 0 })));
    }

    #[test]
    fn first_seal_is_height_zero() {
        let ledger = ledger();
        let block = ledger.seal("first").unwrap();
        assert_eq!(block.height, 0);
        assert!(block.previous_hash.is_empty());
        assert_eq!(ledger.current_height().unwrap(), Some(0));
    }

    #[test]
    fn heights_are_sequential() {
        let ledger = ledger();
        for i in 0..10u64 {
            let block = ledger.seal(format!("body {i}")).unwrap();
            assert_eq!(block.height, i);
            assert_eq!(ledger.current_height().unwrap(), Some(i));
        }
    }

    #[test]
    fn blocks_link_to_predecessor() {
        let ledger = ledger();
        ledger.ensure_genesis().unwrap();
        ledger.seal("A").unwrap();
        ledger.seal("B").unwrap();

        for h in 1..=2 {
            let block = ledger.fetch(h).unwrap();
            let parent = ledger.fetch(h - 1).unwrap();
            assert_eq!(block.previous_hash, parent.hash);
        }
    }

    #[test]
    fn fetched_block_matches_sealed_block() {
        let ledger = ledger();
        let sealed = ledger.seal("payload").unwrap();
        let fetched = ledger.fetch(0).unwrap();
        assert_eq!(fetched, sealed);
        assert!(fetched.has_valid_hash());
    }

    #[test]
    fn timestamp_is_whole_seconds_now() {
        let before = chrono::Utc::now().timestamp();
        let block = ledger().seal("t").unwrap();
        let after = chrono::Utc::now().timestamp();
        assert!(block.timestamp >= before && block.timestamp <= after);
    }

    #[test]
    fn fetch_above_height_is_not_found_even_if_stored() {
        let ledger = ledger();
        ledger.seal("g").unwrap();
        let orphan = Block::seal(1, "orphan", 0, "x");
        ledger.store().put("1", &orphan.encode()).unwrap();

        assert!(matches!(ledger.fetch(1), Err(LedgerError::NotFound { height: 1 })));
    }

    #[test]
    fn ensure_genesis_is_idempotent() {
        let ledger = ledger();
        let first = ledger.ensure_genesis().unwrap();
        let second = ledger.ensure_genesis().unwrap();

        assert_eq!(first, second);
        assert_eq!(first.body, GENESIS_BODY);
        assert_eq!(ledger.current_height().unwrap(), Some(0));
        assert_eq!(ledger.stored_block_count().unwrap(), 1);
    }

    #[test]
    fn ensure_genesis_keeps_existing_chain() {
        let ledger = ledger();
        ledger.seal("custom genesis").unwrap();
        ledger.seal("A").unwrap();

        let genesis = ledger.ensure_genesis().unwrap();
        assert_eq!(genesis.body, "custom genesis");
        assert_eq!(ledger.current_height().unwrap(), Some(1));
    }

    #[test]
    fn concurrent_ensure_genesis_produces_one_block() {
        let ledger = Arc::new(caching_ledger());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let ledger = Arc::clone(&ledger);
                thread::spawn(move || ledger.ensure_genesis().unwrap())
            })
            .collect();

        let hashes: Vec<String> = handles
            .into_iter()
            .map(|h| h.join().expect("genesis thread panicked").hash)
            .collect();

        assert!(hashes.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(ledger.current_height().unwrap(), Some(0));
        assert_eq!(ledger.sealed_this_session().len(), 1);
    }

    #[test]
    fn concurrent_seals_do_not_interleave() {
        let ledger = Arc::new(ledger());
        ledger.ensure_genesis().unwrap();

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let ledger = Arc::clone(&ledger);
                thread::spawn(move || {
                    for i in 0..5 {
                        ledger.seal(format!("thread {t} block {i}")).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("seal thread panicked");
        }

        assert_eq!(ledger.current_height().unwrap(), Some(20));
        let blocks = ledger.fetch_range(0, 20).unwrap();
        for pair in blocks.windows(2) {
            assert_eq!(pair[1].height, pair[0].height + 1);
            assert!(pair[1].links_to(&pair[0]));
        }
    }

    #[test]
    fn missing_predecessor_is_linkage_error() {
        let ledger = ledger();
        ledger.seal("g").unwrap();
        ledger.seal("A").unwrap();
        ledger.store().remove("1");

        let err = ledger.seal("B").unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Linkage {
                height: 2,
                predecessor: 1
            }
        ));
        assert_eq!(ledger.current_height().unwrap(), Some(1));
        assert!(ledger.fetch_raw(2).unwrap().is_none());
    }

    #[test]
    fn block_write_failure_commits_nothing() {
        let ledger = ledger();
        ledger.seal("g").unwrap();
        ledger.store().set_fail_writes(true);

        assert!(matches!(ledger.seal("A"), Err(LedgerError::StoreWrite(_))));
        assert_eq!(ledger.current_height().unwrap(), Some(0));
        assert!(ledger.fetch_raw(1).unwrap().is_none());
    }

    #[test]
    fn pointer_write_failure_leaves_unsealed_orphan() {
        let ledger = ledger();
        ledger.seal("g").unwrap();
        ledger.store().set_fail_key(Some(HEIGHT_KEY));

        assert!(matches!(ledger.seal("A"), Err(LedgerError::StoreWrite(_))));
        assert_eq!(ledger.current_height().unwrap(), Some(0));
        assert_eq!(ledger.unsealed_heights().unwrap(), vec![1]);

        // Retrying the whole seal overwrites the orphan.
        ledger.store().set_fail_key(None);
        let retried = ledger.seal("A again").unwrap();
        assert_eq!(retried.height, 1);
        assert_eq!(ledger.fetch(1).unwrap().body, "A again");
        assert!(ledger.unsealed_heights().unwrap().is_empty());
    }

    #[test]
    fn corrupt_height_pointer_is_reported() {
        let ledger = ledger();
        ledger.store().put(HEIGHT_KEY, b"not-a-number").unwrap();
        assert!(matches!(
            ledger.current_height(),
            Err(LedgerError::Corrupt { .. })
        ));
    }

    #[test]
    fn corrupt_block_bytes_fail_fetch() {
        let ledger = ledger();
        ledger.seal("g").unwrap();
        ledger.store().put("0", b"{garbage").unwrap();
        assert!(matches!(ledger.fetch(0), Err(LedgerError::Corrupt { .. })));
    }

    #[test]
    fn fetch_range_clamps_to_height() {
        let ledger = ledger();
        for body in ["g", "a", "b", "c"] {
            ledger.seal(body).unwrap();
        }

        let mid = ledger.fetch_range(1, 2).unwrap();
        assert_eq!(mid.iter().map(|b| b.height).collect::<Vec<_>>(), vec![1, 2]);

        let clamped = ledger.fetch_range(2, 100).unwrap();
        assert_eq!(clamped.len(), 2);

        assert!(ledger.fetch_range(5, 10).unwrap().is_empty());
    }

    #[test]
    fn tip_is_last_sealed() {
        let ledger = ledger();
        ledger.seal("g").unwrap();
        let last = ledger.seal("last").unwrap();
        assert_eq!(ledger.tip().unwrap(), Some(last));
    }

    #[test]
    fn session_cache_is_off_by_default() {
        let ledger = ledger();
        ledger.ensure_genesis().unwrap();
        ledger.seal("A").unwrap();
        assert!(ledger.sealed_this_session().is_empty());
    }

    #[test]
    fn session_cache_keeps_sealed_blocks_when_enabled() {
        let ledger = caching_ledger();
        let genesis = ledger.ensure_genesis().unwrap();
        let a = ledger.seal("A").unwrap();
        assert_eq!(ledger.sealed_this_session(), vec![genesis, a]);
    }

    #[test]
    fn read_failure_surfaces_as_store_read() {
        let ledger = ledger();
        ledger.seal("g").unwrap();
        ledger.store().set_fail_reads(true);

        assert!(matches!(ledger.current_height(), Err(LedgerError::StoreRead(_))));
        assert!(matches!(ledger.fetch(0), Err(LedgerError::StoreRead(_))));
        assert!(matches!(ledger.seal("A"), Err(LedgerError::StoreRead(_))));
        assert!(matches!(ledger.unsealed_heights(), Err(LedgerError::StoreRead(_))));

        ledger.store().set_fail_reads(false);
        assert_eq!(ledger.current_height().unwrap(), Some(0));
        assert!(ledger.fetch_raw(1).unwrap().is_none());
    }

    #[test]
    fn flush_failure_surfaces_as_store_write() {
        let ledger = caching_ledger();
        ledger.seal("g").unwrap();
        ledger.store().set_fail_flush(true);

        assert!(matches!(ledger.seal("A"), Err(LedgerError::StoreWrite(_))));
        // Both writes landed before the flush was attempted.
        assert_eq!(ledger.current_height().unwrap(), Some(1));
        assert_eq!(ledger.sealed_this_session().len(), 1);

        ledger.store().set_fail_flush(false);
        assert_eq!(ledger.seal("B").unwrap().height, 2);
    }

    #[test]
    fn flush_failure_ignored_when_flush_disabled() {
        let config = LedgerConfig {
            flush_on_seal: false,
            ..LedgerConfig::default()
        };
        let ledger = Ledger::with_config(MemoryStore::new(), config);
        ledger.store().set_fail_flush(true);
        assert_eq!(ledger.seal("g").unwrap().height, 0);
    }

    #[test]
    fn custom_genesis_body() {
        let config = LedgerConfig {
            genesis_body: "In the beginning".to_string(),
            ..LedgerConfig::default()
        };
        let ledger = Ledger::with_config(MemoryStore::new(), config);
        assert_eq!(ledger.ensure_genesis().unwrap().body, "In the beginning");
    }
}
