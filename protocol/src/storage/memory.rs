//! In-memory store.
//!
//! `MemoryStore` keeps everything in a `BTreeMap` behind a `parking_lot`
//! lock. It is what unit tests and throwaway ledgers run on. Reads, writes
//! and flushes can each be made to fail so the ledger's error paths can be
//! exercised.

use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use super::{Store, StoreError, StoreResult};

/// Volatile [`Store`] backed by a `BTreeMap`.
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: RwLock<BTreeMap<String, Vec<u8>>>,
    fail_writes: AtomicBool,
    fail_reads: AtomicBool,
    fail_flush: AtomicBool,
    fail_key: RwLock<Option<String>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `put` fail (or succeed again with `false`).
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent `get` and `scan` fail.
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make `flush` fail.
    pub fn set_fail_flush(&self, fail: bool) {
        self.fail_flush.store(fail, Ordering::SeqCst);
    }

    /// Make `put` fail only for `key`. `None` clears the fault.
    pub fn set_fail_key(&self, key: Option<&str>) {
        *self.fail_key.write() = key.map(str::to_string);
    }

    /// Remove a key. Test helper for simulating lost writes.
    pub fn remove(&self, key: &str) -> Option<Vec<u8>> {
        self.data.write().remove(key)
    }

    /// Number of stored entries, reserved keys included.
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// True if nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }
}

impl Store for MemoryStore {
    fn put(&self, key: &str, value: &[u8]) -> StoreResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Io(format!("injected write failure for key {key}")));
        }
        if self.fail_key.read().as_deref() == Some(key) {
            return Err(StoreError::Io(format!("injected write failure for key {key}")));
        }
        self.data.write().insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Io(format!("injected read failure for key {key}")));
        }
        Ok(self.data.read().get(key).cloned())
    }

    fn scan(&self) -> StoreResult<Vec<(String, Vec<u8>)>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Io("injected read failure during scan".to_string()));
        }
        Ok(self
            .data
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    fn flush(&self) -> StoreResult<()> {
        if self.fail_flush.load(Ordering::SeqCst) {
            return Err(StoreError::Io("injected flush failure".to_string()));
        }
        Ok(())
    }
}
