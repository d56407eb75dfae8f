//! # SledStore — Persistent Storage Engine
//!
//! The on-disk [`Store`] for the ledger, built on sled's embedded key-value
//! store. Everything the ledger persists lives in a single named tree
//! ([`LEDGER_TREE`]); block keys are decimal heights and the height pointer
//! sits under the reserved [`HEIGHT_KEY`](crate::config::HEIGHT_KEY).
//!
//! ## Atomicity
//!
//! A single `insert` in sled is atomic, so a reader never observes a half
//! written block. The ledger deliberately does *not* batch the block write
//! with the height pointer update: the pointer is the commit marker, and a
//! block that landed without its pointer is simply not sealed yet.

use sled::{Db, Tree};
use std::path::Path;

use super::{Store, StoreResult};
use crate::config::LEDGER_TREE;

/// sled-backed [`Store`].
///
/// sled supports lock-free concurrent reads and serialized writes, so a
/// `SledStore` can be shared across threads without extra synchronization.
#[derive(Debug, Clone)]
pub struct SledStore {
    /// The underlying sled database handle.
    db: Db,
    /// Blocks and the height pointer.
    ledger: Tree,
}

impl SledStore {
    /// Open or create a store at the given filesystem path.
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let db = sled::open(path)?;
        Self::from_db(db)
    }

    /// Create a temporary store that is deleted when dropped.
    pub fn open_temporary() -> StoreResult<Self> {
        let config = sled::Config::new().temporary(true);
        let db = config.open()?;
        Self::from_db(db)
    }

    fn from_db(db: Db) -> StoreResult<Self> {
        let ledger = db.open_tree(LEDGER_TREE)?;
        Ok(Self { db, ledger })
    }

    /// Number of entries in the ledger tree, reserved keys included.
    pub fn len(&self) -> usize {
        self.ledger.len()
    }

    /// True if the ledger tree holds nothing.
    pub fn is_empty(&self) -> bool {
        self.ledger.is_empty()
    }

    /// Whether sled recovered this database from an existing directory.
    pub fn was_recovered(&self) -> bool {
        self.db.was_recovered()
    }
}

impl Store for SledStore {
    fn put(&self, key: &str, value: &[u8]) -> StoreResult<()> {
        self.ledger.insert(key.as_bytes(), value)?;
        Ok(())
    }

    fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        Ok(self.ledger.get(key.as_bytes())?.map(|v| v.to_vec()))
    }

    fn scan(&self) -> StoreResult<Vec<(String, Vec<u8>)>> {
        let mut entries = Vec::with_capacity(self.ledger.len());
        for result in self.ledger.iter() {
            let (key, value) = result?;
            entries.push((String::from_utf8_lossy(&key).into_owned(), value.to_vec()));
        }
        Ok(entries)
    }

    fn flush(&self) -> StoreResult<()> {
        self.db.flush()?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_temporary_database() {
        let store = SledStore::open_temporary().expect("should create temp store");
        assert!(store.is_empty());
        assert_eq!(store.get("height").unwrap(), None);
    }

    #[test]
    fn open_persistent_database() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = SledStore::open(dir.path()).expect("should open store");
        store.put("0", b"genesis").unwrap();
        store.flush().unwrap();
        drop(store);

        let reopened = SledStore::open(dir.path()).expect("should reopen store");
        assert!(reopened.was_recovered());
        assert_eq!(reopened.get("0").unwrap().as_deref(), Some(&b"genesis"[..]));
    }

    #[test]
    fn put_get_overwrite() {
        let store = SledStore::open_temporary().unwrap();
        store.put("height", b"0").unwrap();
        store.put("height", b"7").unwrap();
        assert_eq!(store.get("height").unwrap().as_deref(), Some(&b"7"[..]));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn scan_returns_all_keys() {
        let store = SledStore::open_temporary().unwrap();
        for key in ["0", "1", "10", "2", "height"] {
            store.put(key, key.as_bytes()).unwrap();
        }

        let mut entries = store.scan().unwrap();
        entries.sort();
        let keys: Vec<&str> = entries.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["0", "1", "10", "2", "height"]);
        assert!(entries.iter().all(|(k, v)| k.as_bytes() == v.as_slice()));
    }

    #[test]
    fn concurrent_reads_do_not_block() {
        use std::sync::Arc;
        use std::thread;

        let store = Arc::new(SledStore::open_temporary().unwrap());
        for i in 0..10u64 {
            store.put(&i.to_string(), &i.to_be_bytes()).unwrap();
        }

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for i in 0..10u64 {
                        let value = store.get(&i.to_string()).unwrap().unwrap();
                        assert_eq!(value, i.to_be_bytes().to_vec());
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().expect("reader thread should not panic");
        }
    }
}
