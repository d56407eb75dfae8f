// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Sealchain — Core Library
//!
//! An append-only, hash-linked ledger of opaque records ("blocks") persisted
//! in a key-value store. Every block carries the SHA-256 of its own canonical
//! encoding and the hash of its predecessor, so rewriting history anywhere in
//! the chain shows up the next time the chain is validated.
//!
//! ## Architecture
//!
//! - **crypto** — SHA-256 hashing and hex digests.
//! - **storage** — Block type, the `Store` contract, sled and in-memory
//!   backends, and the `Ledger` that seals blocks.
//! - **validation** — Chain-wide integrity checks. Findings, not faults.
//! - **config** — Reserved keys, the genesis sentinel, and `LedgerConfig`.
//!
//! ## Quick Tour
//!
//! ```
//! use sealchain_protocol::storage::{Ledger, MemoryStore};
//! use sealchain_protocol::validation::Validator;
//!
//! let ledger = Ledger::new(MemoryStore::new());
//! ledger.ensure_genesis().unwrap();
//! ledger.seal("A").unwrap();
//!
//! assert_eq!(ledger.current_height().unwrap(), Some(1));
//! assert!(Validator::new(&ledger).validate_chain().unwrap().is_empty());
//! ```
//!
//! ## Ground Rules
//!
//! 1. The store is the only durable owner of block bytes.
//! 2. One writer at a time. Sealing holds an exclusive section end to end.
//! 3. Tampered data is an expected input to validation, never a panic.

pub mod config;
pub mod crypto;
pub mod storage;
pub mod validation;
