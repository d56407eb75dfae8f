//! # Block Structure
//!
//! A block is one immutable record in the ledger: a caller-supplied body,
//! the wall-clock second it was sealed, its position in the chain, and two
//! hashes that tie it to its own contents and to its predecessor.
//!
//! ## Block Layout
//!
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │  height: u64          (0 = genesis)              │
//! │  body: String         (opaque payload)           │
//! │  timestamp: i64       (unix seconds)             │
//! │  previous_hash: hex   ("" for genesis)           │
//! │  hash: hex            (SHA-256, see below)       │
//! └──────────────────────────────────────────────────┘
//! ```
//!
//! ## Canonical Encoding
//!
//! The canonical encoding is the compact JSON object of the five fields in
//! the order above. The block hash is `SHA-256(canonical encoding)` computed
//! with `hash` set to the empty string. The same encoding, with the real
//! hash filled in, is what the store holds. There is exactly one encoder
//! ([`Block::canonical_bytes`]) so sealing and validation cannot drift apart.

use serde::{Deserialize, Serialize};

use crate::crypto::hash::sha256_hex;

/// A sealed ledger block.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// Position in the chain. Genesis is 0.
    pub height: u64,
    /// Caller-supplied payload.
    pub body: String,
    /// Unix timestamp, whole seconds, taken when the block was sealed.
    pub timestamp: i64,
    /// Hash of the block at `height - 1`. Empty only for genesis.
    pub previous_hash: String,
    /// SHA-256 of this block's canonical encoding with `hash` blanked.
    pub hash: String,
}

/// Borrowed view used for hashing: identical field order to [`Block`], with
/// the hash slot supplied separately so no scratch clone is needed.
#[derive(Serialize)]
struct CanonicalView<'a> {
    height: u64,
    body: &'a str,
    timestamp: i64,
    previous_hash: &'a str,
    hash: &'a str,
}

impl Block {
    /// Build and seal a block: fills every field and computes the hash.
    ///
    /// This does not touch storage. The [`Ledger`](super::Ledger) decides
    /// `height` and `previous_hash`; this only makes the result self-consistent.
    pub fn seal(
        height: u64,
        body: impl Into<String>,
        timestamp: i64,
        previous_hash: impl Into<String>,
    ) -> Self {
        let mut block = Block {
            height,
            body: body.into(),
            timestamp,
            previous_hash: previous_hash.into(),
            hash: String::new(),
        };
        block.hash = block.compute_hash();
        block
    }

    /// Construct a genesis block: height 0, no predecessor.
    pub fn genesis(body: impl Into<String>, timestamp: i64) -> Self {
        Self::seal(0, body, timestamp, String::new())
    }

    /// Canonical encoding of this block with the `hash` field blanked.
    ///
    /// This is the hash preimage.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        self.encode_with_hash("")
    }

    /// Encoding written to the store: the canonical encoding with the real
    /// hash present.
    pub fn encode(&self) -> Vec<u8> {
        self.encode_with_hash(&self.hash)
    }

    /// Decode a block from its stored encoding.
    pub fn decode(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    /// Recompute the hash from the current field values.
    pub fn compute_hash(&self) -> String {
        sha256_hex(&self.canonical_bytes())
    }

    /// True when the stored hash matches the recomputed one.
    pub fn has_valid_hash(&self) -> bool {
        self.hash == self.compute_hash()
    }

    /// True if `self` correctly extends `parent`.
    pub fn links_to(&self, parent: &Block) -> bool {
        self.previous_hash == parent.hash
    }

    fn encode_with_hash(&self, hash: &str) -> Vec<u8> {
        let view = CanonicalView {
            height: self.height,
            body: &self.body,
            timestamp: self.timestamp,
            previous_hash: &self.previous_hash,
            hash,
        };
        // Strings and integers only: serialization cannot fail.
        serde_json::to_vec(&view).unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
