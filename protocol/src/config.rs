//! # Ledger Configuration & Constants
//!
//! Every magic string in Sealchain lives here. The reserved key names and the
//! genesis body are part of the on-disk format: changing them after a ledger
//! has been written makes the existing chain unreadable, so don't.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// On-Disk Format
// ---------------------------------------------------------------------------

/// Reserved store key holding the height of the last fully sealed block.
///
/// Block keys are decimal heights, so no block can ever collide with it.
pub const HEIGHT_KEY: &str = "height";

/// Body of the block sealed at height 0.
pub const GENESIS_BODY: &str = "Genesis Block";

/// Name of the sled tree that holds blocks and the height pointer.
pub const LEDGER_TREE: &str = "ledger";

// ---------------------------------------------------------------------------
// Hashing
// ---------------------------------------------------------------------------

/// Hash function used for block hashes.
pub const HASH_ALGORITHM: &str = "SHA-256";

/// Digest length in bytes.
pub const HASH_OUTPUT_LENGTH: usize = 32;

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

/// Default data directory for the node binary.
pub const DEFAULT_DATA_DIR: &str = "./chaindata";

/// Library version string, mostly for `sealchain-node version`.
pub const PROTOCOL_VERSION: &str = "0.1.0";

// ---------------------------------------------------------------------------
// LedgerConfig
// ---------------------------------------------------------------------------

/// Runtime knobs for a [`Ledger`](crate::storage::Ledger).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Flush the store after every seal. Off trades durability of the last
    /// few seals for throughput.
    pub flush_on_seal: bool,
    /// Body used when [`ensure_genesis`](crate::storage::Ledger::ensure_genesis)
    /// seeds an empty ledger.
    pub genesis_body: String,
    /// Keep a copy of every block this instance seals in memory. Off by
    /// default: the copy is never evicted, so a long-running writer grows
    /// without bound.
    pub cache_sealed: bool,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            flush_on_seal: true,
            genesis_body: GENESIS_BODY.to_string(),
            cache_sealed: false,
        }
    }
}
