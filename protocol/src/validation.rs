//! Chain validation: re-derive every hash from stored bytes and report
//! anything that does not line up.
//!
//! A tampered chain is an expected input here, not an exceptional state.
//! Mismatches come back as [`Violation`]s; only store failures are errors.
//! The scan never stops at the first finding, so one corrupted block cannot
//! hide another, and it never writes to the store.
//!
//! Checks per height `h` in `0..=current_height`, in order:
//!
//! 1. **Self-hash** — the stored `hash` equals SHA-256 of the block's
//!    canonical encoding with `hash` blanked.
//! 2. **Linkage** (`h > 0`) — `previous_hash` equals the predecessor's stored
//!    `hash`, and that hash is the predecessor's real content hash.
//!
//! A run of block keys absent inside the sealed range is reported once, as
//! `Missing` at its first height; bytes that no longer decode as a block as
//! `Malformed`. Linkage is not evaluated across a missing or malformed
//! neighbour. Store read failures abort the scan with `StoreRead`.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use crate::storage::{parse_block_key, Block, Ledger, LedgerError, LedgerResult, Store};

/// What went wrong at a given height.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    /// Stored hash does not match the block's contents.
    SelfHash,
    /// `previous_hash` does not match the predecessor.
    Linkage,
    /// No block stored at a height the pointer claims is sealed.
    Missing,
    /// Stored bytes do not decode as a block.
    Malformed,
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ViolationKind::SelfHash => "self-hash mismatch",
            ViolationKind::Linkage => "linkage mismatch",
            ViolationKind::Missing => "missing block",
            ViolationKind::Malformed => "malformed block",
        };
        f.write_str(s)
    }
}

/// One integrity finding.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub height: u64,
    pub kind: ViolationKind,
}

impl Violation {
    pub fn new(height: u64, kind: ViolationKind) -> Self {
        Self { height, kind }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "block {}: {}", self.height, self.kind)
    }
}

/// Result of a full chain scan.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ChainReport {
    /// Height pointer at scan time. `None` for an empty ledger.
    pub height: Option<u64>,
    /// Number of stored blocks examined.
    pub checked: u64,
    /// Findings ordered by height; at one height `SelfHash` precedes `Linkage`.
    pub violations: Vec<Violation>,
}

impl ChainReport {
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    /// Distinct heights with at least one finding, ascending.
    pub fn offending_heights(&self) -> Vec<u64> {
        let mut heights: Vec<u64> = self.violations.iter().map(|v| v.height).collect();
        heights.sort_unstable();
        heights.dedup();
        heights
    }
}

/// What the store holds at a block key.
enum Stored {
    Missing,
    Malformed,
    Block(Block),
}

/// Read-only integrity checker over a [`Ledger`].
pub struct Validator<'a, S: Store> {
    ledger: &'a Ledger<S>,
}

impl<'a, S: Store> Validator<'a, S> {
    pub fn new(ledger: &'a Ledger<S>) -> Self {
        Self { ledger }
    }

    /// Recompute the hash of the sealed block at `height` and compare it to
    /// the stored one.
    ///
    /// Returns `Ok(false)` on mismatch, including stored bytes that do not
    /// decode. `NotFound` if `height` is not sealed or its key is absent.
    pub fn validate_block(&self, height: u64) -> LedgerResult<bool> {
        match self.ledger.current_height()? {
            Some(current) if height <= current => {}
            _ => return Err(LedgerError::NotFound { height }),
        }

        match self.inspect(height)? {
            Stored::Missing => Err(LedgerError::NotFound { height }),
            Stored::Malformed => Ok(false),
            Stored::Block(block) => {
                let valid = block.has_valid_hash();
                if !valid {
                    tracing::debug!(
                        height,
                        stored = %block.hash,
                        computed = %block.compute_hash(),
                        "block hash mismatch"
                    );
                }
                Ok(valid)
            }
        }
    }

    /// Scan every sealed height and return all findings, ascending by
    /// height. Empty means the chain is intact.
    pub fn validate_chain(&self) -> LedgerResult<Vec<Violation>> {
        Ok(self.report()?.violations)
    }

    /// [`validate_chain`](Self::validate_chain) with scan metadata.
    ///
    /// Reads the stored blocks with one full scan. Work is bounded by what
    /// is actually stored, not by the height pointer: a run of absent
    /// heights, including a pointer past the last stored block, yields a
    /// single `Missing` finding at the first absent height.
    pub fn report(&self) -> LedgerResult<ChainReport> {
        let Some(current) = self.ledger.current_height()? else {
            return Ok(ChainReport {
                height: None,
                checked: 0,
                violations: Vec::new(),
            });
        };

        let stored: BTreeMap<u64, Vec<u8>> = self
            .ledger
            .store()
            .scan()
            .map_err(LedgerError::StoreRead)?
            .into_iter()
            .filter_map(|(key, value)| parse_block_key(&key).map(|height| (height, value)))
            .filter(|(height, _)| *height <= current)
            .collect();

        let mut violations = Vec::new();
        // Predecessor plus its recomputed hash; `None` when unreadable.
        let mut previous: Option<(Block, String)> = None;
        // First height not yet accounted for.
        let mut expected: u64 = 0;

        for (&height, bytes) in &stored {
            if height != expected {
                violations.push(Violation::new(expected, ViolationKind::Missing));
                previous = None;
            }
            expected = height.saturating_add(1);

            let block = match Block::decode(bytes) {
                Ok(block) => block,
                Err(e) => {
                    tracing::debug!(height, error = %e, "stored block does not decode");
                    violations.push(Violation::new(height, ViolationKind::Malformed));
                    previous = None;
                    continue;
                }
            };

            let computed = block.compute_hash();
            if block.hash != computed {
                violations.push(Violation::new(height, ViolationKind::SelfHash));
            }

            if height > 0 {
                if let Some((parent, parent_computed)) = &previous {
                    if !block.links_to(parent) || block.previous_hash != *parent_computed {
                        violations.push(Violation::new(height, ViolationKind::Linkage));
                    }
                }
            }

            previous = Some((block, computed));
        }

        let last_stored = stored.keys().next_back().copied();
        if last_stored.map_or(true, |last| last < current) {
            tracing::warn!(height = current, ?last_stored, "height pointer beyond stored blocks");
            violations.push(Violation::new(expected, ViolationKind::Missing));
        }

        for violation in &violations {
            tracing::warn!(height = violation.height, kind = %violation.kind, "integrity violation");
        }
        if violations.is_empty() {
            tracing::info!(height = current, "chain validated, no violations");
        }

        Ok(ChainReport {
            height: Some(current),
            checked: stored.len() as u64,
            violations,
        })
    }

    fn inspect(&self, height: u64) -> LedgerResult<Stored> {
        let Some(bytes) = self.ledger.fetch_raw(height)? else {
            return Ok(Stored::Missing);
        };
        match Block::decode(&bytes) {
            Ok(block) => Ok(Stored::Block(block)),
            Err(e) => {
                tracing::debug!(height, error = %e, "stored block does not decode");
                Ok(Stored::Malformed)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
