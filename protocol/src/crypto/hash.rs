//! # Hashing Utilities
//!
//! SHA-256 is the only hash function in the ledger. It is treated as a pure
//! function `bytes -> digest`; everything above this module works with the
//! hex form so that stored hashes can be compared as plain strings.

use sha2::{Digest, Sha256};

use crate::config::HASH_OUTPUT_LENGTH;

/// Compute the SHA-256 hash and return a fixed-size array.
///
/// # Example
///
/// ```
/// use sealchain_protocol::crypto::sha256_array;
///
/// let hash = sha256_array(b"Genesis Block");
/// assert_eq!(hash.len(), 32);
/// ```
pub fn sha256_array(data: &[u8]) -> [u8; HASH_OUTPUT_LENGTH] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Compute the SHA-256 hash as a lowercase hex string.
///
/// This is the representation stored in a block's `hash` and
/// `previous_hash` fields.
///
/// ```
/// use sealchain_protocol::crypto::sha256_hex;
///
/// assert_eq!(
///     sha256_hex(b""),
///     "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
/// );
/// ```
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(sha256_array(data))
}
