//! # Cryptographic Primitives
//!
//! Thin wrappers over `sha2`. Block hashes are SHA-256 digests rendered as
//! lowercase hex, which is the form they take on disk and in comparisons.

pub mod hash;

pub use hash::{sha256_array, sha256_hex};
