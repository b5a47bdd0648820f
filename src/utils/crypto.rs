// src/utils/crypto.rs
//! Document fingerprinting.
//!
//! Uses Keccak-256 (Ethereum's standard hash function) so fingerprints match
//! what the registry contract computes on-chain.

use crate::models::fingerprint::DocumentFingerprint;
use ethers::utils::keccak256;

/// Computes a Keccak-256 hash of the input data (Ethereum-compatible).
///
/// # Arguments
/// * `data` - Binary data to hash (as bytes slice)
///
/// # Returns
/// Fixed-size 32-byte array (`[u8; 32]`) containing the hash.
///
/// Pure and deterministic: the same input bytes always produce the same
/// digest, with no salt and no process-dependent state.
pub fn hash_data(data: &[u8]) -> [u8; 32] {
    keccak256(data)
}

/// Computes the canonical fingerprint of a document's bytes.
pub fn fingerprint(data: &[u8]) -> DocumentFingerprint {
    DocumentFingerprint::new(hash_data(data))
}
