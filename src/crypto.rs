//! Hashing primitives and node identity for forgechain

use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};

/// Length of a hex-encoded SHA-256 digest.
pub const HASH_HEX_LEN: usize = 64;

/// Number of random bytes behind a node identifier (32 hex characters).
const NODE_ID_BYTES: usize = 16;

pub type Sha256Hash = [u8; 32];

pub fn sha256(data: &[u8]) -> Sha256Hash {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// SHA-256 of `data` as 64 lowercase hex characters.
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(sha256(data))
}

/// True when the hex digest starts with `zeros` `'0'` characters.
pub fn has_leading_hex_zeros(hex_digest: &str, zeros: usize) -> bool {
    hex_digest.len() >= zeros && hex_digest.bytes().take(zeros).all(|b| b == b'0')
}

/// Generates a random node identifier from the OS random number generator.
///
/// The identifier is 32 lowercase hex characters, the same shape as a
/// dash-less UUIDv4.
pub fn generate_node_identifier() -> String {
    let mut bytes = [0u8; NODE_ID_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}
