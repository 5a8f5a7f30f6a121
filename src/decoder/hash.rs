//! Double-SHA256 helpers for block and transaction identifiers

use sha2::{Digest, Sha256};

/// SHA-256 applied twice
pub fn double_sha256(data: &[u8]) -> [u8; 32] {
    let first = Sha256::digest(data);
    Sha256::digest(first).into()
}

/// Reverse internal byte order into the conventional big-endian display order
pub fn reversed(mut bytes: [u8; 32]) -> [u8; 32] {
    bytes.reverse();
    bytes
}

/// Display-order hex of a double-SHA256 digest
pub fn display_hash(data: &[u8]) -> String {
    hex::encode(reversed(double_sha256(data)))
}
