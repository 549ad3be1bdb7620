//! Checksum utilities for uploaded payloads

use sha2::{Digest, Sha256};

/// SHA-256 hex digest of an in-memory payload
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}
