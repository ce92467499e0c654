//! Content hashing for verbatim memory dedup.

use sha2::{Digest, Sha256};

/// Hex SHA-256 of the content, 64 lowercase chars.
pub fn content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}
