//! Chunk identifier generation.
//!
//! ULIDs: 26-character Crockford Base32, 48-bit millisecond timestamp
//! prefix and 80 bits of randomness. Lexicographic order equals creation
//! order for distinct timestamps.

use std::time::SystemTime;

use ulid::Ulid;

/// Generate a fresh chunk identifier.
pub fn new_chunk_id() -> String {
    Ulid::new().to_string()
}

/// Generate an identifier for a specific instant (import paths, tests).
pub fn chunk_id_at(time: SystemTime) -> String {
    Ulid::from_datetime(time).to_string()
}
