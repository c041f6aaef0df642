//! Identifier and content-hash helpers shared across components.

use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Generate a fresh random identifier for a new entity.
#[must_use]
pub fn new_id() -> Uuid {
    Uuid::new_v4()
}

/// Hex-encoded SHA-256 of `content`, used by the code indexer's change
/// detection (spec §4.6) and the GHAP journal's entry checksums.
#[must_use]
pub fn content_hash(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    hex::encode(hasher.finalize())
}
