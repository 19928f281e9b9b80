//! Hashing utilities for change detection.

use sha2::{Digest, Sha256};

/// Compute SHA256 hash of bytes.
pub fn sha256_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Compute one SHA256 hash over several byte chunks, fed in iteration order.
///
/// The result equals `sha256_bytes` of the concatenated chunks.
pub fn sha256_chunks<'a, I>(chunks: I) -> String
where
    I: IntoIterator<Item = &'a [u8]>,
{
    let mut hasher = Sha256::new();
    for chunk in chunks {
        hasher.update(chunk);
    }
    hex::encode(hasher.finalize())
}
