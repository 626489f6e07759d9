//! Content-addressed cache key generation.

use sha2::{Digest, Sha256};

/// Compute the cache key for a resolved fetch URL.
///
/// The key is the lowercase hex SHA-256 of the URL, so it is stable across
/// runs and safe to use as a file name.
pub fn compute_key(url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}
