//! Content-addressed cache key generation.

use sha2::{Digest, Sha256};

/// Compute the storage key for a request within a generation.
///
/// Method is normalised to upper case; the URL is expected to be canonical
/// already.
pub fn compute_entry_key(method: &str, url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(method.to_ascii_uppercase().as_bytes());
    hasher.update(b"\n");
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}
