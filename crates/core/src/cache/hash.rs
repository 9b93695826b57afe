//! Content-addressed request key hashing.

use sha2::{Digest, Sha256};

use crate::http::RequestKey;

/// Compute the storage hash for a request key.
pub fn compute_request_hash(key: &RequestKey) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key.method.as_bytes());
    hasher.update(b"\n");
    hasher.update(key.url.as_bytes());
    hex::encode(hasher.finalize())
}
