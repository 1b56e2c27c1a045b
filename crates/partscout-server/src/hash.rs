//! Search-hash helpers for session reuse.

use sha2::{Digest, Sha256};

/// Hex-encoded SHA-256 of a string.
pub(crate) fn hash_string(value: &str) -> String {
    format!("{:x}", Sha256::digest(value.as_bytes()))
}

/// The reuse key for a search: text queries hash case-insensitively,
/// image searches hash the image URL.
pub(crate) fn search_hash(query: Option<&str>, image_url: Option<&str>) -> String {
    match query.filter(|q| !q.is_empty()) {
        Some(query) => hash_string(&format!("text:{}", query.to_lowercase())),
        None => hash_string(&format!("image:{}", image_url.unwrap_or_default())),
    }
}
