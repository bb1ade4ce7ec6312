//! SHA-256 checksum and stable hash utilities.

use sha2::{Digest, Sha256};

/// Compute SHA256 checksum of a string
pub fn compute_checksum(s: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(s.as_bytes());
    let result = hasher.finalize();
    format!("{:x}", result)
}

/// Stable 64-bit identifier derived from a string.
///
/// Takes the first eight bytes of the SHA-256 digest, big-endian. Used for
/// row identifiers that must be reproducible from an entity's local uid.
pub fn stable_hash(s: &str) -> i64 {
    let digest = Sha256::digest(s.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    i64::from_be_bytes(bytes)
}
