use sha2::{Digest, Sha256};

/// Compute SHA-256 of an in-memory byte slice.
pub fn sha256_bytes(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Encode a raw 32-byte hash as a lowercase hex string (64 chars).
pub fn to_hex(hash: &[u8; 32]) -> String {
    hash.iter().map(|b| format!("{b:02x}")).collect()
}

/// Content key of a message: SHA-256 hex of its normalized text, so the same
/// SMS pasted twice with different spacing or case hashes identically.
pub fn fingerprint(normalized: &str) -> String {
    to_hex(&sha256_bytes(normalized.as_bytes()))
}
