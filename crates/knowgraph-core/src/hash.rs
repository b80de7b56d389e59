use sha2::{Digest, Sha256};

/// Hex-encoded Sha256 digest of arbitrary bytes. All content, metadata,
/// structure, and cache-key hashes in the engine go through here.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_is_stable_and_hex() {
        let a = sha256_hex(b"knowledge");
        let b = sha256_hex(b"knowledge");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(sha256_hex(b"knowledge"), sha256_hex(b"Knowledge"));
    }
}
