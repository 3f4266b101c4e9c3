use sha2::{Digest, Sha256};

/// Computes SHA-256, the base digest of every tree node.
pub fn sha256(input: &[u8]) -> [u8; 32] {
    Sha256::digest(input).into()
}

/// Computes SHA-256 over several slices without concatenating them first.
pub fn sha256_parts(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().into()
}

/// Computes BLAKE3 and returns the first-class 32-byte digest value.
///
/// Used for local integrity checksums, never for consensus-visible digests.
pub fn blake3_32(input: &[u8]) -> [u8; 32] {
    *blake3::hash(input).as_bytes()
}

#[cfg(test)]
mod tests {
    use super::{blake3_32, sha256, sha256_parts};

    #[test]
    fn sha256_matches_known_vector() {
        assert_eq!(
            hex::encode(sha256(b"abc")),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn sha256_parts_equals_concatenation() {
        assert_eq!(sha256_parts(&[&b"ab"[..], &b""[..], &b"c"[..]]), sha256(b"abc"));
    }

    #[test]
    fn hash_is_deterministic() {
        let input = b"quadrant";
        assert_eq!(blake3_32(input), blake3_32(input));
        assert_ne!(blake3_32(b"quadrant-a"), blake3_32(b"quadrant-b"));
    }
}
