use sha2::{Digest, Sha256};

/// Lowercase hex SHA-256 of an image payload. This is the dedupe key
/// for the cache index.
pub fn sha256_hex(data: &[u8]) -> String {
    format!("{:x}", Sha256::digest(data))
}

/// First 16 characters of a digest for display. Tolerates short strings,
/// which can reach us from a hand-edited or foreign database.
pub fn short_digest(digest: &str) -> &str {
    digest.get(..16).unwrap_or(digest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_deterministic() {
        assert_eq!(sha256_hex(b"payload"), sha256_hex(b"payload"));
    }

    #[test]
    fn test_digest_distinguishes_payloads() {
        assert_ne!(sha256_hex(b"one"), sha256_hex(b"two"));
    }

    #[test]
    fn test_digest_is_64_hex_chars() {
        let d = sha256_hex(b"image bytes");
        assert_eq!(d.len(), 64);
        assert!(d.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_short_digest_truncates() {
        let d = sha256_hex(b"image bytes");
        assert_eq!(short_digest(&d), &d[..16]);
    }

    #[test]
    fn test_short_digest_tolerates_short_input() {
        assert_eq!(short_digest("abc"), "abc");
        assert_eq!(short_digest(""), "");
    }

    #[test]
    fn test_known_vector() {
        // sha256 of the empty payload
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
