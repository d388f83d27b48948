//! Fixed-width content fingerprint

use std::fmt;

/// Number of bytes in a [`Digest`], and therefore the maximum trie depth
pub const DIGEST_LEN: usize = 20;

/// A 20-byte content fingerprint
///
/// Produced from the leading bytes of a BLAKE3 output. It is used for change
/// detection and slot selection only, never for security.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Digest([u8; DIGEST_LEN]);

impl Digest {
    /// Create a digest from raw bytes
    pub const fn from_bytes(bytes: [u8; DIGEST_LEN]) -> Self {
        Digest(bytes)
    }

    /// Fingerprint arbitrary data
    pub fn of(data: &[u8]) -> Self {
        Self::from_hasher(blake3::Hasher::new().update(data))
    }

    pub(crate) fn from_hasher(hasher: &blake3::Hasher) -> Self {
        let mut out = [0u8; DIGEST_LEN];
        hasher.finalize_xof().fill(&mut out);
        Digest(out)
    }

    /// The slot byte this digest selects at `depth`
    ///
    /// Callers must keep `depth < DIGEST_LEN`.
    #[inline]
    pub fn slot(&self, depth: usize) -> u8 {
        self.0[depth]
    }

    /// Get the raw bytes
    pub fn as_bytes(&self) -> &[u8; DIGEST_LEN] {
        &self.0
    }

    /// Convert to hex string
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from hex string
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let mut arr = [0u8; DIGEST_LEN];
        hex::decode_to_slice(s, &mut arr)?;
        Ok(Digest(arr))
    }

    /// Get a short prefix for display (first 7 chars, like git)
    pub fn short(&self) -> String {
        self.to_hex()[..7].to_string()
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", self.short())
    }
}

impl AsRef<[u8]> for Digest {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_deterministic() {
        let d1 = Digest::of(b"hello");
        let d2 = Digest::of(b"hello");
        let d3 = Digest::of(b"world");

        assert_eq!(d1, d2);
        assert_ne!(d1, d3);
    }

    #[test]
    fn test_digest_is_blake3_prefix() {
        let full = blake3::hash(b"prefix check");
        assert_eq!(
            Digest::of(b"prefix check").as_bytes(),
            &full.as_bytes()[..DIGEST_LEN]
        );
    }

    #[test]
    fn test_sample_corpus_distinct() {
        let corpus: Vec<String> = (0..500).map(|i| format!("value-{i}")).collect();
        let digests: std::collections::HashSet<Digest> =
            corpus.iter().map(|v| Digest::of(v.as_bytes())).collect();
        assert_eq!(digests.len(), corpus.len());
    }

    #[test]
    fn test_hex_roundtrip() {
        let d1 = Digest::of(b"test data");
        let hex = d1.to_hex();
        assert_eq!(hex.len(), DIGEST_LEN * 2);
        assert_eq!(Digest::from_hex(&hex).unwrap(), d1);
        assert!(Digest::from_hex("abcd").is_err());
    }

    #[test]
    fn test_short() {
        assert_eq!(Digest::of(b"test").short().len(), 7);
    }
}
