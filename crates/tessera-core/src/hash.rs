//! Pure synchronous hashing for content addressing
//!
//! Hashing is deterministic and side-effect free, so it lives outside the
//! effect system. Every content-addressed identifier in Tessera (blob ids,
//! principal ids, ledger object ids) goes through [`hash`] so the algorithm
//! is chosen in exactly one place.
//!
//! Current algorithm: **SHA-256**.

use sha2::{Digest, Sha256};

/// Hash arbitrary bytes to a 32-byte digest
pub fn hash(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Incremental hasher for multi-part input
#[derive(Debug, Clone, Default)]
pub struct Hasher(Sha256);

impl Hasher {
    /// Start a new hash computation
    pub fn new() -> Self {
        Self(Sha256::new())
    }

    /// Start a new hash computation with a domain separation tag
    pub fn with_domain(domain: &[u8]) -> Self {
        let mut hasher = Self::new();
        hasher.update_framed(domain);
        hasher
    }

    /// Feed raw bytes
    pub fn update(&mut self, data: &[u8]) -> &mut Self {
        self.0.update(data);
        self
    }

    /// Feed a length-prefixed field so adjacent fields cannot be shifted into each other
    pub fn update_framed(&mut self, data: &[u8]) -> &mut Self {
        self.0.update((data.len() as u64).to_be_bytes());
        self.0.update(data);
        self
    }

    /// Finish and return the digest
    pub fn finalize(self) -> [u8; 32] {
        self.0.finalize().into()
    }
}

/// Start an incremental hash computation
pub fn hasher() -> Hasher {
    Hasher::new()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_incremental_matches_one_shot() {
        let mut h = hasher();
        h.update(b"hello").update(b" ").update(b"world");
        assert_eq!(h.finalize(), hash(b"hello world"));
    }

    #[test]
    fn test_framing_separates_fields() {
        let mut a = Hasher::with_domain(b"test");
        a.update_framed(b"ab").update_framed(b"c");
        let mut b = Hasher::with_domain(b"test");
        b.update_framed(b"a").update_framed(b"bc");
        assert_ne!(a.finalize(), b.finalize());
    }
}
