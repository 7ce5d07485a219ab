//! Deterministic hashing utilities.
//!
//! Route ETags must be stable across process restarts so that client caches
//! survive a redeploy of unchanged files. `DefaultHasher` seeds randomly per
//! process and `FxHasher` makes no stability promise, so tags are derived
//! with blake3 instead.

/// A deterministic hasher using blake3
///
/// Unlike `std::hash::Hasher`, this produces the same output across
/// process restarts for the same input
pub struct StableHasher {
    inner: blake3::Hasher,
}

impl StableHasher {
    #[inline]
    pub fn new() -> Self {
        Self {
            inner: blake3::Hasher::new(),
        }
    }

    /// Update with raw bytes
    #[inline]
    pub fn update(mut self, data: &[u8]) -> Self {
        self.inner.update(data);
        self
    }

    /// Update with a string
    #[inline]
    pub fn update_str(self, s: &str) -> Self {
        self.update(s.as_bytes())
    }

    /// Update with a u128 (little-endian)
    #[inline]
    pub fn update_u128(self, n: u128) -> Self {
        self.update(&n.to_le_bytes())
    }

    /// Finish and return the full 64-character hex digest
    #[inline]
    pub fn finish_hex(self) -> String {
        self.inner.finalize().to_hex().to_string()
    }
}

impl Default for StableHasher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deterministic() {
        let a = StableHasher::new().update_str("hello").finish_hex();
        let b = StableHasher::new().update_str("hello").finish_hex();
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_inputs_distinguished() {
        let a = StableHasher::new()
            .update_str("path")
            .update_u128(1)
            .finish_hex();
        let b = StableHasher::new()
            .update_str("path")
            .update_u128(2)
            .finish_hex();
        assert_ne!(a, b);
    }
}
