// src/hash.rs
//! String hashing for uniform names, feature flags and texture usages.
//!
//! Hashes are 32-bit (the low half of XXH3-64) so they stay cheap to store in the
//! selection sets and uniform maps. The empty string hashes to 0, which is reserved
//! as "no hash".

use xxhash_rust::xxh3::xxh3_64;

/// A hashed identifier (uniform name, feature flag, environment flag, ...).
pub type HashValue = u32;

/// Reserved hash of the empty string.
pub const NULL_HASH: HashValue = 0;

/// Hashes `value`. `hash("") == NULL_HASH`.
#[inline]
pub fn hash(value: &str) -> HashValue {
    if value.is_empty() {
        return NULL_HASH;
    }
    xxh3_64(value.as_bytes()) as HashValue
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_is_null() {
        assert_eq!(hash(""), NULL_HASH);
    }

    #[test]
    fn test_stable_and_distinct() {
        assert_eq!(hash("color"), hash("color"));
        assert_ne!(hash("color"), hash("Color"));
        assert_ne!(hash("Texture_BaseColor"), hash("Texture_Normal"));
    }
}
