//! SHA-1-derived hash used by the consistent-hash ring and the server-side
//! chained cache. Mirrors the original `hashcode()`: hash the key with
//! SHA-1, then fold the twenty digest bytes into a `u64` with a weighted
//! sum over increasing powers of 7. This is the non-overflowing variant;
//! a `pow(31, len-1)`-based alternative exists in some source variants but
//! is known to overflow silently on long keys and is not used here.

use sha1::{Digest, Sha1};

/// Hashes `key` into a 64-bit value suitable for bucket/ring placement.
pub fn sha1_hash(key: &[u8]) -> u64 {
    let digest = Sha1::digest(key);

    let mut hashval: u64 = 0;
    let mut multiplier: u64 = 7;
    for byte in digest.iter() {
        hashval = hashval.wrapping_add(multiplier.wrapping_mul(*byte as u64));
        multiplier = multiplier.wrapping_mul(7);
    }
    hashval
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic_for_same_input() {
        assert_eq!(sha1_hash(b"www.google.com"), sha1_hash(b"www.google.com"));
    }

    #[test]
    fn differs_across_inputs() {
        assert_ne!(sha1_hash(b"a"), sha1_hash(b"b"));
    }

    #[test]
    fn empty_key_is_stable() {
        assert_eq!(sha1_hash(b""), sha1_hash(b""));
    }
}
