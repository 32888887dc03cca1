//! Polynomial string hash used to pick buckets.

use core::hash::{BuildHasher, Hasher};

const HASH_MULTIPLIER: u64 = 65599;

/// `BuildHasher` for the multiplicative string hash
/// `h = h * 65599 + byte`, evaluated left to right with wrapping `u64`
/// arithmetic. Deterministic across runs and processes.
#[derive(Copy, Clone, Debug, Default)]
pub struct Poly65599;

impl BuildHasher for Poly65599 {
    type Hasher = Poly65599Hasher;

    fn build_hasher(&self) -> Self::Hasher {
        Poly65599Hasher::default()
    }
}

#[derive(Copy, Clone, Debug, Default)]
pub struct Poly65599Hasher {
    state: u64,
}

impl Hasher for Poly65599Hasher {
    #[inline]
    fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.state = self
                .state
                .wrapping_mul(HASH_MULTIPLIER)
                .wrapping_add(u64::from(b));
        }
    }

    #[inline]
    fn finish(&self) -> u64 {
        self.state
    }
}

/// Full hash of `key` under `build`. Only the raw UTF-8 bytes are fed to the
/// hasher; `str::hash` would append a terminator byte and change the value.
#[inline]
pub(crate) fn hash_key<S: BuildHasher>(build: &S, key: &str) -> u64 {
    let mut h = build.build_hasher();
    h.write(key.as_bytes());
    h.finish()
}

/// Bucket that `key` lands in for a table of `bucket_count` buckets under
/// the default hash.
pub fn bucket_index(key: &str, bucket_count: usize) -> usize {
    reduce(hash_key(&Poly65599, key), bucket_count)
}

#[inline]
pub(crate) fn reduce(hash: u64, bucket_count: usize) -> usize {
    (hash % bucket_count as u64) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_values() {
        assert_eq!(hash_key(&Poly65599, ""), 0);
        assert_eq!(hash_key(&Poly65599, "a"), 97);
        assert_eq!(hash_key(&Poly65599, "ab"), 97 * 65599 + 98);
        assert_eq!(hash_key(&Poly65599, "abc"), 417_419_622_498);
    }

    #[test]
    fn bucket_index_reduces_modulo_capacity() {
        assert_eq!(bucket_index("", 509), 0);
        assert_eq!(bucket_index("a", 509), 97);
        assert_eq!(bucket_index("ab", 509), 192);
        assert_eq!(bucket_index("ab", 1021), 329);
        assert_eq!(bucket_index("key", 509), 3);
        assert_eq!(bucket_index("key", 1021), 932);
    }

    #[test]
    fn long_keys_wrap_instead_of_overflowing() {
        let key = "z".repeat(4096);
        let h = hash_key(&Poly65599, &key);
        assert!(bucket_index(&key, 65521) < 65521);
        assert_eq!(h, hash_key(&Poly65599, &key));
    }

    #[test]
    fn split_writes_match_single_write() {
        let mut a = Poly65599.build_hasher();
        a.write(b"hello ");
        a.write(b"world");
        assert_eq!(a.finish(), hash_key(&Poly65599, "hello world"));
    }

    #[test]
    fn high_bytes_are_unsigned() {
        // 'é' is 0xC3 0xA9 in UTF-8.
        assert_eq!(hash_key(&Poly65599, "é"), 0xC3 * 65599 + 0xA9);
    }
}
