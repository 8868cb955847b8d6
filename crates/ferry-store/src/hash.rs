//! String hash functions for [`KeyedStore`](crate::KeyedStore).
//!
//! A table takes a plain `fn(&str) -> u64`, so callers can plug in any
//! function with that shape. The bucket index is `hash % bucket_count`.

/// Hash function signature accepted by the store.
pub type HashFn = fn(&str) -> u64;

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// FNV-1a, 64-bit. Default for [`KeyedStore::new`](crate::KeyedStore::new).
pub fn fnv1a_hash(key: &str) -> u64 {
    key.bytes().fold(FNV_OFFSET_BASIS, |hash, byte| {
        (hash ^ u64::from(byte)).wrapping_mul(FNV_PRIME)
    })
}

/// Sum of the key's bytes.
///
/// Cheap, and keeps anagrams in the same bucket. Paths that differ only
/// in digit order (`run-12`, `run-21`) collide, so prefer [`fnv1a_hash`]
/// for large trees.
pub fn additive_hash(key: &str) -> u64 {
    key.bytes().map(u64::from).sum()
}
