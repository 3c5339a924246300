//! # Server-side chained cache
//!
//! The distributed cache server's storage backend: `MAX_BUCKETS`
//! singly-linked chains, indexed by the shared SHA-1-derived hash, each
//! holding the entries whose key falls in that chain. Grounded directly
//! in the original `cacherequesthandler.c`'s `addtocache` / `cache_get`
//! pair: SET sweeps the chain and removes any existing entries with the
//! same key before appending the new one at the tail; GET sweeps the
//! chain, removing expired same-key entries it passes over, and returns
//! the first live same-key entry it finds.
//!
//! ## Design Principles
//!
//! 1. **Single-Threaded Owner**: the distributed server handles one
//!    connection at a time end-to-end, so this table needs no internal
//!    locking (see the concurrency model's "server-side chained cache"
//!    row).
//! 2. **Lazy Expiry**: entries are never proactively swept by a timer;
//!    expired entries are discarded only when a GET or SET walks past
//!    them.
//! 3. **Tail Insertion**: new entries are appended at the chain's tail,
//!    matching the original's "append after dedup" behaviour (the order
//!    doesn't matter for correctness here, only for parity with the
//!    grounding source).

use std::time::{SystemTime, UNIX_EPOCH};

use cache_common::hash::sha1_hash;
use cache_common::limits::{DISTRIBUTED_MAXDATALEN, DISTRIBUTED_MAXKEYLEN, MAXTTL, MAX_BUCKETS};

struct Entry {
    key: Vec<u8>,
    data: Vec<u8>,
    expiry: u64,
}

/// Fixed `MAX_BUCKETS`-chain hash table backing the distributed cache
/// server. Not thread-safe: the server loop owns one instance and
/// handles requests to completion one at a time.
pub struct BucketCache {
    buckets: Vec<Vec<Entry>>,
}

impl Default for BucketCache {
    fn default() -> Self {
        Self::new()
    }
}

impl BucketCache {
    pub fn new() -> Self {
        let mut buckets = Vec::with_capacity(MAX_BUCKETS);
        buckets.resize_with(MAX_BUCKETS, Vec::new);
        BucketCache { buckets }
    }

    fn bucket_index(key: &[u8]) -> usize {
        (sha1_hash(key) % MAX_BUCKETS as u64) as usize
    }

    /// Inserts `key` -> `data` with TTL `ttl` seconds. Silent no-op on
    /// `ttl == 0` or oversized key/data, matching the wire codec's own
    /// rejection limits. Removes any existing same-key entries from the
    /// chain before appending the new one.
    pub fn set(&mut self, key: &[u8], data: &[u8], ttl: u32) {
        if ttl == 0 {
            return;
        }
        if key.len() as u32 > DISTRIBUTED_MAXKEYLEN || data.len() as u32 > DISTRIBUTED_MAXDATALEN {
            return;
        }
        let ttl = (ttl as u64).min(MAXTTL);
        let expiry = now_secs() + ttl;

        let bucket = &mut self.buckets[Self::bucket_index(key)];
        bucket.retain(|entry| entry.key != key);
        bucket.push(Entry {
            key: key.to_vec(),
            data: data.to_vec(),
            expiry,
        });
    }

    /// Looks up `key`. Sweeps the chain, discarding expired entries for
    /// this key as it goes, and returns `(data, ttl_remaining)` for the
    /// first live match, or `None` on miss.
    pub fn get(&mut self, key: &[u8]) -> Option<(Vec<u8>, u32)> {
        let now = now_secs();
        let bucket = &mut self.buckets[Self::bucket_index(key)];

        let mut found: Option<(Vec<u8>, u32)> = None;
        bucket.retain(|entry| {
            if entry.key != key {
                return true;
            }
            if found.is_some() {
                // A live match was already found earlier in the chain;
                // any further same-key entries are stale duplicates.
                return false;
            }
            if entry.expiry < now {
                return false;
            }
            let ttl_remaining = (entry.expiry - now).min(MAXTTL) as u32;
            found = Some((entry.data.clone(), ttl_remaining));
            true
        });

        found
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before unix epoch")
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_then_get_hits() {
        let mut cache = BucketCache::new();
        cache.set(b"k", b"v", 86400);
        let (data, ttl) = cache.get(b"k").expect("hit");
        assert_eq!(data, b"v");
        assert!(ttl <= 86400 && ttl >= 86399);
    }

    #[test]
    fn miss_on_absent_key() {
        let mut cache = BucketCache::new();
        assert!(cache.get(b"nope").is_none());
    }

    #[test]
    fn zero_ttl_is_noop() {
        let mut cache = BucketCache::new();
        cache.set(b"k", b"v", 0);
        assert!(cache.get(b"k").is_none());
    }

    #[test]
    fn set_overwrites_previous_value_for_same_key() {
        let mut cache = BucketCache::new();
        cache.set(b"k", b"v1", 60);
        cache.set(b"k", b"v2", 60);
        let (data, _) = cache.get(b"k").expect("hit");
        assert_eq!(data, b"v2");
    }

    #[test]
    fn expired_entry_is_miss_and_is_reclaimed() {
        let mut cache = BucketCache::new();
        let bucket = BucketCache::bucket_index(b"k");
        cache.buckets[bucket].push(Entry {
            key: b"k".to_vec(),
            data: b"v".to_vec(),
            expiry: now_secs().saturating_sub(10),
        });
        assert!(cache.get(b"k").is_none());
        assert!(cache.buckets[bucket].is_empty(), "expired entry should be swept on lookup");
    }

    #[test]
    fn oversized_key_is_noop() {
        let mut cache = BucketCache::new();
        let big_key = vec![b'x'; (DISTRIBUTED_MAXKEYLEN + 1) as usize];
        cache.set(&big_key, b"v", 60);
        assert!(cache.get(&big_key).is_none());
    }
}
