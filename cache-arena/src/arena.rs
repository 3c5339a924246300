//! # Single-process arena cache
//!
//! A fixed-capacity byte buffer holding a FIFO of TTL'd entries, indexed by
//! per-bucket XOR-linked collision chains. This is the classic djbdns-style
//! cache structure: one contiguous allocation, insertion at the write
//! cursor, eviction at the read cursor, no entry ever moves once written.
//!
//! ## Design Principles
//!
//! 1. **Single Allocation**: the whole cache lives in one `Vec<u8>`, sized
//!    once at construction; no per-entry heap allocation.
//! 2. **XOR-Linked Buckets**: each bucket chain stores only one 4-byte link
//!    per entry (the xor of its two neighbours) instead of two pointers.
//! 3. **FIFO Eviction**: entries are never reordered or resized in place;
//!    making room for a new entry always evicts from the oldest end.
//! 4. **Boundary Discipline**: every 4-byte access is bounds-checked against
//!    the arena size; a violation means the arena is corrupt and the
//!    process aborts rather than risk reading attacker-controlled memory
//!    past the buffer.
//! 5. **Lazy Expiry**: an expired entry is reported as a miss on lookup but
//!    is not physically unlinked; it is reclaimed naturally once FIFO
//!    eviction reaches it (or a future `set` overwrites the same bucket).
//!
//! ## Structure Overview
//!
//! ```text
//! [0 .. hsize)        bucket head-links, one 4-byte slot per bucket
//! [hsize .. writer)   live entries, newest on the right
//! [writer .. oldest)  free gap
//! [oldest .. unused)  live entries, oldest on the left (wrapped segment)
//! [unused .. size)    unused tail
//! ```

use std::time::{SystemTime, UNIX_EPOCH};

use cache_common::limits::{ARENA_MAX_SIZE, ARENA_MIN_SIZE, MAXDATALEN, MAXKEYLEN, MAXTTL};
use cache_common::{CacheError, CacheResult};

/// Hash-flood defence: caps bucket-chain traversal length.
const MAX_CHAIN_HOPS: u32 = 100;
/// Fixed per-entry overhead: 4-byte link + 4-byte keylen + 4-byte datalen + 8-byte expiry.
const ENTRY_HEADER_LEN: u32 = 20;

/// Fixed-capacity, single-writer byte arena implementing the arena cache
/// contract (`init` / `get` / `set` / `delete` / `motion_counter`).
///
/// Not internally synchronized: callers must serialize access (see the
/// concurrency model — this mirrors the original's single-writer
/// assumption).
pub struct ArenaCache {
    buf: Vec<u8>,
    size: u32,
    hsize: u32,
    writer: u32,
    oldest: u32,
    unused: u32,
    motion: u64,
}

impl ArenaCache {
    /// Allocates and zeroes a new arena. `requested_size` is clamped into
    /// `[ARENA_MIN_SIZE, ARENA_MAX_SIZE]`. Panics if the backing allocation
    /// fails; prefer [`ArenaCache::try_new`] where an allocation failure
    /// should be reported to the caller instead.
    pub fn new(requested_size: u32) -> Self {
        Self::try_new(requested_size).expect("arena allocation failed")
    }

    /// Allocates and zeroes a new arena, reporting an allocation failure
    /// via [`CacheError::Allocation`] instead of aborting. This is the
    /// only failure mode `init` has, per the arena cache's public
    /// contract.
    pub fn try_new(requested_size: u32) -> CacheResult<Self> {
        let size = requested_size.clamp(ARENA_MIN_SIZE, ARENA_MAX_SIZE);

        let mut hsize: u32 = 4;
        while hsize.saturating_mul(2) <= size / 16 {
            hsize *= 2;
        }

        let mut buf = Vec::new();
        buf.try_reserve_exact(size as usize)
            .map_err(|_| CacheError::Allocation(size as usize))?;
        buf.resize(size as usize, 0u8);

        Ok(ArenaCache {
            buf,
            size,
            hsize,
            writer: hsize,
            oldest: size,
            unused: size,
            motion: 0,
        })
    }

    /// Total bytes ever written across this arena's lifetime.
    pub fn motion_counter(&self) -> u64 {
        self.motion
    }

    /// Looks up `key`. Returns the value bytes and the remaining TTL in
    /// seconds, or `None` on miss (including expired-but-not-yet-evicted
    /// entries).
    pub fn get(&self, key: &[u8]) -> Option<(Vec<u8>, u64)> {
        if key.len() as u32 > MAXKEYLEN {
            return None;
        }
        let keylen = key.len() as u32;

        let mut prevpos = self.bucket_hash(key);
        let mut pos = self.get4(prevpos);
        let mut hops = 0u32;

        while pos != 0 {
            if self.get4(pos + 4) == keylen {
                self.check_bound(pos + ENTRY_HEADER_LEN + keylen);
                if &self.buf[(pos + ENTRY_HEADER_LEN) as usize..(pos + ENTRY_HEADER_LEN + keylen) as usize] == key {
                    let expiry = self.get8(pos + 12);
                    let now = now_secs();
                    if expiry < now {
                        tracing::trace!(pos, "arena get: key expired");
                        return None;
                    }
                    let ttl_remaining = (expiry - now).min(MAXTTL);

                    let datalen = self.get4(pos + 8);
                    let data_start = pos + ENTRY_HEADER_LEN + keylen;
                    self.check_bound(data_start + datalen);
                    let data = self.buf[data_start as usize..(data_start + datalen) as usize].to_vec();
                    return Some((data, ttl_remaining));
                }
            }

            let nextpos = prevpos ^ self.get4(pos);
            prevpos = pos;
            pos = nextpos;
            hops += 1;
            if hops > MAX_CHAIN_HOPS {
                tracing::warn!("arena get: bucket chain exceeded hop cap, treating as miss");
                return None;
            }
        }

        None
    }

    /// Inserts `key` -> `data` with TTL `ttl` seconds, evicting the oldest
    /// entries as needed to make room. Silently no-ops on `ttl == 0`,
    /// oversized keys/data, or if a single entry can never fit.
    pub fn set(&mut self, key: &[u8], data: &[u8], ttl: u64) {
        if key.len() as u32 > MAXKEYLEN || data.len() as u32 > MAXDATALEN {
            return;
        }
        if ttl == 0 {
            return;
        }
        let ttl = ttl.min(MAXTTL);
        let keylen = key.len() as u32;
        let datalen = data.len() as u32;
        let entrylen = keylen + datalen + ENTRY_HEADER_LEN;

        while self.writer + entrylen > self.oldest {
            if self.oldest == self.unused {
                if self.writer <= self.hsize {
                    tracing::warn!(entrylen, "arena set: entry cannot fit even in an empty arena");
                    return;
                }
                tracing::trace!(writer = self.writer, "arena set: wrapping, oldest/writer reset to hsize");
                self.unused = self.writer;
                self.oldest = self.hsize;
                self.writer = self.hsize;
            }

            let pos = self.get4(self.oldest);
            let patched = self.get4(pos) ^ self.oldest;
            tracing::trace!(oldest = self.oldest, neighbour = pos, "arena set: evicting oldest entry");
            self.set4(pos, patched);

            self.oldest += self.get4(self.oldest + 4) + self.get4(self.oldest + 8) + ENTRY_HEADER_LEN;
            if self.oldest > self.unused {
                self.abort_corrupt("oldest advanced past unused during eviction");
            }
            if self.oldest == self.unused {
                tracing::trace!("arena set: wrapped segment fully evicted, collapsing oldest/unused");
                self.unused = self.size;
                self.oldest = self.size;
            }
        }

        let keyhash = self.bucket_hash(key);
        tracing::trace!(keyhash, keylen, datalen, "arena set: bucket hash computed");
        let now = now_secs();
        let expiry = now + ttl;

        let pos = self.get4(keyhash);
        if pos != 0 {
            let patched = self.get4(pos) ^ keyhash ^ self.writer;
            self.set4(pos, patched);
        }

        let writer = self.writer;
        self.set4(writer, pos ^ keyhash);
        self.set4(writer + 4, keylen);
        self.set4(writer + 8, datalen);
        self.set8(writer + 12, expiry);
        let key_start = (writer + ENTRY_HEADER_LEN) as usize;
        self.buf[key_start..key_start + key.len()].copy_from_slice(key);
        let data_start = key_start + key.len();
        self.buf[data_start..data_start + data.len()].copy_from_slice(data);

        self.set4(keyhash, writer);
        self.writer += entrylen;
        self.motion += entrylen as u64;
    }

    /// Expires `key` immediately by rewriting its expiry into the past.
    /// Silent no-op if the key is absent. The entry stays physically
    /// linked until FIFO eviction or a future `set` reclaims it.
    pub fn delete(&mut self, key: &[u8]) {
        if key.len() as u32 > MAXKEYLEN {
            return;
        }
        let keylen = key.len() as u32;

        let mut prevpos = self.bucket_hash(key);
        let mut pos = self.get4(prevpos);
        let mut hops = 0u32;

        while pos != 0 {
            if self.get4(pos + 4) == keylen {
                self.check_bound(pos + ENTRY_HEADER_LEN + keylen);
                if &self.buf[(pos + ENTRY_HEADER_LEN) as usize..(pos + ENTRY_HEADER_LEN + keylen) as usize] == key {
                    self.set8(pos + 12, now_secs().saturating_sub(10));
                    return;
                }
            }
            let nextpos = prevpos ^ self.get4(pos);
            prevpos = pos;
            pos = nextpos;
            hops += 1;
            if hops > MAX_CHAIN_HOPS {
                return;
            }
        }
    }

    fn bucket_hash(&self, key: &[u8]) -> u32 {
        let mut result: u32 = 5381;
        for &byte in key {
            result = result.wrapping_shl(5).wrapping_add(result);
            result ^= byte as u32;
        }
        result <<= 2;
        result &= self.hsize - 4;
        tracing::trace!(keylen = key.len(), bucket = result, "arena: hash computed");
        result
    }

    fn check_bound(&self, end: u32) {
        if end > self.size {
            self.abort_corrupt("read past arena boundary");
        }
    }

    fn get4(&self, pos: u32) -> u32 {
        if pos > self.size.saturating_sub(4) {
            self.abort_corrupt("get4 out of bounds");
        }
        let p = pos as usize;
        u32::from_be_bytes(self.buf[p..p + 4].try_into().unwrap())
    }

    fn set4(&mut self, pos: u32, value: u32) {
        if pos > self.size.saturating_sub(4) {
            self.abort_corrupt("set4 out of bounds");
        }
        let p = pos as usize;
        self.buf[p..p + 4].copy_from_slice(&value.to_be_bytes());
    }

    fn get8(&self, pos: u32) -> u64 {
        if pos > self.size.saturating_sub(8) {
            self.abort_corrupt("get8 out of bounds");
        }
        let p = pos as usize;
        u64::from_be_bytes(self.buf[p..p + 8].try_into().unwrap())
    }

    fn set8(&mut self, pos: u32, value: u64) {
        if pos > self.size.saturating_sub(8) {
            self.abort_corrupt("set8 out of bounds");
        }
        let p = pos as usize;
        self.buf[p..p + 8].copy_from_slice(&value.to_be_bytes());
    }

    fn abort_corrupt(&self, reason: &str) -> ! {
        tracing::error!(reason, "arena corruption detected, aborting process");
        std::process::abort();
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
    fn set_get_roundtrip() {
        let mut arena = ArenaCache::new(200);
        arena.set(b"a", b"1", 86400);
        let (data, ttl) = arena.get(b"a").expect("hit");
        assert_eq!(data, b"1");
        assert!(ttl <= 86400 && ttl >= 86399);
    }

    #[test]
    fn try_new_succeeds_for_valid_size() {
        let mut arena = ArenaCache::try_new(200).expect("allocation should succeed");
        arena.set(b"a", b"1", 86400);
        let (data, _) = arena.get(b"a").expect("hit");
        assert_eq!(data, b"1");
    }

    #[test]
    fn domain_example_roundtrip() {
        let mut arena = ArenaCache::new(200);
        arena.set(b"www.google.com", b"172.217.3.164", 86400);
        let (data, _) = arena.get(b"www.google.com").expect("hit");
        assert_eq!(data, b"172.217.3.164");
    }

    #[test]
    fn zero_ttl_is_noop() {
        let mut arena = ArenaCache::new(200);
        arena.set(b"k", b"v", 0);
        assert!(arena.get(b"k").is_none());
    }

    #[test]
    fn delete_then_get_is_miss() {
        let mut arena = ArenaCache::new(200);
        arena.set(b"a", b"1", 86400);
        arena.delete(b"a");
        assert!(arena.get(b"a").is_none());
    }

    #[test]
    fn delete_missing_key_is_noop() {
        let mut arena = ArenaCache::new(200);
        arena.delete(b"nope");
    }

    #[test]
    fn oversized_key_is_noop() {
        let mut arena = ArenaCache::new(200);
        let big_key = vec![b'x'; 1001];
        arena.set(&big_key, b"v", 60);
        assert!(arena.get(&big_key).is_none());
    }

    #[test]
    fn idempotent_set_increases_motion_by_twice_entry_len() {
        let mut arena = ArenaCache::new(4096);
        let before = arena.motion_counter();
        arena.set(b"k", b"v", 60);
        let after_first = arena.motion_counter();
        arena.set(b"k", b"v", 60);
        let after_second = arena.motion_counter();
        assert_eq!(after_first - before, after_second - after_first);
        let (data, _) = arena.get(b"k").expect("hit");
        assert_eq!(data, b"v");
    }

    #[test]
    fn fifo_eviction_drops_oldest_first() {
        let mut arena = ArenaCache::new(256);
        let mut last_key = Vec::new();
        for i in 0..200u32 {
            let key = format!("K{i}").into_bytes();
            arena.set(&key, b"V", 100);
            last_key = key;
        }
        assert!(arena.get(b"K0").is_none(), "oldest entry should have been evicted");
        let (data, _) = arena.get(&last_key).expect("newest entry should survive");
        assert_eq!(data, b"V");
    }

    #[test]
    fn invariants_hold_after_wrap() {
        let mut arena = ArenaCache::new(512);
        for i in 0..500u32 {
            let key = format!("key-{i}").into_bytes();
            arena.set(&key, b"value", 3600);
            assert!(arena.hsize <= arena.writer);
            assert!(arena.writer <= arena.oldest);
            assert!(arena.oldest <= arena.unused);
            assert!(arena.unused <= arena.size);
            if arena.oldest == arena.unused {
                assert_eq!(arena.unused, arena.size);
            }
        }
    }
}
