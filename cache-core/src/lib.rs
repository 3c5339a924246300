//! # Cache dispatcher
//!
//! The resolver-facing entry point: `Cache::init_local` / `init_distributed`
//! choose a backend once at startup, after which every call goes through
//! `cache_get` / `cache_set` / `cache_delete` without the caller ever
//! knowing which concrete implementation is live. This is a direct
//! translation of the original `cachewrapper.c`'s `usedistributedcache`
//! flag and its three wrapper functions, expressed as a trait object
//! instead of a branch on every call.
//!
//! `CacheSystem` additionally owns the auxiliary control loops this
//! workspace specifies alongside the cache itself: the consistent-hash
//! ring's membership watcher (only relevant in distributed mode) and the
//! IP access-control allowlist watcher (relevant regardless of backend,
//! since it gates which callers may query the resolver at all). Both are
//! optional — a caller that only wants the bare cache dispatcher can use
//! `Cache` directly without spinning up any background threads.

mod backend;

pub use backend::{CacheBackend, DistributedBackend, LocalBackend};

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use cache_acl::{spawn_allowlist_watcher, AllowList};
use cache_ring::{spawn_ring_watcher, ConsistentHashRing};

/// Resolver-facing cache handle. Holds exactly one backend, chosen at
/// construction and never swapped afterward — switching backends at
/// runtime is out of scope, same as the original's `cache_init_wrapper`
/// being callable only once per process.
pub struct Cache {
    backend: Arc<dyn CacheBackend>,
}

impl Cache {
    /// Wraps an already-constructed backend. Prefer [`Cache::init_local`]
    /// or [`Cache::init_distributed`] unless a custom [`CacheBackend`]
    /// is needed (e.g. in tests).
    pub fn from_backend(backend: Arc<dyn CacheBackend>) -> Self {
        Cache { backend }
    }

    /// Initializes the single-process arena backend with the given size
    /// in bytes (clamped to `[ARENA_MIN_SIZE, ARENA_MAX_SIZE]` by the
    /// arena itself).
    pub fn init_local(size: u32) -> Self {
        Cache {
            backend: Arc::new(LocalBackend::new(size)),
        }
    }

    /// Initializes the distributed backend against an already-built
    /// ring. Use [`CacheSystem::init_distributed`] instead if the ring
    /// should hot-reload from a membership file.
    pub fn init_distributed(ring: Arc<ConsistentHashRing>) -> Self {
        Cache {
            backend: Arc::new(DistributedBackend::new(ring)),
        }
    }

    /// Looks up `key`. Returns `(data, ttl_remaining_seconds)` on hit.
    pub fn cache_get(&self, key: &[u8]) -> Option<(Vec<u8>, u64)> {
        self.backend.get(key)
    }

    /// Inserts `key` -> `data` with TTL `ttl` seconds.
    pub fn cache_set(&self, key: &[u8], data: &[u8], ttl: u64) {
        self.backend.set(key, data, ttl);
    }

    /// Expires `key` immediately. A silent no-op against the
    /// distributed backend (see [`DistributedBackend::delete`]).
    pub fn cache_delete(&self, key: &[u8]) {
        self.backend.delete(key);
    }
}

/// Owns a [`Cache`] plus the background watchers that keep its
/// distributed routing and access-control state current. Dropping (or
/// calling [`CacheSystem::shutdown`] on) this value clears the shared
/// run flag; watcher threads observe it at their next poll boundary and
/// exit.
pub struct CacheSystem {
    pub cache: Cache,
    pub allowlist: Arc<AllowList>,
    keep_running: Arc<AtomicBool>,
    watchers: Vec<JoinHandle<()>>,
}

impl CacheSystem {
    /// Single-process mode: no watchers are needed for the cache itself,
    /// but the allowlist watcher still runs if `allowlist_file` is
    /// given.
    pub fn init_local(size: u32, allowlist_file: Option<PathBuf>) -> Self {
        let keep_running = Arc::new(AtomicBool::new(true));
        let allowlist = Arc::new(AllowList::empty());
        let mut watchers = Vec::new();

        if let Some(path) = allowlist_file {
            watchers.push(spawn_allowlist_watcher(
                Arc::clone(&allowlist),
                path,
                Arc::clone(&keep_running),
            ));
        }

        CacheSystem {
            cache: Cache::init_local(size),
            allowlist,
            keep_running,
            watchers,
        }
    }

    /// Distributed mode: spawns the ring-membership watcher against
    /// `ring_file`, and optionally the allowlist watcher against
    /// `allowlist_file`.
    pub fn init_distributed(ring_file: PathBuf, allowlist_file: Option<PathBuf>) -> Self {
        let keep_running = Arc::new(AtomicBool::new(true));
        let ring = Arc::new(ConsistentHashRing::new());
        let allowlist = Arc::new(AllowList::empty());
        let mut watchers = Vec::new();

        watchers.push(spawn_ring_watcher(
            Arc::clone(&ring),
            ring_file,
            Arc::clone(&keep_running),
        ));

        if let Some(path) = allowlist_file {
            watchers.push(spawn_allowlist_watcher(
                Arc::clone(&allowlist),
                path,
                Arc::clone(&keep_running),
            ));
        }

        CacheSystem {
            cache: Cache::init_distributed(ring),
            allowlist,
            keep_running,
            watchers,
        }
    }

    /// True if `ip` is present in the current allowlist snapshot.
    pub fn is_allowed(&self, ip: &str) -> bool {
        self.allowlist.is_allowed(ip)
    }

    /// Clears the shared run flag and joins every watcher thread.
    /// Idempotent: calling this more than once is harmless.
    pub fn shutdown(&mut self) {
        self.keep_running.store(false, Ordering::Relaxed);
        for handle in self.watchers.drain(..) {
            let _ = handle.join();
        }
    }
}

impl Drop for CacheSystem {
    fn drop(&mut self) {
        self.keep_running.store(false, Ordering::Relaxed);
        // Watcher threads exit on their own at the next poll boundary;
        // we don't block the dropping thread joining them here, matching
        // the original daemon's fire-and-forget shutdown (the process is
        // exiting anyway).
    }
}
