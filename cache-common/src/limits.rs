//! Size and capacity limits shared across the single-process arena and the
//! distributed cache path. Values match the original cache daemon exactly.

/// Largest key length accepted by the single-process arena.
pub const MAXKEYLEN: u32 = 1000;
/// Largest value length accepted by the single-process arena.
pub const MAXDATALEN: u32 = 1_000_000;
/// TTL ceiling (seconds) applied everywhere a caller-supplied TTL is stored.
pub const MAXTTL: u64 = 604_800;

/// Largest key length accepted over the distributed wire protocol.
pub const DISTRIBUTED_MAXKEYLEN: u32 = 1000;
/// Largest value length accepted over the distributed wire protocol.
pub const DISTRIBUTED_MAXDATALEN: u32 = 1_000_000;

/// Number of chains in the server-side chained cache.
pub const MAX_BUCKETS: usize = 10_000;

/// Ring position space; positions live in `[0, HASH_MODULO)`.
pub const HASH_MODULO: u32 = 999;
/// Step applied to a ring position on collision during placement.
pub const HASH_REHASH_STEP: u32 = 99;
/// Number of rehash attempts before placement gives up.
pub const HASH_REHASH_ATTEMPTS: u32 = 100;

/// Smallest allowed single-process arena size.
pub const ARENA_MIN_SIZE: u32 = 100;
/// Largest allowed single-process arena size.
pub const ARENA_MAX_SIZE: u32 = 1_000_000_000;

/// Non-blocking connect readiness window for the distributed client.
pub const CLIENT_CONNECT_TIMEOUT_MS: u64 = 500;
/// Response wait window for a distributed GET.
pub const CLIENT_RESPONSE_TIMEOUT_MS: u64 = 500;

/// Poll interval used by both hot-reload watchers.
pub const WATCHER_POLL_INTERVAL_MS: u64 = 2_000;
/// Event-loop tick used by the distributed server for shutdown responsiveness.
pub const SERVER_TICK_MS: u64 = 200;
