//! Error types shared by the cache crates.
//!
//! Per the failure taxonomy: arena/ring/server-table lookups never
//! surface errors (miss and no-op are the only outcomes). `CacheError`
//! exists only for the one boundary operation the design already treats
//! as fallible: arena allocation at init, which fails only on allocation
//! failure. Ring/allowlist file parsing and server bind report failure
//! through plain `std::io::Result` instead, since their callers (the
//! hot-reload watcher, the server binary) already handle a bare
//! `io::Error` without needing a richer variant.

/// Result alias used across the cache crates' fallible boundary operations.
pub type CacheResult<T> = Result<T, CacheError>;

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("failed to allocate arena of {0} bytes")]
    Allocation(usize),
}
