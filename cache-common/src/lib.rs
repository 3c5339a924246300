//! cache-common - Shared errors, limits, and hashing for the dnscache
//! workspace's single-process and distributed cache backends.

pub mod error;
pub mod hash;
pub mod limits;
pub mod watcher;

pub use error::{CacheError, CacheResult};
pub use hash::sha1_hash;
pub use watcher::watch_and_swap;
