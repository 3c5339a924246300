//! Distributed cache server: a `MAX_BUCKETS`-chained, lazily-expiring
//! key/value table (`bucket_cache`) served over the binary wire protocol
//! by a single readiness-driven accept loop (`server`).

pub mod bucket_cache;
pub mod server;

pub use bucket_cache::BucketCache;
pub use server::run_event_loop;
