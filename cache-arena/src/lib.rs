//! Single-process fixed-capacity arena cache (XOR-linked bucket chains,
//! FIFO eviction, lazy TTL expiry).

pub mod arena;

pub use arena::ArenaCache;
