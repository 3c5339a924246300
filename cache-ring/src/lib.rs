//! Consistent-hash ring routing distributed cache keys to servers, plus a
//! hot-reload watcher that rebuilds the ring when its membership file
//! changes.

pub mod ring;
pub mod watch;

pub use ring::{build_ring, ConsistentHashRing, RingBuild, RingNode};
pub use watch::spawn_ring_watcher;
