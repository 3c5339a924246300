//! # Consistent-hash ring
//!
//! Routes cache keys to one of a set of distributed cache servers by
//! consistent hashing: servers are placed at SHA-1-derived positions on a
//! small circular position space, and a key is routed to the first server
//! whose position is not less than the key's own position, wrapping
//! around to the first server otherwise.
//!
//! ## Design Principles
//!
//! 1. **Immutable Snapshots**: a ring is never mutated in place; membership
//!    changes build a brand-new ring and swap it in behind a lock.
//! 2. **Collision Resolution**: server placement rehashes on collision
//!    instead of silently overwriting another server's slot.
//! 3. **Small Position Space**: positions live in `[0, HASH_MODULO)`, not
//!    the full hash range, keeping routing a short linear scan.

use std::collections::HashSet;
use std::io;
use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;

use cache_common::hash::sha1_hash;
use cache_common::limits::{HASH_MODULO, HASH_REHASH_ATTEMPTS, HASH_REHASH_STEP};

/// One server's placement on the ring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RingNode {
    pub hash_position: u32,
    pub ip: String,
    pub port: u16,
}

/// An immutable, sorted ring snapshot.
#[derive(Debug, Default)]
struct Ring {
    nodes: Vec<RingNode>,
}

impl Ring {
    fn build_from_file(path: &Path) -> io::Result<Ring> {
        let contents = std::fs::read_to_string(path)?;
        let mut used_positions = HashSet::new();
        let mut nodes = Vec::new();

        for raw_line in contents.lines() {
            let line = raw_line.trim();
            if line.is_empty() {
                continue;
            }
            let Some(node) = parse_entry(line, &mut used_positions) else {
                tracing::warn!(entry = line, "ring membership: skipping invalid entry");
                continue;
            };
            nodes.push(node);
        }

        nodes.sort_by_key(|n| n.hash_position);
        Ok(Ring { nodes })
    }

    fn route(&self, key: &[u8]) -> Option<&RingNode> {
        if self.nodes.is_empty() {
            return None;
        }
        let target = (sha1_hash(key) % HASH_MODULO as u64) as u32;
        self.nodes
            .iter()
            .find(|n| n.hash_position >= target)
            .or_else(|| self.nodes.first())
    }
}

fn parse_entry(line: &str, used_positions: &mut HashSet<u32>) -> Option<RingNode> {
    let colon = line.rfind(':')?;
    let (ip, port_str) = (&line[..colon], &line[colon + 1..]);
    if ip.is_empty() {
        return None;
    }
    let port: u16 = port_str.parse().ok()?;
    if port < 1024 {
        return None;
    }

    let mut pos = (sha1_hash(line.as_bytes()) % HASH_MODULO as u64) as u32;
    let mut attempts = 0;
    while used_positions.contains(&pos) && attempts < HASH_REHASH_ATTEMPTS {
        pos = (pos + HASH_REHASH_STEP) % HASH_MODULO;
        attempts += 1;
    }
    if used_positions.contains(&pos) {
        tracing::warn!(entry = line, "ring placement: exhausted rehash attempts");
        return None;
    }
    used_positions.insert(pos);

    Some(RingNode {
        hash_position: pos,
        ip: ip.to_string(),
        port,
    })
}

/// Thread-safe holder for the live ring, swapped wholesale on reload.
pub struct ConsistentHashRing {
    live: RwLock<Arc<Ring>>,
}

impl Default for ConsistentHashRing {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsistentHashRing {
    pub fn new() -> Self {
        ConsistentHashRing {
            live: RwLock::new(Arc::new(Ring::default())),
        }
    }

    /// Rebuilds the ring from `path` and swaps it in. On parse/IO failure
    /// the live ring is left untouched and the error is returned to the
    /// caller (who is expected to log and retry on the next poll).
    pub fn rebuild(&self, path: &Path) -> io::Result<()> {
        let built = Ring::build_from_file(path)?;
        *self.live.write() = Arc::new(built);
        Ok(())
    }

    /// Swaps in an already-built ring. Used by the hot-reload watcher,
    /// which builds off-lock and hands the result here.
    fn swap_in(&self, ring: Ring) {
        *self.live.write() = Arc::new(ring);
    }

    /// Returns the `(ip, port)` of the server responsible for `key`, or
    /// `None` if the ring has no members.
    pub fn server_for(&self, key: &[u8]) -> Option<(String, u16)> {
        let ring = self.live.read().clone();
        ring.route(key).map(|n| (n.ip.clone(), n.port))
    }

    /// Number of servers currently in the ring.
    pub fn len(&self) -> usize {
        self.live.read().nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Builds a ring snapshot from `path` without touching any live state.
/// Exposed for the watcher loop's off-lock rebuild phase.
pub fn build_ring(path: &Path) -> io::Result<RingBuild> {
    Ring::build_from_file(path).map(RingBuild)
}

/// Opaque built-but-not-installed ring, handed to [`ConsistentHashRing::install`].
pub struct RingBuild(Ring);

impl ConsistentHashRing {
    /// Installs a ring previously produced by [`build_ring`].
    pub fn install(&self, built: RingBuild) {
        self.swap_in(built.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;

    struct TempFile(PathBuf);

    impl TempFile {
        fn new(name: &str, contents: &str) -> Self {
            let mut path = std::env::temp_dir();
            path.push(format!("cache-ring-test-{name}-{:?}", std::thread::current().id()));
            let mut f = std::fs::File::create(&path).unwrap();
            f.write_all(contents.as_bytes()).unwrap();
            TempFile(path)
        }
    }

    impl Drop for TempFile {
        fn drop(&mut self) {
            let _ = std::fs::remove_file(&self.0);
        }
    }

    #[test]
    fn routes_to_some_node_when_nonempty() {
        let path = TempFile::new("basic", "10.0.0.1:9001\n10.0.0.2:9001\n10.0.0.3:9001\n");
        let ring = ConsistentHashRing::new();
        ring.rebuild(&path.0).unwrap();
        assert!(ring.server_for(b"k1").is_some());
    }

    #[test]
    fn single_node_is_always_chosen() {
        let path = TempFile::new("single", "10.0.0.1:9001\n");
        let ring = ConsistentHashRing::new();
        ring.rebuild(&path.0).unwrap();
        let (ip, port) = ring.server_for(b"anything").unwrap();
        assert_eq!((ip.as_str(), port), ("10.0.0.1", 9001));
    }

    #[test]
    fn empty_ring_is_unavailable() {
        let ring = ConsistentHashRing::new();
        assert!(ring.server_for(b"k").is_none());
    }

    #[test]
    fn invalid_lines_are_skipped_not_fatal() {
        let path = TempFile::new("invalid", "not-a-valid-line\n10.0.0.1:9001\n10.0.0.2:80\n");
        let ring = ConsistentHashRing::new();
        ring.rebuild(&path.0).unwrap();
        assert_eq!(ring.len(), 1);
    }

    #[test]
    fn removing_a_node_only_moves_its_own_keys() {
        let before_path = TempFile::new("before", "10.0.0.1:9001\n10.0.0.2:9001\n10.0.0.3:9001\n");
        let ring_before = ConsistentHashRing::new();
        ring_before.rebuild(&before_path.0).unwrap();

        let keys: Vec<Vec<u8>> = (0..50).map(|i| format!("key-{i}").into_bytes()).collect();
        let owners_before: Vec<_> = keys.iter().map(|k| ring_before.server_for(k).unwrap()).collect();

        let after_path = TempFile::new("after", "10.0.0.1:9001\n10.0.0.3:9001\n");
        let ring_after = ConsistentHashRing::new();
        ring_after.rebuild(&after_path.0).unwrap();
        let owners_after: Vec<_> = keys.iter().map(|k| ring_after.server_for(k).unwrap()).collect();

        for (before, after) in owners_before.iter().zip(owners_after.iter()) {
            if before.0 != "10.0.0.2" {
                assert_eq!(before, after, "key owned by a surviving node must not move");
            }
        }
    }
}
