//! # IP allowlist
//!
//! A hash set of allowed IP literals, sharded into `MAX_BUCKETS` per-bucket
//! locks so lookups never contend with each other across buckets. Reload
//! uses the same build-aux-and-swap pattern as the ring, but the swap
//! phase walks buckets one at a time rather than holding a single lock for
//! the whole structure, per the per-bucket locking policy.
//!
//! ## Design Principles
//!
//! 1. **Per-Bucket Locking**: a lookup holds exactly one lock.
//! 2. **Incremental Swap**: reload replaces buckets one at a time so no
//!    single pause blocks every in-flight lookup at once.
//! 3. **Off-Lock Rebuild**: the new bucket contents are parsed from file
//!    before any lock is taken.

use std::io;
use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;

use cache_common::hash::sha1_hash;
use cache_common::limits::MAX_BUCKETS;

fn bucket_index(ip: &[u8]) -> usize {
    (sha1_hash(ip) % MAX_BUCKETS as u64) as usize
}

/// Sharded allowlist. Cheaply cloneable via `Arc` for sharing with a
/// watcher thread.
pub struct AllowList {
    buckets: Vec<Mutex<Vec<String>>>,
}

impl Default for AllowList {
    fn default() -> Self {
        Self::empty()
    }
}

impl AllowList {
    pub fn empty() -> Self {
        let mut buckets = Vec::with_capacity(MAX_BUCKETS);
        buckets.resize_with(MAX_BUCKETS, || Mutex::new(Vec::new()));
        AllowList { buckets }
    }

    /// True if `ip` is present in the allowlist.
    pub fn is_allowed(&self, ip: &str) -> bool {
        let bucket = bucket_index(ip.as_bytes());
        self.buckets[bucket].lock().iter().any(|entry| entry == ip)
    }

    /// Installs freshly parsed bucket contents, one bucket lock at a time.
    pub fn install(&self, built: AllowListBuild) {
        for (bucket, new_contents) in self.buckets.iter().zip(built.0.into_iter()) {
            *bucket.lock() = new_contents;
        }
    }
}

/// Off-lock parse result, ready to hand to [`AllowList::install`].
pub struct AllowListBuild(Vec<Vec<String>>);

/// Parses an allowlist file (one dotted-quad IP per line, blank lines
/// tolerated) into per-bucket groupings without touching any live state.
pub fn build_allowlist(path: &Path) -> io::Result<AllowListBuild> {
    let contents = std::fs::read_to_string(path)?;
    let mut buckets: Vec<Vec<String>> = Vec::with_capacity(MAX_BUCKETS);
    buckets.resize_with(MAX_BUCKETS, Vec::new);

    for raw_line in contents.lines() {
        let ip = raw_line.trim();
        if ip.is_empty() {
            continue;
        }
        buckets[bucket_index(ip.as_bytes())].push(ip.to_string());
    }

    Ok(AllowListBuild(buckets))
}

/// Convenience wrapper for sharing an allowlist with a watcher thread.
pub type SharedAllowList = Arc<AllowList>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;

    struct TempFile(PathBuf);

    impl TempFile {
        fn new(name: &str, contents: &str) -> Self {
            let mut path = std::env::temp_dir();
            path.push(format!("cache-acl-test-{name}-{:?}", std::thread::current().id()));
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
    fn allows_listed_ip_only() {
        let path = TempFile::new("basic", "1.2.3.4\n5.6.7.8\n");
        let allowlist = AllowList::empty();
        allowlist.install(build_allowlist(&path.0).unwrap());
        assert!(allowlist.is_allowed("1.2.3.4"));
        assert!(allowlist.is_allowed("5.6.7.8"));
        assert!(!allowlist.is_allowed("9.9.9.9"));
    }

    #[test]
    fn reload_replaces_membership() {
        let path = TempFile::new("reload", "1.2.3.4\n5.6.7.8\n");
        let allowlist = AllowList::empty();
        allowlist.install(build_allowlist(&path.0).unwrap());

        let path2 = TempFile::new("reload2", "5.6.7.8\n");
        allowlist.install(build_allowlist(&path2.0).unwrap());

        assert!(!allowlist.is_allowed("1.2.3.4"));
        assert!(allowlist.is_allowed("5.6.7.8"));
    }

    #[test]
    fn blank_lines_are_tolerated() {
        let path = TempFile::new("blank", "1.2.3.4\n\n\n5.6.7.8\n");
        let allowlist = AllowList::empty();
        allowlist.install(build_allowlist(&path.0).unwrap());
        assert!(allowlist.is_allowed("1.2.3.4"));
        assert!(allowlist.is_allowed("5.6.7.8"));
    }
}
