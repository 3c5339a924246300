//! Background thread that hot-reloads ring membership from a file on a
//! fixed poll interval, grounded in the original `monitorserverlistforupdates`
//! loop (2s sleep, mtime probe, rebuild-on-change, `keepRunning` flag).

use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use cache_common::limits::WATCHER_POLL_INTERVAL_MS;
use cache_common::watcher::watch_and_swap;

use crate::ring::{build_ring, ConsistentHashRing};

/// Spawns the ring-membership watcher thread. The thread exits once
/// `keep_running` is cleared.
pub fn spawn_ring_watcher(
    ring: Arc<ConsistentHashRing>,
    path: PathBuf,
    keep_running: Arc<AtomicBool>,
) -> JoinHandle<()> {
    std::thread::spawn(move || {
        watch_and_swap(
            path,
            keep_running,
            Duration::from_millis(WATCHER_POLL_INTERVAL_MS),
            |p| build_ring(p),
            |built| ring.install(built),
        )
    })
}
