//! Background thread that hot-reloads the allowlist from a file, grounded
//! in the original `updateAccessControl` loop (2s sleep, `keepRunning`
//! flag) and shared with the ring watcher's poll/rebuild/swap shell.

use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use cache_common::limits::WATCHER_POLL_INTERVAL_MS;
use cache_common::watcher::watch_and_swap;

use crate::allowlist::{build_allowlist, AllowList};

/// Spawns the allowlist watcher thread. The thread exits once
/// `keep_running` is cleared.
pub fn spawn_allowlist_watcher(
    allowlist: Arc<AllowList>,
    path: PathBuf,
    keep_running: Arc<AtomicBool>,
) -> JoinHandle<()> {
    std::thread::spawn(move || {
        watch_and_swap(
            path,
            keep_running,
            Duration::from_millis(WATCHER_POLL_INTERVAL_MS),
            |p| build_allowlist(p),
            |built| allowlist.install(built),
        )
    })
}
