//! Shared build-aux-and-swap hot-reload loop.
//!
//! Both the ring-membership watcher and the allowlist watcher poll a
//! file's mtime on a fixed interval, rebuild an auxiliary structure off
//! any lock when the file changes, then hand the built value to a
//! caller-supplied `swap` closure that performs the actual pointer/lock
//! exchange. Keeping `swap` as a closure lets each caller pick its own
//! locking granularity (the ring swaps a single `Arc` under one lock; the
//! allowlist swaps per-bucket) while sharing the poll/probe/rebuild shell.
//!
//! State machine: `Idle -> Probing -> Rebuilding -> Swapping -> Idle`.
//! `Rebuilding` runs `build` with no lock held; `Swapping` is the only
//! state that runs `swap`. A failed `build` leaves the live state
//! untouched and is retried on the next cycle.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

/// Runs the poll/rebuild/swap loop until `keep_running` is cleared.
/// Intended to be spawned on a dedicated `std::thread` per watched file,
/// mirroring the one-thread-per-watcher shape of the original daemon.
pub fn watch_and_swap<T>(
    path: PathBuf,
    keep_running: Arc<AtomicBool>,
    poll_interval: Duration,
    mut build: impl FnMut(&Path) -> std::io::Result<T>,
    mut swap: impl FnMut(T),
) {
    let mut last_mtime: Option<SystemTime> = None;

    while keep_running.load(Ordering::Relaxed) {
        std::thread::sleep(poll_interval);
        if !keep_running.load(Ordering::Relaxed) {
            break;
        }

        let mtime = match std::fs::metadata(&path).and_then(|meta| meta.modified()) {
            Ok(mtime) => mtime,
            Err(err) => {
                tracing::warn!(path = %path.display(), %err, "hot-reload stat failed, retrying next cycle");
                continue;
            }
        };

        if last_mtime == Some(mtime) {
            continue;
        }

        match build(&path) {
            Ok(built) => {
                swap(built);
                last_mtime = Some(mtime);
                tracing::info!(path = %path.display(), "hot-reload swap complete");
            }
            Err(err) => {
                tracing::warn!(path = %path.display(), %err, "hot-reload rebuild failed, retrying next cycle");
            }
        }
    }
}
