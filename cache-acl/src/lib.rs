//! Hot-reloadable IP allowlist, sharded into per-bucket locks.

pub mod allowlist;
pub mod watch;

pub use allowlist::{build_allowlist, AllowList, AllowListBuild, SharedAllowList};
pub use watch::spawn_allowlist_watcher;
