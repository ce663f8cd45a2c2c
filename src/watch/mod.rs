// src/watch/mod.rs

//! File watching and watch-triggered runs.
//!
//! - [`watcher`] turns `notify` events into `WatchEvent`s for every watcher
//!   whose patterns match.
//! - [`coalesce`] applies each watcher's debounce or throttle.
//! - [`state`] holds the Idle/Running fold and its drop guard.
//! - [`controller`] gates events on run state and drives
//!   resolve → build → run for each admitted event.

pub mod coalesce;
pub mod controller;
pub mod error;
pub mod model;
pub mod patterns;
pub mod state;
pub mod watcher;

pub use controller::{WatchController, WatchHandle, WatchReport};
pub use error::WatchError;
pub use model::{select_watchers, FileEvent, WatchEvent, WatchOptions, WatchPlan, Watcher, WatcherUid};
pub use patterns::{collect_matching_files, relative_str, WatcherProfile};
pub use watcher::{spawn_fs_watcher, FsWatcherHandle};
