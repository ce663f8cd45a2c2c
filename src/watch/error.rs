// src/watch/error.rs

use thiserror::Error;

use crate::watch::model::WatcherUid;

/// Problems that stop a watch session from starting.
#[derive(Error, Debug)]
pub enum WatchError {
    #[error("watch group '{name}' not found (available: {})", .available.join(", "))]
    WatchTaskNameNotFound { name: String, available: Vec<String> },

    #[error("watcher {watcher} of group '{group}' has invalid tasks: {}", .tasks.join(", "))]
    InvalidWatchTasks {
        group: String,
        watcher: WatcherUid,
        tasks: Vec<String>,
    },

    #[error("before tasks failed to resolve: {}", .0.join("; "))]
    BeforeTasksInvalid(Vec<String>),

    #[error("before tasks failed: {}", .0.join("; "))]
    BeforeTasksFailed(Vec<String>),

    #[error("invalid watch pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },
}
