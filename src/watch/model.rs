// src/watch/model.rs

use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::config::{Config, WatchOptionsConfig};
use crate::watch::error::WatchError;

static NEXT_WATCHER_UID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of one watcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WatcherUid(u64);

impl WatcherUid {
    pub fn next() -> Self {
        WatcherUid(NEXT_WATCHER_UID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for WatcherUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "w{}", self.0)
    }
}

/// Effective coalescing options of one watcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchOptions {
    pub debounce: Option<Duration>,
    pub throttle: Option<Duration>,
    /// Skip the initial "file exists" scan.
    pub ignore_initial: bool,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            debounce: None,
            throttle: None,
            ignore_initial: true,
        }
    }
}

impl From<WatchOptionsConfig> for WatchOptions {
    fn from(cfg: WatchOptionsConfig) -> Self {
        Self {
            debounce: cfg.debounce.map(Duration::from_millis),
            throttle: cfg.throttle.map(Duration::from_millis),
            ignore_initial: cfg.ignore_initial.unwrap_or(true),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Watcher {
    pub uid: WatcherUid,
    pub group: String,
    pub patterns: Vec<String>,
    pub task_names: Vec<String>,
    pub options: WatchOptions,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileEvent {
    Add,
    Change,
    Unlink,
}

impl fmt::Display for FileEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileEvent::Add => f.write_str("add"),
            FileEvent::Change => f.write_str("change"),
            FileEvent::Unlink => f.write_str("unlink"),
        }
    }
}

/// One file event, already attributed to a watcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    pub event: FileEvent,
    pub path: PathBuf,
    pub watcher_uid: WatcherUid,
    pub tasks: Vec<String>,
}

impl WatchEvent {
    pub fn new(event: FileEvent, path: impl Into<PathBuf>, watcher: &Watcher) -> Self {
        Self {
            event,
            path: path.into(),
            watcher_uid: watcher.uid,
            tasks: watcher.task_names.clone(),
        }
    }
}

/// Watchers of the selected groups plus the tasks to run before them.
#[derive(Debug, Clone, Default)]
pub struct WatchPlan {
    pub before: Vec<String>,
    pub watchers: Vec<Watcher>,
}

/// Pick watch groups by name; no names selects every group.
pub fn select_watchers(config: &Config, names: &[String]) -> Result<WatchPlan, WatchError> {
    let selected: Vec<&String> = if names.is_empty() {
        config.watch.keys().collect()
    } else {
        names.iter().collect()
    };

    let mut plan = WatchPlan {
        before: config.config.watch_before.clone(),
        watchers: Vec::new(),
    };

    for name in selected {
        let Some(group) = config.watch.get(name) else {
            return Err(WatchError::WatchTaskNameNotFound {
                name: name.clone(),
                available: config.watch.keys().cloned().collect(),
            });
        };
        for task in &group.before {
            if !plan.before.contains(task) {
                plan.before.push(task.clone());
            }
        }
        for w in &group.watchers {
            plan.watchers.push(Watcher {
                uid: WatcherUid::next(),
                group: name.clone(),
                patterns: w.patterns.clone(),
                task_names: w.tasks.clone(),
                options: group.options.merged_with(w.options).into(),
            });
        }
    }

    Ok(plan)
}
