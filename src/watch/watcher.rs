// src/watch/watcher.rs

//! Filesystem event source built on `notify`.

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::Result;
use notify::event::{EventKind, ModifyKind};
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher as _};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::fs::FileSystem;
use crate::watch::model::{FileEvent, WatchEvent, Watcher};
use crate::watch::patterns::{collect_matching_files, relative_str, WatcherProfile};

/// Keeps the underlying `RecommendedWatcher` alive. Dropping it stops file
/// watching and closes the event stream.
pub struct FsWatcherHandle {
    _inner: RecommendedWatcher,
}

impl fmt::Debug for FsWatcherHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FsWatcherHandle").finish()
    }
}

struct Target {
    profile: WatcherProfile,
    watcher: Watcher,
}

/// Map a `notify` event kind onto add/change/unlink.
pub fn file_event_kind(kind: &EventKind) -> Option<FileEvent> {
    match kind {
        EventKind::Create(_) => Some(FileEvent::Add),
        EventKind::Modify(ModifyKind::Metadata(_)) => None,
        EventKind::Modify(_) => Some(FileEvent::Change),
        EventKind::Remove(_) => Some(FileEvent::Unlink),
        _ => None,
    }
}

/// Initial `Add` events for watchers with `ignore_initial = false`.
pub fn initial_events(fs: &dyn FileSystem, root: &Path, watchers: &[Watcher]) -> Result<Vec<WatchEvent>> {
    let mut events = Vec::new();
    for watcher in watchers.iter().filter(|w| !w.options.ignore_initial) {
        let profile = WatcherProfile::compile(watcher)?;
        for path in collect_matching_files(fs, root, &profile)? {
            events.push(WatchEvent::new(FileEvent::Add, path, watcher));
        }
    }
    Ok(events)
}

/// Watch `root` recursively and send one `WatchEvent` per matching watcher
/// for every relevant filesystem change.
pub fn spawn_fs_watcher(
    root: impl Into<PathBuf>,
    watchers: &[Watcher],
    fs: &dyn FileSystem,
    events_tx: mpsc::UnboundedSender<WatchEvent>,
) -> Result<FsWatcherHandle> {
    let root = root.into();
    let root = root.canonicalize().unwrap_or(root);

    let targets = watchers
        .iter()
        .map(|w| {
            Ok(Target {
                profile: WatcherProfile::compile(w)?,
                watcher: w.clone(),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    for event in initial_events(fs, &root, watchers)? {
        let _ = events_tx.send(event);
    }

    let (raw_tx, mut raw_rx) = mpsc::unbounded_channel::<Event>();
    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if let Err(err) = raw_tx.send(event) {
                    eprintln!("conductor: failed to forward notify event: {err}");
                }
            }
            Err(err) => eprintln!("conductor: file watch error: {err}"),
        },
        Config::default(),
    )?;
    watcher.watch(&root, RecursiveMode::Recursive)?;
    info!(root = ?root, watchers = targets.len(), "file watcher started");

    tokio::spawn(async move {
        while let Some(event) = raw_rx.recv().await {
            let Some(kind) = file_event_kind(&event.kind) else {
                continue;
            };
            for path in event.paths {
                let Some(rel) = relative_str(&root, &path) else {
                    warn!(?path, ?root, "could not relativize path");
                    continue;
                };
                for target in targets.iter().filter(|t| t.profile.matches(&rel)) {
                    debug!(%rel, %kind, watcher = %target.profile.uid(), "file event");
                    if events_tx
                        .send(WatchEvent::new(kind, path.clone(), &target.watcher))
                        .is_err()
                    {
                        return;
                    }
                }
            }
        }
        debug!("watcher event loop finished");
    });

    Ok(FsWatcherHandle { _inner: watcher })
}
