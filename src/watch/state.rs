// src/watch/state.rs

//! Per-watcher run state (Idle/Running).
//!
//! [`RunStates`] is a pure fold over [`StateIntent`]s; the controller's
//! actor task is its only owner. Everything else sends
//! [`ControllerInput`] messages.

use std::collections::HashMap;

use tokio::sync::mpsc;

use crate::watch::model::{WatchEvent, WatcherUid};

#[derive(Debug)]
pub enum ControllerInput {
    /// A coalesced file event.
    Event(WatchEvent),
    /// A run for this watcher finished (sent by `RunGuard`).
    Stop(WatcherUid),
    /// The event source and all coalescers have closed.
    SourceClosed,
    Shutdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateIntent {
    Start,
    Stop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Started,
    AlreadyRunning,
    Stopped,
    AlreadyIdle,
    UnknownWatcher,
}

#[derive(Debug, Clone, Default)]
pub struct RunStates {
    running: HashMap<WatcherUid, bool>,
}

impl RunStates {
    /// Every watcher starts Idle.
    pub fn new(uids: impl IntoIterator<Item = WatcherUid>) -> Self {
        Self {
            running: uids.into_iter().map(|uid| (uid, false)).collect(),
        }
    }

    pub fn apply(&mut self, uid: WatcherUid, intent: StateIntent) -> Transition {
        let Some(running) = self.running.get_mut(&uid) else {
            return Transition::UnknownWatcher;
        };
        match (intent, *running) {
            (StateIntent::Start, true) => Transition::AlreadyRunning,
            (StateIntent::Start, false) => {
                *running = true;
                Transition::Started
            }
            (StateIntent::Stop, true) => {
                *running = false;
                Transition::Stopped
            }
            (StateIntent::Stop, false) => Transition::AlreadyIdle,
        }
    }

    pub fn is_running(&self, uid: WatcherUid) -> bool {
        self.running.get(&uid).copied().unwrap_or(false)
    }

    pub fn any_running(&self) -> bool {
        self.running.values().any(|r| *r)
    }
}

/// Returns its watcher to Idle when dropped, including on error or panic.
#[derive(Debug)]
pub struct RunGuard {
    uid: WatcherUid,
    tx: mpsc::UnboundedSender<ControllerInput>,
}

impl RunGuard {
    pub fn new(uid: WatcherUid, tx: mpsc::UnboundedSender<ControllerInput>) -> Self {
        Self { uid, tx }
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        let _ = self.tx.send(ControllerInput::Stop(self.uid));
    }
}
