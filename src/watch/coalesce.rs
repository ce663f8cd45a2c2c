// src/watch/coalesce.rs

//! Per-watcher event coalescing, applied before the run-state gate.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};
use tracing::trace;

use crate::watch::model::{WatchEvent, WatchOptions};
use crate::watch::state::ControllerInput;

/// Leading-edge rate limiter: admit, then ignore for `window`.
#[derive(Debug, Clone, Copy)]
pub struct Throttle {
    window: Duration,
    last_fired: Option<Instant>,
}

impl Throttle {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_fired: None,
        }
    }

    pub fn admit(&mut self, now: Instant) -> bool {
        match self.last_fired {
            Some(last) if now.duration_since(last) < self.window => false,
            _ => {
                self.last_fired = Some(now);
                true
            }
        }
    }
}

/// Spawn the coalescer for one watcher. It ends when `rx` closes, after
/// flushing any pending debounced event.
pub fn spawn_coalescer(
    options: WatchOptions,
    rx: mpsc::UnboundedReceiver<WatchEvent>,
    out: mpsc::UnboundedSender<ControllerInput>,
) -> JoinHandle<()> {
    match (options.debounce, options.throttle) {
        (Some(quiet), _) => tokio::spawn(debounce(quiet, rx, out)),
        (None, Some(window)) => tokio::spawn(throttle(window, rx, out)),
        (None, None) => tokio::spawn(pass_through(rx, out)),
    }
}

async fn pass_through(
    mut rx: mpsc::UnboundedReceiver<WatchEvent>,
    out: mpsc::UnboundedSender<ControllerInput>,
) {
    while let Some(event) = rx.recv().await {
        if out.send(ControllerInput::Event(event)).is_err() {
            return;
        }
    }
}

async fn throttle(
    window: Duration,
    mut rx: mpsc::UnboundedReceiver<WatchEvent>,
    out: mpsc::UnboundedSender<ControllerInput>,
) {
    let mut throttle = Throttle::new(window);
    while let Some(event) = rx.recv().await {
        if !throttle.admit(Instant::now()) {
            trace!(watcher = %event.watcher_uid, "throttled event");
            continue;
        }
        if out.send(ControllerInput::Event(event)).is_err() {
            return;
        }
    }
}

/// Trailing edge: the latest event fires once `quiet` passes without a
/// newer one.
async fn debounce(
    quiet: Duration,
    mut rx: mpsc::UnboundedReceiver<WatchEvent>,
    out: mpsc::UnboundedSender<ControllerInput>,
) {
    while let Some(mut pending) = rx.recv().await {
        loop {
            tokio::select! {
                next = rx.recv() => match next {
                    Some(event) => {
                        trace!(watcher = %event.watcher_uid, "debounce timer reset");
                        pending = event;
                    }
                    None => {
                        let _ = out.send(ControllerInput::Event(pending));
                        return;
                    }
                },
                _ = sleep(quiet) => {
                    if out.send(ControllerInput::Event(pending)).is_err() {
                        return;
                    }
                    break;
                }
            }
        }
    }
}
