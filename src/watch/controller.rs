// src/watch/controller.rs

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::engine::{Report, RunOptions, RunSummary, Runtime, Teardowns};
use crate::exec::{TriggerContext, TriggerReason};
use crate::sequence::SequenceBuilder;
use crate::task::Resolver;
use crate::watch::coalesce::spawn_coalescer;
use crate::watch::error::WatchError;
use crate::watch::model::{select_watchers, WatchEvent, WatchPlan, Watcher, WatcherUid};
use crate::watch::patterns::WatcherProfile;
use crate::watch::state::{ControllerInput, RunGuard, RunStates, StateIntent, Transition};

/// What a watch session reports.
#[derive(Debug, Clone)]
pub enum WatchReport {
    /// A leaf report from a triggered run.
    Task {
        watcher_uid: WatcherUid,
        report: Report,
    },
    /// A triggered run finished (successfully or not).
    RunnerComplete {
        watcher_uid: WatcherUid,
        event: WatchEvent,
        summary: RunSummary,
    },
    /// The watcher's tasks could not be resolved or built for this event.
    ResolutionFailed {
        watcher_uid: WatcherUid,
        event: WatchEvent,
        errors: Vec<String>,
    },
}

impl WatchReport {
    pub fn watcher_uid(&self) -> WatcherUid {
        match self {
            WatchReport::Task { watcher_uid, .. }
            | WatchReport::RunnerComplete { watcher_uid, .. }
            | WatchReport::ResolutionFailed { watcher_uid, .. } => *watcher_uid,
        }
    }
}

/// Turns file events into task runs, at most one in flight per watcher.
#[derive(Debug)]
pub struct WatchController {
    resolver: Arc<Resolver>,
    plan: WatchPlan,
    options: RunOptions,
    teardowns: Teardowns,
}

impl WatchController {
    /// Select watch groups by name (all groups when `groups` is empty).
    pub fn new(resolver: Arc<Resolver>, groups: &[String]) -> Result<Self, WatchError> {
        let plan = select_watchers(resolver.config(), groups)?;
        let options = RunOptions {
            continue_on_error: resolver.config().config.continue_on_error,
        };
        Ok(Self::from_plan(resolver, plan).with_run_options(options))
    }

    pub fn from_plan(resolver: Arc<Resolver>, plan: WatchPlan) -> Self {
        Self {
            resolver,
            plan,
            options: RunOptions::default(),
            teardowns: Teardowns::new(),
        }
    }

    pub fn with_run_options(mut self, options: RunOptions) -> Self {
        self.options = options;
        self
    }

    pub fn plan(&self) -> &WatchPlan {
        &self.plan
    }

    pub fn watchers(&self) -> &[Watcher] {
        &self.plan.watchers
    }

    /// Teardowns of every run started by this controller.
    pub fn teardowns(&self) -> &Teardowns {
        &self.teardowns
    }

    /// Check patterns and that every watcher's tasks resolve.
    pub fn validate(&self) -> Result<(), WatchError> {
        for watcher in &self.plan.watchers {
            WatcherProfile::compile(watcher)?;
            let resolution = self.resolver.resolve(&watcher.task_names);
            if !resolution.is_valid() {
                return Err(WatchError::InvalidWatchTasks {
                    group: watcher.group.clone(),
                    watcher: watcher.uid,
                    tasks: resolution.invalid_names(),
                });
            }
        }
        Ok(())
    }

    /// Run the `before` tasks once. `None` when there are none.
    pub async fn run_before(&self) -> Result<Option<RunSummary>, WatchError> {
        if self.plan.before.is_empty() {
            return Ok(None);
        }
        info!(tasks = ?self.plan.before, "running before tasks");

        let resolution = self.resolver.resolve(&self.plan.before);
        if !resolution.is_valid() {
            return Err(WatchError::BeforeTasksInvalid(
                resolution.errors().iter().map(|e| e.to_string()).collect(),
            ));
        }

        let trigger = TriggerContext::new(Arc::clone(self.resolver.config()), TriggerReason::Before);
        let sequence = SequenceBuilder::new(Arc::clone(self.resolver.adaptors()), trigger.clone())
            .build(&resolution.valid)
            .map_err(|e| WatchError::BeforeTasksInvalid(vec![e.to_string()]))?;

        let summary = Runtime::new(sequence, trigger, self.options)
            .with_teardowns(self.teardowns.clone())
            .series()
            .summary()
            .await
            .map_err(|e| WatchError::BeforeTasksFailed(vec![e.to_string()]))?;

        if !summary.is_success() {
            return Err(WatchError::BeforeTasksFailed(
                summary.errors().iter().map(|e| e.to_string()).collect(),
            ));
        }
        Ok(Some(summary))
    }

    /// Start consuming `events`. The session ends on
    /// [`WatchHandle::shutdown`], or once `events` closes and no run is in
    /// flight.
    pub fn start(&self, mut events: mpsc::UnboundedReceiver<WatchEvent>) -> WatchHandle {
        let (input_tx, input_rx) = mpsc::unbounded_channel::<ControllerInput>();
        let (report_tx, report_rx) = mpsc::unbounded_channel::<WatchReport>();

        let mut coalescers = HashMap::new();
        let mut coalescer_tasks = Vec::new();
        for watcher in &self.plan.watchers {
            let (tx, rx) = mpsc::unbounded_channel();
            coalescer_tasks.push(spawn_coalescer(watcher.options, rx, input_tx.clone()));
            coalescers.insert(watcher.uid, tx);
        }

        let router_tx = input_tx.clone();
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                match coalescers.get(&event.watcher_uid) {
                    Some(tx) => {
                        let _ = tx.send(event);
                    }
                    None => warn!(watcher = %event.watcher_uid, "event for unknown watcher"),
                }
            }
            drop(coalescers);
            for task in coalescer_tasks {
                let _ = task.await;
            }
            let _ = router_tx.send(ControllerInput::SourceClosed);
        });

        let actor = Actor {
            states: RunStates::new(self.plan.watchers.iter().map(|w| w.uid)),
            resolver: Arc::clone(&self.resolver),
            options: self.options,
            teardowns: self.teardowns.clone(),
            input_tx: input_tx.clone(),
            report_tx,
        };
        let join = tokio::spawn(actor.run(input_rx));

        WatchHandle {
            reports: report_rx,
            input_tx,
            join,
        }
    }
}

/// A running watch session.
#[derive(Debug)]
pub struct WatchHandle {
    reports: mpsc::UnboundedReceiver<WatchReport>,
    input_tx: mpsc::UnboundedSender<ControllerInput>,
    join: JoinHandle<()>,
}

impl WatchHandle {
    pub async fn next(&mut self) -> Option<WatchReport> {
        self.reports.recv().await
    }

    /// Stop admitting events. Runs already in flight still finish.
    pub fn shutdown(&self) {
        let _ = self.input_tx.send(ControllerInput::Shutdown);
    }

    /// Every report until the session ends.
    pub async fn collect(mut self) -> Vec<WatchReport> {
        drop(self.input_tx);
        let mut reports = Vec::new();
        while let Some(report) = self.reports.recv().await {
            reports.push(report);
        }
        let _ = self.join.await;
        reports
    }
}

/// Sole owner of the run-state map.
struct Actor {
    states: RunStates,
    resolver: Arc<Resolver>,
    options: RunOptions,
    teardowns: Teardowns,
    input_tx: mpsc::UnboundedSender<ControllerInput>,
    report_tx: mpsc::UnboundedSender<WatchReport>,
}

impl Actor {
    async fn run(mut self, mut input_rx: mpsc::UnboundedReceiver<ControllerInput>) {
        let mut source_closed = false;
        while let Some(input) = input_rx.recv().await {
            match input {
                ControllerInput::Event(event) => self.on_event(event),
                ControllerInput::Stop(uid) => {
                    let transition = self.states.apply(uid, StateIntent::Stop);
                    debug!(watcher = %uid, ?transition, "watcher idle");
                }
                ControllerInput::SourceClosed => source_closed = true,
                ControllerInput::Shutdown => {
                    info!("watch controller shutting down");
                    break;
                }
            }
            if source_closed && !self.states.any_running() {
                debug!("event source closed and no runs in flight");
                break;
            }
        }
    }

    fn on_event(&mut self, event: WatchEvent) {
        let uid = event.watcher_uid;
        match self.states.apply(uid, StateIntent::Start) {
            Transition::Started => {
                info!(watcher = %uid, path = ?event.path, event = %event.event, "triggering run");
                let guard = RunGuard::new(uid, self.input_tx.clone());
                let resolver = Arc::clone(&self.resolver);
                let options = self.options;
                let teardowns = self.teardowns.clone();
                let report_tx = self.report_tx.clone();
                tokio::spawn(async move {
                    let _guard = guard;
                    run_for_event(resolver, options, teardowns, event, report_tx).await;
                });
            }
            Transition::AlreadyRunning => {
                debug!(watcher = %uid, path = ?event.path, "watcher running; event dropped");
            }
            other => warn!(watcher = %uid, transition = ?other, "unexpected start transition"),
        }
    }
}

/// Resolve, build and run a watcher's tasks for one admitted event.
async fn run_for_event(
    resolver: Arc<Resolver>,
    options: RunOptions,
    teardowns: Teardowns,
    event: WatchEvent,
    report_tx: mpsc::UnboundedSender<WatchReport>,
) {
    let uid = event.watcher_uid;
    let resolution = resolver.resolve(&event.tasks);
    if !resolution.is_valid() {
        let errors = resolution.errors().iter().map(|e| e.to_string()).collect();
        let _ = report_tx.send(WatchReport::ResolutionFailed {
            watcher_uid: uid,
            event,
            errors,
        });
        return;
    }

    let trigger = TriggerContext::new(
        Arc::clone(resolver.config()),
        TriggerReason::Watch(event.clone()),
    );
    let sequence = match SequenceBuilder::new(Arc::clone(resolver.adaptors()), trigger.clone())
        .build(&resolution.valid)
    {
        Ok(sequence) => sequence,
        Err(err) => {
            let _ = report_tx.send(WatchReport::ResolutionFailed {
                watcher_uid: uid,
                event,
                errors: vec![err.to_string()],
            });
            return;
        }
    };

    let mut stream = Runtime::new(sequence, trigger, options)
        .with_teardowns(teardowns)
        .series();
    while let Some(report) = stream.next().await {
        let _ = report_tx.send(WatchReport::Task {
            watcher_uid: uid,
            report,
        });
    }

    let summary = match stream.summary().await {
        Ok(summary) => summary,
        Err(err) => {
            warn!(watcher = %uid, error = %err, "run ended abnormally");
            RunSummary::default()
        }
    };
    let _ = report_tx.send(WatchReport::RunnerComplete {
        watcher_uid: uid,
        event,
        summary,
    });
}
