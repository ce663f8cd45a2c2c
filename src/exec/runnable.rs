// src/exec/runnable.rs

//! The contract between the runtime and whatever a leaf actually runs.
//!
//! A [`Runnable`] receives a [`TaskContext`] and returns a
//! [`RunnableResult`] saying how it will signal completion:
//!
//! - `Callback`: the runnable calls [`DoneSink::done`] (or drops it, which
//!   counts as an error).
//! - `Future`: the returned future resolves to the outcome.
//! - `Stream`: the stream is drained; the first `Err` item fails the leaf.
//! - `Cancelable`: like `Callback`, plus a [`Teardown`] the runtime keeps
//!   until the leaf finishes and calls on interruption.

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::anyhow;
use futures::future::BoxFuture;
use futures::stream::{BoxStream, Stream};
use futures::FutureExt;
use futures::StreamExt;
use tokio::sync::oneshot;

use crate::config::{Config, InlineTask};
use crate::watch::WatchEvent;

/// Something a `SequenceTask` leaf can execute.
pub trait Runnable: Send + Sync {
    fn run(&self, ctx: TaskContext) -> RunnableResult;

    /// Short human-readable description for logs and dry runs.
    fn describe(&self) -> String;
}

/// How a runnable will report completion.
pub enum RunnableResult {
    Callback,
    Future(BoxFuture<'static, anyhow::Result<()>>),
    Stream(BoxStream<'static, anyhow::Result<()>>),
    Cancelable(Teardown),
}

impl RunnableResult {
    pub fn future<F>(f: F) -> Self
    where
        F: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        RunnableResult::Future(f.boxed())
    }

    pub fn stream<S>(s: S) -> Self
    where
        S: Stream<Item = anyhow::Result<()>> + Send + 'static,
    {
        RunnableResult::Stream(s.boxed())
    }

    pub fn ok() -> Self {
        RunnableResult::future(async { Ok(()) })
    }
}

impl fmt::Debug for RunnableResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunnableResult::Callback => "Callback",
            RunnableResult::Future(_) => "Future",
            RunnableResult::Stream(_) => "Stream",
            RunnableResult::Cancelable(_) => "Cancelable",
        };
        f.write_str(name)
    }
}

/// Cancellation hook retained by the runtime while a leaf is in flight.
pub struct Teardown {
    f: Box<dyn FnOnce() -> anyhow::Result<()> + Send>,
    outlives_leaf: bool,
}

impl Teardown {
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce() -> anyhow::Result<()> + Send + 'static,
    {
        Teardown {
            f: Box::new(f),
            outlives_leaf: false,
        }
    }

    /// A teardown kept after the leaf completes, for work the leaf left
    /// running (background processes).
    pub fn outliving<F>(f: F) -> Self
    where
        F: FnOnce() -> anyhow::Result<()> + Send + 'static,
    {
        Teardown {
            f: Box::new(f),
            outlives_leaf: true,
        }
    }

    pub fn outlives_leaf(&self) -> bool {
        self.outlives_leaf
    }

    pub fn run(self) -> anyhow::Result<()> {
        (self.f)()
    }
}

impl fmt::Debug for Teardown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Teardown")
    }
}

/// Single-use completion callback handed to every runnable.
#[derive(Debug)]
pub struct DoneSink {
    tx: oneshot::Sender<anyhow::Result<()>>,
}

/// Runtime side of a [`DoneSink`].
#[derive(Debug)]
pub struct DoneReceiver {
    rx: oneshot::Receiver<anyhow::Result<()>>,
}

impl DoneSink {
    pub fn channel() -> (DoneSink, DoneReceiver) {
        let (tx, rx) = oneshot::channel();
        (DoneSink { tx }, DoneReceiver { rx })
    }

    /// Report the outcome. Later calls are impossible (the sink is consumed).
    pub fn done(self, result: anyhow::Result<()>) {
        // The receiver is gone when the runtime no longer waits for this
        // leaf (Future/Stream conventions); nothing to report then.
        let _ = self.tx.send(result);
    }

    pub fn ok(self) {
        self.done(Ok(()));
    }

    pub fn fail(self, err: impl Into<anyhow::Error>) {
        self.done(Err(err.into()));
    }
}

impl DoneReceiver {
    pub async fn wait(self) -> anyhow::Result<()> {
        match self.rx.await {
            Ok(result) => result,
            Err(_) => Err(anyhow!(
                "completion callback was dropped without being called"
            )),
        }
    }
}

/// Why a run was started.
#[derive(Debug, Clone)]
pub enum TriggerReason {
    /// Task names given on the command line (or through the library API).
    Command,
    /// `before` tasks of a watch invocation.
    Before,
    /// A file event admitted by the watch controller.
    Watch(WatchEvent),
}

/// Context shared by every leaf of one run.
#[derive(Debug, Clone)]
pub struct TriggerContext {
    pub reason: TriggerReason,
    pub cwd: PathBuf,
    pub config: Arc<Config>,
}

impl TriggerContext {
    pub fn new(config: Arc<Config>, reason: TriggerReason) -> Self {
        Self {
            cwd: config.cwd(),
            reason,
            config,
        }
    }

    pub fn command(config: Arc<Config>) -> Self {
        Self::new(config, TriggerReason::Command)
    }
}

/// Everything a leaf receives when it starts.
#[derive(Debug)]
pub struct TaskContext {
    pub done: DoneSink,
    pub task_name: String,
    pub subtask: Option<String>,
    pub options: toml::Table,
    /// Task-local environment (config `[env]` is added by process helpers).
    pub env: BTreeMap<String, String>,
    pub trigger: TriggerContext,
}

/// [`Runnable`] for functions registered in code.
#[derive(Debug, Clone)]
pub struct FnRunnable {
    task: InlineTask,
}

impl FnRunnable {
    pub fn new(task: InlineTask) -> Self {
        Self { task }
    }
}

impl Runnable for FnRunnable {
    fn run(&self, ctx: TaskContext) -> RunnableResult {
        self.task.call(ctx)
    }

    fn describe(&self) -> String {
        format!("fn {}", self.task.label())
    }
}

/// Drain a stream-convention result; the first error wins.
pub(crate) async fn drain_stream(
    mut stream: BoxStream<'static, anyhow::Result<()>>,
) -> anyhow::Result<()> {
    while let Some(item) = stream.next().await {
        item?;
    }
    Ok(())
}
