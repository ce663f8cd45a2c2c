// src/engine/runtime.rs

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use anyhow::{anyhow, Context};
use futures::future::{join_all, BoxFuture};
use futures::FutureExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::engine::report::{ItemStats, LeafResult, Report, RunSummary};
use crate::engine::teardown::Teardowns;
use crate::exec::runnable::drain_stream;
use crate::exec::{DoneSink, RunnableResult, TaskContext, TriggerContext};
use crate::sequence::{SequenceItem, SequenceTask};
use crate::types::RunMode;

#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Keep running series siblings after an error.
    pub continue_on_error: bool,
}

/// Runs one compiled sequence.
///
/// `series()` / `parallel()` choose how the top-level items run; nested
/// groups always follow their own kind.
#[derive(Debug)]
pub struct Runtime {
    sequence: Vec<SequenceItem>,
    trigger: TriggerContext,
    options: RunOptions,
    teardowns: Teardowns,
}

impl Runtime {
    pub fn new(sequence: Vec<SequenceItem>, trigger: TriggerContext, options: RunOptions) -> Self {
        Self {
            sequence,
            trigger,
            options,
            teardowns: Teardowns::new(),
        }
    }

    /// Share a teardown registry with other runs (e.g. all runs of one
    /// watch session).
    pub fn with_teardowns(mut self, teardowns: Teardowns) -> Self {
        self.teardowns = teardowns;
        self
    }

    pub fn series(self) -> ReportStream {
        self.start(RunMode::Series)
    }

    pub fn parallel(self) -> ReportStream {
        self.start(RunMode::Parallel)
    }

    pub fn start(self, mode: RunMode) -> ReportStream {
        let (tx, rx) = mpsc::unbounded_channel();
        let teardowns = self.teardowns.clone();
        let interpreter = Interpreter {
            tx,
            trigger: self.trigger,
            options: self.options,
            teardowns: self.teardowns,
        };
        let sequence = self.sequence;

        let handle = tokio::spawn(async move {
            let started = Instant::now();
            info!(%mode, items = sequence.len(), "run started");
            let outcome = interpreter.run_items(sequence, mode).await;

            let mut leaves = outcome.leaves;
            leaves.sort_by_key(|l| l.item.seq_uid);
            let summary = RunSummary {
                leaves,
                duration: started.elapsed(),
            };
            info!(
                completed = summary.completed(),
                failed = summary.failed(),
                skipped = summary.skipped(),
                duration_ms = summary.duration.as_millis() as u64,
                "run finished"
            );
            summary
        });

        ReportStream {
            rx,
            handle,
            teardowns,
        }
    }
}

/// Reports of one run, plus its final summary.
#[derive(Debug)]
pub struct ReportStream {
    rx: mpsc::UnboundedReceiver<Report>,
    handle: JoinHandle<RunSummary>,
    teardowns: Teardowns,
}

impl ReportStream {
    /// Next report, or `None` once the run is over.
    pub async fn next(&mut self) -> Option<Report> {
        self.rx.recv().await
    }

    /// Drain remaining reports and wait for the summary.
    pub async fn finish(mut self) -> anyhow::Result<(Vec<Report>, RunSummary)> {
        let mut reports = Vec::new();
        while let Some(report) = self.rx.recv().await {
            reports.push(report);
        }
        let summary = self.handle.await.context("run task failed to complete")?;
        Ok((reports, summary))
    }

    pub async fn summary(self) -> anyhow::Result<RunSummary> {
        self.finish().await.map(|(_, summary)| summary)
    }

    /// Invoke the teardown of every in-flight leaf.
    pub fn cancel(&self) -> usize {
        self.teardowns.run_all()
    }

    pub fn teardowns(&self) -> &Teardowns {
        &self.teardowns
    }
}

#[derive(Debug, Default)]
struct Outcome {
    leaves: Vec<LeafResult>,
    failed: bool,
}

impl Outcome {
    fn absorb(&mut self, other: Outcome) {
        self.failed |= other.failed;
        self.leaves.extend(other.leaves);
    }
}

#[derive(Debug, Clone)]
struct Interpreter {
    tx: mpsc::UnboundedSender<Report>,
    trigger: TriggerContext,
    options: RunOptions,
    teardowns: Teardowns,
}

impl Interpreter {
    fn emit(&self, report: Report) {
        // The receiver may have been dropped by a caller that only wants
        // the summary.
        let _ = self.tx.send(report);
    }

    fn run_item(&self, item: SequenceItem) -> BoxFuture<'static, Outcome> {
        let this = self.clone();
        async move {
            match item {
                SequenceItem::Task(leaf) => this.run_leaf(leaf).await,
                SequenceItem::SeriesGroup(group) => {
                    this.run_items(group.items, RunMode::Series).await
                }
                SequenceItem::ParallelGroup(group) => {
                    this.run_items(group.items, RunMode::Parallel).await
                }
            }
        }
        .boxed()
    }

    fn run_items(&self, items: Vec<SequenceItem>, mode: RunMode) -> BoxFuture<'static, Outcome> {
        let this = self.clone();
        async move {
            let mut outcome = Outcome::default();
            match mode {
                RunMode::Parallel => {
                    let results = join_all(items.into_iter().map(|item| this.run_item(item))).await;
                    for result in results {
                        outcome.absorb(result);
                    }
                }
                RunMode::Series => {
                    let mut halted = false;
                    for item in items {
                        if halted {
                            outcome.leaves.extend(item.leaves().into_iter().map(|leaf| {
                                LeafResult {
                                    item: Arc::clone(leaf),
                                    stats: ItemStats::skipped(),
                                }
                            }));
                            continue;
                        }
                        let result = this.run_item(item).await;
                        if result.failed && !this.options.continue_on_error {
                            halted = true;
                        }
                        outcome.absorb(result);
                    }
                }
            }
            outcome
        }
        .boxed()
    }

    async fn run_leaf(&self, leaf: Arc<SequenceTask>) -> Outcome {
        if leaf.skipped {
            debug!(task = %leaf.label(), "skipping task");
            return Outcome {
                leaves: vec![LeafResult {
                    item: leaf,
                    stats: ItemStats::skipped(),
                }],
                failed: false,
            };
        }

        let mut stats = ItemStats::started_now();
        self.emit(Report::Start {
            item: Arc::clone(&leaf),
            stats: stats.clone(),
        });

        let result = self.invoke(&leaf).await;
        stats.complete();

        let failed = match result {
            Ok(()) => {
                self.emit(Report::End {
                    item: Arc::clone(&leaf),
                    stats: stats.clone(),
                });
                false
            }
            Err(err) => {
                let error = Arc::new(err);
                stats.errors.push(Arc::clone(&error));
                self.emit(Report::Error {
                    item: Arc::clone(&leaf),
                    stats: stats.clone(),
                    error,
                });
                true
            }
        };

        Outcome {
            leaves: vec![LeafResult { item: leaf, stats }],
            failed,
        }
    }

    /// Start the runnable and wait for it under whichever completion
    /// convention it chose.
    async fn invoke(&self, leaf: &SequenceTask) -> anyhow::Result<()> {
        let (done, done_rx) = DoneSink::channel();
        let ctx = TaskContext {
            done,
            task_name: leaf.task_name.clone(),
            subtask: leaf.subtask.clone(),
            options: leaf.options.clone(),
            env: leaf.env.clone(),
            trigger: self.trigger.clone(),
        };

        let runnable = Arc::clone(&leaf.runnable);
        let started = std::panic::catch_unwind(AssertUnwindSafe(move || runnable.run(ctx)));

        match started {
            Err(panic) => Err(panic_error(&leaf.label(), panic)),
            Ok(RunnableResult::Callback) => done_rx.wait().await,
            Ok(RunnableResult::Future(fut)) => AssertUnwindSafe(fut)
                .catch_unwind()
                .await
                .unwrap_or_else(|panic| Err(panic_error(&leaf.label(), panic))),
            Ok(RunnableResult::Stream(stream)) => AssertUnwindSafe(drain_stream(stream))
                .catch_unwind()
                .await
                .unwrap_or_else(|panic| Err(panic_error(&leaf.label(), panic))),
            Ok(RunnableResult::Cancelable(teardown)) => {
                let outlives = teardown.outlives_leaf();
                let key = self.teardowns.register(leaf.label(), teardown);
                let result = done_rx.wait().await;
                if !outlives {
                    self.teardowns.release(key);
                }
                result
            }
        }
    }
}

fn panic_error(label: &str, panic: Box<dyn Any + Send>) -> anyhow::Error {
    let message = panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic payload".to_string());
    warn!(task = %label, %message, "task panicked");
    anyhow!("task '{label}' panicked: {message}")
}
