//! Inline task implementations for exercising the runtime.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::anyhow;
use conductor::exec::{RunnableResult, TaskContext, Teardown};
use futures::stream;
use futures::StreamExt;

/// Future that succeeds after `ms`.
pub fn delay_ok(ms: u64) -> impl Fn(TaskContext) -> RunnableResult + Send + Sync + 'static {
    move |_ctx| {
        RunnableResult::future(async move {
            tokio::time::sleep(Duration::from_millis(ms)).await;
            Ok(())
        })
    }
}

/// Future that fails with `msg` after `ms`.
pub fn delay_fail(
    ms: u64,
    msg: &'static str,
) -> impl Fn(TaskContext) -> RunnableResult + Send + Sync + 'static {
    move |_ctx| {
        RunnableResult::future(async move {
            tokio::time::sleep(Duration::from_millis(ms)).await;
            Err(anyhow!(msg))
        })
    }
}

/// Calls `done` from a spawned task after `ms`.
pub fn callback_ok(ms: u64) -> impl Fn(TaskContext) -> RunnableResult + Send + Sync + 'static {
    move |ctx| {
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(ms)).await;
            ctx.done.ok();
        });
        RunnableResult::Callback
    }
}

/// Returns `Callback` but never calls `done`.
pub fn drops_done() -> impl Fn(TaskContext) -> RunnableResult + Send + Sync + 'static {
    |ctx| {
        drop(ctx);
        RunnableResult::Callback
    }
}

/// Stream of `items` elements, `ms` apart; fails at `fail_at` if given.
pub fn stream_items(
    items: usize,
    ms: u64,
    fail_at: Option<usize>,
) -> impl Fn(TaskContext) -> RunnableResult + Send + Sync + 'static {
    move |_ctx| {
        let s = stream::iter(0..items).then(move |i| async move {
            tokio::time::sleep(Duration::from_millis(ms)).await;
            if Some(i) == fail_at {
                Err(anyhow!("stream item {i} failed"))
            } else {
                Ok(())
            }
        });
        RunnableResult::stream(s)
    }
}

/// Panics while being started.
pub fn panics(msg: &'static str) -> impl Fn(TaskContext) -> RunnableResult + Send + Sync + 'static {
    move |_ctx| panic!("{msg}")
}

/// Panics while its future is polled.
pub fn panics_in_future(
    msg: &'static str,
) -> impl Fn(TaskContext) -> RunnableResult + Send + Sync + 'static {
    move |_ctx| {
        RunnableResult::future(async move {
            tokio::task::yield_now().await;
            panic!("{msg}")
        })
    }
}

/// Cancelable leaf that completes after `ms`, or fails as soon as its
/// teardown runs. `torn_down` records whether the teardown was invoked.
pub fn cancelable(
    ms: u64,
    torn_down: Arc<AtomicBool>,
) -> impl Fn(TaskContext) -> RunnableResult + Send + Sync + 'static {
    move |ctx| {
        let (cancel_tx, cancel_rx) = tokio::sync::oneshot::channel::<()>();
        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(Duration::from_millis(ms)) => ctx.done.ok(),
                _ = cancel_rx => ctx.done.fail(anyhow!("cancelled")),
            }
        });
        let flag = Arc::clone(&torn_down);
        RunnableResult::Cancelable(Teardown::new(move || {
            flag.store(true, Ordering::SeqCst);
            let _ = cancel_tx.send(());
            Ok(())
        }))
    }
}

/// Records the task name (and subtask) of every invocation, then succeeds
/// after `ms`.
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    calls: Arc<Mutex<Vec<String>>>,
    count: Arc<AtomicUsize>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn task(&self, ms: u64) -> impl Fn(TaskContext) -> RunnableResult + Send + Sync + 'static {
        let calls = Arc::clone(&self.calls);
        let count = Arc::clone(&self.count);
        move |ctx| {
            let label = match &ctx.subtask {
                Some(sub) => format!("{}:{}", ctx.task_name, sub),
                None => ctx.task_name.clone(),
            };
            calls.lock().unwrap().push(label);
            count.fetch_add(1, Ordering::SeqCst);
            RunnableResult::future(async move {
                tokio::time::sleep(Duration::from_millis(ms)).await;
                Ok(())
            })
        }
    }

    /// Like [`Recorder::task`], also capturing the options each call saw.
    pub fn with_options(
        &self,
        seen: Arc<Mutex<Vec<toml::Table>>>,
    ) -> impl Fn(TaskContext) -> RunnableResult + Send + Sync + 'static {
        let inner = self.task(0);
        move |ctx| {
            seen.lock().unwrap().push(ctx.options.clone());
            inner(ctx)
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}
