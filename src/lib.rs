// src/lib.rs

pub mod adaptor;
pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod options;
pub mod report;
pub mod sequence;
pub mod task;
pub mod types;
pub mod watch;

use std::sync::Arc;

use anyhow::{bail, Result};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::adaptor::AdaptorRegistry;
use crate::cli::{CliArgs, Command};
use crate::config::load_and_validate;
use crate::engine::{RunOptions, Runtime};
use crate::errors::ConductorError;
use crate::exec::TriggerContext;
use crate::fs::RealFileSystem;
use crate::sequence::SequenceBuilder;
use crate::task::Resolver;
use crate::types::RunMode;
use crate::watch::{spawn_fs_watcher, WatchController};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - resolver / sequence builder / runtime
/// - (for `watch`) the file watcher and watch controller
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let config = Arc::new(load_and_validate(&args.config)?);
    let resolver = Arc::new(Resolver::new(
        config,
        Arc::new(AdaptorRegistry::with_defaults()),
        Arc::new(RealFileSystem),
    ));

    match args.command {
        Command::Run {
            tasks,
            parallel,
            continue_on_error,
            dry_run,
        } => run_tasks(&resolver, &tasks, parallel, continue_on_error, dry_run).await,
        Command::Watch { groups, dry_run } => watch(resolver, &groups, dry_run).await,
    }
}

async fn run_tasks(
    resolver: &Resolver,
    tasks: &[String],
    parallel: bool,
    continue_on_error: bool,
    dry_run: bool,
) -> Result<()> {
    let config = Arc::clone(resolver.config());
    let resolution = resolver.resolve(tasks);

    if dry_run {
        print!("{}", report::render_resolution(&resolution));
        return Ok(());
    }
    if !resolution.is_valid() {
        return Err(ConductorError::InvalidTasks(resolution.invalid_names()).into());
    }

    let trigger = TriggerContext::command(Arc::clone(&config));
    let sequence =
        SequenceBuilder::new(Arc::clone(resolver.adaptors()), trigger.clone()).build(&resolution.valid)?;

    let mode = if parallel {
        RunMode::Parallel
    } else {
        config.config.run_mode
    };
    let options = RunOptions {
        continue_on_error: continue_on_error || config.config.continue_on_error,
    };

    let mut stream = Runtime::new(sequence, trigger, options).start(mode);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut interrupted = false;
    loop {
        tokio::select! {
            report = stream.next() => match report {
                Some(report) => report::log_report(&report),
                None => break,
            },
            _ = &mut ctrl_c, if !interrupted => {
                interrupted = true;
                let cancelled = stream.cancel();
                warn!(cancelled, "interrupted; tearing down running tasks");
            }
        }
    }

    let teardowns = stream.teardowns().clone();
    let summary = stream.summary().await?;
    report::log_summary(&summary);

    if !interrupted && !teardowns.is_empty() {
        info!(
            count = teardowns.len(),
            "background processes still running; press Ctrl-C to stop them"
        );
        tokio::signal::ctrl_c().await?;
        teardowns.run_all();
    }

    if interrupted {
        bail!("run interrupted");
    }
    if !summary.is_success() {
        bail!("{} task(s) failed", summary.failed());
    }
    Ok(())
}

async fn watch(resolver: Arc<Resolver>, groups: &[String], dry_run: bool) -> Result<()> {
    let controller = WatchController::new(Arc::clone(&resolver), groups)?;

    if dry_run {
        print!("{}", report::render_watch_plan(controller.plan()));
        return Ok(());
    }

    controller.validate()?;
    if let Some(summary) = controller.run_before().await? {
        report::log_summary(&summary);
    }

    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let _fs_watcher = spawn_fs_watcher(
        resolver.config().cwd(),
        controller.watchers(),
        &RealFileSystem,
        events_tx,
    )?;
    let mut handle = controller.start(events_rx);

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    loop {
        tokio::select! {
            report = handle.next() => match report {
                Some(report) => report::log_watch_report(&report),
                None => break,
            },
            _ = &mut ctrl_c => {
                info!("Ctrl-C received; stopping watchers");
                handle.shutdown();
                controller.teardowns().run_all();
                break;
            }
        }
    }
    Ok(())
}
