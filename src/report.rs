// src/report.rs

//! Log-line rendering of run and watch reports, plus dry-run output.

use std::fmt::Write as _;

use tracing::{error, info, warn};

use crate::engine::{Report, RunSummary};
use crate::task::{Resolution, Task, TaskBinding};
use crate::watch::{WatchPlan, WatchReport};

pub fn log_report(report: &Report) {
    let item = report.item();
    match report {
        Report::Start { .. } => info!(task = %item.label(), "started"),
        Report::End { stats, .. } => info!(
            task = %item.label(),
            duration_ms = stats.duration.as_millis() as u64,
            "finished"
        ),
        Report::Error { stats, error, .. } => error!(
            task = %item.label(),
            duration_ms = stats.duration.as_millis() as u64,
            error = %format!("{error:#}"),
            "failed"
        ),
    }
}

pub fn log_summary(summary: &RunSummary) {
    let duration_ms = summary.duration.as_millis() as u64;
    if summary.is_success() {
        info!(
            completed = summary.completed(),
            skipped = summary.skipped(),
            duration_ms,
            "all tasks completed"
        );
    } else {
        warn!(
            completed = summary.completed(),
            failed = summary.failed(),
            skipped = summary.skipped(),
            duration_ms,
            "run finished with errors"
        );
    }
}

pub fn log_watch_report(report: &WatchReport) {
    match report {
        WatchReport::Task { report, .. } => log_report(report),
        WatchReport::RunnerComplete {
            watcher_uid,
            event,
            summary,
        } => {
            info!(watcher = %watcher_uid, path = ?event.path, "watch run complete");
            log_summary(summary);
        }
        WatchReport::ResolutionFailed {
            watcher_uid,
            errors,
            ..
        } => {
            for err in errors {
                error!(watcher = %watcher_uid, error = %err, "watch tasks failed to resolve");
            }
        }
    }
}

/// Indented task trees of a resolution, invalid tasks with their errors.
pub fn render_resolution(resolution: &Resolution) -> String {
    let mut out = String::new();
    for task in resolution.valid.iter().chain(resolution.invalid.iter()) {
        render_task(&mut out, task, 0);
    }
    out
}

fn render_task(out: &mut String, task: &Task, depth: usize) {
    let indent = "  ".repeat(depth);
    let binding = match &task.binding {
        Some(TaskBinding::Adaptor { id, command }) => format!(" [{} {}]", id.sigil(), command),
        Some(TaskBinding::Module(module)) => format!(" [module {}]", module.path.display()),
        Some(TaskBinding::Inline(f)) => format!(" [fn {}]", f.label()),
        None => format!(" ({})", task.run_mode),
    };
    let _ = write!(out, "{indent}- {}{binding}", task.raw_input);
    if task.skipped {
        out.push_str(" (skipped)");
    }
    if !task.subtasks.is_empty() {
        let names: Vec<&str> = task.subtasks.iter().map(|s| s.name.as_str()).collect();
        let _ = write!(out, " subtasks: {}", names.join(", "));
    }
    out.push('\n');
    for err in &task.errors {
        let _ = writeln!(out, "{indent}    error: {err}");
    }
    for child in &task.children {
        render_task(out, child, depth + 1);
    }
}

pub fn render_watch_plan(plan: &WatchPlan) -> String {
    let mut out = String::new();
    if !plan.before.is_empty() {
        let _ = writeln!(out, "before: {}", plan.before.join(", "));
    }
    for w in &plan.watchers {
        let _ = writeln!(
            out,
            "{} [{}] {} -> {}",
            w.group,
            w.uid,
            w.patterns.join(" "),
            w.task_names.join(", ")
        );
        if let Some(d) = w.options.debounce {
            let _ = writeln!(out, "    debounce: {}ms", d.as_millis());
        }
        if let Some(t) = w.options.throttle {
            let _ = writeln!(out, "    throttle: {}ms", t.as_millis());
        }
        if !w.options.ignore_initial {
            out.push_str("    ignore_initial: false\n");
        }
    }
    out
}
