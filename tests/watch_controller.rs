// tests/watch_controller.rs

mod common;

use std::path::PathBuf;
use std::time::Duration;

use conductor::watch::{FileEvent, WatchController, WatchError, WatchEvent, WatchReport, Watcher};
use tokio::sync::mpsc;
use tokio::time::sleep;

use crate::common::tasks::{delay_fail, Recorder};
use crate::common::{
    debounce, init_tracing, names, resolver, throttle, with_timeout, ConfigBuilder, TestResult,
};

fn change(watcher: &Watcher, path: &str) -> WatchEvent {
    WatchEvent::new(FileEvent::Change, path, watcher)
}

fn completions(reports: &[WatchReport]) -> Vec<&WatchEvent> {
    reports
        .iter()
        .filter_map(|r| match r {
            WatchReport::RunnerComplete { event, .. } => Some(event),
            _ => None,
        })
        .collect()
}

fn task_reports(reports: &[WatchReport]) -> usize {
    reports
        .iter()
        .filter(|r| matches!(r, WatchReport::Task { .. }))
        .count()
}

#[tokio::test(start_paused = true)]
async fn events_during_a_run_are_dropped() -> TestResult {
    init_tracing();
    let recorder = Recorder::new();
    let config = ConfigBuilder::new()
        .task_fn("css", recorder.task(100))
        .watcher("default", &["src/**/*.scss"], &["css"])
        .build();
    let controller = WatchController::new(resolver(config), &[])?;
    controller.validate()?;
    let watcher = controller.watchers()[0].clone();

    let (tx, rx) = mpsc::unbounded_channel();
    let handle = controller.start(rx);
    for path in ["src/a.scss", "src/b.scss", "src/c.scss"] {
        tx.send(change(&watcher, path))?;
        sleep(Duration::from_millis(1)).await;
    }
    drop(tx);

    let reports = with_timeout(handle.collect()).await;

    assert_eq!(recorder.count(), 1);
    assert_eq!(task_reports(&reports), 2);
    let done = completions(&reports);
    assert_eq!(done.len(), 1);
    assert_eq!(done[0].path, PathBuf::from("src/a.scss"));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn watcher_returns_to_idle_after_each_run() -> TestResult {
    init_tracing();
    let recorder = Recorder::new();
    let config = ConfigBuilder::new()
        .task_fn("css", recorder.task(50))
        .watcher("default", &["**/*.scss"], &["css"])
        .build();
    let controller = WatchController::new(resolver(config), &[])?;
    let watcher = controller.watchers()[0].clone();

    let (tx, rx) = mpsc::unbounded_channel();
    let handle = controller.start(rx);
    tx.send(change(&watcher, "a.scss"))?;
    sleep(Duration::from_millis(200)).await;
    tx.send(change(&watcher, "b.scss"))?;
    drop(tx);

    let reports = with_timeout(handle.collect()).await;

    assert_eq!(recorder.count(), 2);
    assert_eq!(completions(&reports).len(), 2);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn failed_run_still_returns_the_watcher_to_idle() -> TestResult {
    init_tracing();
    let config = ConfigBuilder::new()
        .task_fn("lint", delay_fail(20, "lint errors"))
        .watcher("default", &["**/*.js"], &["lint"])
        .build();
    let controller = WatchController::new(resolver(config), &[])?;
    let watcher = controller.watchers()[0].clone();

    let (tx, rx) = mpsc::unbounded_channel();
    let handle = controller.start(rx);
    tx.send(change(&watcher, "a.js"))?;
    sleep(Duration::from_millis(100)).await;
    tx.send(change(&watcher, "b.js"))?;
    drop(tx);

    let reports = with_timeout(handle.collect()).await;

    let summaries: Vec<bool> = reports
        .iter()
        .filter_map(|r| match r {
            WatchReport::RunnerComplete { summary, .. } => Some(summary.is_success()),
            _ => None,
        })
        .collect();
    assert_eq!(summaries, vec![false, false]);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn throttle_collapses_a_burst_into_one_run() -> TestResult {
    init_tracing();
    let recorder = Recorder::new();
    let config = ConfigBuilder::new()
        .task_fn("css", recorder.task(10))
        .watcher_with("default", &["**/*.scss"], &["css"], throttle(100))
        .build();
    let controller = WatchController::new(resolver(config), &[])?;
    let watcher = controller.watchers()[0].clone();
    assert_eq!(watcher.options.throttle, Some(Duration::from_millis(100)));

    let (tx, rx) = mpsc::unbounded_channel();
    let handle = controller.start(rx);
    for i in 0..5 {
        tx.send(change(&watcher, &format!("{i}.scss")))?;
        sleep(Duration::from_millis(20)).await;
    }
    drop(tx);

    let reports = with_timeout(handle.collect()).await;

    assert_eq!(recorder.count(), 1);
    let done = completions(&reports);
    assert_eq!(done.len(), 1);
    assert_eq!(done[0].path, PathBuf::from("0.scss"));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn throttle_admits_again_after_the_window() -> TestResult {
    init_tracing();
    let recorder = Recorder::new();
    let config = ConfigBuilder::new()
        .task_fn("css", recorder.task(10))
        .watcher_with("default", &["**/*.scss"], &["css"], throttle(100))
        .build();
    let controller = WatchController::new(resolver(config), &[])?;
    let watcher = controller.watchers()[0].clone();

    let (tx, rx) = mpsc::unbounded_channel();
    let handle = controller.start(rx);
    tx.send(change(&watcher, "a.scss"))?;
    sleep(Duration::from_millis(150)).await;
    tx.send(change(&watcher, "b.scss"))?;
    drop(tx);

    with_timeout(handle.collect()).await;

    assert_eq!(recorder.count(), 2);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn debounce_runs_once_with_the_latest_event() -> TestResult {
    init_tracing();
    let recorder = Recorder::new();
    let config = ConfigBuilder::new()
        .task_fn("css", recorder.task(10))
        .watch_group("default", &[], debounce(50))
        .watcher("default", &["**/*.scss"], &["css"])
        .build();
    let controller = WatchController::new(resolver(config), &[])?;
    let watcher = controller.watchers()[0].clone();
    assert_eq!(watcher.options.debounce, Some(Duration::from_millis(50)));

    let (tx, rx) = mpsc::unbounded_channel();
    let handle = controller.start(rx);
    for path in ["a.scss", "b.scss", "c.scss"] {
        tx.send(change(&watcher, path))?;
        sleep(Duration::from_millis(10)).await;
    }
    drop(tx);

    let reports = with_timeout(handle.collect()).await;

    assert_eq!(recorder.count(), 1);
    let done = completions(&reports);
    assert_eq!(done.len(), 1);
    assert_eq!(done[0].path, PathBuf::from("c.scss"));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn watchers_are_gated_independently() -> TestResult {
    init_tracing();
    let css = Recorder::new();
    let js = Recorder::new();
    let config = ConfigBuilder::new()
        .task_fn("css", css.task(100))
        .task_fn("js", js.task(100))
        .watcher("default", &["**/*.scss"], &["css"])
        .watcher("default", &["**/*.js"], &["js"])
        .build();
    let controller = WatchController::new(resolver(config), &[])?;
    let css_watcher = controller.watchers()[0].clone();
    let js_watcher = controller.watchers()[1].clone();

    let (tx, rx) = mpsc::unbounded_channel();
    let handle = controller.start(rx);
    tx.send(change(&css_watcher, "a.scss"))?;
    tx.send(change(&js_watcher, "a.js"))?;
    tx.send(change(&css_watcher, "b.scss"))?;
    drop(tx);

    let reports = with_timeout(handle.collect()).await;

    assert_eq!(css.count(), 1);
    assert_eq!(js.count(), 1);
    assert_eq!(completions(&reports).len(), 2);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn shutdown_stops_admitting_events() -> TestResult {
    init_tracing();
    let recorder = Recorder::new();
    let config = ConfigBuilder::new()
        .task_fn("css", recorder.task(10))
        .watcher("default", &["**/*.scss"], &["css"])
        .build();
    let controller = WatchController::new(resolver(config), &[])?;
    let watcher = controller.watchers()[0].clone();

    let (tx, rx) = mpsc::unbounded_channel();
    let mut handle = controller.start(rx);
    tx.send(change(&watcher, "a.scss"))?;

    let first = with_timeout(async {
        loop {
            match handle.next().await {
                Some(WatchReport::RunnerComplete { .. }) | None => break,
                Some(_) => continue,
            }
        }
    });
    first.await;

    handle.shutdown();
    sleep(Duration::from_millis(10)).await;
    let _ = tx.send(change(&watcher, "b.scss"));
    sleep(Duration::from_millis(50)).await;

    assert_eq!(recorder.count(), 1);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn unresolvable_tasks_report_resolution_failure() -> TestResult {
    init_tracing();
    let config = ConfigBuilder::new()
        .watcher("default", &["**/*.md"], &["missing"])
        .build();
    let controller = WatchController::new(resolver(config), &[])?;
    let watcher = controller.watchers()[0].clone();

    let (tx, rx) = mpsc::unbounded_channel();
    let handle = controller.start(rx);
    tx.send(change(&watcher, "README.md"))?;
    drop(tx);

    let reports = with_timeout(handle.collect()).await;

    assert_eq!(reports.len(), 1);
    assert!(matches!(
        &reports[0],
        WatchReport::ResolutionFailed { errors, .. } if errors[0].contains("missing")
    ));
    Ok(())
}

#[test]
fn unknown_group_is_rejected() -> TestResult {
    init_tracing();
    let config = ConfigBuilder::new()
        .task_fn("css", Recorder::new().task(1))
        .watcher("styles", &["**/*.scss"], &["css"])
        .build();

    let err = WatchController::new(resolver(config), &names(&["scripts"]))
        .err()
        .ok_or("expected an error")?;

    match err {
        WatchError::WatchTaskNameNotFound { name, available } => {
            assert_eq!(name, "scripts");
            assert_eq!(available, vec!["styles".to_string()]);
        }
        other => return Err(format!("unexpected error {other}").into()),
    }
    Ok(())
}

#[test]
fn selecting_groups_collects_their_before_tasks() -> TestResult {
    init_tracing();
    let config = ConfigBuilder::new()
        .task_fn("css", Recorder::new().task(1))
        .watch_before(&["clean"])
        .watch_group("styles", &["clean", "fonts"], Default::default())
        .watcher("styles", &["**/*.scss"], &["css"])
        .watcher("scripts", &["**/*.js"], &["css"])
        .build();

    let controller = WatchController::new(resolver(config), &names(&["styles"]))?;

    assert_eq!(controller.plan().before, vec!["clean", "fonts"]);
    assert_eq!(controller.watchers().len(), 1);
    assert_eq!(controller.watchers()[0].group, "styles");
    Ok(())
}

#[test]
fn invalid_watcher_tasks_fail_validation() -> TestResult {
    init_tracing();
    let config = ConfigBuilder::new()
        .watcher("default", &["**/*.scss"], &["missing"])
        .build();
    let controller = WatchController::new(resolver(config), &[])?;

    let err = controller.validate().err().ok_or("expected an error")?;
    assert!(matches!(
        err,
        WatchError::InvalidWatchTasks { ref tasks, .. } if tasks == &vec!["missing".to_string()]
    ));
    Ok(())
}

#[test]
fn invalid_patterns_fail_validation() -> TestResult {
    init_tracing();
    let config = ConfigBuilder::new()
        .task_fn("css", Recorder::new().task(1))
        .watcher("default", &["src/[.scss"], &["css"])
        .build();
    let controller = WatchController::new(resolver(config), &[])?;

    assert!(matches!(
        controller.validate(),
        Err(WatchError::InvalidPattern { .. })
    ));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn before_tasks_run_once() -> TestResult {
    init_tracing();
    let recorder = Recorder::new();
    let config = ConfigBuilder::new()
        .task_fn("prep", recorder.task(10))
        .task_fn("css", Recorder::new().task(1))
        .watch_before(&["prep"])
        .watcher("default", &["**/*.scss"], &["css"])
        .build();
    let controller = WatchController::new(resolver(config), &[])?;

    let summary = controller.run_before().await?.ok_or("expected a summary")?;

    assert!(summary.is_success());
    assert_eq!(recorder.count(), 1);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn failing_before_tasks_abort_startup() -> TestResult {
    init_tracing();
    let config = ConfigBuilder::new()
        .task_fn("prep", delay_fail(10, "cannot prepare"))
        .task_fn("css", Recorder::new().task(1))
        .watch_before(&["prep"])
        .watcher("default", &["**/*.scss"], &["css"])
        .build();
    let controller = WatchController::new(resolver(config), &[])?;

    match controller.run_before().await {
        Err(WatchError::BeforeTasksFailed(errors)) => {
            assert!(errors[0].contains("cannot prepare"));
        }
        other => return Err(format!("unexpected result {other:?}").into()),
    }
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn unresolvable_before_tasks_abort_startup() -> TestResult {
    init_tracing();
    let config = ConfigBuilder::new()
        .task_fn("css", Recorder::new().task(1))
        .watch_before(&["missing"])
        .watcher("default", &["**/*.scss"], &["css"])
        .build();
    let controller = WatchController::new(resolver(config), &[])?;

    assert!(matches!(
        controller.run_before().await,
        Err(WatchError::BeforeTasksInvalid(_))
    ));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn no_before_tasks_means_nothing_to_run() -> TestResult {
    init_tracing();
    let config = ConfigBuilder::new()
        .task_fn("css", Recorder::new().task(1))
        .watcher("default", &["**/*.scss"], &["css"])
        .build();
    let controller = WatchController::new(resolver(config), &[])?;

    assert!(controller.run_before().await?.is_none());
    Ok(())
}
