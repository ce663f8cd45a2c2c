// tests/watch_units.rs

mod common;

use std::path::Path;
use std::time::Duration;

use conductor::fs::mock::MockFileSystem;
use conductor::watch::coalesce::Throttle;
use conductor::watch::state::{ControllerInput, RunGuard, RunStates, StateIntent, Transition};
use conductor::watch::watcher::{file_event_kind, initial_events};
use conductor::watch::{
    collect_matching_files, relative_str, select_watchers, FileEvent, WatcherProfile, WatcherUid,
};
use notify::event::{CreateKind, DataChange, EventKind, MetadataKind, ModifyKind, RemoveKind};
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::common::{init_tracing, ConfigBuilder, TestResult};

#[test]
fn run_states_gate_one_run_per_watcher() -> TestResult {
    init_tracing();
    let a = WatcherUid::next();
    let b = WatcherUid::next();
    let mut states = RunStates::new([a, b]);

    assert_eq!(states.apply(a, StateIntent::Start), Transition::Started);
    assert_eq!(states.apply(a, StateIntent::Start), Transition::AlreadyRunning);
    assert_eq!(states.apply(b, StateIntent::Start), Transition::Started);
    assert!(states.is_running(a));

    assert_eq!(states.apply(a, StateIntent::Stop), Transition::Stopped);
    assert_eq!(states.apply(a, StateIntent::Stop), Transition::AlreadyIdle);
    assert!(!states.is_running(a));
    assert!(states.any_running());

    let stranger = WatcherUid::next();
    assert_eq!(states.apply(stranger, StateIntent::Start), Transition::UnknownWatcher);
    Ok(())
}

#[test]
fn run_guard_reports_stop_when_dropped() -> TestResult {
    init_tracing();
    let uid = WatcherUid::next();
    let (tx, mut rx) = mpsc::unbounded_channel();

    drop(RunGuard::new(uid, tx));

    match rx.try_recv()? {
        ControllerInput::Stop(stopped) => assert_eq!(stopped, uid),
        other => return Err(format!("unexpected input {other:?}").into()),
    }
    Ok(())
}

#[test]
fn throttle_admits_leading_edge_only() -> TestResult {
    init_tracing();
    let mut throttle = Throttle::new(Duration::from_millis(100));
    let t0 = Instant::now();

    assert!(throttle.admit(t0));
    assert!(!throttle.admit(t0 + Duration::from_millis(50)));
    assert!(!throttle.admit(t0 + Duration::from_millis(99)));
    assert!(throttle.admit(t0 + Duration::from_millis(100)));
    assert!(!throttle.admit(t0 + Duration::from_millis(150)));
    Ok(())
}

#[test]
fn watcher_uids_are_unique_and_displayed() -> TestResult {
    init_tracing();
    let a = WatcherUid::next();
    let b = WatcherUid::next();

    assert_ne!(a, b);
    assert_eq!(a.to_string(), format!("w{}", a.get()));
    Ok(())
}

#[test]
fn profiles_honour_exclusions() -> TestResult {
    init_tracing();
    let config = ConfigBuilder::new()
        .watcher("styles", &["styles/**/*.scss", "!styles/vendor/**"], &["css"])
        .build();
    let plan = select_watchers(&config, &[])?;
    let profile = WatcherProfile::compile(&plan.watchers[0])?;

    assert!(profile.matches("styles/main.scss"));
    assert!(profile.matches("styles/partials/_grid.scss"));
    assert!(!profile.matches("styles/vendor/reset.scss"));
    assert!(!profile.matches("scripts/app.js"));
    assert_eq!(profile.uid(), plan.watchers[0].uid);
    Ok(())
}

#[test]
fn notify_kinds_map_to_file_events() -> TestResult {
    init_tracing();
    assert_eq!(
        file_event_kind(&EventKind::Create(CreateKind::File)),
        Some(FileEvent::Add)
    );
    assert_eq!(
        file_event_kind(&EventKind::Modify(ModifyKind::Data(DataChange::Content))),
        Some(FileEvent::Change)
    );
    assert_eq!(
        file_event_kind(&EventKind::Remove(RemoveKind::File)),
        Some(FileEvent::Unlink)
    );
    assert_eq!(
        file_event_kind(&EventKind::Modify(ModifyKind::Metadata(MetadataKind::AccessTime))),
        None
    );
    assert_eq!(file_event_kind(&EventKind::Any), None);
    Ok(())
}

#[test]
fn initial_events_only_for_watchers_that_want_them() -> TestResult {
    init_tracing();
    let fs = MockFileSystem::new();
    fs.add_file(Path::new(".").join("src/b.js"));
    fs.add_file(Path::new(".").join("src/a.js"));
    fs.add_file(Path::new(".").join("src/style.css"));

    let config = ConfigBuilder::new()
        .watcher_with(
            "eager",
            &["src/*.js"],
            &["js"],
            conductor::config::WatchOptionsConfig {
                ignore_initial: Some(false),
                ..Default::default()
            },
        )
        .watcher("lazy", &["src/*.css"], &["css"])
        .build();
    let plan = select_watchers(&config, &[])?;

    let events = initial_events(&fs, Path::new("."), &plan.watchers)?;

    let paths: Vec<_> = events.iter().map(|e| e.path.clone()).collect();
    assert_eq!(
        paths,
        vec![Path::new(".").join("src/a.js"), Path::new(".").join("src/b.js")]
    );
    assert!(events.iter().all(|e| e.event == FileEvent::Add));
    assert!(events.iter().all(|e| e.tasks == vec!["js".to_string()]));
    Ok(())
}

#[test]
fn matching_files_are_collected_recursively() -> TestResult {
    init_tracing();
    let fs = MockFileSystem::new();
    fs.add_file(Path::new(".").join("docs/guide/intro.md"));
    fs.add_file(Path::new(".").join("docs/index.md"));
    fs.add_file(Path::new(".").join("docs/logo.png"));

    let config = ConfigBuilder::new()
        .watcher("docs", &["docs/**/*.md"], &["docs"])
        .build();
    let plan = select_watchers(&config, &[])?;
    let profile = WatcherProfile::compile(&plan.watchers[0])?;

    let files = collect_matching_files(&fs, Path::new("."), &profile)?;

    assert_eq!(
        files,
        vec![
            Path::new(".").join("docs/guide/intro.md"),
            Path::new(".").join("docs/index.md"),
        ]
    );
    Ok(())
}

#[test]
fn relative_paths_use_forward_slashes() -> TestResult {
    init_tracing();
    let root = Path::new("/project");

    assert_eq!(
        relative_str(root, &root.join("src").join("main.rs")),
        Some("src/main.rs".to_string())
    );
    Ok(())
}
