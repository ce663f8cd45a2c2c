// tests/process_adaptors.rs
//
// These spawn real `sh` processes.
#![cfg(unix)]

mod common;

use std::path::Path;
use std::sync::Arc;

use conductor::adaptor::AdaptorRegistry;
use conductor::config::Config;
use conductor::engine::{ReportKind, RunOptions, RunSummary, Runtime};
use conductor::exec::TriggerContext;
use conductor::fs::RealFileSystem;
use conductor::sequence::SequenceBuilder;
use conductor::task::Resolver;

use crate::common::{init_tracing, names, with_timeout, ConfigBuilder, TestResult};

fn real_resolver(config: Config) -> Resolver {
    Resolver::new(
        Arc::new(config),
        Arc::new(AdaptorRegistry::with_defaults()),
        Arc::new(RealFileSystem),
    )
}

async fn run(resolver: &Resolver, tasks: &[&str]) -> Result<RunSummary, Box<dyn std::error::Error>> {
    let resolution = resolver.resolve(&names(tasks));
    if !resolution.is_valid() {
        return Err(format!("unresolved: {:?}", resolution.errors()).into());
    }
    let trigger = TriggerContext::command(Arc::clone(resolver.config()));
    let sequence =
        SequenceBuilder::new(Arc::clone(resolver.adaptors()), trigger.clone()).build(&resolution.valid)?;
    let summary = Runtime::new(sequence, trigger, RunOptions::default())
        .series()
        .summary()
        .await?;
    Ok(summary)
}

fn write_script(dir: &Path, rel: &str, body: &str) -> std::io::Result<()> {
    let path = dir.join(rel);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, body)
}

#[tokio::test]
async fn shell_exit_status_decides_the_outcome() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let resolver = real_resolver(ConfigBuilder::new().cwd(dir.path()).build());

    let ok = with_timeout(run(&resolver, &["@sh exit 0"])).await?;
    assert!(ok.is_success());

    let failed = with_timeout(run(&resolver, &["@sh exit 3"])).await?;
    assert!(!failed.is_success());
    let error = failed.errors()[0].to_string();
    assert!(error.contains("exited with code 3"), "unexpected error: {error}");
    Ok(())
}

#[tokio::test]
async fn shell_runs_in_the_configured_directory_with_config_env() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let config = ConfigBuilder::new()
        .cwd(dir.path())
        .env("GREETING", "hello")
        .list("greet", &["@sh printf '%s' \"$GREETING\" > greeting.txt"])
        .build();
    let resolver = real_resolver(config);

    let summary = with_timeout(run(&resolver, &["greet"])).await?;

    assert!(summary.is_success(), "{:?}", summary.errors());
    assert_eq!(std::fs::read_to_string(dir.path().join("greeting.txt"))?, "hello");
    Ok(())
}

#[tokio::test]
async fn script_modules_receive_task_metadata() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    write_script(
        dir.path(),
        "tasks/stamp.sh",
        "printf '%s %s' \"$CONDUCTOR_TASK\" \"$CONDUCTOR_SUBTASK\" > stamp.txt\n",
    )?;
    let mut table = toml::Table::new();
    table.insert("level".to_string(), toml::Value::Integer(2));
    let config = ConfigBuilder::new()
        .cwd(dir.path())
        .subtask("stamp", "release", table)
        .build();
    let resolver = real_resolver(config);

    let summary = with_timeout(run(&resolver, &["stamp:release"])).await?;

    assert!(summary.is_success(), "{:?}", summary.errors());
    assert_eq!(
        std::fs::read_to_string(dir.path().join("stamp.txt"))?,
        "stamp release"
    );
    Ok(())
}

#[tokio::test]
async fn directory_modules_stop_at_the_first_failing_script() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    write_script(dir.path(), "tasks/deploy/01-build.sh", "touch built\n")?;
    write_script(dir.path(), "tasks/deploy/02-check.sh", "exit 1\n")?;
    write_script(dir.path(), "tasks/deploy/03-upload.sh", "touch uploaded\n")?;
    let resolver = real_resolver(ConfigBuilder::new().cwd(dir.path()).build());

    let summary = with_timeout(run(&resolver, &["deploy"])).await?;

    assert_eq!(summary.failed(), 1);
    assert_eq!(summary.skipped(), 1);
    assert!(dir.path().join("built").exists());
    assert!(!dir.path().join("uploaded").exists());
    Ok(())
}

#[tokio::test]
async fn background_processes_outlive_their_leaf_until_torn_down() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let resolver = real_resolver(ConfigBuilder::new().cwd(dir.path()).build());

    let resolution = resolver.resolve(&names(&["@bg sleep 30"]));
    let trigger = TriggerContext::command(Arc::clone(resolver.config()));
    let sequence =
        SequenceBuilder::new(Arc::clone(resolver.adaptors()), trigger.clone()).build(&resolution.valid)?;

    let stream = Runtime::new(sequence, trigger, RunOptions::default()).series();
    let teardowns = stream.teardowns().clone();
    let (reports, summary) = with_timeout(stream.finish()).await?;

    assert!(summary.is_success());
    assert_eq!(reports.last().map(|r| r.kind()), Some(ReportKind::End));
    assert_eq!(teardowns.len(), 1);
    assert_eq!(teardowns.run_all(), 1);
    assert!(teardowns.is_empty());
    Ok(())
}

#[tokio::test]
async fn cancelling_a_shell_leaf_kills_the_process() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let resolver = real_resolver(ConfigBuilder::new().cwd(dir.path()).build());

    let resolution = resolver.resolve(&names(&["@sh sleep 30"]));
    let trigger = TriggerContext::command(Arc::clone(resolver.config()));
    let sequence =
        SequenceBuilder::new(Arc::clone(resolver.adaptors()), trigger.clone()).build(&resolution.valid)?;

    let stream = Runtime::new(sequence, trigger, RunOptions::default()).series();
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;
    assert_eq!(stream.cancel(), 1);

    let (_, summary) = with_timeout(stream.finish()).await?;
    assert_eq!(summary.failed(), 1);
    assert!(summary.errors()[0].to_string().contains("cancelled"));
    Ok(())
}

#[tokio::test]
async fn shell_finds_tools_in_the_project_bin_dir() -> TestResult {
    use std::os::unix::fs::PermissionsExt;

    init_tracing();
    let dir = tempfile::tempdir()?;
    write_script(dir.path(), "node_modules/.bin/localtool", "#!/bin/sh\ntouch tool-ran\n")?;
    let tool = dir.path().join("node_modules/.bin/localtool");
    std::fs::set_permissions(&tool, std::fs::Permissions::from_mode(0o755))?;
    let resolver = real_resolver(ConfigBuilder::new().cwd(dir.path()).build());

    let summary = with_timeout(run(&resolver, &["@sh localtool"])).await?;

    assert!(summary.is_success(), "{:?}", summary.errors());
    assert!(dir.path().join("tool-ran").exists());
    Ok(())
}

#[tokio::test]
async fn configured_path_is_kept_behind_the_bin_dir() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let config = ConfigBuilder::new()
        .cwd(dir.path())
        .env("PATH", "/opt/custom/bin:/usr/bin:/bin")
        .build();
    let resolver = real_resolver(config);

    let summary = with_timeout(run(&resolver, &["@sh printf '%s' \"$PATH\" > path.txt"])).await?;

    assert!(summary.is_success(), "{:?}", summary.errors());
    let seen = std::fs::read_to_string(dir.path().join("path.txt"))?;
    let bin_dir = dir.path().join("node_modules/.bin");
    assert_eq!(seen, format!("{}:/opt/custom/bin:/usr/bin:/bin", bin_dir.display()));
    Ok(())
}
