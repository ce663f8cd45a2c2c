pub mod builders;
pub mod tasks;

use std::sync::{Arc, Once};

use conductor::adaptor::AdaptorRegistry;
use conductor::config::Config;
use conductor::engine::{Report, ReportKind, RunOptions, RunSummary, Runtime};
use conductor::exec::TriggerContext;
use conductor::fs::mock::MockFileSystem;
use conductor::sequence::SequenceBuilder;
use conductor::task::Resolver;
use conductor::types::RunMode;
use tracing_subscriber::{fmt, EnvFilter};

static INIT: Once = Once::new();

/// Initialise tracing for tests.
///
/// - Uses `with_test_writer()`, so logs are captured per-test.
/// - The Rust test harness only prints captured output for **failing** tests
///   (unless you run with `-- --nocapture`).
///
/// Enable levels with e.g.:
/// `RUST_LOG=debug cargo test`
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer() // print only for failing tests unless --nocapture
            .with_target(true)
            .init();
    });
}

/// Run a future with a 5-second timeout.
#[allow(dead_code)]
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: std::future::Future<Output = T>,
{
    tokio::time::timeout(std::time::Duration::from_secs(5), f)
        .await
        .expect("Test timed out after 5 seconds")
}

/// Resolver over an empty in-memory filesystem.
pub fn resolver(config: Config) -> Arc<Resolver> {
    resolver_with_fs(config, MockFileSystem::new())
}

pub fn resolver_with_fs(config: Config, fs: MockFileSystem) -> Arc<Resolver> {
    Arc::new(Resolver::new(
        Arc::new(config),
        Arc::new(AdaptorRegistry::with_defaults()),
        Arc::new(fs),
    ))
}

/// Resolve, build and run `names`; panics if anything fails to resolve.
pub async fn run_names(
    resolver: &Resolver,
    names: &[&str],
    mode: RunMode,
    options: RunOptions,
) -> (Vec<Report>, RunSummary) {
    let names: Vec<String> = names.iter().map(|s| s.to_string()).collect();
    let resolution = resolver.resolve(&names);
    assert!(
        resolution.is_valid(),
        "tasks failed to resolve: {:?}",
        resolution.errors()
    );

    let trigger = TriggerContext::command(Arc::clone(resolver.config()));
    let sequence = SequenceBuilder::new(Arc::clone(resolver.adaptors()), trigger.clone())
        .build(&resolution.valid)
        .expect("sequence should build");

    Runtime::new(sequence, trigger, options)
        .start(mode)
        .finish()
        .await
        .expect("run should complete")
}

pub async fn run_series(resolver: &Resolver, names: &[&str]) -> (Vec<Report>, RunSummary) {
    run_names(resolver, names, RunMode::Series, RunOptions::default()).await
}

pub async fn run_parallel(resolver: &Resolver, names: &[&str]) -> (Vec<Report>, RunSummary) {
    run_names(resolver, names, RunMode::Parallel, RunOptions::default()).await
}

/// `(label, kind)` for each report, in emission order.
pub fn report_trace(reports: &[Report]) -> Vec<(String, ReportKind)> {
    reports
        .iter()
        .map(|r| (r.item().label(), r.kind()))
        .collect()
}
