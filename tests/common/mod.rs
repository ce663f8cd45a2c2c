#![allow(dead_code)]

pub use conductor_test_utils::builders::{debounce, throttle, ConfigBuilder};
pub use conductor_test_utils::tasks;
pub use conductor_test_utils::{
    init_tracing, report_trace, resolver, resolver_with_fs, run_names, run_parallel, run_series,
    with_timeout,
};

pub type TestResult = Result<(), Box<dyn std::error::Error>>;

/// Owned names for `Resolver::resolve`.
pub fn names(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
