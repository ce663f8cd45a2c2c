// src/engine/mod.rs

//! Execution runtime.
//!
//! [`runtime`] interprets a `SequenceItem` tree: series groups run one item
//! at a time and halt on the first error, parallel groups start every item
//! together. Each leaf produces `start` then `end`/`error` reports over a
//! [`ReportStream`]; the final [`RunSummary`] carries per-leaf stats in
//! declared order.
//!
//! [`teardown`] keeps the cancellation hooks of in-flight leaves.

pub mod report;
pub mod runtime;
pub mod teardown;

pub use report::{ItemStats, LeafResult, Report, ReportKind, RunSummary};
pub use runtime::{ReportStream, RunOptions, Runtime};
pub use teardown::{TeardownKey, Teardowns};
