// src/exec/mod.rs

//! Execution layer.
//!
//! - [`runnable`] defines the `Runnable` contract, the four completion
//!   conventions (`RunnableResult`) and the per-leaf `TaskContext`.
//! - [`process`] spawns OS processes with `tokio::process::Command` for the
//!   shell-like adaptors and script modules.
//! - [`script`] wraps an external module file as a `Runnable`.

pub mod process;
pub mod runnable;
pub mod script;

pub use process::ProcessSpec;
pub use runnable::{
    DoneReceiver, DoneSink, FnRunnable, Runnable, RunnableResult, TaskContext, Teardown,
    TriggerContext, TriggerReason,
};
pub use script::ScriptRunnable;
