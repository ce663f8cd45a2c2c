// src/exec/script.rs

use std::path::PathBuf;

use crate::exec::process::{run_to_completion, ProcessSpec};
use crate::exec::runnable::{Runnable, RunnableResult, TaskContext};

/// Runs one external module script with `sh`.
#[derive(Debug, Clone)]
pub struct ScriptRunnable {
    path: PathBuf,
}

impl ScriptRunnable {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

impl Runnable for ScriptRunnable {
    fn run(&self, ctx: TaskContext) -> RunnableResult {
        let spec = ProcessSpec::script(&self.path, &ctx);
        run_to_completion(spec, ctx.done)
    }

    fn describe(&self) -> String {
        format!("module {}", self.path.display())
    }
}
