// src/adaptor/npm.rs

//! Adaptors for project-local tooling: `npm run <script>` and the configured
//! build tool (`grunt` by default).

use std::sync::Arc;

use crate::adaptor::{Adaptor, AdaptorId};
use crate::config::Config;
use crate::exec::process::run_to_completion;
use crate::exec::{ProcessSpec, Runnable, RunnableResult, TaskContext, TriggerContext};

#[derive(Debug, Clone, Copy, Default)]
pub struct NpmAdaptor;

impl Adaptor for NpmAdaptor {
    fn id(&self) -> AdaptorId {
        AdaptorId::NpmScript
    }

    /// A script name is required and must not look like an npm flag.
    fn validate(&self, command: &str, _config: &Config) -> bool {
        command
            .split_whitespace()
            .next()
            .is_some_and(|script| !script.starts_with('-'))
    }

    fn create(&self, command: &str, _trigger: &TriggerContext) -> Arc<dyn Runnable> {
        Arc::new(ToolRunnable {
            id: AdaptorId::NpmScript,
            command_line: format!("npm run {}", command.trim()),
        })
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BuildToolAdaptor;

impl Adaptor for BuildToolAdaptor {
    fn id(&self) -> AdaptorId {
        AdaptorId::ExternalBuildTool
    }

    fn validate(&self, command: &str, config: &Config) -> bool {
        !command.trim().is_empty() && !config.config.build_tool.trim().is_empty()
    }

    fn create(&self, command: &str, trigger: &TriggerContext) -> Arc<dyn Runnable> {
        Arc::new(ToolRunnable {
            id: AdaptorId::ExternalBuildTool,
            command_line: format!("{} {}", trigger.config.config.build_tool, command.trim()),
        })
    }
}

#[derive(Debug, Clone)]
pub struct ToolRunnable {
    id: AdaptorId,
    command_line: String,
}

impl Runnable for ToolRunnable {
    fn run(&self, ctx: TaskContext) -> RunnableResult {
        let spec = ProcessSpec::shell(&self.command_line, &ctx);
        run_to_completion(spec, ctx.done)
    }

    fn describe(&self) -> String {
        format!("{} {}", self.id.sigil(), self.command_line)
    }
}
