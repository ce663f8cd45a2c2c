// src/adaptor/shell.rs

use std::sync::Arc;

use crate::adaptor::{Adaptor, AdaptorId};
use crate::config::Config;
use crate::exec::process::{run_to_completion, spawn_detached};
use crate::exec::{ProcessSpec, Runnable, RunnableResult, TaskContext, TriggerContext};

/// `@sh` and `@bg`: a command line run through the platform shell.
#[derive(Debug, Clone, Copy)]
pub struct ShellAdaptor {
    background: bool,
}

impl ShellAdaptor {
    pub fn foreground() -> Self {
        Self { background: false }
    }

    pub fn background() -> Self {
        Self { background: true }
    }
}

impl Adaptor for ShellAdaptor {
    fn id(&self) -> AdaptorId {
        if self.background {
            AdaptorId::BackgroundShell
        } else {
            AdaptorId::Shell
        }
    }

    fn validate(&self, command: &str, _config: &Config) -> bool {
        !command.trim().is_empty()
    }

    fn create(&self, command: &str, _trigger: &TriggerContext) -> Arc<dyn Runnable> {
        Arc::new(ShellRunnable {
            command: command.trim().to_string(),
            background: self.background,
        })
    }
}

#[derive(Debug, Clone)]
pub struct ShellRunnable {
    command: String,
    background: bool,
}

impl Runnable for ShellRunnable {
    fn run(&self, ctx: TaskContext) -> RunnableResult {
        let spec = ProcessSpec::shell(&self.command, &ctx);
        if self.background {
            spawn_detached(spec, ctx.done)
        } else {
            run_to_completion(spec, ctx.done)
        }
    }

    fn describe(&self) -> String {
        if self.background {
            format!("@bg {}", self.command)
        } else {
            format!("@sh {}", self.command)
        }
    }
}
