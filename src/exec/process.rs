// src/exec/process.rs

//! OS process spawning shared by the shell-like adaptors and external
//! script modules.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use anyhow::{anyhow, bail, Context, Result};
use tokio::process::{Child, Command};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::exec::runnable::{DoneSink, RunnableResult, TaskContext, Teardown};

/// What to spawn and with which environment.
#[derive(Debug, Clone)]
pub struct ProcessSpec {
    /// Used in logs and error messages.
    pub label: String,
    pub program: OsString,
    pub args: Vec<OsString>,
    pub cwd: PathBuf,
    pub env: BTreeMap<String, String>,
    /// Project-local tool directory, prepended to `PATH`.
    pub local_bin: PathBuf,
}

impl ProcessSpec {
    /// Run `command` through the platform shell.
    pub fn shell(command: &str, ctx: &TaskContext) -> Self {
        let (program, flag) = if cfg!(windows) {
            ("cmd", "/C")
        } else {
            ("sh", "-c")
        };
        Self {
            label: command.to_string(),
            program: program.into(),
            args: vec![flag.into(), command.into()],
            cwd: ctx.trigger.cwd.clone(),
            env: merged_env(ctx),
            local_bin: local_bin(ctx),
        }
    }

    /// Run a script file with `sh`, exposing task metadata in its
    /// environment.
    pub fn script(path: &Path, ctx: &TaskContext) -> Self {
        let mut env = merged_env(ctx);
        env.insert("CONDUCTOR_TASK".to_string(), ctx.task_name.clone());
        if let Some(sub) = &ctx.subtask {
            env.insert("CONDUCTOR_SUBTASK".to_string(), sub.clone());
        }
        match toml::to_string(&ctx.options) {
            Ok(options) => {
                env.insert("CONDUCTOR_OPTIONS".to_string(), options);
            }
            Err(err) => warn!(
                task = %ctx.task_name,
                error = %err,
                "could not serialise task options for script environment"
            ),
        }
        Self {
            label: path.display().to_string(),
            program: "sh".into(),
            args: vec![path.as_os_str().to_owned()],
            cwd: ctx.trigger.cwd.clone(),
            env,
            local_bin: local_bin(ctx),
        }
    }

    fn command(&self) -> Result<Command> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .current_dir(&self.cwd)
            .envs(&self.env)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        // A PATH from `[env]` or the task replaces the inherited one.
        let base = match self.env.get("PATH") {
            Some(path) => OsString::from(path),
            None => std::env::var_os("PATH").unwrap_or_default(),
        };
        let paths = std::iter::once(self.local_bin.clone()).chain(std::env::split_paths(&base));
        let joined = std::env::join_paths(paths)
            .with_context(|| format!("building PATH with {:?}", self.local_bin))?;
        cmd.env("PATH", joined);
        Ok(cmd)
    }

    fn spawn(&self, kill_on_drop: bool) -> Result<Child> {
        let mut cmd = self.command()?;
        cmd.kill_on_drop(kill_on_drop);
        cmd.spawn()
            .with_context(|| format!("spawning process for '{}'", self.label))
    }
}

/// `[env]` from config, then task-local overrides.
fn merged_env(ctx: &TaskContext) -> BTreeMap<String, String> {
    let mut env = ctx.trigger.config.env.clone();
    env.extend(ctx.env.iter().map(|(k, v)| (k.clone(), v.clone())));
    env
}

fn local_bin(ctx: &TaskContext) -> PathBuf {
    ctx.trigger.cwd.join(&ctx.trigger.config.config.bin_dir)
}

/// Spawn the process and complete `done` when it exits.
///
/// The returned teardown kills the child if it is still running; the leaf
/// then fails with a cancellation error.
pub fn run_to_completion(spec: ProcessSpec, done: DoneSink) -> RunnableResult {
    let (cancel_tx, cancel_rx) = oneshot::channel::<()>();

    tokio::spawn(async move {
        let result = wait_or_cancel(&spec, cancel_rx).await;
        done.done(result);
    });

    RunnableResult::Cancelable(Teardown::new(move || {
        // Err means the process already finished.
        let _ = cancel_tx.send(());
        Ok(())
    }))
}

async fn wait_or_cancel(spec: &ProcessSpec, mut cancel_rx: oneshot::Receiver<()>) -> Result<()> {
    info!(cmd = %spec.label, cwd = ?spec.cwd, "starting process");
    let mut child = spec.spawn(true)?;

    tokio::select! {
        status_res = child.wait() => {
            let status = status_res
                .with_context(|| format!("waiting for process '{}'", spec.label))?;
            let code = status.code().unwrap_or(-1);
            debug!(cmd = %spec.label, exit_code = code, "process exited");
            if !status.success() {
                bail!("command '{}' exited with code {}", spec.label, code);
            }
            Ok(())
        }

        cancel = &mut cancel_rx => {
            if cancel.is_ok() {
                info!(cmd = %spec.label, "cancellation requested; killing process");
                if let Err(e) = child.kill().await {
                    warn!(cmd = %spec.label, error = %e, "failed to kill child process");
                }
            }
            Err(anyhow!("command '{}' was cancelled", spec.label))
        }
    }
}

/// Spawn the process and complete `done` immediately.
///
/// The child keeps running after the leaf completes; the returned teardown
/// outlives the leaf and kills it on interruption.
pub fn spawn_detached(spec: ProcessSpec, done: DoneSink) -> RunnableResult {
    info!(cmd = %spec.label, cwd = ?spec.cwd, "starting background process");
    let mut child = match spec.spawn(false) {
        Ok(child) => child,
        Err(err) => {
            done.fail(err);
            return RunnableResult::Callback;
        }
    };
    let pid = child.id();
    let (cancel_tx, cancel_rx) = oneshot::channel::<()>();
    let label = spec.label;

    tokio::spawn(async move {
        tokio::select! {
            status = child.wait() => {
                debug!(cmd = %label, ?pid, ?status, "background process exited");
            }
            cancel = cancel_rx => {
                if cancel.is_ok() {
                    info!(cmd = %label, ?pid, "stopping background process");
                    if let Err(e) = child.kill().await {
                        warn!(cmd = %label, error = %e, "failed to kill background process");
                    }
                }
            }
        }
    });

    done.ok();
    RunnableResult::Cancelable(Teardown::outliving(move || {
        let _ = cancel_tx.send(());
        Ok(())
    }))
}
