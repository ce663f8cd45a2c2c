// src/adaptor/control.rs

//! `@cb`: in-process control commands.
//!
//! - `noop`
//! - `sleep <n>(ms|s|m)`
//! - `fail [message]`
//! - `log <message>`

use std::sync::{Arc, LazyLock};
use std::time::Duration;

use anyhow::anyhow;
use regex::Regex;
use tracing::info;

use crate::adaptor::{Adaptor, AdaptorId};
use crate::config::Config;
use crate::exec::{Runnable, RunnableResult, TaskContext, TriggerContext};

static SLEEP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^sleep\s+(?P<n>\d+)\s*(?P<unit>ms|s|m)$").expect("valid sleep regex")
});

static FAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^fail(?:\s+(?P<msg>.+))?$").expect("valid fail regex"));

static LOG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^log\s+(?P<msg>.+)$").expect("valid log regex"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlCommand {
    Noop,
    Sleep(Duration),
    Fail(Option<String>),
    Log(String),
}

impl ControlCommand {
    pub fn parse(input: &str) -> Option<ControlCommand> {
        let input = input.trim();
        if input == "noop" {
            return Some(ControlCommand::Noop);
        }
        if let Some(caps) = SLEEP_RE.captures(input) {
            let n: u64 = caps["n"].parse().ok()?;
            let dur = match &caps["unit"] {
                "ms" => Duration::from_millis(n),
                "s" => Duration::from_secs(n),
                _ => Duration::from_secs(n.checked_mul(60)?),
            };
            return Some(ControlCommand::Sleep(dur));
        }
        if let Some(caps) = FAIL_RE.captures(input) {
            return Some(ControlCommand::Fail(
                caps.name("msg").map(|m| m.as_str().to_string()),
            ));
        }
        LOG_RE
            .captures(input)
            .map(|caps| ControlCommand::Log(caps["msg"].to_string()))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ControlAdaptor;

impl Adaptor for ControlAdaptor {
    fn id(&self) -> AdaptorId {
        AdaptorId::Control
    }

    fn validate(&self, command: &str, _config: &Config) -> bool {
        ControlCommand::parse(command).is_some()
    }

    fn create(&self, command: &str, _trigger: &TriggerContext) -> Arc<dyn Runnable> {
        let parsed = ControlCommand::parse(command).ok_or_else(|| command.trim().to_string());
        Arc::new(ControlRunnable { command: parsed })
    }
}

#[derive(Debug, Clone)]
pub struct ControlRunnable {
    /// `Err` holds the raw text of a command that did not parse.
    command: Result<ControlCommand, String>,
}

impl Runnable for ControlRunnable {
    fn run(&self, ctx: TaskContext) -> RunnableResult {
        let command = match &self.command {
            Ok(command) => command.clone(),
            Err(raw) => {
                let raw = raw.clone();
                return RunnableResult::future(async move {
                    Err(anyhow!("unknown control command '{raw}'"))
                });
            }
        };

        match command {
            ControlCommand::Noop => RunnableResult::ok(),
            ControlCommand::Sleep(dur) => RunnableResult::future(async move {
                tokio::time::sleep(dur).await;
                Ok(())
            }),
            ControlCommand::Fail(msg) => {
                let task = ctx.task_name;
                RunnableResult::future(async move {
                    Err(anyhow!(
                        msg.unwrap_or_else(|| format!("control task '{task}' failed"))
                    ))
                })
            }
            ControlCommand::Log(msg) => {
                info!(task = %ctx.task_name, "{msg}");
                RunnableResult::ok()
            }
        }
    }

    fn describe(&self) -> String {
        match &self.command {
            Ok(ControlCommand::Noop) => "@cb noop".to_string(),
            Ok(ControlCommand::Sleep(d)) => format!("@cb sleep {}ms", d.as_millis()),
            Ok(ControlCommand::Fail(Some(msg))) => format!("@cb fail {msg}"),
            Ok(ControlCommand::Fail(None)) => "@cb fail".to_string(),
            Ok(ControlCommand::Log(msg)) => format!("@cb log {msg}"),
            Err(raw) => format!("@cb {raw}"),
        }
    }
}
