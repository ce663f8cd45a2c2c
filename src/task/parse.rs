// src/task/parse.rs

//! Task-name grammar: `name(:subtask)*(@flags)?`, or an adaptor invocation
//! `@sigil command…`.

use std::sync::LazyLock;

use regex::Regex;
use tracing::warn;

use crate::task::error::TaskError;

static NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<name>[^:@\s]+)(?P<subs>(?::[^:@\s]*)*)(?:@(?P<flags>[^@\s]*))?$")
        .expect("valid task name regex")
});

pub const WILDCARD: &str = "*";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskInput {
    /// `@sh echo hi` → sigil `@sh`, command `echo hi`.
    Adaptor { sigil: String, command: String },
    Named(ParsedName),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedName {
    pub task_name: String,
    pub sub_task_names: Vec<String>,
    pub flags: Option<String>,
}

impl ParsedName {
    pub fn is_parallel(&self) -> bool {
        self.flags.as_deref().is_some_and(|f| f.contains('p'))
    }

    pub fn has_wildcard(&self) -> bool {
        self.sub_task_names.iter().any(|s| s == WILDCARD)
    }
}

pub fn parse_input(raw: &str) -> Result<TaskInput, TaskError> {
    let input = raw.trim();
    if input.is_empty() {
        return Err(TaskError::invalid(raw, "task name is empty"));
    }

    if input.starts_with('@') {
        let (sigil, command) = match input.split_once(char::is_whitespace) {
            Some((sigil, rest)) => (sigil, rest.trim()),
            None => (input, ""),
        };
        return Ok(TaskInput::Adaptor {
            sigil: sigil.to_string(),
            command: command.to_string(),
        });
    }

    let Some(caps) = NAME_RE.captures(input) else {
        let reason = if input.starts_with(':') {
            "name segment is empty"
        } else {
            "does not match name(:subtask)*(@flags)?"
        };
        return Err(TaskError::invalid(raw, reason));
    };

    let task_name = caps["name"].to_string();

    let sub_task_names: Vec<String> = caps
        .name("subs")
        .map(|m| m.as_str())
        .filter(|s| !s.is_empty())
        .map(|s| s.split(':').skip(1).map(str::to_string).collect())
        .unwrap_or_default();
    if sub_task_names.iter().any(String::is_empty) {
        return Err(TaskError::SubtaskNotProvided { task: task_name });
    }

    let flags = caps.name("flags").map(|m| m.as_str().to_string());
    if let Some(flags) = &flags {
        if flags.is_empty() {
            return Err(TaskError::FlagNotProvided { task: task_name });
        }
        for flag in flags.chars().filter(|c| *c != 'p') {
            warn!(task = %task_name, %flag, "ignoring unknown task flag");
        }
    }

    Ok(TaskInput::Named(ParsedName {
        task_name,
        sub_task_names,
        flags,
    }))
}

/// Best-effort task name for inputs that failed to parse.
pub(crate) fn guess_task_name(raw: &str) -> String {
    raw.trim()
        .split([':', '@'])
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or(raw.trim())
        .to_string()
}
