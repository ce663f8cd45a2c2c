// src/task/error.rs

use std::path::PathBuf;

use thiserror::Error;

/// Resolution problems, collected on the `Task` node they concern.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    #[error("task '{task}' was not found in config or on disk")]
    TaskNotFound { task: String },

    #[error("module for task '{task}' was not found at {path:?}")]
    ModuleNotFound { task: String, path: PathBuf },

    #[error("subtask '{subtask}' of task '{task}' has no options table")]
    SubtaskNotFound { task: String, subtask: String },

    #[error("task '{task}' has an empty subtask name")]
    SubtaskNotProvided { task: String },

    #[error("task '{task}' uses '*' but has no subtasks configured")]
    SubtasksNotInConfig { task: String },

    #[error("task '{task}' mixes '*' with named subtasks")]
    SubtaskWildcardNotAvailable { task: String },

    #[error("adaptor '{adaptor}' used by '{task}' does not exist")]
    AdaptorNotFound { task: String, adaptor: String },

    #[error("task '{task}' has '@' but no flags")]
    FlagNotProvided { task: String },

    #[error("invalid task input '{task}': {reason}")]
    InvalidTaskInput { task: String, reason: String },

    #[error("circular reference for task '{task}': {}", .chain.join(" -> "))]
    CircularReference { task: String, chain: Vec<String> },
}

impl TaskError {
    /// Name (or raw input) of the offending task.
    pub fn task(&self) -> &str {
        match self {
            TaskError::TaskNotFound { task }
            | TaskError::ModuleNotFound { task, .. }
            | TaskError::SubtaskNotFound { task, .. }
            | TaskError::SubtaskNotProvided { task }
            | TaskError::SubtasksNotInConfig { task }
            | TaskError::SubtaskWildcardNotAvailable { task }
            | TaskError::AdaptorNotFound { task, .. }
            | TaskError::FlagNotProvided { task }
            | TaskError::InvalidTaskInput { task, .. }
            | TaskError::CircularReference { task, .. } => task,
        }
    }

    pub(crate) fn invalid(task: impl Into<String>, reason: impl Into<String>) -> Self {
        TaskError::InvalidTaskInput {
            task: task.into(),
            reason: reason.into(),
        }
    }
}
