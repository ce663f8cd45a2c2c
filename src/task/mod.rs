// src/task/mod.rs

//! Task resolution: raw task-name strings become validated `Task` trees.
//!
//! - [`parse`] implements the name grammar.
//! - [`module`] finds external modules on disk.
//! - [`resolver`] expands aliases against config, fans out subtasks and
//!   detects cycles.

use std::collections::BTreeMap;

use crate::adaptor::AdaptorId;
use crate::config::InlineTask;
use crate::types::RunMode;

pub mod error;
pub mod module;
pub mod parse;
pub mod resolver;

pub use error::TaskError;
pub use module::{ExternalModule, ModuleLookup, ModuleResolver};
pub use parse::{parse_input, ParsedName, TaskInput};
pub use resolver::Resolver;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    ExternalModule,
    InlineFunction,
    Adaptor,
    TaskGroup,
}

/// What a leaf runs.
#[derive(Debug, Clone)]
pub enum TaskBinding {
    Adaptor { id: AdaptorId, command: String },
    Module(ExternalModule),
    Inline(InlineTask),
}

/// One expanded subtask with its own options table.
#[derive(Debug, Clone, PartialEq)]
pub struct Subtask {
    pub name: String,
    pub options: toml::Table,
}

/// A node of the resolved dependency tree.
#[derive(Debug, Clone)]
pub struct Task {
    pub raw_input: String,
    pub task_name: String,
    /// Subtask segments as written (may be `["*"]`).
    pub sub_task_names: Vec<String>,
    /// Expanded subtasks, in declared order.
    pub subtasks: Vec<Subtask>,
    pub kind: TaskKind,
    pub run_mode: RunMode,
    pub children: Vec<Task>,
    pub options: toml::Table,
    pub env: BTreeMap<String, String>,
    pub errors: Vec<TaskError>,
    pub valid: bool,
    pub skipped: bool,
    pub description: Option<String>,
    pub binding: Option<TaskBinding>,
}

impl Task {
    pub(crate) fn new(raw_input: impl Into<String>, task_name: impl Into<String>, kind: TaskKind) -> Self {
        Self {
            raw_input: raw_input.into(),
            task_name: task_name.into(),
            sub_task_names: Vec::new(),
            subtasks: Vec::new(),
            kind,
            run_mode: RunMode::Series,
            children: Vec::new(),
            options: toml::Table::new(),
            env: BTreeMap::new(),
            errors: Vec::new(),
            valid: false,
            skipped: false,
            description: None,
            binding: None,
        }
    }

    pub(crate) fn invalid(raw_input: &str, task_name: impl Into<String>, error: TaskError) -> Self {
        let mut task = Task::new(raw_input, task_name, TaskKind::TaskGroup);
        task.errors.push(error);
        task
    }

    pub fn is_leaf(&self) -> bool {
        self.binding.is_some()
    }

    /// Errors on this node and every descendant, depth first.
    pub fn all_errors(&self) -> Vec<&TaskError> {
        let mut out: Vec<&TaskError> = self.errors.iter().collect();
        for child in &self.children {
            out.extend(child.all_errors());
        }
        out
    }

    /// Recompute `valid` from this node's binding, errors and children.
    pub(crate) fn settle(&mut self) {
        if self.errors.is_empty() && self.binding.is_none() && self.children.is_empty() {
            self.errors.push(TaskError::invalid(
                self.raw_input.clone(),
                "task has nothing to run",
            ));
        }
        self.valid = self.errors.is_empty()
            && (self.binding.is_some() || self.children.iter().all(|c| c.valid));
    }
}

/// Result of resolving a list of names, partitioned by validity.
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    pub valid: Vec<Task>,
    pub invalid: Vec<Task>,
}

impl Resolution {
    pub fn is_valid(&self) -> bool {
        self.invalid.is_empty()
    }

    pub fn errors(&self) -> Vec<&TaskError> {
        self.invalid.iter().flat_map(Task::all_errors).collect()
    }

    pub fn invalid_names(&self) -> Vec<String> {
        self.invalid.iter().map(|t| t.raw_input.clone()).collect()
    }
}
