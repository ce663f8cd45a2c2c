// src/sequence/mod.rs

//! Executable schedule compiled from resolved `Task` trees.
//!
//! The tree shape is immutable once built; per-run state lives in the
//! runtime's reports.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::exec::Runnable;

pub mod builder;

pub use builder::SequenceBuilder;

/// A leaf bound to a concrete runnable.
pub struct SequenceTask {
    /// Declared-order index within one build.
    pub seq_uid: usize,
    pub task_name: String,
    pub raw_input: String,
    pub subtask: Option<String>,
    pub options: toml::Table,
    pub env: BTreeMap<String, String>,
    pub skipped: bool,
    pub runnable: Arc<dyn Runnable>,
}

impl SequenceTask {
    /// `name` or `name:subtask`.
    pub fn label(&self) -> String {
        match &self.subtask {
            Some(sub) => format!("{}:{}", self.task_name, sub),
            None => self.task_name.clone(),
        }
    }
}

impl fmt::Debug for SequenceTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SequenceTask")
            .field("seq_uid", &self.seq_uid)
            .field("task_name", &self.task_name)
            .field("subtask", &self.subtask)
            .field("skipped", &self.skipped)
            .field("runnable", &self.runnable.describe())
            .finish()
    }
}

#[derive(Debug, Clone, Default)]
pub struct SequenceGroup {
    /// Name of the task that produced the group.
    pub name: String,
    pub items: Vec<SequenceItem>,
}

#[derive(Debug, Clone)]
pub enum SequenceItem {
    Task(Arc<SequenceTask>),
    SeriesGroup(SequenceGroup),
    ParallelGroup(SequenceGroup),
}

impl SequenceItem {
    /// Leaves in declared order.
    pub fn leaves(&self) -> Vec<&Arc<SequenceTask>> {
        match self {
            SequenceItem::Task(task) => vec![task],
            SequenceItem::SeriesGroup(group) | SequenceItem::ParallelGroup(group) => {
                group.items.iter().flat_map(SequenceItem::leaves).collect()
            }
        }
    }
}

/// Leaves of a whole sequence, in declared order.
pub fn leaves(items: &[SequenceItem]) -> Vec<&Arc<SequenceTask>> {
    items.iter().flat_map(SequenceItem::leaves).collect()
}
