// src/sequence/builder.rs

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use crate::adaptor::AdaptorRegistry;
use crate::errors::{ConductorError, Result};
use crate::exec::{FnRunnable, Runnable, ScriptRunnable, TriggerContext};
use crate::options::{layered, layered_env};
use crate::sequence::{SequenceGroup, SequenceItem, SequenceTask};
use crate::task::{Task, TaskBinding};

/// Compiles valid `Task` trees into `SequenceItem` trees.
#[derive(Debug, Clone)]
pub struct SequenceBuilder {
    adaptors: Arc<AdaptorRegistry>,
    trigger: TriggerContext,
}

/// What a node inherits from its ancestors.
#[derive(Debug, Clone, Default)]
struct Scope {
    options: toml::Table,
    env: BTreeMap<String, String>,
    skipped: bool,
}

#[derive(Debug, Default)]
struct BuildState {
    next_uid: usize,
}

impl BuildState {
    fn next_uid(&mut self) -> usize {
        let uid = self.next_uid;
        self.next_uid += 1;
        uid
    }
}

impl SequenceBuilder {
    pub fn new(adaptors: Arc<AdaptorRegistry>, trigger: TriggerContext) -> Self {
        Self { adaptors, trigger }
    }

    pub fn build(&self, tasks: &[Task]) -> Result<Vec<SequenceItem>> {
        let invalid: Vec<String> = tasks
            .iter()
            .filter(|t| !t.valid)
            .map(|t| t.raw_input.clone())
            .collect();
        if !invalid.is_empty() {
            return Err(ConductorError::InvalidTasks(invalid));
        }

        let mut state = BuildState::default();
        let mut items = Vec::new();
        for task in tasks {
            items.extend(self.build_task(task, &Scope::default(), &mut state)?);
        }
        debug!(leaves = state.next_uid, "built sequence");
        Ok(items)
    }

    /// One item per subtask (or one item when there are none).
    fn build_task(
        &self,
        task: &Task,
        scope: &Scope,
        state: &mut BuildState,
    ) -> Result<Vec<SequenceItem>> {
        let env = layered_env(&scope.env, &task.env);
        let skipped = scope.skipped || task.skipped;

        if task.subtasks.is_empty() {
            let options = layered([&task.options, &scope.options]);
            let child_scope = Scope {
                options: scope.options.clone(),
                env: env.clone(),
                skipped,
            };
            let item = self.build_body(task, None, options, &child_scope, state)?;
            return Ok(vec![item]);
        }

        let mut items = Vec::with_capacity(task.subtasks.len());
        for sub in &task.subtasks {
            let options = layered([&task.options, &sub.options, &scope.options]);
            let child_scope = Scope {
                options: layered([&sub.options, &scope.options]),
                env: env.clone(),
                skipped,
            };
            items.push(self.build_body(task, Some(&sub.name), options, &child_scope, state)?);
        }

        if task.run_mode.is_parallel() && items.len() > 1 {
            return Ok(vec![SequenceItem::ParallelGroup(SequenceGroup {
                name: task.task_name.clone(),
                items,
            })]);
        }
        Ok(items)
    }

    fn build_body(
        &self,
        task: &Task,
        subtask: Option<&String>,
        options: toml::Table,
        scope: &Scope,
        state: &mut BuildState,
    ) -> Result<SequenceItem> {
        let leaf = |runnable: Arc<dyn Runnable>, state: &mut BuildState| {
            SequenceItem::Task(Arc::new(SequenceTask {
                seq_uid: state.next_uid(),
                task_name: task.task_name.clone(),
                raw_input: task.raw_input.clone(),
                subtask: subtask.cloned(),
                options: options.clone(),
                env: scope.env.clone(),
                skipped: scope.skipped,
                runnable,
            }))
        };

        match &task.binding {
            Some(TaskBinding::Adaptor { id, command }) => {
                let runnable = self.adaptors.create(*id, command, &self.trigger)?;
                Ok(leaf(runnable, state))
            }
            Some(TaskBinding::Inline(f)) => Ok(leaf(Arc::new(FnRunnable::new(f.clone())), state)),
            Some(TaskBinding::Module(module)) if !module.is_dir => {
                Ok(leaf(Arc::new(ScriptRunnable::new(&module.path)), state))
            }
            Some(TaskBinding::Module(module)) => {
                // Directory modules always run in file-name order.
                let items = module
                    .entries
                    .iter()
                    .map(|entry| leaf(Arc::new(ScriptRunnable::new(entry)), state))
                    .collect();
                Ok(SequenceItem::SeriesGroup(SequenceGroup {
                    name: task.task_name.clone(),
                    items,
                }))
            }
            None => {
                let mut items = Vec::new();
                for child in &task.children {
                    items.extend(self.build_task(child, scope, state)?);
                }
                let group = SequenceGroup {
                    name: task.task_name.clone(),
                    items,
                };
                Ok(if task.run_mode.is_parallel() {
                    SequenceItem::ParallelGroup(group)
                } else {
                    SequenceItem::SeriesGroup(group)
                })
            }
        }
    }
}
