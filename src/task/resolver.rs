// src/task/resolver.rs

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, warn};

use crate::adaptor::AdaptorRegistry;
use crate::config::{Config, TaskDefinition, TaskItem};
use crate::fs::FileSystem;
use crate::options::deep_merge;
use crate::task::module::{ModuleLookup, ModuleResolver};
use crate::task::parse::{guess_task_name, parse_input, ParsedName, TaskInput};
use crate::task::{Resolution, Subtask, Task, TaskBinding, TaskError, TaskKind};
use crate::types::RunMode;

/// State of one resolution walk.
#[derive(Debug, Default)]
struct Walk {
    /// Keyed by raw input.
    visits: HashMap<String, Visit>,
    /// Task names from the root to the node being resolved.
    chain: Vec<String>,
}

#[derive(Debug)]
enum Visit {
    Resolving,
    Resolved(Task),
}

impl Walk {
    fn cycle(&self, raw: &str, task_name: &str) -> Task {
        let mut chain = self.chain.clone();
        chain.push(task_name.to_string());
        Task::invalid(
            raw,
            task_name,
            TaskError::CircularReference {
                task: task_name.to_string(),
                chain,
            },
        )
    }
}

/// Turns task names into `Task` trees.
///
/// Results are cached per name list for the life of the resolver.
#[derive(Debug)]
pub struct Resolver {
    config: Arc<Config>,
    adaptors: Arc<AdaptorRegistry>,
    fs: Arc<dyn FileSystem>,
    cache: Mutex<HashMap<Vec<String>, Arc<Resolution>>>,
}

impl Resolver {
    pub fn new(config: Arc<Config>, adaptors: Arc<AdaptorRegistry>, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            config,
            adaptors,
            fs,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &Arc<Config> {
        &self.config
    }

    pub fn adaptors(&self) -> &Arc<AdaptorRegistry> {
        &self.adaptors
    }

    fn cache(&self) -> MutexGuard<'_, HashMap<Vec<String>, Arc<Resolution>>> {
        self.cache.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn resolve(&self, names: &[String]) -> Arc<Resolution> {
        if let Some(hit) = self.cache().get(names) {
            debug!(?names, "resolution cache hit");
            return Arc::clone(hit);
        }

        let mut walk = Walk::default();
        let mut resolution = Resolution::default();
        for name in names {
            let task = self.resolve_input(name, &mut walk);
            if task.valid {
                resolution.valid.push(task);
            } else {
                for err in task.all_errors() {
                    warn!(task = %task.raw_input, error = %err, "task failed to resolve");
                }
                resolution.invalid.push(task);
            }
        }

        let resolution = Arc::new(resolution);
        self.cache().insert(names.to_vec(), Arc::clone(&resolution));
        resolution
    }

    fn resolve_input(&self, raw: &str, walk: &mut Walk) -> Task {
        match walk.visits.get(raw) {
            Some(Visit::Resolved(task)) => return task.clone(),
            Some(Visit::Resolving) => return walk.cycle(raw, &guess_task_name(raw)),
            None => {}
        }

        let parsed = match parse_input(raw) {
            Ok(TaskInput::Adaptor { sigil, command }) => {
                return self.resolve_adaptor(raw, &sigil, &command);
            }
            Ok(TaskInput::Named(parsed)) => parsed,
            Err(err) => {
                let mut task = Task::invalid(raw, guess_task_name(raw), err);
                task.settle();
                return task;
            }
        };

        if walk.chain.contains(&parsed.task_name) {
            return walk.cycle(raw, &parsed.task_name);
        }

        walk.visits.insert(raw.to_string(), Visit::Resolving);
        walk.chain.push(parsed.task_name.clone());
        let task = self.resolve_named(raw, parsed, walk);
        walk.chain.pop();
        walk.visits
            .insert(raw.to_string(), Visit::Resolved(task.clone()));
        task
    }

    fn resolve_adaptor(&self, raw: &str, sigil: &str, command: &str) -> Task {
        let Some(adaptor) = self.adaptors.get(sigil) else {
            let mut task = Task::invalid(
                raw,
                sigil,
                TaskError::AdaptorNotFound {
                    task: raw.to_string(),
                    adaptor: sigil.to_string(),
                },
            );
            task.settle();
            return task;
        };

        let mut task = Task::new(raw, adaptor.id().name(), TaskKind::Adaptor);
        if adaptor.validate(command, &self.config) {
            task.binding = Some(TaskBinding::Adaptor {
                id: adaptor.id(),
                command: command.to_string(),
            });
        } else {
            task.errors.push(TaskError::invalid(
                raw,
                format!("'{command}' is not a valid {} command", adaptor.id()),
            ));
        }
        task.settle();
        task
    }

    fn resolve_named(&self, raw: &str, parsed: ParsedName, walk: &mut Walk) -> Task {
        let name = parsed.task_name.clone();
        let mut task = Task::new(raw, &name, TaskKind::TaskGroup);
        task.sub_task_names = parsed.sub_task_names.clone();
        let mut own_options = toml::Table::new();

        match self.config.task(&name) {
            Some(TaskDefinition::Alias(target)) => {
                task.children.push(self.resolve_input(target, walk));
            }
            Some(TaskDefinition::List(items)) => {
                task.children = self.resolve_items(items, walk);
            }
            Some(TaskDefinition::Object(obj)) => {
                task.children = self.resolve_items(&obj.tasks, walk);
                own_options = obj.options.clone();
                task.description = obj.description.clone();
                task.run_mode = obj.run_mode.unwrap_or_default();
                task.skipped = obj.skip;
                task.env = obj.env.clone();
            }
            Some(TaskDefinition::Function(f)) => {
                task.kind = TaskKind::InlineFunction;
                task.binding = Some(TaskBinding::Inline(f.clone()));
            }
            None => self.resolve_module(&mut task),
        }

        if parsed.is_parallel() {
            task.run_mode = RunMode::Parallel;
        }

        if let Some(configured) = self.config.task_options(&name) {
            deep_merge(&mut own_options, configured);
        }
        task.options = own_options;

        match self.expand_subtasks(&parsed) {
            Ok(subtasks) => task.subtasks = subtasks,
            Err(err) => task.errors.push(err),
        }

        task.settle();
        task
    }

    fn resolve_items(&self, items: &[TaskItem], walk: &mut Walk) -> Vec<Task> {
        items
            .iter()
            .map(|item| match item {
                TaskItem::Name(name) => self.resolve_input(name, walk),
                TaskItem::Function(f) => {
                    let mut task = Task::new(f.label(), f.label(), TaskKind::InlineFunction);
                    task.binding = Some(TaskBinding::Inline(f.clone()));
                    task.settle();
                    task
                }
            })
            .collect()
    }

    fn resolve_module(&self, task: &mut Task) {
        let cwd = self.config.cwd();
        let modules = ModuleResolver::new(self.fs.as_ref(), &cwd, &self.config.config);
        match modules.lookup(&task.task_name) {
            ModuleLookup::Found(module) => {
                task.kind = TaskKind::ExternalModule;
                if module.entries.is_empty() {
                    task.errors.push(TaskError::invalid(
                        task.raw_input.clone(),
                        format!("module directory {:?} has no scripts", module.path),
                    ));
                } else {
                    task.binding = Some(TaskBinding::Module(module));
                }
            }
            ModuleLookup::Missing(path) => {
                task.kind = TaskKind::ExternalModule;
                task.errors.push(TaskError::ModuleNotFound {
                    task: task.task_name.clone(),
                    path,
                });
            }
            ModuleLookup::NotFound => task.errors.push(TaskError::TaskNotFound {
                task: task.task_name.clone(),
            }),
        }
    }

    /// Subtasks are the table-valued keys under `[options.<task>]`.
    fn expand_subtasks(&self, parsed: &ParsedName) -> Result<Vec<Subtask>, TaskError> {
        if parsed.sub_task_names.is_empty() {
            return Ok(Vec::new());
        }
        let task = parsed.task_name.clone();
        let empty = toml::Table::new();
        let table = self.config.task_options(&task).unwrap_or(&empty);

        if parsed.has_wildcard() {
            if parsed.sub_task_names.len() > 1 {
                return Err(TaskError::SubtaskWildcardNotAvailable { task });
            }
            let subtasks: Vec<Subtask> = table
                .iter()
                .filter_map(|(name, value)| {
                    value.as_table().map(|options| Subtask {
                        name: name.clone(),
                        options: options.clone(),
                    })
                })
                .collect();
            if subtasks.is_empty() {
                return Err(TaskError::SubtasksNotInConfig { task });
            }
            return Ok(subtasks);
        }

        parsed
            .sub_task_names
            .iter()
            .map(|sub| {
                match table.get(sub).and_then(toml::Value::as_table) {
                    Some(options) => Ok(Subtask {
                        name: sub.clone(),
                        options: options.clone(),
                    }),
                    None => Err(TaskError::SubtaskNotFound {
                        task: task.clone(),
                        subtask: sub.clone(),
                    }),
                }
            })
            .collect()
    }
}
