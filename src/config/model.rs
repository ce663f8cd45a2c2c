// src/config/model.rs

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use serde::Deserialize;

use crate::exec::{RunnableResult, TaskContext};
use crate::types::RunMode;

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [config]
/// run_mode = "series"
///
/// [env]
/// NODE_ENV = "development"
///
/// [tasks]
/// js = "css"
/// css = ["@cb sleep 100ms", "@sh echo css"]
///
/// [options.sass.dev]
/// style = "expanded"
///
/// [watch.default]
/// watchers = [{ patterns = ["src/**/*.scss"], tasks = ["css"] }]
/// ```
///
/// All sections are optional. This is the raw, unvalidated form; convert it
/// with `Config::try_from`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub config: ConfigSection,

    #[serde(default)]
    pub env: BTreeMap<String, String>,

    #[serde(default)]
    pub tasks: BTreeMap<String, RawTaskDefinition>,

    /// Per-task options, keyed further by subtask name.
    #[serde(default)]
    pub options: toml::Table,

    #[serde(default)]
    pub watch: BTreeMap<String, RawWatchGroup>,
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// Working directory for spawned processes and module lookup.
    ///
    /// When omitted, the loader uses the directory holding the config file.
    #[serde(default)]
    pub cwd: Option<PathBuf>,

    /// Default top-level run mode.
    #[serde(default)]
    pub run_mode: RunMode,

    /// Keep running series siblings after an error.
    #[serde(default)]
    pub continue_on_error: bool,

    /// Directory searched first for external task modules.
    #[serde(default = "default_tasks_dir")]
    pub tasks_dir: String,

    /// Project-local binary directory; prepended to `PATH` for `@npm` and
    /// `@grunt`, and searched for installed modules.
    #[serde(default = "default_bin_dir")]
    pub bin_dir: String,

    /// File-name prefix of installed modules inside `bin_dir`.
    #[serde(default = "default_module_prefix")]
    pub module_prefix: String,

    /// Executable used by the `@grunt` adaptor.
    #[serde(default = "default_build_tool")]
    pub build_tool: String,

    /// Tasks run once before any watcher starts.
    #[serde(default)]
    pub watch_before: Vec<String>,
}

fn default_tasks_dir() -> String {
    "tasks".to_string()
}

fn default_bin_dir() -> String {
    "node_modules/.bin".to_string()
}

fn default_module_prefix() -> String {
    "conductor-".to_string()
}

fn default_build_tool() -> String {
    "grunt".to_string()
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            cwd: None,
            run_mode: RunMode::default(),
            continue_on_error: false,
            tasks_dir: default_tasks_dir(),
            bin_dir: default_bin_dir(),
            module_prefix: default_module_prefix(),
            build_tool: default_build_tool(),
            watch_before: Vec::new(),
        }
    }
}

/// A value that may be written either as a single string or as a list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum StringOrList {
    One(String),
    Many(Vec<String>),
}

impl StringOrList {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            StringOrList::One(s) => vec![s],
            StringOrList::Many(v) => v,
        }
    }
}

/// `[tasks]` entry as written in TOML.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawTaskDefinition {
    Alias(String),
    List(Vec<String>),
    Object(RawTaskObject),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawTaskObject {
    pub tasks: StringOrList,
    #[serde(default)]
    pub options: toml::Table,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub run_mode: Option<RunMode>,
    #[serde(default)]
    pub skip: bool,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

/// `[watch.<group>]` entry: the full form, or the `"pattern" = tasks`
/// shorthand.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawWatchGroup {
    Full(RawWatchGroupFull),
    Shorthand(BTreeMap<String, StringOrList>),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawWatchGroupFull {
    #[serde(default)]
    pub before: Vec<String>,
    #[serde(default)]
    pub options: WatchOptionsConfig,
    pub watchers: Vec<RawWatcher>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawWatcher {
    pub patterns: StringOrList,
    pub tasks: StringOrList,
    #[serde(default)]
    pub options: WatchOptionsConfig,
}

/// Coalescing options as written in config. Watcher-level values override
/// group-level ones field by field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WatchOptionsConfig {
    /// Trailing-edge quiet period, in milliseconds.
    #[serde(default)]
    pub debounce: Option<u64>,
    /// Leading-edge ignore window, in milliseconds.
    #[serde(default)]
    pub throttle: Option<u64>,
    #[serde(default)]
    pub ignore_initial: Option<bool>,
}

impl WatchOptionsConfig {
    /// Overlay `other` on top of `self`.
    pub fn merged_with(self, other: WatchOptionsConfig) -> WatchOptionsConfig {
        WatchOptionsConfig {
            debounce: other.debounce.or(self.debounce),
            throttle: other.throttle.or(self.throttle),
            ignore_initial: other.ignore_initial.or(self.ignore_initial),
        }
    }
}

/// In-process task implementation registered from code.
pub type TaskFn = Arc<dyn Fn(TaskContext) -> RunnableResult + Send + Sync>;

/// A labelled inline function task.
#[derive(Clone)]
pub struct InlineTask {
    label: String,
    f: TaskFn,
}

impl InlineTask {
    pub fn new<F>(label: impl Into<String>, f: F) -> Self
    where
        F: Fn(TaskContext) -> RunnableResult + Send + Sync + 'static,
    {
        Self {
            label: label.into(),
            f: Arc::new(f),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn call(&self, ctx: TaskContext) -> RunnableResult {
        (self.f)(ctx)
    }
}

impl fmt::Debug for InlineTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("InlineTask").field(&self.label).finish()
    }
}

/// One element of a task list: another task name, or an inline function.
#[derive(Debug, Clone)]
pub enum TaskItem {
    Name(String),
    Function(InlineTask),
}

impl From<&str> for TaskItem {
    fn from(s: &str) -> Self {
        TaskItem::Name(s.to_string())
    }
}

impl From<String> for TaskItem {
    fn from(s: String) -> Self {
        TaskItem::Name(s)
    }
}

impl From<InlineTask> for TaskItem {
    fn from(f: InlineTask) -> Self {
        TaskItem::Function(f)
    }
}

/// Object form of a task definition.
#[derive(Debug, Clone, Default)]
pub struct TaskObject {
    pub tasks: Vec<TaskItem>,
    pub options: toml::Table,
    pub description: Option<String>,
    pub run_mode: Option<RunMode>,
    pub skip: bool,
    pub env: BTreeMap<String, String>,
}

/// Validated `[tasks]` entry.
#[derive(Debug, Clone)]
pub enum TaskDefinition {
    /// `js = "css"`: a single child.
    Alias(String),
    /// `build = ["clean", "js"]`: children in declared order.
    List(Vec<TaskItem>),
    Object(TaskObject),
    Function(InlineTask),
}

impl From<RawTaskDefinition> for TaskDefinition {
    fn from(raw: RawTaskDefinition) -> Self {
        match raw {
            RawTaskDefinition::Alias(s) => TaskDefinition::Alias(s),
            RawTaskDefinition::List(v) => {
                TaskDefinition::List(v.into_iter().map(TaskItem::Name).collect())
            }
            RawTaskDefinition::Object(o) => TaskDefinition::Object(TaskObject {
                tasks: o.tasks.into_vec().into_iter().map(TaskItem::Name).collect(),
                options: o.options,
                description: o.description,
                run_mode: o.run_mode,
                skip: o.skip,
                env: o.env,
            }),
        }
    }
}

impl TaskDefinition {
    /// Names referenced by this definition (inline functions excluded).
    pub fn referenced_names(&self) -> Vec<&str> {
        let items: &[TaskItem] = match self {
            TaskDefinition::Alias(s) => return vec![s.as_str()],
            TaskDefinition::List(items) => items,
            TaskDefinition::Object(o) => &o.tasks,
            TaskDefinition::Function(_) => return Vec::new(),
        };
        items
            .iter()
            .filter_map(|item| match item {
                TaskItem::Name(n) => Some(n.as_str()),
                TaskItem::Function(_) => None,
            })
            .collect()
    }

    pub fn description(&self) -> Option<&str> {
        match self {
            TaskDefinition::Object(o) => o.description.as_deref(),
            _ => None,
        }
    }
}

/// Validated `[watch.<group>]` entry.
#[derive(Debug, Clone, Default)]
pub struct WatchGroupConfig {
    pub before: Vec<String>,
    pub options: WatchOptionsConfig,
    pub watchers: Vec<WatcherConfig>,
}

#[derive(Debug, Clone)]
pub struct WatcherConfig {
    pub patterns: Vec<String>,
    pub tasks: Vec<String>,
    pub options: WatchOptionsConfig,
}

impl From<RawWatchGroup> for WatchGroupConfig {
    fn from(raw: RawWatchGroup) -> Self {
        match raw {
            RawWatchGroup::Full(full) => WatchGroupConfig {
                before: full.before,
                options: full.options,
                watchers: full
                    .watchers
                    .into_iter()
                    .map(|w| WatcherConfig {
                        patterns: w.patterns.into_vec(),
                        tasks: w.tasks.into_vec(),
                        options: w.options,
                    })
                    .collect(),
            },
            RawWatchGroup::Shorthand(map) => WatchGroupConfig {
                before: Vec::new(),
                options: WatchOptionsConfig::default(),
                watchers: map
                    .into_iter()
                    .map(|(pattern, tasks)| WatcherConfig {
                        patterns: vec![pattern],
                        tasks: tasks.into_vec(),
                        options: WatchOptionsConfig::default(),
                    })
                    .collect(),
            },
        }
    }
}

/// Validated configuration, shared across the resolver, builder, runtime
/// and watch controller behind an `Arc`.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub config: ConfigSection,
    pub env: BTreeMap<String, String>,
    pub tasks: BTreeMap<String, TaskDefinition>,
    pub options: toml::Table,
    pub watch: BTreeMap<String, WatchGroupConfig>,
}

impl Config {
    /// Construct without running validation. Prefer `Config::try_from`.
    pub fn new_unchecked(
        config: ConfigSection,
        env: BTreeMap<String, String>,
        tasks: BTreeMap<String, TaskDefinition>,
        options: toml::Table,
        watch: BTreeMap<String, WatchGroupConfig>,
    ) -> Self {
        Self {
            config,
            env,
            tasks,
            options,
            watch,
        }
    }

    pub fn task(&self, name: &str) -> Option<&TaskDefinition> {
        self.tasks.get(name)
    }

    /// `[options.<name>]` as a table, if present.
    pub fn task_options(&self, name: &str) -> Option<&toml::Table> {
        self.options.get(name).and_then(toml::Value::as_table)
    }

    pub fn insert_task(&mut self, name: impl Into<String>, def: TaskDefinition) {
        self.tasks.insert(name.into(), def);
    }

    /// Register an inline function under `name`.
    pub fn insert_task_fn<F>(&mut self, name: impl Into<String>, f: F)
    where
        F: Fn(TaskContext) -> RunnableResult + Send + Sync + 'static,
    {
        let name = name.into();
        let task = InlineTask::new(name.clone(), f);
        self.tasks.insert(name, TaskDefinition::Function(task));
    }

    /// Effective working directory (`[config].cwd`, else `.`).
    pub fn cwd(&self) -> PathBuf {
        self.config.cwd.clone().unwrap_or_else(|| PathBuf::from("."))
    }
}
