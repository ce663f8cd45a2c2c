#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use conductor::config::{
    validate_config, Config, TaskDefinition, TaskItem, TaskObject, WatchGroupConfig,
    WatchOptionsConfig, WatcherConfig,
};
use conductor::exec::{RunnableResult, TaskContext};
use conductor::types::RunMode;

/// Builder for `Config` to simplify test setup.
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    /// `name = "target"`
    pub fn alias(mut self, name: &str, target: &str) -> Self {
        self.config
            .insert_task(name, TaskDefinition::Alias(target.to_string()));
        self
    }

    /// `name = ["a", "b"]`
    pub fn list(mut self, name: &str, items: &[&str]) -> Self {
        let items = items.iter().map(|s| TaskItem::from(*s)).collect();
        self.config.insert_task(name, TaskDefinition::List(items));
        self
    }

    pub fn items(mut self, name: &str, items: Vec<TaskItem>) -> Self {
        self.config.insert_task(name, TaskDefinition::List(items));
        self
    }

    pub fn object(mut self, name: &str, object: TaskObject) -> Self {
        self.config.insert_task(name, TaskDefinition::Object(object));
        self
    }

    /// `name = { tasks = [...], run_mode = "parallel" }`
    pub fn parallel(self, name: &str, items: &[&str]) -> Self {
        let object = TaskObject {
            tasks: items.iter().map(|s| TaskItem::from(*s)).collect(),
            run_mode: Some(RunMode::Parallel),
            ..TaskObject::default()
        };
        self.object(name, object)
    }

    /// `name = { tasks = [...], skip = true }`
    pub fn skipped(self, name: &str, items: &[&str]) -> Self {
        let object = TaskObject {
            tasks: items.iter().map(|s| TaskItem::from(*s)).collect(),
            skip: true,
            ..TaskObject::default()
        };
        self.object(name, object)
    }

    pub fn task_fn<F>(mut self, name: &str, f: F) -> Self
    where
        F: Fn(TaskContext) -> RunnableResult + Send + Sync + 'static,
    {
        self.config.insert_task_fn(name, f);
        self
    }

    /// `[options.<task>] key = value`
    pub fn task_option(mut self, task: &str, key: &str, value: impl Into<toml::Value>) -> Self {
        self.task_table(task).insert(key.to_string(), value.into());
        self
    }

    /// `[options.<task>.<sub>]`
    pub fn subtask(mut self, task: &str, sub: &str, options: toml::Table) -> Self {
        self.task_table(task)
            .insert(sub.to_string(), toml::Value::Table(options));
        self
    }

    fn task_table(&mut self, task: &str) -> &mut toml::Table {
        let entry = self
            .config
            .options
            .entry(task.to_string())
            .or_insert_with(|| toml::Value::Table(toml::Table::new()));
        match entry {
            toml::Value::Table(table) => table,
            other => {
                *other = toml::Value::Table(toml::Table::new());
                other.as_table_mut().expect("just inserted a table")
            }
        }
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.config.env.insert(key.to_string(), value.to_string());
        self
    }

    pub fn cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.config.config.cwd = Some(cwd.into());
        self
    }

    pub fn continue_on_error(mut self, val: bool) -> Self {
        self.config.config.continue_on_error = val;
        self
    }

    pub fn watch_before(mut self, tasks: &[&str]) -> Self {
        self.config.config.watch_before = tasks.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn watch_group(mut self, group: &str, before: &[&str], options: WatchOptionsConfig) -> Self {
        let entry = self.config.watch.entry(group.to_string()).or_default();
        entry.before = before.iter().map(|s| s.to_string()).collect();
        entry.options = options;
        self
    }

    pub fn watcher(self, group: &str, patterns: &[&str], tasks: &[&str]) -> Self {
        self.watcher_with(group, patterns, tasks, WatchOptionsConfig::default())
    }

    pub fn watcher_with(
        mut self,
        group: &str,
        patterns: &[&str],
        tasks: &[&str],
        options: WatchOptionsConfig,
    ) -> Self {
        let entry: &mut WatchGroupConfig = self.config.watch.entry(group.to_string()).or_default();
        entry.watchers.push(WatcherConfig {
            patterns: patterns.iter().map(|s| s.to_string()).collect(),
            tasks: tasks.iter().map(|s| s.to_string()).collect(),
            options,
        });
        self
    }

    pub fn build(self) -> Config {
        validate_config(&self.config).expect("Failed to build valid config from builder");
        self.config
    }

    pub fn build_arc(self) -> Arc<Config> {
        Arc::new(self.build())
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Watch options with only `throttle` set.
pub fn throttle(ms: u64) -> WatchOptionsConfig {
    WatchOptionsConfig {
        throttle: Some(ms),
        ..WatchOptionsConfig::default()
    }
}

/// Watch options with only `debounce` set.
pub fn debounce(ms: u64) -> WatchOptionsConfig {
    WatchOptionsConfig {
        debounce: Some(ms),
        ..WatchOptionsConfig::default()
    }
}
