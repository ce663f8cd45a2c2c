// src/config/validate.rs

use std::collections::BTreeMap;

use petgraph::algo::tarjan_scc;
use petgraph::graphmap::DiGraphMap;
use tracing::warn;

use crate::adaptor::AdaptorId;
use crate::config::model::{
    Config, RawConfigFile, RawTaskDefinition, TaskDefinition, WatchGroupConfig,
};
use crate::errors::{ConductorError, Result};
use crate::task::parse::{parse_input, TaskInput};

impl TryFrom<RawConfigFile> for Config {
    type Error = ConductorError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;

        let tasks: BTreeMap<String, TaskDefinition> = raw
            .tasks
            .into_iter()
            .map(|(name, def)| (name, TaskDefinition::from(def)))
            .collect();
        let watch: BTreeMap<String, WatchGroupConfig> = raw
            .watch
            .into_iter()
            .map(|(name, group)| (name, WatchGroupConfig::from(group)))
            .collect();

        let config = Config::new_unchecked(raw.config, raw.env, tasks, raw.options, watch);
        validate_config(&config)?;

        for cycle in alias_cycles(&config) {
            warn!(
                cycle = %cycle.join(" -> "),
                "task aliases form a cycle; affected tasks will fail to resolve"
            );
        }

        Ok(config)
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    for (name, def) in cfg.tasks.iter() {
        validate_task_name(name)?;
        match def {
            RawTaskDefinition::Alias(s) if s.trim().is_empty() => {
                return Err(ConductorError::ConfigError(format!(
                    "task '{name}' is an empty alias"
                )));
            }
            RawTaskDefinition::List(items) if items.is_empty() => {
                return Err(ConductorError::ConfigError(format!(
                    "task '{name}' has an empty task list"
                )));
            }
            RawTaskDefinition::Object(obj) if obj.tasks.clone().into_vec().is_empty() => {
                return Err(ConductorError::ConfigError(format!(
                    "task '{name}' has an object definition with no `tasks`"
                )));
            }
            _ => {}
        }
    }

    for (name, value) in cfg.options.iter() {
        if !value.is_table() {
            return Err(ConductorError::ConfigError(format!(
                "[options.{name}] must be a table"
            )));
        }
    }

    Ok(())
}

/// Checks that apply to both file-loaded and code-built configs.
pub fn validate_config(cfg: &Config) -> Result<()> {
    for (name, def) in cfg.tasks.iter() {
        validate_task_name(name)?;
        for reference in def.referenced_names() {
            if let Ok(TaskInput::Adaptor { sigil, .. }) = parse_input(reference) {
                if AdaptorId::from_sigil(&sigil).is_none() {
                    return Err(ConductorError::ConfigError(format!(
                        "task '{name}' uses unknown adaptor '{sigil}'"
                    )));
                }
            }
        }
    }

    for (group, wg) in cfg.watch.iter() {
        if wg.watchers.is_empty() {
            return Err(ConductorError::ConfigError(format!(
                "watch group '{group}' has no watchers"
            )));
        }
        for (idx, w) in wg.watchers.iter().enumerate() {
            if w.patterns.is_empty() {
                return Err(ConductorError::ConfigError(format!(
                    "watcher #{idx} of group '{group}' has no patterns"
                )));
            }
            if w.tasks.is_empty() {
                return Err(ConductorError::ConfigError(format!(
                    "watcher #{idx} of group '{group}' has no tasks"
                )));
            }
            let effective = wg.options.merged_with(w.options);
            if effective.debounce.is_some() && effective.throttle.is_some() {
                return Err(ConductorError::ConfigError(format!(
                    "watcher #{idx} of group '{group}' sets both debounce and throttle"
                )));
            }
        }
    }

    Ok(())
}

fn validate_task_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(ConductorError::ConfigError(
            "task names must not be empty".to_string(),
        ));
    }
    if name.contains(|c: char| c == ':' || c == '@' || c.is_whitespace()) {
        return Err(ConductorError::ConfigError(format!(
            "task name '{name}' must not contain ':', '@' or whitespace"
        )));
    }
    Ok(())
}

/// Alias cycles among configured tasks, each as a closed chain of names
/// (`["a", "b", "a"]`).
///
/// Edge direction: task -> referenced task. Adaptor invocations and inline
/// functions are leaves and never take part in a cycle.
pub fn alias_cycles(cfg: &Config) -> Vec<Vec<String>> {
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for name in cfg.tasks.keys() {
        graph.add_node(name.as_str());
    }

    for (name, def) in cfg.tasks.iter() {
        for reference in def.referenced_names() {
            if let Ok(TaskInput::Named(parsed)) = parse_input(reference) {
                if let Some((target, _)) = cfg.tasks.get_key_value(parsed.task_name.as_str()) {
                    graph.add_edge(name.as_str(), target.as_str(), ());
                }
            }
        }
    }

    tarjan_scc(&graph)
        .into_iter()
        .filter(|scc| scc.len() > 1 || graph.contains_edge(scc[0], scc[0]))
        .map(|mut scc| {
            scc.sort_unstable();
            let mut chain: Vec<String> = scc.iter().map(|s| s.to_string()).collect();
            chain.push(scc[0].to_string());
            chain
        })
        .collect()
}
