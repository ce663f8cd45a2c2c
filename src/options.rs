// src/options.rs

//! Task option tables and their layering.

use std::collections::BTreeMap;

use toml::Table;

/// Merge `overlay` into `base`. Nested tables merge recursively; any other
/// value in `overlay` replaces the one in `base`.
pub fn deep_merge(base: &mut Table, overlay: &Table) {
    for (key, value) in overlay {
        match (base.get_mut(key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(incoming)) => {
                deep_merge(existing, incoming);
            }
            _ => {
                base.insert(key.clone(), value.clone());
            }
        }
    }
}

/// Merge layers in order; later layers win.
pub fn layered<'a>(layers: impl IntoIterator<Item = &'a Table>) -> Table {
    let mut out = Table::new();
    for layer in layers {
        deep_merge(&mut out, layer);
    }
    out
}

/// Task-local env layered over an inherited one.
pub fn layered_env(
    inherited: &BTreeMap<String, String>,
    own: &BTreeMap<String, String>,
) -> BTreeMap<String, String> {
    let mut env = inherited.clone();
    env.extend(own.iter().map(|(k, v)| (k.clone(), v.clone())));
    env
}
