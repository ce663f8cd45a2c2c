// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::model::{Config, RawConfigFile};
use crate::errors::Result;

/// Load a configuration file from a given path and return the raw `RawConfigFile`.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;
    parse_str(&contents)
}

/// Parse TOML text into a `RawConfigFile`.
pub fn parse_str(contents: &str) -> Result<RawConfigFile> {
    let config: RawConfigFile = toml::from_str(contents)?;
    Ok(config)
}

/// Load a configuration file from path and validate it.
///
/// A missing `[config].cwd` becomes the directory holding the config file,
/// so relative module paths and commands behave the same regardless of the
/// directory `conductor` was started from.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<Config> {
    let path = path.as_ref();
    let mut raw_config = load_from_path(path)?;

    let root = config_root_dir(path);
    raw_config.config.cwd = Some(match raw_config.config.cwd.take() {
        Some(cwd) if cwd.is_relative() => root.join(cwd),
        Some(cwd) => cwd,
        None => root,
    });
    debug!(cwd = ?raw_config.config.cwd, "resolved working directory");

    let config = Config::try_from(raw_config)?;
    Ok(config)
}

/// Default config path: `Conductor.toml` in the current working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Conductor.toml")
}

/// - If the config path has a non-empty parent (e.g. "configs/Conductor.toml"),
///   we use that directory.
/// - If it's just a bare filename like "Conductor.toml" (parent = ""),
///   we fall back to the current working directory.
fn config_root_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}
