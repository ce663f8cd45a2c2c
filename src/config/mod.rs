// src/config/mod.rs

//! Configuration loading and validation for conductor.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate basic invariants and report alias cycles (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path, parse_str};
pub use model::{
    Config, ConfigSection, InlineTask, RawConfigFile, TaskDefinition, TaskFn, TaskItem,
    TaskObject, WatchGroupConfig, WatchOptionsConfig, WatcherConfig,
};
pub use validate::{alias_cycles, validate_config};
