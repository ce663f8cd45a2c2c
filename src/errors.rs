// src/errors.rs

//! Crate-wide error aliases and helpers.
//!
//! Resolution problems are not errors at this level: they are collected as
//! [`TaskError`](crate::task::TaskError)s on the offending `Task` nodes and
//! only surface here once a caller decides to abort (`InvalidTasks`).

use thiserror::Error;

use crate::watch::WatchError;

#[derive(Error, Debug)]
pub enum ConductorError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Invalid tasks: {}", .0.join(", "))]
    InvalidTasks(Vec<String>),

    #[error(transparent)]
    Watch(#[from] WatchError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, ConductorError>;
