#![forbid(unsafe_code)]

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TodoError {
    #[error("config error: {0}")]
    Config(String),

    #[error("invalid config key '{0}'")]
    InvalidConfigKey(String),

    #[error("invalid config value for '{key}': {msg}")]
    InvalidConfigValue { key: String, msg: String },

    #[error("invalid storage key '{key}': {msg}")]
    InvalidStorageKey { key: String, msg: String },

    #[error("no task matches id: {0}")]
    TaskNotFound(String),

    #[error("multiple tasks match id: {0}")]
    AmbiguousTask(String),

    #[error("invalid priority '{0}' (expected normal, pending or urgent)")]
    InvalidPriority(String),

    #[error("invalid filter '{0}' (expected all, active or completed)")]
    InvalidFilter(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error("io error at {path}: {source}")]
    IoPath {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{0}")]
    Other(String),
}
