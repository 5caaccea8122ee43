// src/errors.rs

//! Crate-wide error type and result alias.

use thiserror::Error;

use crate::types::TaskId;

#[derive(Error, Debug)]
pub enum TierdagError {
    #[error("Duplicate task id: {0}")]
    DuplicateTask(TaskId),

    #[error("Task '{0}' cannot depend on itself")]
    SelfDependency(TaskId),

    #[error("Cycle detected: {}", .0.join(" -> "))]
    CycleDetected(Vec<TaskId>),

    #[error("Task not found: {0}")]
    TaskNotFound(TaskId),

    #[error("Invalid state transition for task '{task}': {from} -> {to}")]
    InvalidTransition {
        task: TaskId,
        from: String,
        to: String,
    },

    #[error("Checkpoint error: {0}")]
    Checkpoint(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, TierdagError>;
