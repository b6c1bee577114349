// src/errors.rs

//! Crate-wide error type and result alias.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TaskchainError {
    /// Structural problem with the declarations or the kind registry.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// A collaborator rejected its kind-specific parameters.
    #[error("Validation error in '{task}' for {fields:?}: {message}")]
    ValidationError {
        task: String,
        fields: Vec<String>,
        message: String,
    },

    #[error(
        "Declaration checksum changed (previous {previous}, current {current}); \
         restore the declarations, pass --overwrite-checksum or --ignore-checksum"
    )]
    ChecksumMismatch { previous: String, current: String },

    #[error("Cycle detected in task paths: {0}")]
    PathCycle(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSerError(#[from] toml::ser::Error),

    #[error("Template error: {0}")]
    TemplateError(#[from] minijinja::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl TaskchainError {
    pub fn config(message: impl Into<String>) -> Self {
        TaskchainError::ConfigError(message.into())
    }

    pub fn validation(task: impl Into<String>, fields: &[&str], message: impl Into<String>) -> Self {
        TaskchainError::ValidationError {
            task: task.into(),
            fields: fields.iter().map(|f| f.to_string()).collect(),
            message: message.into(),
        }
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, TaskchainError>;
