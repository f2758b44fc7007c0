//! Error types for the of-app service layer.

use std::path::PathBuf;

use of_api::ApiError;
use of_core::CoreError;

use crate::validation::ValidationError;
use crate::wizard::GuardError;

/// Application error type shared by the CLI and library callers.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Cannot enter step: {0}")]
    Guard(#[from] GuardError),

    #[error("{0}")]
    Core(#[from] CoreError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to read config file: {path}")]
    ConfigFileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("{operation} failed for: {}", .failed.join(", "))]
    Batch {
        operation: &'static str,
        failed: Vec<String>,
    },

    #[error("Progress polling stopped before training finished")]
    PollingStopped,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for of-app operations.
pub type AppResult<T> = Result<T, AppError>;
