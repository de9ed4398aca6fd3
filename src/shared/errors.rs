use std::time::Duration;
use thiserror::Error;

use crate::core::logging::LoggingError;

/// Failures while persisting the task document.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to write task file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize tasks: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Failed to create directory: {0}")]
    DirectoryError(String),

    #[error("Task file write timed out after {0:?}")]
    Timeout(Duration),

    #[error("Store update aborted: {0}")]
    Aborted(String),
}

impl StorageError {
    pub fn directory(msg: impl Into<String>) -> Self {
        StorageError::DirectoryError(msg.into())
    }

    pub fn aborted(msg: impl Into<String>) -> Self {
        StorageError::Aborted(msg.into())
    }
}

/// Errors raised while wiring the application together.
#[derive(Error, Debug)]
pub enum StartupError {
    #[error(transparent)]
    Logging(#[from] LoggingError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("Failed to start task file watcher: {0}")]
    Watcher(#[from] notify::Error),
}
