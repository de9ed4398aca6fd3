pub mod helpers;
pub mod repository;
pub mod state;
pub mod storage;
pub mod types;
pub mod watcher;

use thiserror::Error;

use crate::shared::errors::StorageError;
use types::ValidationError;

/// Error returned by task state operations.
#[derive(Error, Debug)]
pub enum TaskError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
}
