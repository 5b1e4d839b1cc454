//! Lifecycle errors

use thiserror::Error;

use crate::domain::TaskError;
use crate::state::StateError;

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error(transparent)]
    Task(#[from] TaskError),

    #[error("Failed to load tasks: {0}")]
    State(#[from] StateError),

    #[error("Research job failed: {0}")]
    Join(String),
}
