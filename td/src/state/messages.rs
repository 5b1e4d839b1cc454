//! State manager messages
//!
//! Commands and responses for the actor pattern.

use thiserror::Error;
use tokio::sync::oneshot;

use crate::domain::{RateLimitInfo, Task};

/// Errors from state operations
#[derive(Debug, Error)]
pub enum StateError {
    #[error("Task not found: {0}")]
    NotFound(String),

    #[error("Store error: {0}")]
    StoreError(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Channel error")]
    ChannelError,
}

/// Response from state operations
pub type StateResponse<T> = Result<T, StateError>;

/// Commands sent to the StateManager actor
#[derive(Debug)]
pub enum StateCommand {
    // Task reads
    ListTasks {
        reply: oneshot::Sender<StateResponse<Vec<Task>>>,
    },
    GetTask {
        id: String,
        reply: oneshot::Sender<StateResponse<Option<Task>>>,
    },

    // Task writes
    UpsertTask {
        task: Task,
        reply: oneshot::Sender<StateResponse<()>>,
    },
    DeleteTask {
        id: String,
        reply: oneshot::Sender<StateResponse<()>>,
    },
    ReorderTasks {
        ids: Vec<String>,
        reply: oneshot::Sender<StateResponse<Vec<Task>>>,
    },

    // Rate limit bookkeeping
    LoadRateLimit {
        reply: oneshot::Sender<StateResponse<Option<RateLimitInfo>>>,
    },
    SaveRateLimit {
        info: RateLimitInfo,
        reply: oneshot::Sender<StateResponse<()>>,
    },

    ClearAll {
        reply: oneshot::Sender<StateResponse<()>>,
    },

    // Shutdown
    Shutdown,
}
