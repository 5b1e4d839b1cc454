//! Event types for todone activity streaming
//!
//! These events represent everything a UI needs to stay in sync:
//! - Task list changes (create, update, delete, reorder)
//! - Simulated research progress
//! - Failures that the optimistic layer would otherwise swallow

use serde::{Deserialize, Serialize};

use crate::domain::TaskStatus;
use crate::progress::ProgressStage;

/// Core event enum - the vocabulary of todone activity
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TdEvent {
    // === Task list ===
    TaskCreated {
        task_id: String,
        title: String,
    },
    TaskUpdated {
        task_id: String,
        status: TaskStatus,
    },
    TaskDeleted {
        task_id: String,
    },
    /// The whole order changed at once
    TasksReordered {
        task_ids: Vec<String>,
    },

    // === Research progress ===
    ProgressUpdated {
        task_id: String,
        stage: ProgressStage,
        message: String,
        progress: u8,
    },
    ProgressCleared {
        task_id: String,
    },

    // === Failures ===
    /// Research failed; the task went back to pending
    ResearchFailed {
        task_id: String,
        message: String,
    },
    /// A write-behind persistence step failed
    PersistFailed {
        operation: String,
        message: String,
    },
}

impl TdEvent {
    /// The task this event concerns, if it concerns exactly one
    pub fn task_id(&self) -> Option<&str> {
        match self {
            TdEvent::TaskCreated { task_id, .. }
            | TdEvent::TaskUpdated { task_id, .. }
            | TdEvent::TaskDeleted { task_id }
            | TdEvent::ProgressUpdated { task_id, .. }
            | TdEvent::ProgressCleared { task_id }
            | TdEvent::ResearchFailed { task_id, .. } => Some(task_id),
            TdEvent::TasksReordered { .. } | TdEvent::PersistFailed { .. } => None,
        }
    }

    /// Get a short name for the event type
    pub fn event_type(&self) -> &'static str {
        match self {
            TdEvent::TaskCreated { .. } => "TaskCreated",
            TdEvent::TaskUpdated { .. } => "TaskUpdated",
            TdEvent::TaskDeleted { .. } => "TaskDeleted",
            TdEvent::TasksReordered { .. } => "TasksReordered",
            TdEvent::ProgressUpdated { .. } => "ProgressUpdated",
            TdEvent::ProgressCleared { .. } => "ProgressCleared",
            TdEvent::ResearchFailed { .. } => "ResearchFailed",
            TdEvent::PersistFailed { .. } => "PersistFailed",
        }
    }
}
