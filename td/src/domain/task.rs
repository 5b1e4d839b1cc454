//! Task domain type
//!
//! A Task is one entry on the user's list. Its status follows a small state
//! machine; every mutation bumps `updated_at`.

use serde::{Deserialize, Serialize};
use taskstore::now_ms;
use thiserror::Error;
use tracing::debug;

use super::id::generate_task_id;
use super::research::Research;

/// Task status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Created, research not started (or a failed research attempt)
    #[default]
    Pending,
    /// Research call outstanding
    Researching,
    /// Research attached, ready to act on
    Ready,
    /// Needs no research
    Personal,
    /// Done
    Completed,
    /// Hidden from the active list
    Archived,
}

impl TaskStatus {
    /// All statuses, in display order
    pub const ALL: [TaskStatus; 6] = [
        Self::Pending,
        Self::Researching,
        Self::Ready,
        Self::Personal,
        Self::Completed,
        Self::Archived,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Researching => "researching",
            Self::Ready => "ready",
            Self::Personal => "personal",
            Self::Completed => "completed",
            Self::Archived => "archived",
        }
    }

    /// Active tasks are everything not completed or archived
    pub fn is_active(&self) -> bool {
        !matches!(self, Self::Completed | Self::Archived)
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|status| status.as_str() == s.trim().to_lowercase())
            .ok_or_else(|| format!("Unknown task status: '{}'", s))
    }
}

/// User-triggered status transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskAction {
    StartResearch,
    Complete,
    Archive,
    Restore,
}

impl std::fmt::Display for TaskAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::StartResearch => "research",
            Self::Complete => "complete",
            Self::Archive => "archive",
            Self::Restore => "restore",
        };
        write!(f, "{}", name)
    }
}

/// Errors from task mutations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskError {
    #[error("Task title must not be empty")]
    EmptyTitle,

    #[error("Cannot {action} a task that is {from}")]
    InvalidTransition { from: TaskStatus, action: TaskAction },
}

/// Feedback polarity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackType {
    Positive,
    Negative,
}

impl std::str::FromStr for FeedbackType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "positive" | "up" | "+" => Ok(Self::Positive),
            "negative" | "down" | "-" => Ok(Self::Negative),
            other => Err(format!("Unknown feedback type: '{}'", other)),
        }
    }
}

/// User feedback on a task's briefing; at most one per task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feedback {
    #[serde(rename = "type")]
    pub kind: FeedbackType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub created_at: i64,
}

impl Feedback {
    pub fn new(kind: FeedbackType, comment: Option<String>) -> Self {
        Self {
            kind,
            comment: comment.map(|c| c.trim().to_string()).filter(|c| !c.is_empty()),
            created_at: now_ms(),
        }
    }
}

/// A task record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Unique identifier, immutable
    pub id: String,

    /// Non-empty, trimmed title
    pub title: String,

    pub status: TaskStatus,

    /// Position in the user-controlled total order
    pub order: i64,

    /// Briefing, once research completes
    #[serde(default)]
    pub research: Option<Research>,

    #[serde(default)]
    pub feedback: Option<Feedback>,

    /// Creation timestamp (Unix milliseconds)
    pub created_at: i64,

    /// Last mutation timestamp (Unix milliseconds)
    pub updated_at: i64,

    /// Set only while status is completed
    #[serde(default)]
    pub completed_at: Option<i64>,
}

impl Task {
    /// Create a pending task at the given order position
    pub fn new(title: &str, order: i64) -> Result<Self, TaskError> {
        let title = title.trim();
        debug!(%title, order, "Task::new: called");
        if title.is_empty() {
            return Err(TaskError::EmptyTitle);
        }

        let now = now_ms();
        Ok(Self {
            id: generate_task_id(title),
            title: title.to_string(),
            status: TaskStatus::Pending,
            order,
            research: None,
            feedback: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
        })
    }

    /// Create with a specific ID (for testing or recovery)
    pub fn with_id(id: impl Into<String>, title: &str, order: i64) -> Result<Self, TaskError> {
        let mut task = Self::new(title, order)?;
        task.id = id.into();
        Ok(task)
    }

    /// Bump `updated_at`, never moving it backwards
    pub fn touch(&mut self) {
        self.updated_at = now_ms().max(self.updated_at);
    }

    /// Set status directly, keeping `completed_at` consistent with it
    pub fn set_status(&mut self, status: TaskStatus) {
        debug!(id = %self.id, from = %self.status, to = %status, "Task::set_status: called");
        self.status = status;
        if status == TaskStatus::Completed {
            self.completed_at = Some(now_ms());
        } else {
            self.completed_at = None;
        }
        self.touch();
    }

    /// pending -> researching
    pub fn start_research(&mut self) -> Result<(), TaskError> {
        match self.status {
            TaskStatus::Pending => {
                self.set_status(TaskStatus::Researching);
                Ok(())
            }
            from => Err(TaskError::InvalidTransition {
                from,
                action: TaskAction::StartResearch,
            }),
        }
    }

    /// Attach a finished briefing
    ///
    /// A task still waiting on research becomes ready; a task the user already
    /// moved elsewhere (e.g. archived) keeps its status and just gains the briefing.
    pub fn apply_research(&mut self, research: Research) {
        debug!(id = %self.id, status = %self.status, "Task::apply_research: called");
        self.research = Some(research);
        if matches!(self.status, TaskStatus::Pending | TaskStatus::Researching) {
            self.set_status(TaskStatus::Ready);
        } else {
            self.touch();
        }
    }

    /// Finalize as personal: no research attached
    pub fn mark_personal(&mut self) {
        debug!(id = %self.id, status = %self.status, "Task::mark_personal: called");
        self.research = None;
        if matches!(self.status, TaskStatus::Pending | TaskStatus::Researching) {
            self.set_status(TaskStatus::Personal);
        } else {
            self.touch();
        }
    }

    /// researching -> pending, after a failed research attempt
    pub fn revert_to_pending(&mut self) -> bool {
        if self.status == TaskStatus::Researching {
            self.set_status(TaskStatus::Pending);
            true
        } else {
            false
        }
    }

    /// ready | personal -> completed
    pub fn complete(&mut self) -> Result<(), TaskError> {
        match self.status {
            TaskStatus::Ready | TaskStatus::Personal => {
                self.set_status(TaskStatus::Completed);
                Ok(())
            }
            from => Err(TaskError::InvalidTransition {
                from,
                action: TaskAction::Complete,
            }),
        }
    }

    /// any non-archived -> archived
    pub fn archive(&mut self) -> Result<(), TaskError> {
        match self.status {
            TaskStatus::Archived => Err(TaskError::InvalidTransition {
                from: TaskStatus::Archived,
                action: TaskAction::Archive,
            }),
            _ => {
                self.set_status(TaskStatus::Archived);
                Ok(())
            }
        }
    }

    /// completed | archived -> ready
    pub fn restore(&mut self) -> Result<(), TaskError> {
        match self.status {
            TaskStatus::Completed | TaskStatus::Archived => {
                self.set_status(TaskStatus::Ready);
                Ok(())
            }
            from => Err(TaskError::InvalidTransition {
                from,
                action: TaskAction::Restore,
            }),
        }
    }

    pub fn rename(&mut self, title: &str) -> Result<(), TaskError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(TaskError::EmptyTitle);
        }
        self.title = title.to_string();
        self.touch();
        Ok(())
    }

    /// Later feedback overwrites earlier feedback
    pub fn set_feedback(&mut self, feedback: Feedback) {
        self.feedback = Some(feedback);
        self.touch();
    }

    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }
}
