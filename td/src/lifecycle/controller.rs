//! Task lifecycle controller
//!
//! Orchestrates adding a task: classify it, mark it researching, run the
//! progress simulator alongside the governor call, and reconcile whatever
//! comes back onto the board. Every mutation is applied to the board first
//! and persisted behind it.

use std::sync::Arc;

use taskstore::now_ms;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::board::TaskBoard;
use super::error::LifecycleError;
use super::persist::PersistQueue;
use crate::classifier::is_personal_task;
use crate::domain::{Feedback, RateLimitInfo, Research, Task, TaskError, TaskStatus};
use crate::events::{EventBus, TdEvent};
use crate::governor::{Governor, GovernorReply, Quota, ReplyStatus};
use crate::progress::{ProgressHandle, ProgressSimulator, ProgressStatus};
use crate::state::{StateManager, ordering};

/// Message shown when a failure carries no text of its own
pub const RESEARCH_FAILED: &str = "Research failed";

/// An in-flight research call for one task
#[derive(Debug)]
pub struct ResearchJob {
    task_id: String,
    handle: JoinHandle<()>,
}

impl ResearchJob {
    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    /// Wait for the result to be reconciled onto the board
    pub async fn wait(self) -> Result<(), LifecycleError> {
        self.handle.await.map_err(|e| LifecycleError::Join(e.to_string()))
    }
}

/// Result of adding a task
#[derive(Debug)]
pub struct AddedTask {
    pub task: Task,
    /// None when the task was finalized as personal
    pub research: Option<ResearchJob>,
}

enum Outcome {
    Researched(Research),
    Personal,
    Failed(String),
}

impl Outcome {
    fn from_reply(reply: GovernorReply) -> Self {
        let response = reply.response;
        let error = || response.error.clone().unwrap_or_else(|| RESEARCH_FAILED.to_string());
        match reply.status {
            ReplyStatus::Ok if response.is_personal == Some(true) => Outcome::Personal,
            ReplyStatus::Ok => match response.research.clone() {
                Some(research) => Outcome::Researched(research),
                None => Outcome::Failed(error()),
            },
            ReplyStatus::RateLimited | ReplyStatus::Failed => Outcome::Failed(error()),
        }
    }
}

struct ControllerInner {
    board: TaskBoard,
    governor: Arc<Governor>,
    progress: ProgressSimulator,
    events: Arc<EventBus>,
    identity: String,
}

#[derive(Clone)]
pub struct LifecycleController {
    inner: Arc<ControllerInner>,
}

impl LifecycleController {
    /// Load the board from the store and start the persist worker
    pub async fn load(
        state: StateManager,
        governor: Arc<Governor>,
        progress: ProgressSimulator,
        events: Arc<EventBus>,
    ) -> Result<Self, LifecycleError> {
        let identity = state.identity().to_string();
        debug!(%identity, "LifecycleController::load: called");

        let tasks = state.list_tasks().await?;
        let rate_limit = state.load_rate_limit().await?;
        if let Some(info) = rate_limit {
            governor.restore_quota(&identity, info).await;
        }
        info!(count = tasks.len(), %identity, "Loaded tasks");

        Ok(Self {
            inner: Arc::new(ControllerInner {
                board: TaskBoard::new(tasks, rate_limit, PersistQueue::spawn(state, events.clone())),
                governor,
                progress,
                events,
                identity,
            }),
        })
    }

    // === Reads ===

    pub async fn tasks(&self) -> Vec<Task> {
        self.inner.board.tasks().await
    }

    pub async fn get(&self, id: &str) -> Option<Task> {
        self.inner.board.get(id).await
    }

    pub async fn active_tasks(&self) -> Vec<Task> {
        self.tasks().await.into_iter().filter(Task::is_active).collect()
    }

    pub async fn completed_tasks(&self) -> Vec<Task> {
        self.tasks_with_status(TaskStatus::Completed).await
    }

    pub async fn archived_tasks(&self) -> Vec<Task> {
        self.tasks_with_status(TaskStatus::Archived).await
    }

    async fn tasks_with_status(&self, status: TaskStatus) -> Vec<Task> {
        self.tasks().await.into_iter().filter(|t| t.status == status).collect()
    }

    /// Simulated progress for a task with research outstanding
    pub async fn progress(&self, id: &str) -> Option<ProgressStatus> {
        self.inner.progress.get(id).await
    }

    /// Research requests left in the current window
    pub async fn remaining_requests(&self) -> u32 {
        let max = self.inner.governor.config().rate_limit_max;
        match self.inner.board.rate_limit().await {
            Some(info) if !info.is_expired(now_ms()) => info.remaining(max),
            _ => max,
        }
    }

    /// End of the current quota window, if one is open
    pub async fn quota_reset_at(&self) -> Option<i64> {
        self.inner
            .board
            .rate_limit()
            .await
            .filter(|info| !info.is_expired(now_ms()))
            .map(|info| info.reset_at)
    }

    /// Wait until every queued write has reached the store
    pub async fn flush(&self) {
        self.inner.board.flush().await;
    }

    // === Adding and researching ===

    /// Add a task and, unless it is personal, start researching it
    pub async fn add_task(&self, title: &str) -> Result<AddedTask, LifecycleError> {
        debug!(%title, "LifecycleController::add_task: called");
        let task = self.inner.board.add(title).await?;
        let id = task.id.clone();

        self.inner.events.emit(TdEvent::TaskCreated {
            task_id: id.clone(),
            title: task.title.clone(),
        });
        info!(%id, title = %task.title, "Task added");

        if is_personal_task(&task.title) {
            debug!(%id, "LifecycleController::add_task: personal task");
            let task = self
                .commit(&id, |t| {
                    t.mark_personal();
                    Ok(())
                })
                .await?;
            return Ok(AddedTask { task, research: None });
        }

        let (task, job) = self.begin_research(&id).await?;
        Ok(AddedTask {
            task,
            research: Some(job),
        })
    }

    /// Research a pending task again, typically after a failure
    pub async fn retry_research(&self, id: &str) -> Result<(Task, ResearchJob), LifecycleError> {
        debug!(%id, "LifecycleController::retry_research: called");
        self.begin_research(id).await
    }

    async fn begin_research(&self, id: &str) -> Result<(Task, ResearchJob), LifecycleError> {
        let task = self.commit(id, Task::start_research).await?;
        let handle = self.inner.progress.start(id).await;

        let this = self.clone();
        let task_id = id.to_string();
        let title = task.title.clone();
        let join = tokio::spawn(async move {
            let reply = this
                .inner
                .governor
                .research(&task_id, &title, &this.inner.identity)
                .await;
            this.reconcile(&task_id, reply, handle).await;
        });

        Ok((
            task,
            ResearchJob {
                task_id: id.to_string(),
                handle: join,
            },
        ))
    }

    async fn reconcile(&self, task_id: &str, reply: GovernorReply, handle: ProgressHandle) {
        debug!(%task_id, status = ?reply.status, "LifecycleController::reconcile: called");
        self.inner.progress.stop(&handle).await;

        if let Some(quota) = reply.quota {
            self.record_quota(quota).await;
        }

        let outcome = Outcome::from_reply(reply);
        let failure = match &outcome {
            Outcome::Failed(message) => Some(message.clone()),
            _ => None,
        };

        let updated = self
            .inner
            .board
            .try_update(task_id, |task| match outcome {
                Outcome::Researched(research) => task.apply_research(research),
                Outcome::Personal => task.mark_personal(),
                Outcome::Failed(_) => {
                    task.revert_to_pending();
                }
            })
            .await;

        let Some(task) = updated else {
            debug!(%task_id, "LifecycleController::reconcile: task deleted, discarding result");
            return;
        };

        self.inner.events.emit(TdEvent::TaskUpdated {
            task_id: task_id.to_string(),
            status: task.status,
        });

        match failure {
            Some(message) => {
                warn!(%task_id, %message, "Research failed");
                self.inner.events.emit(TdEvent::ResearchFailed {
                    task_id: task_id.to_string(),
                    message,
                });
            }
            None => info!(%task_id, status = %task.status, "Research reconciled"),
        }
    }

    async fn record_quota(&self, quota: Quota) {
        let max = self.inner.governor.config().rate_limit_max;
        let info = RateLimitInfo {
            count: max.saturating_sub(quota.remaining),
            reset_at: quota.reset_at,
        };
        debug!(count = info.count, reset_at = info.reset_at, "LifecycleController::record_quota: called");
        self.inner.board.set_rate_limit(info).await;
    }

    // === Transitions ===

    /// Apply a transition on the board and announce it
    async fn commit(
        &self,
        id: &str,
        f: impl FnOnce(&mut Task) -> Result<(), TaskError>,
    ) -> Result<Task, LifecycleError> {
        let task = self.inner.board.mutate(id, f).await?;
        self.inner.events.emit(TdEvent::TaskUpdated {
            task_id: task.id.clone(),
            status: task.status,
        });
        Ok(task)
    }

    pub async fn complete(&self, id: &str) -> Result<Task, LifecycleError> {
        debug!(%id, "LifecycleController::complete: called");
        self.commit(id, Task::complete).await
    }

    pub async fn archive(&self, id: &str) -> Result<Task, LifecycleError> {
        debug!(%id, "LifecycleController::archive: called");
        self.commit(id, Task::archive).await
    }

    pub async fn restore(&self, id: &str) -> Result<Task, LifecycleError> {
        debug!(%id, "LifecycleController::restore: called");
        self.commit(id, Task::restore).await
    }

    pub async fn rename(&self, id: &str, title: &str) -> Result<Task, LifecycleError> {
        debug!(%id, %title, "LifecycleController::rename: called");
        self.commit(id, |t| t.rename(title)).await
    }

    pub async fn set_feedback(&self, id: &str, feedback: Feedback) -> Result<Task, LifecycleError> {
        debug!(%id, kind = ?feedback.kind, "LifecycleController::set_feedback: called");
        self.commit(id, |t| {
            t.set_feedback(feedback);
            Ok(())
        })
        .await
    }

    /// Remove a task; research still in flight for it is discarded on arrival
    pub async fn delete(&self, id: &str) -> Result<Task, LifecycleError> {
        debug!(%id, "LifecycleController::delete: called");
        let task = self
            .inner
            .board
            .remove(id)
            .await
            .ok_or_else(|| LifecycleError::TaskNotFound(id.to_string()))?;
        self.inner.events.emit(TdEvent::TaskDeleted { task_id: id.to_string() });
        Ok(task)
    }

    // === Ordering ===

    /// Put the named tasks first, in the given order
    pub async fn reorder(&self, ids: &[String]) -> Vec<Task> {
        debug!(count = ids.len(), "LifecycleController::reorder: called");
        let tasks = self.inner.board.reorder(ids).await;
        let task_ids: Vec<String> = tasks.iter().map(|t| t.id.clone()).collect();
        self.inner.events.emit(TdEvent::TasksReordered { task_ids });
        tasks
    }

    pub async fn move_to_top(&self, id: &str) -> Result<Vec<Task>, LifecycleError> {
        debug!(%id, "LifecycleController::move_to_top: called");
        let tasks = self.existing_tasks(id).await?;
        Ok(self.reorder(&ordering::ids_with_first(&tasks, id)).await)
    }

    pub async fn move_to_bottom(&self, id: &str) -> Result<Vec<Task>, LifecycleError> {
        debug!(%id, "LifecycleController::move_to_bottom: called");
        let tasks = self.existing_tasks(id).await?;
        Ok(self.reorder(&ordering::ids_with_last(&tasks, id)).await)
    }

    async fn existing_tasks(&self, id: &str) -> Result<Vec<Task>, LifecycleError> {
        let tasks = self.tasks().await;
        if tasks.iter().any(|t| t.id == id) {
            Ok(tasks)
        } else {
            Err(LifecycleError::TaskNotFound(id.to_string()))
        }
    }
}
