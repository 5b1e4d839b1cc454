//! In-memory task board
//!
//! The optimistic layer: mutations land here first and are visible at once,
//! while the persist queue catches the store up behind them. Each write is
//! queued under the same lock as the mutation it records, so the store
//! replays changes in exactly the order the board applied them.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::debug;

use super::error::LifecycleError;
use super::persist::{PersistOp, PersistQueue};
use crate::domain::{RateLimitInfo, Task, TaskError};
use crate::state::ordering;

struct BoardInner {
    /// Always sorted by order
    tasks: Vec<Task>,
    rate_limit: Option<RateLimitInfo>,
}

#[derive(Clone)]
pub struct TaskBoard {
    inner: Arc<Mutex<BoardInner>>,
    persist: PersistQueue,
}

impl TaskBoard {
    pub fn new(mut tasks: Vec<Task>, rate_limit: Option<RateLimitInfo>, persist: PersistQueue) -> Self {
        debug!(count = tasks.len(), "TaskBoard::new: called");
        ordering::sort_by_order(&mut tasks);
        Self {
            inner: Arc::new(Mutex::new(BoardInner { tasks, rate_limit })),
            persist,
        }
    }

    pub async fn tasks(&self) -> Vec<Task> {
        self.inner.lock().await.tasks.clone()
    }

    pub async fn get(&self, id: &str) -> Option<Task> {
        self.inner.lock().await.tasks.iter().find(|t| t.id == id).cloned()
    }

    /// Create a task at the end of the list
    pub async fn add(&self, title: &str) -> Result<Task, LifecycleError> {
        debug!(%title, "TaskBoard::add: called");
        let mut inner = self.inner.lock().await;
        let task = Task::new(title, ordering::next_order(&inner.tasks))?;
        inner.tasks.push(task.clone());
        ordering::sort_by_order(&mut inner.tasks);
        self.persist.enqueue(PersistOp::Upsert(task.clone()));
        Ok(task)
    }

    /// Apply a fallible transition; the task is left untouched on error
    pub async fn mutate(
        &self,
        id: &str,
        f: impl FnOnce(&mut Task) -> Result<(), TaskError>,
    ) -> Result<Task, LifecycleError> {
        debug!(%id, "TaskBoard::mutate: called");
        let mut inner = self.inner.lock().await;
        let task = inner
            .tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| LifecycleError::TaskNotFound(id.to_string()))?;
        let mut draft = task.clone();
        f(&mut draft)?;
        *task = draft.clone();
        self.persist.enqueue(PersistOp::Upsert(draft.clone()));
        Ok(draft)
    }

    /// Apply an infallible change if the task still exists
    pub async fn try_update(&self, id: &str, f: impl FnOnce(&mut Task)) -> Option<Task> {
        let mut inner = self.inner.lock().await;
        let task = inner.tasks.iter_mut().find(|t| t.id == id)?;
        f(task);
        let updated = task.clone();
        self.persist.enqueue(PersistOp::Upsert(updated.clone()));
        Some(updated)
    }

    pub async fn remove(&self, id: &str) -> Option<Task> {
        debug!(%id, "TaskBoard::remove: called");
        let mut inner = self.inner.lock().await;
        let pos = inner.tasks.iter().position(|t| t.id == id)?;
        let task = inner.tasks.remove(pos);
        self.persist.enqueue(PersistOp::Delete(task.id.clone()));
        Some(task)
    }

    /// Reorder under one lock so no partial order is ever observable
    pub async fn reorder(&self, ids: &[String]) -> Vec<Task> {
        debug!(count = ids.len(), "TaskBoard::reorder: called");
        let mut inner = self.inner.lock().await;
        let tasks = std::mem::take(&mut inner.tasks);
        inner.tasks = ordering::reorder(tasks, ids);
        let task_ids = inner.tasks.iter().map(|t| t.id.clone()).collect();
        self.persist.enqueue(PersistOp::Reorder(task_ids));
        inner.tasks.clone()
    }

    pub async fn rate_limit(&self) -> Option<RateLimitInfo> {
        self.inner.lock().await.rate_limit
    }

    pub async fn set_rate_limit(&self, info: RateLimitInfo) {
        let mut inner = self.inner.lock().await;
        inner.rate_limit = Some(info);
        self.persist.enqueue(PersistOp::SaveRateLimit(info));
    }

    /// Wait until every write queued so far has been attempted
    pub async fn flush(&self) {
        self.persist.flush().await;
    }
}
