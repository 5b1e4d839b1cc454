//! StateManager - actor that owns TaskStore
//!
//! Processes commands via channels so every read-modify-write of the task list
//! happens as one step; a reorder is never partially visible.

use std::path::Path;

use taskstore::{Store, namespaced_key};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use super::messages::{StateCommand, StateError, StateResponse};
use super::ordering;
use crate::domain::{RateLimitInfo, Task};

/// Key prefix for the persisted task list
pub const TASKS_KEY: &str = "todone:tasks";

/// Key prefix for the persisted rate-limit record
pub const RATE_LIMIT_KEY: &str = "todone:ratelimit";

/// Handle to send commands to the StateManager
#[derive(Clone)]
pub struct StateManager {
    tx: mpsc::Sender<StateCommand>,
    identity: String,
}

impl StateManager {
    /// Spawn a StateManager over the store in `store_dir`
    pub fn spawn(store_dir: impl AsRef<Path>, identity: &str) -> eyre::Result<Self> {
        debug!(store_dir = %store_dir.as_ref().display(), %identity, "StateManager::spawn: called");
        let store = Store::open(store_dir.as_ref())?;
        Ok(Self::spawn_with_store(store, identity))
    }

    /// Spawn a StateManager over a throwaway in-memory store
    pub fn spawn_in_memory(identity: &str) -> eyre::Result<Self> {
        debug!(%identity, "StateManager::spawn_in_memory: called");
        let store = Store::open_in_memory()?;
        Ok(Self::spawn_with_store(store, identity))
    }

    fn spawn_with_store(store: Store, identity: &str) -> Self {
        let (tx, rx) = mpsc::channel(256);
        let keys = Keys {
            tasks: namespaced_key(TASKS_KEY, identity),
            rate_limit: namespaced_key(RATE_LIMIT_KEY, identity),
        };
        tokio::spawn(actor_loop(store, keys, rx));
        info!(%identity, "StateManager spawned");
        Self {
            tx,
            identity: identity.to_string(),
        }
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    async fn request<T>(&self, make: impl FnOnce(oneshot::Sender<StateResponse<T>>) -> StateCommand) -> StateResponse<T> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(make(reply_tx))
            .await
            .map_err(|_| StateError::ChannelError)?;
        reply_rx.await.map_err(|_| StateError::ChannelError)?
    }

    // === Task reads ===

    /// All tasks sorted by order; an unreadable store yields an empty list
    pub async fn list_tasks(&self) -> StateResponse<Vec<Task>> {
        debug!("StateManager::list_tasks: called");
        self.request(|reply| StateCommand::ListTasks { reply }).await
    }

    pub async fn get_task(&self, id: &str) -> StateResponse<Option<Task>> {
        debug!(%id, "StateManager::get_task: called");
        let id = id.to_string();
        self.request(|reply| StateCommand::GetTask { id, reply }).await
    }

    // === Task writes ===

    /// Replace a task record, inserting it if absent
    pub async fn upsert_task(&self, task: Task) -> StateResponse<()> {
        debug!(id = %task.id, "StateManager::upsert_task: called");
        self.request(|reply| StateCommand::UpsertTask { task, reply }).await
    }

    pub async fn delete_task(&self, id: &str) -> StateResponse<()> {
        debug!(%id, "StateManager::delete_task: called");
        let id = id.to_string();
        self.request(|reply| StateCommand::DeleteTask { id, reply }).await
    }

    /// Reorder atomically; returns the list in its new order
    pub async fn reorder_tasks(&self, ids: Vec<String>) -> StateResponse<Vec<Task>> {
        debug!(count = ids.len(), "StateManager::reorder_tasks: called");
        self.request(|reply| StateCommand::ReorderTasks { ids, reply }).await
    }

    // === Rate limit ===

    pub async fn load_rate_limit(&self) -> StateResponse<Option<RateLimitInfo>> {
        debug!("StateManager::load_rate_limit: called");
        self.request(|reply| StateCommand::LoadRateLimit { reply }).await
    }

    pub async fn save_rate_limit(&self, info: RateLimitInfo) -> StateResponse<()> {
        debug!(count = info.count, reset_at = info.reset_at, "StateManager::save_rate_limit: called");
        self.request(|reply| StateCommand::SaveRateLimit { info, reply }).await
    }

    /// Remove the task list and rate-limit record for this identity
    pub async fn clear_all(&self) -> StateResponse<()> {
        debug!("StateManager::clear_all: called");
        self.request(|reply| StateCommand::ClearAll { reply }).await
    }

    /// Shutdown the actor
    pub async fn shutdown(&self) -> StateResponse<()> {
        debug!("StateManager::shutdown: called");
        self.tx
            .send(StateCommand::Shutdown)
            .await
            .map_err(|_| StateError::ChannelError)
    }
}

struct Keys {
    tasks: String,
    rate_limit: String,
}

fn read_tasks(store: &Store, key: &str) -> StateResponse<Vec<Task>> {
    let raw = store.get_raw(key).map_err(|e| StateError::StoreError(e.to_string()))?;
    let mut tasks: Vec<Task> = match raw {
        Some(raw) => serde_json::from_str(&raw).map_err(|e| StateError::Deserialization(e.to_string()))?,
        None => Vec::new(),
    };
    ordering::sort_by_order(&mut tasks);
    Ok(tasks)
}

/// Reads fail open: a broken store looks empty rather than crashing the caller
fn read_tasks_or_empty(store: &Store, key: &str) -> Vec<Task> {
    read_tasks(store, key).unwrap_or_else(|e| {
        warn!(%key, error = %e, "Failed to read tasks, using empty list");
        Vec::new()
    })
}

fn write_tasks(store: &mut Store, key: &str, tasks: &[Task]) -> StateResponse<()> {
    store
        .put_json(key, &tasks)
        .map_err(|e| StateError::StoreError(e.to_string()))
}

/// The actor loop that processes commands
async fn actor_loop(mut store: Store, keys: Keys, mut rx: mpsc::Receiver<StateCommand>) {
    debug!(tasks_key = %keys.tasks, "actor_loop: called");
    let key = keys.tasks.as_str();

    while let Some(cmd) = rx.recv().await {
        match cmd {
            StateCommand::ListTasks { reply } => {
                debug!("actor_loop: ListTasks command");
                let _ = reply.send(Ok(read_tasks_or_empty(&store, key)));
            }

            StateCommand::GetTask { id, reply } => {
                debug!(%id, "actor_loop: GetTask command");
                let task = read_tasks_or_empty(&store, key).into_iter().find(|t| t.id == id);
                let _ = reply.send(Ok(task));
            }

            StateCommand::UpsertTask { task, reply } => {
                debug!(id = %task.id, "actor_loop: UpsertTask command");
                let result = read_tasks(&store, key).and_then(|mut tasks| {
                    match tasks.iter_mut().find(|t| t.id == task.id) {
                        Some(slot) => *slot = task,
                        None => tasks.push(task),
                    }
                    ordering::sort_by_order(&mut tasks);
                    write_tasks(&mut store, key, &tasks)
                });
                let _ = reply.send(result);
            }

            StateCommand::DeleteTask { id, reply } => {
                debug!(%id, "actor_loop: DeleteTask command");
                let result = read_tasks(&store, key).and_then(|mut tasks| {
                    let before = tasks.len();
                    tasks.retain(|t| t.id != id);
                    if tasks.len() == before {
                        return Err(StateError::NotFound(id.clone()));
                    }
                    write_tasks(&mut store, key, &tasks)
                });
                let _ = reply.send(result);
            }

            StateCommand::ReorderTasks { ids, reply } => {
                debug!(count = ids.len(), "actor_loop: ReorderTasks command");
                let result = read_tasks(&store, key).and_then(|tasks| {
                    let tasks = ordering::reorder(tasks, &ids);
                    write_tasks(&mut store, key, &tasks)?;
                    Ok(tasks)
                });
                let _ = reply.send(result);
            }

            StateCommand::LoadRateLimit { reply } => {
                debug!("actor_loop: LoadRateLimit command");
                let info = store.get_json::<RateLimitInfo>(&keys.rate_limit).unwrap_or_else(|e| {
                    warn!(error = %e, "Failed to read rate limit, treating as unset");
                    None
                });
                let _ = reply.send(Ok(info));
            }

            StateCommand::SaveRateLimit { info, reply } => {
                debug!(count = info.count, "actor_loop: SaveRateLimit command");
                let result = store
                    .put_json(&keys.rate_limit, &info)
                    .map_err(|e| StateError::StoreError(e.to_string()));
                let _ = reply.send(result);
            }

            StateCommand::ClearAll { reply } => {
                debug!("actor_loop: ClearAll command");
                let result = store
                    .remove(&keys.tasks)
                    .and_then(|_| store.remove(&keys.rate_limit))
                    .map(|_| ())
                    .map_err(|e| StateError::StoreError(e.to_string()));
                let _ = reply.send(result);
            }

            StateCommand::Shutdown => {
                info!("StateManager shutting down");
                break;
            }
        }
    }

    debug!("StateManager actor stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TaskStatus;
    use tempfile::tempdir;

    fn task(id: &str, title: &str, order: i64) -> Task {
        Task::with_id(id, title, order).unwrap()
    }

    #[tokio::test]
    async fn test_upsert_get_delete() {
        let manager = StateManager::spawn_in_memory("default").unwrap();

        let first = task("t1", "Book dentist", 0);
        let second = task("t2", "Find flights", 1);
        manager.upsert_task(second.clone()).await.unwrap();
        manager.upsert_task(first.clone()).await.unwrap();

        let listed = manager.list_tasks().await.unwrap();
        assert_eq!(listed, vec![first.clone(), second.clone()]);
        assert_eq!(manager.get_task("t1").await.unwrap().unwrap(), first);

        let mut updated = first.clone();
        updated.start_research().unwrap();
        manager.upsert_task(updated).await.unwrap();
        assert_eq!(
            manager.get_task("t1").await.unwrap().unwrap().status,
            TaskStatus::Researching
        );
        assert_eq!(manager.list_tasks().await.unwrap().len(), 2);

        manager.delete_task("t1").await.unwrap();
        let remaining = manager.list_tasks().await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, "t2");

        assert!(matches!(manager.delete_task("t1").await, Err(StateError::NotFound(_))));
        manager.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_reorder_moves_last_to_first() {
        let manager = StateManager::spawn_in_memory("default").unwrap();
        for (i, id) in ["a", "b", "c", "d"].iter().enumerate() {
            manager.upsert_task(task(id, id, i as i64)).await.unwrap();
        }

        let requested: Vec<String> = ["d", "a", "b", "c"].iter().map(|s| s.to_string()).collect();
        let reordered = manager.reorder_tasks(requested.clone()).await.unwrap();
        let listed = manager.list_tasks().await.unwrap();

        assert_eq!(reordered, listed);
        assert_eq!(listed.iter().map(|t| t.id.clone()).collect::<Vec<_>>(), requested);
        assert_eq!(listed.iter().map(|t| t.order).collect::<Vec<_>>(), vec![0, 1, 2, 3]);
    }

    #[tokio::test]
    async fn test_persists_across_restart_per_identity() {
        let temp = tempdir().unwrap();
        {
            let manager = StateManager::spawn(temp.path(), "alice").unwrap();
            manager.upsert_task(task("t1", "Book dentist", 0)).await.unwrap();
            manager
                .save_rate_limit(RateLimitInfo { count: 3, reset_at: 42 })
                .await
                .unwrap();
            manager.shutdown().await.unwrap();
        }

        let alice = StateManager::spawn(temp.path(), "alice").unwrap();
        assert_eq!(alice.list_tasks().await.unwrap().len(), 1);
        assert_eq!(alice.load_rate_limit().await.unwrap().unwrap().count, 3);

        let bob = StateManager::spawn(temp.path(), "bob").unwrap();
        assert!(bob.list_tasks().await.unwrap().is_empty());
        assert!(bob.load_rate_limit().await.unwrap().is_none());

        alice.clear_all().await.unwrap();
        assert!(alice.list_tasks().await.unwrap().is_empty());
        assert!(alice.load_rate_limit().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_corrupted_store_reads_empty() {
        let temp = tempdir().unwrap();
        {
            let mut store = Store::open(temp.path()).unwrap();
            store.put_raw("todone:tasks:default", "{not json").unwrap();
            store.put_raw("todone:ratelimit:default", "[]").unwrap();
        }

        let manager = StateManager::spawn(temp.path(), "default").unwrap();
        assert!(manager.list_tasks().await.unwrap().is_empty());
        assert!(manager.get_task("x").await.unwrap().is_none());
        assert!(manager.load_rate_limit().await.unwrap().is_none());

        // Writes refuse to clobber what they cannot read
        assert!(matches!(
            manager.upsert_task(task("t1", "Book dentist", 0)).await,
            Err(StateError::Deserialization(_))
        ));
        assert!(matches!(
            manager.reorder_tasks(vec!["t1".to_string()]).await,
            Err(StateError::Deserialization(_))
        ));
    }
}
