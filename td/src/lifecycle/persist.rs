//! Write-behind persistence queue
//!
//! Operations are applied to the store strictly in enqueue order by a single
//! worker. A failed write is logged and published as `PersistFailed`; the
//! board stays the source of truth until a later write succeeds.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use crate::domain::{RateLimitInfo, Task};
use crate::events::{EventBus, TdEvent};
use crate::state::{StateError, StateManager};

/// One pending write
#[derive(Debug, Clone)]
pub enum PersistOp {
    Upsert(Task),
    Delete(String),
    Reorder(Vec<String>),
    SaveRateLimit(RateLimitInfo),
}

impl PersistOp {
    pub fn name(&self) -> &'static str {
        match self {
            PersistOp::Upsert(_) => "upsert",
            PersistOp::Delete(_) => "delete",
            PersistOp::Reorder(_) => "reorder",
            PersistOp::SaveRateLimit(_) => "save_rate_limit",
        }
    }
}

enum QueueMessage {
    Op(PersistOp),
    Flush(oneshot::Sender<()>),
}

#[derive(Clone)]
pub struct PersistQueue {
    tx: mpsc::UnboundedSender<QueueMessage>,
}

impl PersistQueue {
    /// Spawn the worker that drains the queue into `state`
    pub fn spawn(state: StateManager, events: Arc<EventBus>) -> Self {
        debug!("PersistQueue::spawn: called");
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(worker(state, events, rx));
        Self { tx }
    }

    /// Queue a write without waiting for it
    pub fn enqueue(&self, op: PersistOp) {
        debug!(op = op.name(), "PersistQueue::enqueue: called");
        if self.tx.send(QueueMessage::Op(op)).is_err() {
            warn!("Persist worker has stopped; write dropped");
        }
    }

    /// Wait until every write queued so far has been attempted
    pub async fn flush(&self) {
        debug!("PersistQueue::flush: called");
        let (done_tx, done_rx) = oneshot::channel();
        if self.tx.send(QueueMessage::Flush(done_tx)).is_ok() {
            let _ = done_rx.await;
        }
    }
}

async fn apply(state: &StateManager, op: PersistOp) -> Result<(), StateError> {
    match op {
        PersistOp::Upsert(task) => state.upsert_task(task).await,
        PersistOp::Delete(id) => state.delete_task(&id).await,
        PersistOp::Reorder(ids) => state.reorder_tasks(ids).await.map(|_| ()),
        PersistOp::SaveRateLimit(info) => state.save_rate_limit(info).await,
    }
}

async fn worker(state: StateManager, events: Arc<EventBus>, mut rx: mpsc::UnboundedReceiver<QueueMessage>) {
    debug!("PersistQueue worker started");
    while let Some(message) = rx.recv().await {
        match message {
            QueueMessage::Op(op) => {
                let operation = op.name();
                if let Err(e) = apply(&state, op).await {
                    warn!(%operation, error = %e, "Persist failed");
                    events.emit(TdEvent::PersistFailed {
                        operation: operation.to_string(),
                        message: e.to_string(),
                    });
                }
            }
            QueueMessage::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
    debug!("PersistQueue worker stopped");
}
