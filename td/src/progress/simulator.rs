//! Progress simulator
//!
//! Steps a task through the fixed stages on a wall-clock interval while its
//! research call is outstanding. The timer knows nothing about the real call;
//! the caller tears it down with `stop` once research finishes either way.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{Instant, interval_at};
use tracing::debug;

use super::stages::{LAST_STAGE, PROGRESS_STAGES, ProgressStatus};
use crate::events::{EventBus, TdEvent};

/// Identifies one `start` call; a stale handle cannot stop a newer run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressHandle {
    task_id: String,
    generation: u64,
}

impl ProgressHandle {
    pub fn task_id(&self) -> &str {
        &self.task_id
    }
}

struct Entry {
    generation: u64,
    index: usize,
    timer: JoinHandle<()>,
}

#[derive(Default)]
struct SimulatorInner {
    entries: HashMap<String, Entry>,
    next_generation: u64,
}

/// Per-task simulated progress, one timer per task id
#[derive(Clone)]
pub struct ProgressSimulator {
    tick: Duration,
    events: Arc<EventBus>,
    inner: Arc<Mutex<SimulatorInner>>,
}

impl ProgressSimulator {
    pub fn new(tick: Duration, events: Arc<EventBus>) -> Self {
        debug!(?tick, "ProgressSimulator::new: called");
        Self {
            tick,
            events,
            inner: Arc::new(Mutex::new(SimulatorInner::default())),
        }
    }

    /// Show the first stage immediately and start ticking
    ///
    /// Starting a task that is already running restarts it from the first stage.
    pub async fn start(&self, task_id: &str) -> ProgressHandle {
        debug!(%task_id, "ProgressSimulator::start: called");
        let mut inner = self.inner.lock().await;
        let generation = inner.next_generation;
        inner.next_generation += 1;

        let timer = tokio::spawn(Self::run_timer(
            self.inner.clone(),
            self.events.clone(),
            task_id.to_string(),
            generation,
            self.tick,
        ));

        if let Some(previous) = inner.entries.insert(
            task_id.to_string(),
            Entry {
                generation,
                index: 0,
                timer,
            },
        ) {
            debug!(%task_id, "ProgressSimulator::start: replacing running simulation");
            previous.timer.abort();
        }

        self.emit_stage(task_id, 0);
        ProgressHandle {
            task_id: task_id.to_string(),
            generation,
        }
    }

    async fn run_timer(
        inner: Arc<Mutex<SimulatorInner>>,
        events: Arc<EventBus>,
        task_id: String,
        generation: u64,
        tick: Duration,
    ) {
        let mut interval = interval_at(Instant::now() + tick, tick);
        loop {
            interval.tick().await;
            let mut guard = inner.lock().await;
            let Some(entry) = guard.entries.get_mut(&task_id).filter(|e| e.generation == generation) else {
                return;
            };
            if entry.index >= LAST_STAGE {
                // Capped at the final stage; nothing left to advance
                return;
            }
            entry.index += 1;
            let status = PROGRESS_STAGES[entry.index];
            drop(guard);

            debug!(%task_id, stage = ?status.stage, "ProgressSimulator: advanced");
            events.emit(TdEvent::ProgressUpdated {
                task_id: task_id.clone(),
                stage: status.stage,
                message: status.message.to_string(),
                progress: status.progress,
            });
        }
    }

    fn emit_stage(&self, task_id: &str, index: usize) {
        let status = PROGRESS_STAGES[index];
        self.events.emit(TdEvent::ProgressUpdated {
            task_id: task_id.to_string(),
            stage: status.stage,
            message: status.message.to_string(),
            progress: status.progress,
        });
    }

    /// Tear down the simulation and clear its displayed progress
    ///
    /// Returns false if the handle is stale or already stopped.
    pub async fn stop(&self, handle: &ProgressHandle) -> bool {
        debug!(task_id = %handle.task_id, generation = handle.generation, "ProgressSimulator::stop: called");
        let mut inner = self.inner.lock().await;
        let current = inner
            .entries
            .get(&handle.task_id)
            .is_some_and(|e| e.generation == handle.generation);
        if !current {
            return false;
        }
        if let Some(entry) = inner.entries.remove(&handle.task_id) {
            entry.timer.abort();
        }
        drop(inner);

        self.events.emit(TdEvent::ProgressCleared {
            task_id: handle.task_id.clone(),
        });
        true
    }

    /// Currently displayed progress for a task
    pub async fn get(&self, task_id: &str) -> Option<ProgressStatus> {
        self.inner
            .lock()
            .await
            .entries
            .get(task_id)
            .map(|e| PROGRESS_STAGES[e.index])
    }

    /// Progress of every task with research outstanding
    pub async fn snapshot(&self) -> HashMap<String, ProgressStatus> {
        self.inner
            .lock()
            .await
            .entries
            .iter()
            .map(|(id, e)| (id.clone(), PROGRESS_STAGES[e.index]))
            .collect()
    }

    pub async fn active_count(&self) -> usize {
        self.inner.lock().await.entries.len()
    }
}
