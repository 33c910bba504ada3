//! A single worker: a loop bound to one model that pulls the head of
//! the highest non-empty lane for that model, runs it through the
//! adapter registry, and reports the outcome back to the lifecycle
//! service.

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use scheduler_adapter::AdapterRegistry;
use scheduler_core::model::ModelId;
use scheduler_core::task::TaskId;
use scheduler_core::SchedulerError;
use scheduler_lifecycle::{StartOutcome, TaskLifecycleService};
use scheduler_queue::QueueManager;
use scheduler_store::ModelStore;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::retry::RetryPolicy;

/// Whether a worker is sitting idle or mid-invocation. Mirrors the
/// dashboard-facing projection the pool manager exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerState {
    Idle,
    Busy,
}

/// Live, dashboard-facing snapshot of one worker.
#[derive(Debug, Clone, serde::Serialize)]
pub struct WorkerStatus {
    pub worker_id: String,
    pub model_id: ModelId,
    pub status: WorkerState,
    pub current_task_id: Option<TaskId>,
    pub start_time: DateTime<Utc>,
    pub last_heartbeat: DateTime<Utc>,
}

/// Shared, lock-protected status cell a worker updates as it moves
/// between idle and busy; the pool manager reads it for `/system` style
/// reporting without needing to talk to the worker's task directly.
pub struct WorkerHandle {
    pub worker_id: String,
    pub model_id: ModelId,
    status: RwLock<WorkerStatus>,
    last_heartbeat_secs: AtomicI64,
    running: AtomicBool,
}

impl WorkerHandle {
    fn new(worker_id: String, model_id: ModelId) -> Arc<Self> {
        let now = Utc::now();
        Arc::new(Self {
            worker_id: worker_id.clone(),
            model_id,
            status: RwLock::new(WorkerStatus {
                worker_id,
                model_id,
                status: WorkerState::Idle,
                current_task_id: None,
                start_time: now,
                last_heartbeat: now,
            }),
            last_heartbeat_secs: AtomicI64::new(now.timestamp()),
            running: AtomicBool::new(true),
        })
    }

    pub fn status(&self) -> WorkerStatus {
        self.status.read().clone()
    }

    fn set_busy(&self, task_id: TaskId) {
        let mut s = self.status.write();
        s.status = WorkerState::Busy;
        s.current_task_id = Some(task_id);
    }

    fn set_idle(&self) {
        let mut s = self.status.write();
        s.status = WorkerState::Idle;
        s.current_task_id = None;
    }

    fn heartbeat(&self) {
        let now = Utc::now();
        self.last_heartbeat_secs.store(now.timestamp(), Ordering::Relaxed);
        self.status.write().last_heartbeat = now;
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    fn stop(&self) {
        self.running.store(false, Ordering::Relaxed);
    }
}

/// Spawns the worker loop as a background task and returns a handle the
/// pool manager keeps for status reporting and shutdown.
#[allow(clippy::too_many_arguments)]
pub fn spawn(
    worker_id: String,
    model_id: ModelId,
    lifecycle: Arc<TaskLifecycleService>,
    models: Arc<ModelStore>,
    queue: Arc<QueueManager>,
    adapters: Arc<AdapterRegistry>,
    retry_policy: RetryPolicy,
    idle_poll_interval: Duration,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> (Arc<WorkerHandle>, tokio::task::JoinHandle<()>) {
    let handle = WorkerHandle::new(worker_id.clone(), model_id);
    let handle_for_task = handle.clone();

    let join = tokio::spawn(async move {
        info!(worker_id = %worker_id, model_id, "worker started");

        loop {
            if shutdown_rx.try_recv().is_ok() {
                break;
            }

            match queue.dequeue(model_id) {
                Ok(Some(entry)) => {
                    handle_for_task.set_busy(entry.task_id);
                    process_one(
                        entry.task_id,
                        &lifecycle,
                        &models,
                        &queue,
                        &adapters,
                        &retry_policy,
                    )
                    .await;
                    handle_for_task.set_idle();
                    handle_for_task.heartbeat();
                }
                Ok(None) => {
                    handle_for_task.heartbeat();
                    tokio::select! {
                        _ = tokio::time::sleep(idle_poll_interval) => {}
                        _ = shutdown_rx.recv() => break,
                    }
                }
                Err(e) => {
                    error!(worker_id = %worker_id, error = %e, "queue dequeue failed");
                    tokio::time::sleep(idle_poll_interval).await;
                }
            }
        }

        handle_for_task.stop();
        info!(worker_id = %worker_id, model_id, "worker stopped");
    });

    (handle, join)
}

async fn process_one(
    task_id: TaskId,
    lifecycle: &TaskLifecycleService,
    models: &ModelStore,
    queue: &QueueManager,
    adapters: &AdapterRegistry,
    retry_policy: &RetryPolicy,
) {
    let task = match lifecycle.start(task_id).await {
        Ok(StartOutcome::Started(task)) => task,
        Ok(StartOutcome::AlreadyResolved) => {
            if let Err(e) = queue.ack(task_id) {
                warn!(task_id, error = %e, "failed to ack already-resolved entry");
            }
            return;
        }
        Err(e) => {
            error!(task_id, error = %e, "failed to start task, leaving in-flight entry for the reaper");
            return;
        }
    };

    let model = match models.get(task.model_id).await {
        Ok(Some(model)) => model,
        Ok(None) => {
            discard_or_log(
                lifecycle
                    .fail(task_id, "model unavailable: deleted or altered", 0, false)
                    .await,
                task_id,
            );
            let _ = queue.ack(task_id);
            return;
        }
        Err(e) => {
            error!(task_id, error = %e, "failed to read model row, leaving in-flight entry for the reaper");
            return;
        }
    };

    let model_config = match serde_json::to_value(&model.config) {
        Ok(v) => v,
        Err(e) => {
            discard_or_log(
                lifecycle.fail(task_id, &format!("bad model config: {e}"), 0, false).await,
                task_id,
            );
            return;
        }
    };

    let adapter = adapters.resolve(&task.task_type, model.model_type);
    let outcome = adapter.invoke(&model_config, &task.task_type, &task.input).await;

    match outcome {
        Ok(output) => {
            discard_or_log(lifecycle.complete(task_id, &output).await, task_id);
        }
        Err(SchedulerError::AdapterError { retryable, message }) if retryable => {
            let delay = retry_policy.delay_for(task.retry_count);
            discard_or_log(lifecycle.fail(task_id, &message, delay, true).await, task_id);
        }
        Err(SchedulerError::AdapterError { message, .. }) => {
            discard_or_log(lifecycle.fail(task_id, &message, 0, false).await, task_id);
        }
        Err(e) => {
            discard_or_log(lifecycle.fail(task_id, &e.to_string(), 0, false).await, task_id);
        }
    }
}

/// A `StateConflict` here means the row was cancelled while the
/// invocation was in flight -- the worker discards the output rather
/// than treating it as an error.
fn discard_or_log(result: scheduler_core::Result<scheduler_core::task::Task>, task_id: TaskId) {
    match result {
        Ok(_) => {}
        Err(SchedulerError::StateConflict(_)) => {
            debug!(task_id, "task resolved (e.g. cancelled) before this worker finished, discarding output");
        }
        Err(e) => {
            error!(task_id, error = %e, "failed to record task outcome");
        }
    }
}
