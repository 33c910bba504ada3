//! The only component allowed to mutate task rows: create/cancel/retry
//! plus the start/complete/fail calls workers make as they process a
//! task, each gated on the row's expected prior status and each paired
//! with a queue-side effect and a `TaskLog` entry.

use scheduler_core::error::SchedulerError;
use scheduler_core::model::ModelId;
use scheduler_core::task::{Priority, Task, TaskId, TaskStatus};
use scheduler_core::task_log::{LogLevel, TaskLog};
use scheduler_core::Result;
use scheduler_queue::{QueueEntry, QueueManager};
use scheduler_store::task_store::TaskFilters;
use scheduler_store::{ModelStore, TaskLogStore, TaskStore};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Outcome of a worker's attempt to start a dequeued task. A worker
/// sees `AlreadyResolved` for an entry that was cancelled (or otherwise
/// moved on) while it sat in the queue; the caller should `ack` and
/// move on without invoking an adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartOutcome {
    Started(Task),
    AlreadyResolved,
}

pub struct TaskLifecycleService {
    tasks: TaskStore,
    models: ModelStore,
    logs: TaskLogStore,
    queue: Arc<QueueManager>,
}

impl TaskLifecycleService {
    pub fn new(tasks: TaskStore, models: ModelStore, logs: TaskLogStore, queue: Arc<QueueManager>) -> Self {
        Self {
            tasks,
            models,
            logs,
            queue,
        }
    }

    /// Validates the model exists, writes a `pending` row, and enqueues
    /// it into the lane matching its priority (default medium).
    #[instrument(skip(self, input))]
    pub async fn create(
        &self,
        model_id: ModelId,
        task_type: String,
        input: String,
        priority: Option<Priority>,
    ) -> Result<Task> {
        if self.models.get(model_id).await?.is_none() {
            return Err(SchedulerError::NotFound(format!("model {model_id}")));
        }

        let mut task = Task::new(model_id, task_type, input, priority.unwrap_or_default());
        task = self.tasks.create(&task).await?;

        self.queue
            .enqueue(&QueueEntry::new(task.id, model_id, task.priority))?;
        self.log(task.id, LogLevel::Info, "created").await;

        info!(task_id = task.id, model_id, "task created");
        Ok(task)
    }

    /// `{pending,running} -> cancelled`. For a task that was running,
    /// also drops the in-flight queue entry. For a task that was still
    /// pending, removes its queue entry outright so a terminal row
    /// never leaves one behind.
    #[instrument(skip(self))]
    pub async fn cancel(&self, task_id: TaskId) -> Result<Task> {
        let was_running = self
            .tasks
            .transition_to_cancelled(task_id)
            .await?
            .ok_or_else(|| SchedulerError::StateConflict(format!("task {task_id} is not pending or running")))?;

        if was_running {
            self.queue.ack(task_id)?;
        } else {
            self.queue.remove_pending(task_id)?;
        }

        self.log(task_id, LogLevel::Info, "cancelled").await;
        self.fetch(task_id).await
    }

    /// `failed -> pending`, only when `retry_count < max_retries`.
    #[instrument(skip(self))]
    pub async fn retry(&self, task_id: TaskId) -> Result<Task> {
        let ok = self.tasks.retry_from_failed(task_id).await?;
        if !ok {
            return Err(SchedulerError::StateConflict(format!(
                "task {task_id} is not retryable (not failed, or retry budget exhausted)"
            )));
        }

        let task = self.fetch(task_id).await?;
        self.queue
            .enqueue(&QueueEntry::new(task.id, task.model_id, task.priority))?;
        self.log(task_id, LogLevel::Info, "retried by operator").await;
        Ok(task)
    }

    /// Called by a worker after it dequeues an entry for `task_id`.
    /// Returns `AlreadyResolved` if the row is no longer `pending`
    /// (e.g. cancelled while queued) rather than erroring.
    #[instrument(skip(self))]
    pub async fn start(&self, task_id: TaskId) -> Result<StartOutcome> {
        if self.tasks.transition_to_running(task_id).await? {
            self.log(task_id, LogLevel::Info, "started").await;
            Ok(StartOutcome::Started(self.fetch(task_id).await?))
        } else {
            warn!(task_id, "start called on a task that is no longer pending");
            Ok(StartOutcome::AlreadyResolved)
        }
    }

    /// `running -> completed`. Bumps the model's request counters and
    /// drops the in-flight queue entry.
    #[instrument(skip(self, output))]
    pub async fn complete(&self, task_id: TaskId, output: &str) -> Result<Task> {
        if !self.tasks.transition_to_completed(task_id, output).await? {
            return Err(SchedulerError::StateConflict(format!("task {task_id} is not running")));
        }

        let task = self.fetch(task_id).await?;
        self.models.increment_request_count(task.model_id, true).await?;
        self.queue.ack(task_id)?;
        self.log(task_id, LogLevel::Info, "completed").await;
        Ok(task)
    }

    /// `running -> {pending, failed}` depending on `retryable` and the
    /// retry budget. A non-retryable adapter error skips the retry
    /// path outright and goes straight to `failed`, regardless of
    /// `retry_count`. Requeues before acking the in-flight entry on a
    /// retryable failure, so a stale "no entry anywhere" window never
    /// opens.
    #[instrument(skip(self, error_message))]
    pub async fn fail(&self, task_id: TaskId, error_message: &str, retry_delay_secs: i64, retryable: bool) -> Result<Task> {
        let retrying = retryable
            && self
                .tasks
                .transition_to_pending_for_retry(task_id, error_message)
                .await?;

        if retrying {
            let task = self.fetch(task_id).await?;
            self.queue
                .requeue(&QueueEntry::new(task.id, task.model_id, task.priority), retry_delay_secs)?;
            self.queue.ack(task_id)?;
            self.log(task_id, LogLevel::Error, error_message).await;
            return Ok(task);
        }

        if !self.tasks.transition_to_failed(task_id, error_message).await? {
            return Err(SchedulerError::StateConflict(format!("task {task_id} is not running")));
        }

        let task = self.fetch(task_id).await?;
        self.models.increment_request_count(task.model_id, false).await?;
        self.queue.ack(task_id)?;
        self.log(task_id, LogLevel::Error, error_message).await;
        Ok(task)
    }

    /// Reaper-triggered requeue: the queue side already moved the entry
    /// to the delayed set, this just resets the row without touching
    /// `retry_count`.
    pub async fn reap(&self, task_id: TaskId) -> Result<bool> {
        let reset = self.tasks.transition_to_pending_for_reap(task_id).await?;
        if reset {
            self.log(task_id, LogLevel::Warn, "reclaimed by reaper").await;
        }
        Ok(reset)
    }

    pub async fn get(&self, task_id: TaskId) -> Result<Option<Task>> {
        self.tasks.get(task_id).await
    }

    pub async fn list(&self, filters: &TaskFilters, page: i64, size: i64) -> Result<(Vec<Task>, i64)> {
        self.tasks.list(filters, page, size).await
    }

    async fn fetch(&self, task_id: TaskId) -> Result<Task> {
        self.tasks
            .get(task_id)
            .await?
            .ok_or_else(|| SchedulerError::NotFound(format!("task {task_id}")))
    }

    async fn log(&self, task_id: TaskId, level: LogLevel, message: impl Into<String>) {
        if let Err(e) = self.logs.append(&TaskLog::new(task_id, level, message)).await {
            warn!(task_id, error = %e, "failed to append task log");
        }
    }
}
