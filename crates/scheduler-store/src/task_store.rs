//! Task row CRUD and the compare-and-set status transitions that back
//! the lifecycle service. Every transition here is gated on the row's
//! *current* status in the `WHERE` clause -- that single
//! `UPDATE ... WHERE status = ?` is the serialization point, and no row
//! is ever read-then-blindly-written.

use chrono::{DateTime, Utc};
use scheduler_core::error::SchedulerError;
use scheduler_core::model::ModelId;
use scheduler_core::task::{Priority, Task, TaskId, TaskStatus};
use scheduler_core::Result;
use sqlx::{AnyPool, Row};

/// Filters accepted by [`TaskStore::list`].
#[derive(Debug, Clone, Default)]
pub struct TaskFilters {
    pub status: Option<TaskStatus>,
    pub model_id: Option<ModelId>,
    pub task_type: Option<String>,
}

#[derive(Clone)]
pub struct TaskStore {
    pool: AnyPool,
}

fn row_to_task(row: &sqlx::any::AnyRow) -> Result<Task> {
    let status_str: String = row.try_get("status")?;
    let priority_i64: i64 = row.try_get("priority")?;
    let created_at: String = row.try_get("created_at")?;
    let updated_at: String = row.try_get("updated_at")?;
    let started_at: Option<String> = row.try_get("started_at")?;
    let completed_at: Option<String> = row.try_get("completed_at")?;

    Ok(Task {
        id: row.try_get::<i64, _>("id")?,
        model_id: row.try_get::<i64, _>("model_id")?,
        task_type: row.try_get("task_type")?,
        input: row.try_get("input")?,
        output: row.try_get("output")?,
        status: TaskStatus::parse(&status_str)
            .ok_or_else(|| SchedulerError::StoreError(format!("unknown task status {status_str}")))?,
        priority: Priority::from_i16(priority_i64 as i16)
            .ok_or_else(|| SchedulerError::StoreError(format!("unknown priority {priority_i64}")))?,
        retry_count: row.try_get::<i64, _>("retry_count")? as i32,
        max_retries: row.try_get::<i64, _>("max_retries")? as i32,
        error_message: row.try_get("error_message")?,
        started_at: started_at.map(|s| parse_ts(&s)).transpose()?,
        completed_at: completed_at.map(|s| parse_ts(&s)).transpose()?,
        created_at: parse_ts(&created_at)?,
        updated_at: parse_ts(&updated_at)?,
    })
}

fn parse_ts(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| SchedulerError::StoreError(format!("bad timestamp {s}: {e}")))
}

impl TaskStore {
    pub fn new(pool: AnyPool) -> Self {
        Self { pool }
    }

    /// Insert a new `pending` task row. `max_retries` defaults to 3
    /// unless the caller has already overridden it on `task`.
    pub async fn create(&self, task: &Task) -> Result<Task> {
        let now = Utc::now().to_rfc3339();
        let row = sqlx::query(
            "INSERT INTO tasks (model_id, task_type, input, output, status, priority, \
             retry_count, max_retries, error_message, started_at, completed_at, created_at, updated_at) \
             VALUES (?, ?, ?, NULL, 'pending', ?, 0, ?, NULL, NULL, NULL, ?, ?) RETURNING *",
        )
        .bind(task.model_id)
        .bind(&task.task_type)
        .bind(&task.input)
        .bind(task.priority.as_i16() as i64)
        .bind(task.max_retries as i64)
        .bind(&now)
        .bind(&now)
        .fetch_one(&self.pool)
        .await?;

        row_to_task(&row)
    }

    pub async fn get(&self, id: TaskId) -> Result<Option<Task>> {
        let row = sqlx::query("SELECT * FROM tasks WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_task).transpose()
    }

    /// Paginated, filtered projection for the dashboard / `list` operation.
    pub async fn list(&self, filters: &TaskFilters, page: i64, size: i64) -> Result<(Vec<Task>, i64)> {
        let page = page.max(1);
        let size = size.clamp(1, 500);
        let offset = (page - 1) * size;

        let mut clauses = Vec::new();
        if filters.status.is_some() {
            clauses.push("status = ?");
        }
        if filters.model_id.is_some() {
            clauses.push("model_id = ?");
        }
        if filters.task_type.is_some() {
            clauses.push("task_type = ?");
        }
        let where_clause = if clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", clauses.join(" AND "))
        };

        let mut count_q = sqlx::query(&format!("SELECT COUNT(*) AS c FROM tasks {where_clause}"));
        let mut list_q = sqlx::query(&format!(
            "SELECT * FROM tasks {where_clause} ORDER BY created_at DESC LIMIT ? OFFSET ?"
        ));

        if let Some(status) = filters.status {
            count_q = count_q.bind(status.as_str());
            list_q = list_q.bind(status.as_str());
        }
        if let Some(model_id) = filters.model_id {
            count_q = count_q.bind(model_id);
            list_q = list_q.bind(model_id);
        }
        if let Some(task_type) = &filters.task_type {
            count_q = count_q.bind(task_type.clone());
            list_q = list_q.bind(task_type.clone());
        }
        list_q = list_q.bind(size).bind(offset);

        let total: i64 = count_q.fetch_one(&self.pool).await?.try_get("c")?;
        let rows = list_q.fetch_all(&self.pool).await?;
        let tasks = rows.iter().map(row_to_task).collect::<Result<Vec<_>>>()?;

        Ok((tasks, total))
    }

    /// `pending -> running`. Called by a worker after it pulls a task
    /// off its bound model's lane.
    pub async fn transition_to_running(&self, id: TaskId) -> Result<bool> {
        let now = Utc::now().to_rfc3339();
        let result = sqlx::query(
            "UPDATE tasks SET status = 'running', started_at = ?, updated_at = ? \
             WHERE id = ? AND status = 'pending'",
        )
        .bind(&now)
        .bind(&now)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// `running -> completed` with output.
    pub async fn transition_to_completed(&self, id: TaskId, output: &str) -> Result<bool> {
        let now = Utc::now().to_rfc3339();
        let result = sqlx::query(
            "UPDATE tasks SET status = 'completed', output = ?, completed_at = ?, updated_at = ? \
             WHERE id = ? AND status = 'running'",
        )
        .bind(output)
        .bind(&now)
        .bind(&now)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// `running -> pending` on a retryable failure: increments
    /// `retry_count` *before* the caller re-enqueues.
    pub async fn transition_to_pending_for_retry(&self, id: TaskId, error_message: &str) -> Result<bool> {
        let now = Utc::now().to_rfc3339();
        let result = sqlx::query(
            "UPDATE tasks SET status = 'pending', retry_count = retry_count + 1, \
             started_at = NULL, error_message = ?, updated_at = ? \
             WHERE id = ? AND status = 'running' AND retry_count < max_retries",
        )
        .bind(error_message)
        .bind(&now)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// `running -> failed`, retries exhausted or a non-retryable adapter error.
    pub async fn transition_to_failed(&self, id: TaskId, error_message: &str) -> Result<bool> {
        let now = Utc::now().to_rfc3339();
        let result = sqlx::query(
            "UPDATE tasks SET status = 'failed', error_message = ?, completed_at = ?, updated_at = ? \
             WHERE id = ? AND status = 'running'",
        )
        .bind(error_message)
        .bind(&now)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// `failed -> pending` via an explicit user retry. Idempotent: a
    /// second concurrent caller finds `retry_count` already
    /// bumped or the status no longer `failed` and the `WHERE` simply
    /// matches zero rows.
    pub async fn retry_from_failed(&self, id: TaskId) -> Result<bool> {
        let now = Utc::now().to_rfc3339();
        let result = sqlx::query(
            "UPDATE tasks SET status = 'pending', retry_count = retry_count + 1, \
             started_at = NULL, completed_at = NULL, error_message = NULL, updated_at = ? \
             WHERE id = ? AND status = 'failed' AND retry_count < max_retries",
        )
        .bind(&now)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// `{pending,running} -> cancelled`. Returns whether the task was
    /// `running` at the moment of cancellation, so the caller knows
    /// whether an in-flight queue entry needs an `ack`.
    pub async fn transition_to_cancelled(&self, id: TaskId) -> Result<Option<bool>> {
        let now = Utc::now().to_rfc3339();

        let from_pending = sqlx::query(
            "UPDATE tasks SET status = 'cancelled', completed_at = ?, updated_at = ? \
             WHERE id = ? AND status = 'pending'",
        )
        .bind(&now)
        .bind(&now)
        .bind(id)
        .execute(&self.pool)
        .await?;
        if from_pending.rows_affected() > 0 {
            return Ok(Some(false));
        }

        let from_running = sqlx::query(
            "UPDATE tasks SET status = 'cancelled', completed_at = ?, updated_at = ? \
             WHERE id = ? AND status = 'running'",
        )
        .bind(&now)
        .bind(&now)
        .bind(id)
        .execute(&self.pool)
        .await?;
        if from_running.rows_affected() > 0 {
            return Ok(Some(true));
        }

        Ok(None)
    }

    /// Reaper-triggered requeue back to `pending`. Does **not** touch
    /// `retry_count` -- a reap is not a retry.
    pub async fn transition_to_pending_for_reap(&self, id: TaskId) -> Result<bool> {
        let now = Utc::now().to_rfc3339();
        let result = sqlx::query(
            "UPDATE tasks SET status = 'pending', started_at = NULL, updated_at = ? \
             WHERE id = ? AND status = 'running'",
        )
        .bind(&now)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Whether any task of `model_id` is still active -- the admission
    /// gate `ModelStore::delete` checks before cascading.
    pub async fn has_active_tasks_for_model(&self, model_id: ModelId) -> Result<bool> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS c FROM tasks WHERE model_id = ? AND status IN ('pending', 'running')",
        )
        .bind(model_id)
        .fetch_one(&self.pool)
        .await?;
        let count: i64 = row.try_get("c")?;
        Ok(count > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model_store::ModelStore;
    use scheduler_core::model::{Model, ModelType};

    async fn setup() -> (TaskStore, ModelId) {
        let pool = crate::tests::test_pool().await;
        let models = ModelStore::new(pool.clone());
        let model = models
            .create(&Model::new("gpt".into(), ModelType::Openai, 2))
            .await
            .unwrap();
        (TaskStore::new(pool), model.id)
    }

    #[tokio::test]
    async fn create_then_get_round_trips() {
        let (store, model_id) = setup().await;
        let created = store
            .create(&Task::new(model_id, "text-generation".into(), "hi".into(), Priority::High))
            .await
            .unwrap();

        let fetched = store.get(created.id).await.unwrap().unwrap();
        assert_eq!(fetched.status, TaskStatus::Pending);
        assert_eq!(fetched.priority, Priority::High);
        assert_eq!(fetched.retry_count, 0);
    }

    #[tokio::test]
    async fn running_to_pending_retry_increments_count_before_requeue() {
        let (store, model_id) = setup().await;
        let task = store
            .create(&Task::new(model_id, "text-generation".into(), "hi".into(), Priority::Medium))
            .await
            .unwrap();
        assert!(store.transition_to_running(task.id).await.unwrap());

        assert!(store
            .transition_to_pending_for_retry(task.id, "timeout")
            .await
            .unwrap());

        let reloaded = store.get(task.id).await.unwrap().unwrap();
        assert_eq!(reloaded.status, TaskStatus::Pending);
        assert_eq!(reloaded.retry_count, 1);
        assert!(reloaded.started_at.is_none());
    }

    #[tokio::test]
    async fn cancel_reports_whether_task_was_running() {
        let (store, model_id) = setup().await;
        let pending = store
            .create(&Task::new(model_id, "text-generation".into(), "hi".into(), Priority::Low))
            .await
            .unwrap();
        let was_running = store.transition_to_cancelled(pending.id).await.unwrap();
        assert_eq!(was_running, Some(false));

        let running = store
            .create(&Task::new(model_id, "text-generation".into(), "hi".into(), Priority::Low))
            .await
            .unwrap();
        store.transition_to_running(running.id).await.unwrap();
        let was_running = store.transition_to_cancelled(running.id).await.unwrap();
        assert_eq!(was_running, Some(true));
    }

    #[tokio::test]
    async fn cancel_on_terminal_task_is_a_noop() {
        let (store, model_id) = setup().await;
        let task = store
            .create(&Task::new(model_id, "text-generation".into(), "hi".into(), Priority::Low))
            .await
            .unwrap();
        store.transition_to_running(task.id).await.unwrap();
        store.transition_to_completed(task.id, "done").await.unwrap();

        assert_eq!(store.transition_to_cancelled(task.id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn retry_refuses_once_budget_exhausted() {
        let (store, model_id) = setup().await;
        let mut task = Task::new(model_id, "text-generation".into(), "hi".into(), Priority::Low);
        task.max_retries = 1;
        let task = store.create(&task).await.unwrap();

        store.transition_to_running(task.id).await.unwrap();
        store.transition_to_failed(task.id, "boom").await.unwrap();
        assert!(store.retry_from_failed(task.id).await.unwrap());

        store.transition_to_running(task.id).await.unwrap();
        store.transition_to_failed(task.id, "boom again").await.unwrap();
        assert!(!store.retry_from_failed(task.id).await.unwrap());
    }

    #[tokio::test]
    async fn active_task_gate_reflects_pending_and_running_only() {
        let (store, model_id) = setup().await;
        assert!(!store.has_active_tasks_for_model(model_id).await.unwrap());

        let task = store
            .create(&Task::new(model_id, "text-generation".into(), "hi".into(), Priority::Low))
            .await
            .unwrap();
        assert!(store.has_active_tasks_for_model(model_id).await.unwrap());

        store.transition_to_running(task.id).await.unwrap();
        store.transition_to_completed(task.id, "done").await.unwrap();
        assert!(!store.has_active_tasks_for_model(model_id).await.unwrap());
    }
}
