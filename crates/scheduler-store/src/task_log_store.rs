//! Append-only task audit log.

use chrono::Utc;
use scheduler_core::error::SchedulerError;
use scheduler_core::task_log::{LogLevel, TaskLog};
use scheduler_core::task::TaskId;
use scheduler_core::Result;
use sqlx::{AnyPool, Row};

#[derive(Clone)]
pub struct TaskLogStore {
    pool: AnyPool,
}

fn row_to_log(row: &sqlx::any::AnyRow) -> Result<TaskLog> {
    let level_str: String = row.try_get("level")?;
    let created_at: String = row.try_get("created_at")?;
    let payload: Option<String> = row.try_get("payload")?;

    Ok(TaskLog {
        id: row.try_get("id")?,
        task_id: row.try_get::<i64, _>("task_id")?,
        level: LogLevel::parse(&level_str)
            .ok_or_else(|| SchedulerError::StoreError(format!("unknown log level {level_str}")))?,
        message: row.try_get("message")?,
        payload: payload.map(|p| serde_json::from_str(&p)).transpose()?,
        created_at: chrono::DateTime::parse_from_rfc3339(&created_at)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| SchedulerError::StoreError(format!("bad timestamp: {e}")))?,
    })
}

impl TaskLogStore {
    pub fn new(pool: AnyPool) -> Self {
        Self { pool }
    }

    /// Append one audit entry. Never mutates or deletes existing rows.
    pub async fn append(&self, log: &TaskLog) -> Result<TaskLog> {
        let now = Utc::now().to_rfc3339();
        let payload_json = log.payload.as_ref().map(serde_json::to_string).transpose()?;
        let row = sqlx::query(
            "INSERT INTO task_logs (task_id, level, message, payload, created_at) \
             VALUES (?, ?, ?, ?, ?) RETURNING *",
        )
        .bind(log.task_id)
        .bind(log.level.as_str())
        .bind(&log.message)
        .bind(payload_json)
        .bind(&now)
        .fetch_one(&self.pool)
        .await?;
        row_to_log(&row)
    }

    pub async fn for_task(&self, task_id: TaskId) -> Result<Vec<TaskLog>> {
        let rows = sqlx::query(
            "SELECT * FROM task_logs WHERE task_id = ? ORDER BY created_at DESC",
        )
        .bind(task_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_log).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model_store::ModelStore;
    use crate::task_store::TaskStore;
    use scheduler_core::model::{Model, ModelType};
    use scheduler_core::task::{Priority, Task};

    #[tokio::test]
    async fn append_then_list_is_newest_first() {
        let pool = crate::tests::test_pool().await;
        let models = ModelStore::new(pool.clone());
        let model = models
            .create(&Model::new("gpt".into(), ModelType::Openai, 1))
            .await
            .unwrap();
        let tasks = TaskStore::new(pool.clone());
        let task = tasks
            .create(&Task::new(model.id, "text-generation".into(), "hi".into(), Priority::Medium))
            .await
            .unwrap();

        let logs = TaskLogStore::new(pool);
        logs.append(&TaskLog::new(task.id, LogLevel::Info, "created")).await.unwrap();
        logs.append(&TaskLog::new(task.id, LogLevel::Error, "attempt 1 failed")).await.unwrap();

        let entries = logs.for_task(task.id).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].message, "attempt 1 failed");
        assert_eq!(entries[1].message, "created");
    }

    #[tokio::test]
    async fn payload_round_trips_through_json() {
        let pool = crate::tests::test_pool().await;
        let models = ModelStore::new(pool.clone());
        let model = models
            .create(&Model::new("gpt".into(), ModelType::Openai, 1))
            .await
            .unwrap();
        let tasks = TaskStore::new(pool.clone());
        let task = tasks
            .create(&Task::new(model.id, "text-generation".into(), "hi".into(), Priority::Low))
            .await
            .unwrap();

        let logs = TaskLogStore::new(pool);
        let log = TaskLog::new(task.id, LogLevel::Warn, "retrying")
            .with_payload(serde_json::json!({"attempt": 2}));
        logs.append(&log).await.unwrap();

        let entries = logs.for_task(task.id).await.unwrap();
        assert_eq!(entries[0].payload.as_ref().unwrap()["attempt"], 2);
    }
}
