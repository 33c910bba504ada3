//! Model registry rows.

use chrono::Utc;
use scheduler_core::error::SchedulerError;
use scheduler_core::model::{Model, ModelId, ModelStatus, ModelType};
use scheduler_core::Result;
use sqlx::{AnyPool, Row};
use std::collections::HashMap;

#[derive(Clone)]
pub struct ModelStore {
    pool: AnyPool,
}

fn row_to_model(row: &sqlx::any::AnyRow) -> Result<Model> {
    let model_type_str: String = row.try_get("model_type")?;
    let status_str: String = row.try_get("status")?;
    let config_json: String = row.try_get("config")?;

    Ok(Model {
        id: row.try_get::<i64, _>("id")?,
        name: row.try_get("name")?,
        model_type: ModelType::parse(&model_type_str)
            .ok_or_else(|| SchedulerError::StoreError(format!("unknown model type {model_type_str}")))?,
        config: serde_json::from_str::<HashMap<String, serde_json::Value>>(&config_json)?,
        status: ModelStatus::parse(&status_str)
            .ok_or_else(|| SchedulerError::StoreError(format!("unknown model status {status_str}")))?,
        max_workers: row.try_get::<i64, _>("max_workers")? as i32,
        current_workers: row.try_get::<i64, _>("current_workers")? as i32,
        total_requests: row.try_get("total_requests")?,
        success_requests: row.try_get("success_requests")?,
    })
}

impl ModelStore {
    pub fn new(pool: AnyPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, model: &Model) -> Result<Model> {
        let now = Utc::now().to_rfc3339();
        let config_json = serde_json::to_string(&model.config)?;
        let row = sqlx::query(
            "INSERT INTO models (name, model_type, config, status, max_workers, current_workers, \
             total_requests, success_requests, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, 0, 0, 0, ?, ?) RETURNING *",
        )
        .bind(&model.name)
        .bind(model.model_type.as_str())
        .bind(config_json)
        .bind(model.status.as_str())
        .bind(model.max_workers as i64)
        .bind(&now)
        .bind(&now)
        .fetch_one(&self.pool)
        .await?;
        row_to_model(&row)
    }

    pub async fn get(&self, id: ModelId) -> Result<Option<Model>> {
        let row = sqlx::query("SELECT * FROM models WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_model).transpose()
    }

    pub async fn list(&self) -> Result<Vec<Model>> {
        let rows = sqlx::query("SELECT * FROM models ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_to_model).collect()
    }

    pub async fn list_online(&self) -> Result<Vec<Model>> {
        let rows = sqlx::query("SELECT * FROM models WHERE status = 'online' ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_to_model).collect()
    }

    /// Update the mutable admin fields of a model (name/config/status/max_workers
    /// are free to change; counters are not touched here).
    pub async fn update(&self, model: &Model) -> Result<bool> {
        let now = Utc::now().to_rfc3339();
        let config_json = serde_json::to_string(&model.config)?;
        let result = sqlx::query(
            "UPDATE models SET name = ?, model_type = ?, config = ?, status = ?, \
             max_workers = ?, updated_at = ? WHERE id = ?",
        )
        .bind(&model.name)
        .bind(model.model_type.as_str())
        .bind(config_json)
        .bind(model.status.as_str())
        .bind(model.max_workers as i64)
        .bind(&now)
        .bind(model.id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn set_status(&self, id: ModelId, status: ModelStatus) -> Result<bool> {
        let now = Utc::now().to_rfc3339();
        let result = sqlx::query("UPDATE models SET status = ?, updated_at = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(&now)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Deletes the row. The lifecycle/model-registry service is
    /// responsible for checking `TaskStore::has_active_tasks_for_model`
    /// first; this method does not re-check.
    pub async fn delete(&self, id: ModelId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM models WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// `total_requests += 1`, and `success_requests += 1` iff `success`.
    /// A single `UPDATE` keeps this atomic at the store layer without a
    /// read-modify-write round trip.
    pub async fn increment_request_count(&self, id: ModelId, success: bool) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE models SET total_requests = total_requests + 1, \
             success_requests = success_requests + ? WHERE id = ?",
        )
        .bind(if success { 1i64 } else { 0i64 })
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Bounded by `max_workers`.
    pub async fn increment_worker_count(&self, id: ModelId) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE models SET current_workers = current_workers + 1 \
             WHERE id = ? AND current_workers < max_workers",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Refuses to go below zero.
    pub async fn decrement_worker_count(&self, id: ModelId) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE models SET current_workers = current_workers - 1 \
             WHERE id = ? AND current_workers > 0",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store() -> ModelStore {
        ModelStore::new(crate::tests::test_pool().await)
    }

    #[tokio::test]
    async fn create_then_get_round_trips() {
        let store = store().await;
        let created = store
            .create(&Model::new("gpt-4".into(), ModelType::Openai, 3))
            .await
            .unwrap();
        let fetched = store.get(created.id).await.unwrap().unwrap();
        assert_eq!(fetched.name, "gpt-4");
        assert_eq!(fetched.max_workers, 3);
        assert_eq!(fetched.status, ModelStatus::Offline);
    }

    #[tokio::test]
    async fn worker_count_is_bounded_by_max_workers() {
        let store = store().await;
        let mut model = Model::new("local-llama".into(), ModelType::Local, 1);
        model.status = ModelStatus::Online;
        let model = store.create(&model).await.unwrap();

        assert!(store.increment_worker_count(model.id).await.unwrap());
        assert!(!store.increment_worker_count(model.id).await.unwrap());

        assert!(store.decrement_worker_count(model.id).await.unwrap());
        assert!(!store.decrement_worker_count(model.id).await.unwrap());
    }

    #[tokio::test]
    async fn success_requests_never_exceeds_total() {
        let store = store().await;
        let model = store
            .create(&Model::new("gpt".into(), ModelType::Openai, 1))
            .await
            .unwrap();

        store.increment_request_count(model.id, true).await.unwrap();
        store.increment_request_count(model.id, false).await.unwrap();
        store.increment_request_count(model.id, true).await.unwrap();

        let reloaded = store.get(model.id).await.unwrap().unwrap();
        assert_eq!(reloaded.total_requests, 3);
        assert_eq!(reloaded.success_requests, 2);
        assert!(reloaded.success_requests <= reloaded.total_requests);
    }
}
