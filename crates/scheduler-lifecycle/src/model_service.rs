//! CRUD over model rows plus the two hot-path counter operations
//! workers call on every completion/failure.

use scheduler_core::error::SchedulerError;
use scheduler_core::model::{Model, ModelId, ModelStatus};
use scheduler_core::Result;
use scheduler_store::{ModelStore, TaskStore};
use tracing::info;

pub struct ModelRegistryService {
    models: ModelStore,
    tasks: TaskStore,
}

impl ModelRegistryService {
    pub fn new(models: ModelStore, tasks: TaskStore) -> Self {
        Self { models, tasks }
    }

    pub async fn create(&self, model: Model) -> Result<Model> {
        let created = self.models.create(&model).await?;
        info!(model_id = created.id, name = %created.name, "model created");
        Ok(created)
    }

    pub async fn get(&self, id: ModelId) -> Result<Option<Model>> {
        self.models.get(id).await
    }

    pub async fn list(&self) -> Result<Vec<Model>> {
        self.models.list().await
    }

    pub async fn list_online(&self) -> Result<Vec<Model>> {
        self.models.list_online().await
    }

    pub async fn update(&self, model: &Model) -> Result<Model> {
        if !self.models.update(model).await? {
            return Err(SchedulerError::NotFound(format!("model {}", model.id)));
        }
        self.models
            .get(model.id)
            .await?
            .ok_or_else(|| SchedulerError::NotFound(format!("model {}", model.id)))
    }

    pub async fn set_status(&self, id: ModelId, status: ModelStatus) -> Result<()> {
        if !self.models.set_status(id, status).await? {
            return Err(SchedulerError::NotFound(format!("model {id}")));
        }
        Ok(())
    }

    /// Fails if any task of this model is still `pending` or `running`.
    pub async fn delete(&self, id: ModelId) -> Result<()> {
        if self.tasks.has_active_tasks_for_model(id).await? {
            return Err(SchedulerError::StateConflict(format!(
                "model {id} has tasks in pending or running status"
            )));
        }
        if !self.models.delete(id).await? {
            return Err(SchedulerError::NotFound(format!("model {id}")));
        }
        Ok(())
    }

    pub async fn increment_request_count(&self, id: ModelId, success: bool) -> Result<()> {
        self.models.increment_request_count(id, success).await?;
        Ok(())
    }

    pub async fn increment_worker_count(&self, id: ModelId) -> Result<bool> {
        self.models.increment_worker_count(id).await
    }

    pub async fn decrement_worker_count(&self, id: ModelId) -> Result<bool> {
        self.models.decrement_worker_count(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scheduler_core::model::ModelType;
    use scheduler_core::task::{Priority, Task};

    async fn setup() -> ModelRegistryService {
        let pool = scheduler_store::connect(&scheduler_store::StoreConfig::default())
            .await
            .unwrap();
        ModelRegistryService::new(ModelStore::new(pool.clone()), TaskStore::new(pool))
    }

    #[tokio::test]
    async fn delete_refuses_when_tasks_are_active() {
        let service = setup().await;
        let model = service.create(Model::new("gpt".into(), ModelType::Openai, 1)).await.unwrap();
        service
            .tasks
            .create(&Task::new(model.id, "text-generation".into(), "hi".into(), Priority::Medium))
            .await
            .unwrap();

        let err = service.delete(model.id).await.unwrap_err();
        assert!(matches!(err, SchedulerError::StateConflict(_)));
    }

    #[tokio::test]
    async fn delete_succeeds_once_no_tasks_are_active() {
        let service = setup().await;
        let model = service.create(Model::new("gpt".into(), ModelType::Openai, 1)).await.unwrap();
        service.delete(model.id).await.unwrap();
        assert!(service.get(model.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn set_status_on_unknown_model_is_not_found() {
        let service = setup().await;
        let err = service.set_status(99999, ModelStatus::Online).await.unwrap_err();
        assert!(matches!(err, SchedulerError::NotFound(_)));
    }
}
