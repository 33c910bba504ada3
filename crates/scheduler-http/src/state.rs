//! Shared application state handed to every handler.

use std::sync::Arc;

use scheduler_lifecycle::{ModelRegistryService, TaskLifecycleService};
use scheduler_queue::QueueManager;
use scheduler_worker::WorkerPoolManager;

#[derive(Clone)]
pub struct AppState {
    pub lifecycle: Arc<TaskLifecycleService>,
    pub models: Arc<ModelRegistryService>,
    pub queue: Arc<QueueManager>,
    pub pool: Arc<WorkerPoolManager>,
    pub started_at: chrono::DateTime<chrono::Utc>,
}

impl AppState {
    pub fn new(
        lifecycle: Arc<TaskLifecycleService>,
        models: Arc<ModelRegistryService>,
        queue: Arc<QueueManager>,
        pool: Arc<WorkerPoolManager>,
    ) -> Self {
        Self {
            lifecycle,
            models,
            queue,
            pool,
            started_at: chrono::Utc::now(),
        }
    }
}
