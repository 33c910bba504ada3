//! The task lifecycle service and the model registry service: the only
//! two components allowed to mutate task and model rows respectively.

pub mod model_service;
pub mod task_service;

pub use model_service::ModelRegistryService;
pub use task_service::{StartOutcome, TaskLifecycleService};
