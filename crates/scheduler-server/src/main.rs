//! Process entry point: wires the store, queue, lifecycle services,
//! adapter registry, and worker pool into one `axum` server, grounded
//! on `task-queue-broker::main` (the wiring order) and
//! `task-queue-worker::bin::worker` (adapter registration and
//! graceful shutdown via `ctrl_c`).

mod config;

use std::sync::Arc;

use clap::Parser;
use scheduler_adapter::{AdapterRegistry, EchoAdapter, LocalHttpAdapter, OpenAiCompatibleAdapter};
use scheduler_core::model::ModelType;
use scheduler_lifecycle::{ModelRegistryService, TaskLifecycleService};
use scheduler_queue::QueueManager;
use scheduler_store::{ModelStore, TaskLogStore, TaskStore};
use scheduler_worker::WorkerPoolManager;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config = config::resolve(config::Args::parse())?;

    let pool = scheduler_store::connect(&config.store).await?;
    let models_store = ModelStore::new(pool.clone());
    let tasks_store = TaskStore::new(pool.clone());
    let logs_store = TaskLogStore::new(pool.clone());

    let queue = Arc::new(QueueManager::open(config.queue.clone())?);

    let lifecycle = Arc::new(TaskLifecycleService::new(
        tasks_store.clone(),
        models_store.clone(),
        logs_store,
        queue.clone(),
    ));
    let model_registry = Arc::new(ModelRegistryService::new(models_store.clone(), tasks_store));

    let mut adapters = AdapterRegistry::with_default(Arc::new(EchoAdapter));
    adapters.register("text-generation", ModelType::Openai, Arc::new(OpenAiCompatibleAdapter::new()));
    adapters.register("text-generation", ModelType::Local, Arc::new(LocalHttpAdapter::new()));
    let adapters = Arc::new(adapters);

    let worker_pool = Arc::new(WorkerPoolManager::new(
        config.pool.clone(),
        lifecycle.clone(),
        model_registry.clone(),
        Arc::new(ModelStore::new(pool.clone())),
        queue.clone(),
        adapters,
    ));
    worker_pool.start().await?;

    let state = scheduler_http::AppState::new(lifecycle, model_registry, queue, worker_pool.clone());
    let app = scheduler_http::router(state);

    let addr = config.http_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, "scheduler-server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    worker_pool.shutdown_all().await?;
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutdown signal received, draining workers");
}
