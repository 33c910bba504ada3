//! Black-box HTTP surface tests: build the real stack (in-memory
//! SQLite, a tempdir-backed RocksDB queue) and drive it through the
//! router rather than unit-testing handlers in isolation.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use scheduler_adapter::AdapterRegistry;
use scheduler_http::{router, AppState};
use scheduler_lifecycle::{ModelRegistryService, TaskLifecycleService};
use scheduler_queue::{QueueConfig, QueueManager};
use scheduler_store::{connect, ModelStore, StoreConfig, TaskLogStore, TaskStore};
use scheduler_worker::{WorkerPoolConfig, WorkerPoolManager};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

async fn test_app() -> (axum::Router, TempDir) {
    let pool = connect(&StoreConfig::default()).await.unwrap();
    let models = ModelStore::new(pool.clone());
    let tasks = TaskStore::new(pool.clone());
    let logs = TaskLogStore::new(pool);

    let dir = TempDir::new().unwrap();
    let queue_config = QueueConfig::default().with_db_path(dir.path().to_str().unwrap().to_string());
    let queue = Arc::new(QueueManager::open(queue_config).unwrap());

    let model_store = Arc::new(models.clone());
    let model_registry = Arc::new(ModelRegistryService::new(models, tasks.clone()));
    let lifecycle = Arc::new(TaskLifecycleService::new(
        tasks,
        model_store.as_ref().clone(),
        logs,
        queue.clone(),
    ));
    let adapters = Arc::new(AdapterRegistry::new());
    let pool_manager = Arc::new(WorkerPoolManager::new(
        WorkerPoolConfig::default(),
        lifecycle.clone(),
        model_registry.clone(),
        model_store,
        queue.clone(),
        adapters,
    ));

    let state = AppState::new(lifecycle, model_registry, queue, pool_manager);
    (router(state), dir)
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn create_model_then_create_task_round_trips() {
    let (app, _dir) = test_app().await;

    let create_model_req = Request::builder()
        .method("POST")
        .uri("/models")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({"name": "gpt-4", "model_type": "openai", "max_workers": 2}).to_string(),
        ))
        .unwrap();
    let response = app.clone().oneshot(create_model_req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["code"], 0);
    let model_id = body["data"]["id"].as_i64().unwrap();

    let create_task_req = Request::builder()
        .method("POST")
        .uri("/tasks")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({"model_id": model_id, "task_type": "text-generation", "input": "hi"}).to_string(),
        ))
        .unwrap();
    let response = app.clone().oneshot(create_task_req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["status"], "pending");
    assert_eq!(body["data"]["priority"], 2);
}

#[tokio::test]
async fn get_unknown_task_is_not_found_with_error_envelope() {
    let (app, _dir) = test_app().await;

    let req = Request::builder().uri("/tasks/99999").body(Body::empty()).unwrap();
    let response = app.oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body["code"], -1);
}

#[tokio::test]
async fn create_task_for_unknown_model_is_rejected() {
    let (app, _dir) = test_app().await;

    let req = Request::builder()
        .method("POST")
        .uri("/tasks")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({"model_id": 99999, "task_type": "text-generation", "input": "hi"}).to_string(),
        ))
        .unwrap();
    let response = app.oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn system_health_reports_ok() {
    let (app, _dir) = test_app().await;
    let req = Request::builder().uri("/system/health").body(Body::empty()).unwrap();
    let response = app.oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["status"], "ok");
}
