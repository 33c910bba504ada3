//! `POST|GET /models`, `GET|PUT|DELETE /models/{id}`, `PUT /models/{id}/status`.

use axum::extract::{Path, State};
use axum::routing::{get, put};
use axum::Router;
use axum::Json;
use scheduler_core::model::{Model, ModelId, ModelStatus, ModelType};
use serde::Deserialize;
use std::collections::HashMap;

use crate::envelope::{ApiResponse, ApiResult};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/models", axum::routing::post(create_model).get(list_models))
        .route("/models/:id", get(get_model).put(update_model).delete(delete_model))
        .route("/models/:id/status", put(set_model_status))
}

#[derive(Debug, Deserialize)]
pub struct CreateModelRequest {
    pub name: String,
    pub model_type: String,
    pub config: Option<HashMap<String, serde_json::Value>>,
    pub max_workers: i32,
}

async fn create_model(State(state): State<AppState>, Json(req): Json<CreateModelRequest>) -> ApiResult<Model> {
    let model_type = ModelType::parse(&req.model_type)
        .ok_or_else(|| scheduler_core::SchedulerError::ValidationError(format!("unknown model type {}", req.model_type)))?;

    let mut model = Model::new(req.name, model_type, req.max_workers);
    model.config = req.config.unwrap_or_default();

    let created = state.models.create(model).await?;
    Ok(ApiResponse::ok(created))
}

async fn list_models(State(state): State<AppState>) -> ApiResult<Vec<Model>> {
    Ok(ApiResponse::ok(state.models.list().await?))
}

async fn get_model(State(state): State<AppState>, Path(id): Path<ModelId>) -> ApiResult<Model> {
    let model = state
        .models
        .get(id)
        .await?
        .ok_or_else(|| scheduler_core::SchedulerError::NotFound(format!("model {id}")))?;
    Ok(ApiResponse::ok(model))
}

#[derive(Debug, Deserialize)]
pub struct UpdateModelRequest {
    pub name: String,
    pub model_type: String,
    pub config: Option<HashMap<String, serde_json::Value>>,
    pub max_workers: i32,
}

async fn update_model(
    State(state): State<AppState>,
    Path(id): Path<ModelId>,
    Json(req): Json<UpdateModelRequest>,
) -> ApiResult<Model> {
    let existing = state
        .models
        .get(id)
        .await?
        .ok_or_else(|| scheduler_core::SchedulerError::NotFound(format!("model {id}")))?;

    let model_type = ModelType::parse(&req.model_type)
        .ok_or_else(|| scheduler_core::SchedulerError::ValidationError(format!("unknown model type {}", req.model_type)))?;

    let updated = Model {
        name: req.name,
        model_type,
        config: req.config.unwrap_or_default(),
        max_workers: req.max_workers,
        ..existing
    };

    let saved = state.models.update(&updated).await?;
    Ok(ApiResponse::ok(saved))
}

/// Fails with `StateConflict` if the model still has `pending` or
/// `running` tasks -- see `ModelRegistryService::delete`.
async fn delete_model(State(state): State<AppState>, Path(id): Path<ModelId>) -> ApiResult<()> {
    state.models.delete(id).await?;
    Ok(ApiResponse::ok_empty())
}

#[derive(Debug, Deserialize)]
pub struct SetStatusRequest {
    pub status: String,
}

/// Besides the row update, this is the live entry point for spinning a
/// model's workers up or down: a transition into `online` spins up to
/// `max_workers`, a transition away from `online` drains them.
async fn set_model_status(
    State(state): State<AppState>,
    Path(id): Path<ModelId>,
    Json(req): Json<SetStatusRequest>,
) -> ApiResult<()> {
    let status = ModelStatus::parse(&req.status)
        .ok_or_else(|| scheduler_core::SchedulerError::ValidationError(format!("unknown model status {}", req.status)))?;

    let existing = state
        .models
        .get(id)
        .await?
        .ok_or_else(|| scheduler_core::SchedulerError::NotFound(format!("model {id}")))?;

    state.models.set_status(id, status).await?;

    if existing.status != ModelStatus::Online && status == ModelStatus::Online {
        state.pool.spin_up(id, existing.max_workers as usize).await?;
    } else if existing.status == ModelStatus::Online && status != ModelStatus::Online {
        state.pool.spin_down(id).await?;
    }

    Ok(ApiResponse::ok_empty())
}
