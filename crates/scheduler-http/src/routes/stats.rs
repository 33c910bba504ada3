//! `GET /stats/dashboard`, `GET /stats/tasks/{date|model|type}` -- a
//! read-side projection over the task and model stores, not a separate
//! aggregation engine.

use axum::extract::{Path, State};
use axum::routing::get;
use axum::Router;
use scheduler_core::task::TaskStatus;
use serde::Serialize;
use std::collections::HashMap;

use crate::envelope::{ApiResponse, ApiResult};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/stats/dashboard", get(dashboard))
        .route("/stats/tasks/:group_by", get(tasks_grouped))
}

#[derive(Debug, Serialize)]
struct Dashboard {
    models: Vec<scheduler_core::Model>,
    queue: scheduler_queue::QueueStatus,
    pending: i64,
    running: i64,
}

async fn dashboard(State(state): State<AppState>) -> ApiResult<Dashboard> {
    let models = state.models.list().await?;
    let queue = state.queue.status()?;

    let pending_filters = scheduler_store::task_store::TaskFilters {
        status: Some(TaskStatus::Pending),
        model_id: None,
        task_type: None,
    };
    let running_filters = scheduler_store::task_store::TaskFilters {
        status: Some(TaskStatus::Running),
        model_id: None,
        task_type: None,
    };
    let (_, pending) = state.lifecycle.list(&pending_filters, 1, 1).await?;
    let (_, running) = state.lifecycle.list(&running_filters, 1, 1).await?;

    Ok(ApiResponse::ok(Dashboard {
        models,
        queue,
        pending,
        running,
    }))
}

/// Groups completed/failed task counts by `model` or `type`. `date`
/// grouping is left to a proper reporting pipeline (out of scope) --
/// this returns a `ValidationError` for it rather than faking data.
async fn tasks_grouped(
    State(state): State<AppState>,
    Path(group_by): Path<String>,
) -> ApiResult<HashMap<String, i64>> {
    let (models, by_model) = match group_by.as_str() {
        "model" => (state.models.list().await?, true),
        "type" => (Vec::new(), false),
        other => {
            return Err(scheduler_core::SchedulerError::ValidationError(format!(
                "unsupported grouping '{other}', expected 'model' or 'type'"
            ))
            .into())
        }
    };

    let mut counts = HashMap::new();
    if by_model {
        for model in models {
            let filters = scheduler_store::task_store::TaskFilters {
                status: None,
                model_id: Some(model.id),
                task_type: None,
            };
            let (_, total) = state.lifecycle.list(&filters, 1, 1).await?;
            counts.insert(model.name, total);
        }
    } else {
        let (tasks, _) = state
            .lifecycle
            .list(&scheduler_store::task_store::TaskFilters::default(), 1, 10_000)
            .await?;
        for task in tasks {
            *counts.entry(task.task_type).or_insert(0) += 1;
        }
    }

    Ok(ApiResponse::ok(counts))
}
