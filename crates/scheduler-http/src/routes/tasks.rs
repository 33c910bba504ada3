//! `POST|GET /tasks`, `GET|PUT|DELETE /tasks/{id}`, `POST /tasks/{id}/retry`,
//! `GET /tasks/stats`.

use axum::extract::{Path, Query, State};
use axum::routing::{get, post, put};
use axum::Router;
use axum::Json;
use scheduler_core::task::{Priority, TaskId, TaskStatus};
use serde::Deserialize;

use crate::envelope::{ApiError, ApiResponse, ApiResult, Page};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/tasks", post(create_task).get(list_tasks))
        .route("/tasks/stats", get(task_stats))
        .route(
            "/tasks/:id",
            get(get_task).put(update_task).delete(cancel_task),
        )
        .route("/tasks/:id/retry", post(retry_task))
}

#[derive(Debug, Deserialize)]
pub struct CreateTaskRequest {
    pub model_id: i64,
    pub task_type: String,
    pub input: String,
    pub priority: Option<i16>,
}

async fn create_task(State(state): State<AppState>, Json(req): Json<CreateTaskRequest>) -> ApiResult<scheduler_core::Task> {
    let priority = req
        .priority
        .map(Priority::from_i16)
        .flatten_invalid("priority must be 1 (low), 2 (medium), or 3 (high)")?;

    let task = state
        .lifecycle
        .create(req.model_id, req.task_type, req.input, priority)
        .await?;
    Ok(ApiResponse::ok(task))
}

#[derive(Debug, Deserialize)]
pub struct ListTasksQuery {
    pub status: Option<String>,
    pub model_id: Option<i64>,
    pub task_type: Option<String>,
    pub page: Option<i64>,
    pub size: Option<i64>,
}

async fn list_tasks(
    State(state): State<AppState>,
    Query(q): Query<ListTasksQuery>,
) -> ApiResult<Page<scheduler_core::Task>> {
    let status = q
        .status
        .as_deref()
        .map(|s| TaskStatus::parse(s).ok_or_else(|| ApiError::from(scheduler_core::SchedulerError::ValidationError(format!("unknown status {s}")))))
        .transpose()?;

    let filters = scheduler_store::task_store::TaskFilters {
        status,
        model_id: q.model_id,
        task_type: q.task_type,
    };
    let page = q.page.unwrap_or(1);
    let size = q.size.unwrap_or(20);

    let (items, total) = state.lifecycle.list(&filters, page, size).await?;
    Ok(ApiResponse::ok(Page { items, total, page, size }))
}

async fn get_task(State(state): State<AppState>, Path(id): Path<TaskId>) -> ApiResult<scheduler_core::Task> {
    let task = state
        .lifecycle
        .get(id)
        .await?
        .ok_or_else(|| scheduler_core::SchedulerError::NotFound(format!("task {id}")))?;
    Ok(ApiResponse::ok(task))
}

#[derive(Debug, Deserialize)]
pub struct UpdateTaskRequest {
    pub priority: Option<i16>,
}

/// No in-place mutation beyond what `retry`/`cancel` already cover:
/// priority is fixed at creation time, so this only returns the
/// current row or rejects an attempted priority change.
async fn update_task(
    State(state): State<AppState>,
    Path(id): Path<TaskId>,
    Json(req): Json<UpdateTaskRequest>,
) -> ApiResult<scheduler_core::Task> {
    let task = state
        .lifecycle
        .get(id)
        .await?
        .ok_or_else(|| scheduler_core::SchedulerError::NotFound(format!("task {id}")))?;

    if let Some(priority) = req.priority {
        let _ = priority;
        return Err(scheduler_core::SchedulerError::ValidationError(
            "changing priority in place is not supported; cancel and recreate the task".to_string(),
        )
        .into());
    }

    Ok(ApiResponse::ok(task))
}

async fn cancel_task(State(state): State<AppState>, Path(id): Path<TaskId>) -> ApiResult<scheduler_core::Task> {
    let task = state.lifecycle.cancel(id).await?;
    Ok(ApiResponse::ok(task))
}

async fn retry_task(State(state): State<AppState>, Path(id): Path<TaskId>) -> ApiResult<scheduler_core::Task> {
    let task = state.lifecycle.retry(id).await?;
    Ok(ApiResponse::ok(task))
}

#[derive(Debug, serde::Serialize)]
pub struct TaskStats {
    pub pending: i64,
    pub running: i64,
    pub completed: i64,
    pub failed: i64,
    pub cancelled: i64,
}

async fn task_stats(State(state): State<AppState>) -> ApiResult<TaskStats> {
    let mut counts = TaskStats {
        pending: 0,
        running: 0,
        completed: 0,
        failed: 0,
        cancelled: 0,
    };

    for status in [
        TaskStatus::Pending,
        TaskStatus::Running,
        TaskStatus::Completed,
        TaskStatus::Failed,
        TaskStatus::Cancelled,
    ] {
        let filters = scheduler_store::task_store::TaskFilters {
            status: Some(status),
            model_id: None,
            task_type: None,
        };
        let (_, total) = state.lifecycle.list(&filters, 1, 1).await?;
        match status {
            TaskStatus::Pending => counts.pending = total,
            TaskStatus::Running => counts.running = total,
            TaskStatus::Completed => counts.completed = total,
            TaskStatus::Failed => counts.failed = total,
            TaskStatus::Cancelled => counts.cancelled = total,
        }
    }

    Ok(ApiResponse::ok(counts))
}

/// Small helper trait to turn an `Option<Option<T>>` produced by
/// `.map(...).transpose()` over a fallible parse into a validation
/// error when the inner parse failed.
trait FlattenInvalid<T> {
    fn flatten_invalid(self, message: &str) -> Result<Option<T>, ApiError>;
}

impl<T> FlattenInvalid<T> for Option<Option<T>> {
    fn flatten_invalid(self, message: &str) -> Result<Option<T>, ApiError> {
        match self {
            Some(None) => Err(scheduler_core::SchedulerError::ValidationError(message.to_string()).into()),
            Some(Some(v)) => Ok(Some(v)),
            None => Ok(None),
        }
    }
}
