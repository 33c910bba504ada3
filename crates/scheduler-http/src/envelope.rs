//! The `{code, message, data?}` response envelope, plus the paginated
//! variant that adds `{total, page, size}`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use scheduler_core::SchedulerError;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            code: 0,
            message: "ok".to_string(),
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    pub fn ok_empty() -> Self {
        Self {
            code: 0,
            message: "ok".to_string(),
            data: None,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

/// A paginated projection: `list`/`get` callers get the page of rows
/// plus the total count and the page parameters they asked for.
#[derive(Debug, Serialize)]
pub struct Page<T: Serialize> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub size: i64,
}

/// The error side of the envelope: `code = -1`, `message` carries the
/// failure reason, `data` is always absent. The HTTP status is derived
/// from the [`SchedulerError`] kind.
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiResponse::<()> {
            code: -1,
            message: self.message,
            data: None,
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<SchedulerError> for ApiError {
    fn from(err: SchedulerError) -> Self {
        let status = match &err {
            SchedulerError::ValidationError(_) => StatusCode::BAD_REQUEST,
            SchedulerError::NotFound(_) => StatusCode::NOT_FOUND,
            SchedulerError::StateConflict(_) => StatusCode::BAD_REQUEST,
            SchedulerError::QueueFull(_) => StatusCode::SERVICE_UNAVAILABLE,
            SchedulerError::AdapterError { .. } => StatusCode::BAD_GATEWAY,
            SchedulerError::StoreError(_)
            | SchedulerError::Database(_)
            | SchedulerError::Migration(_)
            | SchedulerError::Rocks(_)
            | SchedulerError::Serialization(_)
            | SchedulerError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

pub type ApiResult<T> = Result<ApiResponse<T>, ApiError>;
