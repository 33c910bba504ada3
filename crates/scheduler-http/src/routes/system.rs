//! `GET /system/health`, `GET /system/info`.

use axum::extract::State;
use axum::routing::get;
use axum::Router;
use serde::Serialize;

use crate::envelope::{ApiResponse, ApiResult};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/system/health", get(health))
        .route("/system/info", get(info))
}

#[derive(Debug, Serialize)]
struct Health {
    status: &'static str,
}

async fn health(State(state): State<AppState>) -> ApiResult<Health> {
    // Touching the queue store's cardinalities is a cheap liveness
    // probe for the RocksDB-backed queue; the relational store is
    // exercised on every request already.
    state.queue.status()?;
    Ok(ApiResponse::ok(Health { status: "ok" }))
}

#[derive(Debug, Serialize)]
struct Info {
    uptime_secs: i64,
    live_workers: Vec<scheduler_worker::WorkerStatus>,
}

async fn info(State(state): State<AppState>) -> ApiResult<Info> {
    let uptime_secs = (chrono::Utc::now() - state.started_at).num_seconds();
    Ok(ApiResponse::ok(Info {
        uptime_secs,
        live_workers: state.pool.worker_statuses(),
    }))
}
