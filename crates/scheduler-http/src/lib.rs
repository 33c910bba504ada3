//! The HTTP surface the dashboard consumes. A thin `axum` router
//! delegating every handler body to `scheduler-lifecycle` /
//! `scheduler-worker` calls; no templating or dashboard HTML is built
//! here, that lives in the separate frontend.

pub mod envelope;
pub mod routes;
pub mod state;

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use state::AppState;

/// Build the full router, merged under one permissive CORS layer.
pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(routes::tasks::router())
        .merge(routes::models::router())
        .merge(routes::stats::router())
        .merge(routes::system::router())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
