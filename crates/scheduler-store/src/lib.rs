//! Durable task store.
//!
//! The relational store is the source of truth for task, model and
//! task-log rows. It is deliberately the only crate in this workspace
//! that talks SQL; `scheduler-queue` never reads a task's real state,
//! it only carries an opaque `QueueEntry` pointing back at a `task_id`.

pub mod config;
pub mod model_store;
pub mod pool;
pub mod task_log_store;
pub mod task_store;

pub use config::StoreConfig;
pub use model_store::ModelStore;
pub use pool::connect;
pub use task_log_store::TaskLogStore;
pub use task_store::TaskStore;

use scheduler_core::Result;
use sqlx::AnyPool;

/// Run the embedded schema migrations against an already-open pool.
pub async fn migrate(pool: &AnyPool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}
