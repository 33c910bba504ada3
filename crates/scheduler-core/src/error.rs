//! Error types for the scheduler.

use thiserror::Error;

/// Result type for scheduler operations.
pub type Result<T> = std::result::Result<T, SchedulerError>;

/// Error kinds produced by the scheduling engine.
#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("state conflict: {0}")]
    StateConflict(String),

    #[error("queue full: {0}")]
    QueueFull(String),

    #[error("adapter error: {message}")]
    AdapterError { retryable: bool, message: String },

    #[error("store error: {0}")]
    StoreError(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("queue store error: {0}")]
    Rocks(#[from] rocksdb::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl SchedulerError {
    /// Whether retrying the operation that produced this error could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SchedulerError::AdapterError { retryable: true, .. })
    }
}
