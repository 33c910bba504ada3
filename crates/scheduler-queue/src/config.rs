//! Configuration for the RocksDB-backed queue manager.

/// Settings for [`crate::manager::QueueManager`].
#[derive(Debug, Clone)]
pub struct QueueConfig {
    pub db_path: String,
    /// How long a dequeued entry may sit in `queue:processing` before the
    /// reaper considers the worker dead and requeues it.
    pub task_timeout_secs: i64,
    /// Delay applied when the reaper requeues an expired entry.
    pub reap_retry_delay_secs: i64,
    /// Soft cap across the three priority lanes plus the delayed set,
    /// enforced by `enqueue`.
    pub max_queue_size: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            db_path: "./data/queue".to_string(),
            task_timeout_secs: 300,
            reap_retry_delay_secs: 5,
            max_queue_size: 10_000,
        }
    }
}

impl QueueConfig {
    pub fn with_db_path(mut self, path: impl Into<String>) -> Self {
        self.db_path = path.into();
        self
    }

    pub fn with_task_timeout_secs(mut self, secs: i64) -> Self {
        self.task_timeout_secs = secs;
        self
    }
}
