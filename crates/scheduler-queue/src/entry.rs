//! The queue-side task identity.

use chrono::{DateTime, Utc};
use scheduler_core::model::ModelId;
use scheduler_core::task::{Priority, TaskId};
use serde::{Deserialize, Serialize};

/// `{task_id, model_id, priority, created_at}` -- the only queue-side
/// identity. The task row in `scheduler-store` remains the source of
/// truth; this is just enough to route and order the work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueEntry {
    pub task_id: TaskId,
    pub model_id: ModelId,
    pub priority: Priority,
    pub created_at: DateTime<Utc>,
}

impl QueueEntry {
    pub fn new(task_id: TaskId, model_id: ModelId, priority: Priority) -> Self {
        Self {
            task_id,
            model_id,
            priority,
            created_at: Utc::now(),
        }
    }
}
