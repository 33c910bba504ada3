//! Task definition and status tracking.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::ModelId;

/// Numeric identifier for a task row.
pub type TaskId = i64;

/// Task priority. Stored as tinyint 1/2/3 (low/medium/high) per the persisted schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(i16)]
pub enum Priority {
    Low = 1,
    Medium = 2,
    High = 3,
}

impl Priority {
    pub const ALL_DESCENDING: [Priority; 3] = [Priority::High, Priority::Medium, Priority::Low];

    pub fn from_i16(value: i16) -> Option<Self> {
        match value {
            1 => Some(Priority::Low),
            2 => Some(Priority::Medium),
            3 => Some(Priority::High),
            _ => None,
        }
    }

    pub fn as_i16(&self) -> i16 {
        *self as i16
    }
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Medium
    }
}

/// Task lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl TaskStatus {
    /// Terminal statuses carry no queue entries: once a task reaches one,
    /// it will never be re-dequeued or retried.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Cancelled
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Running => "running",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
            TaskStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(TaskStatus::Pending),
            "running" => Some(TaskStatus::Running),
            "completed" => Some(TaskStatus::Completed),
            "failed" => Some(TaskStatus::Failed),
            "cancelled" => Some(TaskStatus::Cancelled),
            _ => None,
        }
    }
}

/// A scheduled unit of work dispatched to a model backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub model_id: ModelId,
    pub task_type: String,
    pub input: String,
    pub output: Option<String>,
    pub status: TaskStatus,
    pub priority: Priority,
    pub retry_count: i32,
    pub max_retries: i32,
    pub error_message: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Build a new pending task row, not yet persisted.
    pub fn new(model_id: ModelId, task_type: String, input: String, priority: Priority) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            model_id,
            task_type,
            input,
            output: None,
            status: TaskStatus::Pending,
            priority,
            retry_count: 0,
            max_retries: 3,
            error_message: None,
            started_at: None,
            completed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether another retry attempt is permitted.
    pub fn can_retry(&self) -> bool {
        self.status == TaskStatus::Failed && self.retry_count < self.max_retries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_task_is_pending_with_zero_retries() {
        let t = Task::new(1, "text-generation".into(), "hello".into(), Priority::High);
        assert_eq!(t.status, TaskStatus::Pending);
        assert_eq!(t.retry_count, 0);
        assert_eq!(t.max_retries, 3);
        assert!(t.started_at.is_none());
    }

    #[test]
    fn priority_ordering_is_low_lt_medium_lt_high() {
        assert!(Priority::Low < Priority::Medium);
        assert!(Priority::Medium < Priority::High);
    }

    #[test]
    fn can_retry_requires_failed_status_and_budget() {
        let mut t = Task::new(1, "text-generation".into(), "hi".into(), Priority::Medium);
        assert!(!t.can_retry());
        t.status = TaskStatus::Failed;
        assert!(t.can_retry());
        t.retry_count = t.max_retries;
        assert!(!t.can_retry());
    }

    #[test]
    fn terminal_statuses() {
        assert!(TaskStatus::Completed.is_terminal());
        assert!(TaskStatus::Failed.is_terminal());
        assert!(TaskStatus::Cancelled.is_terminal());
        assert!(!TaskStatus::Pending.is_terminal());
        assert!(!TaskStatus::Running.is_terminal());
    }
}
