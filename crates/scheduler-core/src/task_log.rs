//! Append-only per-task audit log entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::task::TaskId;

/// Severity of a task log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "debug" => Some(LogLevel::Debug),
            "info" => Some(LogLevel::Info),
            "warn" => Some(LogLevel::Warn),
            "error" => Some(LogLevel::Error),
            _ => None,
        }
    }
}

/// One audit entry recorded at a task state transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskLog {
    pub id: i64,
    pub task_id: TaskId,
    pub level: LogLevel,
    pub message: String,
    pub payload: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

impl TaskLog {
    pub fn new(task_id: TaskId, level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            id: 0,
            task_id,
            level,
            message: message.into(),
            payload: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = Some(payload);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_log_has_no_payload_by_default() {
        let log = TaskLog::new(1, LogLevel::Info, "started");
        assert!(log.payload.is_none());
        assert_eq!(log.message, "started");
    }

    #[test]
    fn with_payload_attaches_structured_data() {
        let log = TaskLog::new(1, LogLevel::Error, "failed")
            .with_payload(serde_json::json!({"attempt": 2}));
        assert_eq!(log.payload.unwrap()["attempt"], 2);
    }
}
