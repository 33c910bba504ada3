//! Model registry entity.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Numeric identifier for a model row.
pub type ModelId = i64;

/// Backend kind a model talks to.
///
/// Stored as text in the relational schema (`scheduler-store` maps to/from
/// this via `as_str`/`FromStr`, the way `rapid-rs`'s `JobStorage` maps its
/// status column) rather than a native Postgres enum, so the same schema
/// works unchanged against the SQLite test backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelType {
    Openai,
    Local,
    Custom,
}

impl ModelType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelType::Openai => "openai",
            ModelType::Local => "local",
            ModelType::Custom => "custom",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "openai" => Some(ModelType::Openai),
            "local" => Some(ModelType::Local),
            "custom" => Some(ModelType::Custom),
            _ => None,
        }
    }
}

/// Admission status of a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelStatus {
    Online,
    Offline,
    Maintenance,
}

impl ModelStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelStatus::Online => "online",
            ModelStatus::Offline => "offline",
            ModelStatus::Maintenance => "maintenance",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "online" => Some(ModelStatus::Online),
            "offline" => Some(ModelStatus::Offline),
            "maintenance" => Some(ModelStatus::Maintenance),
            _ => None,
        }
    }
}

/// A model backend definition and its live worker bookkeeping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Model {
    pub id: ModelId,
    pub name: String,
    pub model_type: ModelType,
    pub config: HashMap<String, serde_json::Value>,
    pub status: ModelStatus,
    pub max_workers: i32,
    pub current_workers: i32,
    pub total_requests: i64,
    pub success_requests: i64,
}

impl Model {
    /// Build a new model row, not yet persisted, with zeroed counters.
    pub fn new(name: String, model_type: ModelType, max_workers: i32) -> Self {
        Self {
            id: 0,
            name,
            model_type,
            config: HashMap::new(),
            status: ModelStatus::Offline,
            max_workers,
            current_workers: 0,
            total_requests: 0,
            success_requests: 0,
        }
    }

    /// Whether another worker may be spun up for this model without exceeding the cap.
    pub fn has_worker_capacity(&self) -> bool {
        self.current_workers < self.max_workers
    }
}
