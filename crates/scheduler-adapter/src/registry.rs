//! Registry mapping `(task_type, model_type)` to an [`Adapter`], with a
//! defaulted fallback for unregistered task types.

use std::collections::HashMap;
use std::sync::Arc;

use scheduler_core::model::ModelType;

use crate::{Adapter, EchoAdapter};

/// Holds one adapter per `(task_type, model_type)` pair plus a shared
/// default invoked when no specific match exists.
pub struct AdapterRegistry {
    adapters: HashMap<(String, ModelType), Arc<dyn Adapter>>,
    default: Arc<dyn Adapter>,
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self {
            adapters: HashMap::new(),
            default: Arc::new(EchoAdapter),
        }
    }

    pub fn with_default(default: Arc<dyn Adapter>) -> Self {
        Self {
            adapters: HashMap::new(),
            default,
        }
    }

    /// Register an adapter for a specific `(task_type, model_type)` pair.
    pub fn register(&mut self, task_type: impl Into<String>, model_type: ModelType, adapter: Arc<dyn Adapter>) {
        self.adapters.insert((task_type.into(), model_type), adapter);
    }

    /// Look up the adapter for `(task_type, model_type)`, falling back
    /// to the registry's default when nothing was registered for it.
    pub fn resolve(&self, task_type: &str, model_type: ModelType) -> Arc<dyn Adapter> {
        self.adapters
            .get(&(task_type.to_string(), model_type))
            .cloned()
            .unwrap_or_else(|| self.default.clone())
    }

    pub fn has(&self, task_type: &str, model_type: ModelType) -> bool {
        self.adapters.contains_key(&(task_type.to_string(), model_type))
    }
}
