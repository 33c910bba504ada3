//! The model-invocation plug-in point: one trait, a registry keyed by
//! `(task_type, model_type)`, and a small set of illustrative adapters.

pub mod custom;
pub mod http;
pub mod registry;

use async_trait::async_trait;
use scheduler_core::error::SchedulerError;
use serde_json::Value;

pub use custom::EchoAdapter;
pub use http::{LocalHttpAdapter, OpenAiCompatibleAdapter};
pub use registry::AdapterRegistry;

/// Outcome of a model invocation: either the model's text output, or an
/// error annotated with whether retrying is worth attempting.
pub type InvokeResult = Result<String, SchedulerError>;

/// A single backend invocation capability. Implementations should be
/// idempotent where practical: the reaper can cause the same task to
/// be invoked twice if a worker is slow rather than dead.
#[async_trait]
pub trait Adapter: Send + Sync {
    async fn invoke(&self, model_config: &Value, task_type: &str, input: &str) -> InvokeResult;
}

pub(crate) fn adapter_error(retryable: bool, message: impl Into<String>) -> SchedulerError {
    SchedulerError::AdapterError {
        retryable,
        message: message.into(),
    }
}
