//! The default fallback adapter: when no adapter is registered for a
//! task type, the registry dispatches here rather than failing outright.

use async_trait::async_trait;
use serde_json::Value;

use crate::{Adapter, InvokeResult};

/// Echoes the input back as the output. Matches the documented
/// compatibility behavior for task types with no configured handler.
#[derive(Debug, Clone, Default)]
pub struct EchoAdapter;

#[async_trait]
impl Adapter for EchoAdapter {
    async fn invoke(&self, _model_config: &Value, _task_type: &str, input: &str) -> InvokeResult {
        Ok(input.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn echoes_input_unchanged() {
        let adapter = EchoAdapter;
        let out = adapter.invoke(&json!({}), "anything", "hello").await.unwrap();
        assert_eq!(out, "hello");
    }
}
