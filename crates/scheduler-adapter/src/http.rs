//! HTTP-backed adapters for OpenAI-compatible and bare local inference
//! endpoints. Both are illustrative: enough to prove the trait object
//! works end-to-end, not a complete client for either API family.

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::{adapter_error, Adapter, InvokeResult};

/// Talks to a `/chat/completions`-shaped endpoint. `model_config` is
/// expected to carry `base_url`, `api_key`, and `model` keys; missing
/// `base_url` is a validation failure, not a retryable one.
#[derive(Debug, Clone)]
pub struct OpenAiCompatibleAdapter {
    client: reqwest::Client,
}

impl Default for OpenAiCompatibleAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl OpenAiCompatibleAdapter {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl Adapter for OpenAiCompatibleAdapter {
    async fn invoke(&self, model_config: &Value, _task_type: &str, input: &str) -> InvokeResult {
        let base_url = model_config
            .get("base_url")
            .and_then(Value::as_str)
            .ok_or_else(|| adapter_error(false, "model config missing base_url"))?;
        let model = model_config.get("model").and_then(Value::as_str).unwrap_or("default");
        let api_key = model_config.get("api_key").and_then(Value::as_str).unwrap_or("");

        let url = format!("{}/chat/completions", base_url.trim_end_matches('/'));
        let body = json!({
            "model": model,
            "messages": [{"role": "user", "content": input}],
        });

        debug!(url = %url, "invoking openai-compatible adapter");
        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| adapter_error(true, format!("request failed: {e}")))?;

        if !response.status().is_success() {
            let retryable = response.status().is_server_error();
            let status = response.status();
            return Err(adapter_error(retryable, format!("upstream returned {status}")));
        }

        let parsed: Value = response
            .json()
            .await
            .map_err(|e| adapter_error(true, format!("invalid response body: {e}")))?;

        parsed
            .pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| adapter_error(false, "response missing choices[0].message.content"))
    }
}

/// Talks to a bare local inference endpoint that accepts `{"prompt": ...}`
/// and returns `{"output": ...}`.
#[derive(Debug, Clone)]
pub struct LocalHttpAdapter {
    client: reqwest::Client,
}

impl Default for LocalHttpAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalHttpAdapter {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl Adapter for LocalHttpAdapter {
    async fn invoke(&self, model_config: &Value, _task_type: &str, input: &str) -> InvokeResult {
        let endpoint = model_config
            .get("endpoint")
            .and_then(Value::as_str)
            .ok_or_else(|| adapter_error(false, "model config missing endpoint"))?;

        let response = self
            .client
            .post(endpoint)
            .json(&json!({ "prompt": input }))
            .send()
            .await
            .map_err(|e| adapter_error(true, format!("request failed: {e}")))?;

        if !response.status().is_success() {
            let retryable = response.status().is_server_error();
            warn!(status = %response.status(), "local adapter call failed");
            return Err(adapter_error(retryable, format!("upstream returned {}", response.status())));
        }

        let parsed: Value = response
            .json()
            .await
            .map_err(|e| adapter_error(true, format!("invalid response body: {e}")))?;

        parsed
            .get("output")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| adapter_error(false, "response missing output field"))
    }
}
