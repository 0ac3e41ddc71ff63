//! ABOUTME: `inference` adapter - wraps the backend's OpenAI-shaped chat endpoint
//! ABOUTME: never synthesizes text on its own; "no engine" is a hard failure here

use super::BackendClient;
use crate::capability::{Capability, CapabilityKind, Outcome};
use crate::transport::Transport;
use crate::value_bag::ValueBag;
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;

pub struct InferenceCapability {
    client: BackendClient,
}

impl InferenceCapability {
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>, endpoint: impl Into<String>) -> Self {
        Self {
            client: BackendClient::new(transport, endpoint),
        }
    }
}

#[async_trait]
impl Capability for InferenceCapability {
    fn name(&self) -> &str {
        "inference"
    }

    fn description(&self) -> &str {
        "Run a completion against the backend's inference engine"
    }

    fn kind(&self) -> CapabilityKind {
        CapabilityKind::Inference
    }

    async fn invoke(&self, params: ValueBag) -> Outcome {
        let prompt = params.get_string("prompt", "");
        if prompt.is_empty() {
            return Outcome::failure("validation_failed: prompt is required");
        }
        let max_tokens = params.get_int("max_tokens", 128).clamp(1, 4096);
        let temperature = params.get_float("temperature", 0.7).clamp(0.0, 2.0);
        let top_p = params.get_float("top_p", 0.9).clamp(0.0, 1.0);
        let seed = params.get_int("seed", -1);
        let model = params.get_string("model_id", "default");

        let mut body = json!({
            "model": model,
            "messages": [{"role": "user", "content": prompt}],
            "max_tokens": max_tokens,
            "temperature": temperature,
            "top_p": top_p,
        });
        if seed >= 0 {
            body["seed"] = json!(seed);
        }

        let start = Instant::now();
        match self.client.post("/v1/chat/completions", body, None).await {
            Ok(json) => match extract(&json) {
                Some(mut data) => {
                    let elapsed = start.elapsed().as_secs_f64();
                    let tokens = data.get_int("tokens_generated", 0);
                    if elapsed > 0.0 {
                        data.set("tokens_per_second", tokens as f64 / elapsed);
                    }
                    Outcome::success(data)
                }
                None => Outcome::failure("backend: no engine"),
            },
            Err(error) => Outcome::failure(error),
        }
    }
}

fn extract(json: &serde_json::Value) -> Option<ValueBag> {
    let text = json
        .get("choices")?
        .as_array()?
        .first()?
        .get("message")?
        .get("content")?
        .as_str()?
        .to_string();

    let mut data = ValueBag::new();
    let tokens_generated = json
        .get("usage")
        .and_then(|u| u.get("completion_tokens"))
        .and_then(serde_json::Value::as_i64)
        .unwrap_or_else(|| text.split_whitespace().count() as i64);
    let engine_used = json
        .get("model")
        .and_then(serde_json::Value::as_str)
        .unwrap_or("unknown")
        .to_string();

    data.set("text", text);
    data.set("tokens_generated", tokens_generated);
    data.set("tokens_per_second", 0.0_f64);
    data.set("engine_used", engine_used);
    Some(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::StubTransport;

    #[tokio::test]
    async fn extracts_openai_shaped_response() {
        let stub = StubTransport::ok(
            r#"{"model":"llama","choices":[{"message":{"content":"hello world"}}],"usage":{"completion_tokens":2}}"#,
        );
        let cap = InferenceCapability::new(Arc::new(stub), "http://x");
        let mut params = ValueBag::new();
        params.set("prompt", "hi");
        let outcome = cap.invoke(params).await;
        assert!(outcome.ok);
        assert_eq!(outcome.data.get_string("text", ""), "hello world");
        assert_eq!(outcome.data.get_string("engine_used", ""), "llama");
    }

    #[tokio::test]
    async fn no_engine_is_hard_failure_not_synthesized_text() {
        let stub = StubTransport::ok(r#"{"choices":[]}"#);
        let cap = InferenceCapability::new(Arc::new(stub), "http://x");
        let mut params = ValueBag::new();
        params.set("prompt", "hi");
        let outcome = cap.invoke(params).await;
        assert!(!outcome.ok);
        assert_eq!(outcome.error.unwrap(), "backend: no engine");
    }

    #[tokio::test]
    async fn parameters_are_clamped_to_documented_ranges() {
        let stub = StubTransport::ok(
            r#"{"model":"m","choices":[{"message":{"content":"x"}}]}"#,
        );
        let cap = InferenceCapability::new(Arc::new(stub), "http://x");
        let mut params = ValueBag::new();
        params.set("prompt", "hi");
        params.set("max_tokens", 999_999_i64);
        params.set("temperature", 10.0_f64);
        let outcome = cap.invoke(params).await;
        assert!(outcome.ok);
    }
}
