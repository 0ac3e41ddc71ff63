//! ABOUTME: `embedding` adapter - wraps the backend's embedding endpoint
//! ABOUTME: the raw vector never crosses the ValueBag boundary (spec §4.3)

use super::BackendClient;
use crate::capability::{Capability, CapabilityKind, Outcome};
use crate::transport::Transport;
use crate::value_bag::ValueBag;
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;

pub struct EmbeddingCapability {
    client: BackendClient,
}

impl EmbeddingCapability {
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>, endpoint: impl Into<String>) -> Self {
        Self {
            client: BackendClient::new(transport, endpoint),
        }
    }
}

#[async_trait]
impl Capability for EmbeddingCapability {
    fn name(&self) -> &str {
        "embedding"
    }

    fn description(&self) -> &str {
        "Compute a text embedding and report summary statistics"
    }

    fn kind(&self) -> CapabilityKind {
        CapabilityKind::Embedding
    }

    async fn invoke(&self, params: ValueBag) -> Outcome {
        let text = params.get_string("text", "");
        if text.is_empty() {
            return Outcome::failure("validation_failed: text is required");
        }
        let body = json!({
            "text": text,
            "model": params.get_string("model", ""),
        });

        match self.client.post("/embed", body, None).await {
            Ok(json) => match summarize(&json) {
                Some(data) => Outcome::success(data),
                None => Outcome::failure("parse: embedding response missing vector"),
            },
            Err(error) => Outcome::failure(error),
        }
    }
}

fn summarize(json: &serde_json::Value) -> Option<ValueBag> {
    let vector = json.get("embedding").and_then(serde_json::Value::as_array)?;
    let values: Vec<f64> = vector.iter().filter_map(serde_json::Value::as_f64).collect();
    if values.is_empty() {
        return None;
    }
    let sum: f64 = values.iter().sum();
    let mean = sum / values.len() as f64;
    let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);

    let mut data = ValueBag::new();
    data.set("dimensions", values.len() as i64);
    data.set("mean", mean);
    data.set("min", min);
    data.set("max", max);
    Some(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::StubTransport;

    #[tokio::test]
    async fn summarizes_vector_without_returning_it() {
        let stub = StubTransport::ok(r#"{"embedding":[0.1,0.5,0.9]}"#);
        let cap = EmbeddingCapability::new(Arc::new(stub), "http://x");
        let mut params = ValueBag::new();
        params.set("text", "hello");
        let outcome = cap.invoke(params).await;
        assert!(outcome.ok);
        assert_eq!(outcome.data.get_int("dimensions", 0), 3);
        assert!(!outcome.data.has("embedding"));
    }

    #[tokio::test]
    async fn missing_vector_is_parse_error() {
        let stub = StubTransport::ok(r#"{}"#);
        let cap = EmbeddingCapability::new(Arc::new(stub), "http://x");
        let mut params = ValueBag::new();
        params.set("text", "hello");
        let outcome = cap.invoke(params).await;
        assert!(!outcome.ok);
        assert!(outcome.error.unwrap().starts_with("parse:"));
    }
}
