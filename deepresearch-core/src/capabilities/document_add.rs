//! ABOUTME: `document_add` adapter - wraps the backend's POST /documents endpoint

use super::BackendClient;
use crate::capability::{Capability, CapabilityKind, Outcome};
use crate::transport::Transport;
use crate::value_bag::ValueBag;
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;

pub struct DocumentAddCapability {
    client: BackendClient,
}

impl DocumentAddCapability {
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>, endpoint: impl Into<String>) -> Self {
        Self {
            client: BackendClient::new(transport, endpoint),
        }
    }
}

#[async_trait]
impl Capability for DocumentAddCapability {
    fn name(&self) -> &str {
        "document_add"
    }

    fn description(&self) -> &str {
        "Add documents to the vector store"
    }

    fn kind(&self) -> CapabilityKind {
        CapabilityKind::DocumentStore
    }

    async fn invoke(&self, params: ValueBag) -> Outcome {
        let texts = params.get_list("texts", vec![]);
        if texts.is_empty() {
            return Outcome::failure("validation_failed: texts is required");
        }
        let documents: Vec<serde_json::Value> = texts
            .iter()
            .map(|t| json!({ "text": t, "metadata": {} }))
            .collect();
        let body = json!({
            "collection": params.get_string("collection", "documents"),
            "documents": documents,
        });

        match self.client.post("/documents", body, None).await {
            Ok(json) => Outcome::success(normalize(&json)),
            Err(error) => Outcome::failure(error),
        }
    }
}

fn normalize(json: &serde_json::Value) -> ValueBag {
    let mut data = ValueBag::new();
    let results = json
        .get("results")
        .and_then(serde_json::Value::as_array)
        .cloned()
        .unwrap_or_default();

    let successful_count = json
        .get("successful_count")
        .and_then(serde_json::Value::as_i64)
        .unwrap_or_else(|| {
            results
                .iter()
                .filter(|r| r.get("success").and_then(serde_json::Value::as_bool) == Some(true))
                .count() as i64
        });
    let failed_count = json
        .get("failed_count")
        .and_then(serde_json::Value::as_i64)
        .unwrap_or(results.len() as i64 - successful_count);

    let document_ids: Vec<String> = results
        .iter()
        .filter(|r| r.get("success").and_then(serde_json::Value::as_bool) == Some(true))
        .filter_map(|r| r.get("id").and_then(serde_json::Value::as_str))
        .map(str::to_string)
        .collect();

    data.set("successful_count", successful_count);
    data.set("failed_count", failed_count);
    data.set("document_ids", document_ids);
    data
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::StubTransport;

    #[tokio::test]
    async fn empty_texts_is_validation_failure() {
        let cap = DocumentAddCapability::new(Arc::new(StubTransport::ok("{}")), "http://x");
        let outcome = cap.invoke(ValueBag::new()).await;
        assert!(!outcome.ok);
    }

    #[tokio::test]
    async fn successful_ids_only_include_successes() {
        let stub = StubTransport::ok(
            r#"{"successful_count":1,"failed_count":1,"results":[{"id":"a","success":true},{"id":"b","success":false,"error":"dup"}]}"#,
        );
        let cap = DocumentAddCapability::new(Arc::new(stub), "http://x");
        let mut params = ValueBag::new();
        params.set("texts", vec!["hello".to_string()]);
        let outcome = cap.invoke(params).await;
        assert!(outcome.ok);
        assert_eq!(outcome.data.get_int("successful_count", 0), 1);
        assert_eq!(outcome.data.get_int("failed_count", 0), 1);
        assert_eq!(outcome.data.get_list("document_ids", vec![]), vec!["a"]);
    }
}
