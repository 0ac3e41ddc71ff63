//! ABOUTME: `document_remove` adapter - wraps the backend's document deletion endpoint

use super::BackendClient;
use crate::capability::{Capability, CapabilityKind, Outcome};
use crate::transport::Transport;
use crate::value_bag::ValueBag;
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;

pub struct DocumentRemoveCapability {
    client: BackendClient,
}

impl DocumentRemoveCapability {
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>, endpoint: impl Into<String>) -> Self {
        Self {
            client: BackendClient::new(transport, endpoint),
        }
    }
}

#[async_trait]
impl Capability for DocumentRemoveCapability {
    fn name(&self) -> &str {
        "document_remove"
    }

    fn description(&self) -> &str {
        "Remove documents from the vector store by id"
    }

    fn kind(&self) -> CapabilityKind {
        CapabilityKind::DocumentStore
    }

    async fn invoke(&self, params: ValueBag) -> Outcome {
        let mut ids = params.get_list("ids", vec![]);
        let single = params.get_string("id", "");
        if ids.is_empty() && !single.is_empty() {
            ids.push(single);
        }
        if ids.is_empty() {
            return Outcome::failure("validation_failed: ids or id is required");
        }
        let body = json!({
            "ids": ids,
            "collection": params.get_string("collection", "documents"),
        });

        match self.client.post("/documents/remove", body, None).await {
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

    let mut removed_ids = Vec::new();
    let mut removed_count = 0i64;
    let mut not_found_count = 0i64;
    let mut failed_count = 0i64;
    for r in &results {
        let status = r
            .get("status")
            .and_then(serde_json::Value::as_str)
            .unwrap_or("");
        let id = r
            .get("id")
            .and_then(serde_json::Value::as_str)
            .unwrap_or("")
            .to_string();
        match status {
            "removed" => {
                removed_count += 1;
                removed_ids.push(id);
            }
            "not_found" => not_found_count += 1,
            _ => failed_count += 1,
        }
    }

    data.set("removed_count", removed_count);
    data.set("not_found_count", not_found_count);
    data.set("failed_count", failed_count);
    data.set("removed_ids", removed_ids);
    data
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::StubTransport;

    #[tokio::test]
    async fn accepts_single_id_param() {
        let stub = StubTransport::ok(r#"{"results":[{"id":"d1","status":"removed"}]}"#);
        let cap = DocumentRemoveCapability::new(Arc::new(stub), "http://x");
        let mut params = ValueBag::new();
        params.set("id", "d1");
        let outcome = cap.invoke(params).await;
        assert!(outcome.ok);
        assert_eq!(outcome.data.get_int("removed_count", 0), 1);
    }

    #[tokio::test]
    async fn classifies_not_found_and_failed() {
        let stub = StubTransport::ok(
            r#"{"results":[{"id":"a","status":"removed"},{"id":"b","status":"not_found"},{"id":"c","status":"error"}]}"#,
        );
        let cap = DocumentRemoveCapability::new(Arc::new(stub), "http://x");
        let mut params = ValueBag::new();
        params.set("ids", vec!["a".to_string(), "b".to_string(), "c".to_string()]);
        let outcome = cap.invoke(params).await;
        assert!(outcome.ok);
        assert_eq!(outcome.data.get_int("removed_count", 0), 1);
        assert_eq!(outcome.data.get_int("not_found_count", 0), 1);
        assert_eq!(outcome.data.get_int("failed_count", 0), 1);
    }
}
