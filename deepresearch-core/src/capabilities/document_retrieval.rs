//! ABOUTME: `document_retrieval` adapter - wraps the backend's /retrieve endpoint

use super::BackendClient;
use crate::capability::{Capability, CapabilityKind, Outcome};
use crate::transport::Transport;
use crate::value_bag::ValueBag;
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;

pub struct DocumentRetrievalCapability {
    client: BackendClient,
}

impl DocumentRetrievalCapability {
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>, endpoint: impl Into<String>) -> Self {
        Self {
            client: BackendClient::new(transport, endpoint),
        }
    }
}

#[async_trait]
impl Capability for DocumentRetrievalCapability {
    fn name(&self) -> &str {
        "document_retrieval"
    }

    fn description(&self) -> &str {
        "Retrieve documents from the vector store by semantic similarity"
    }

    fn kind(&self) -> CapabilityKind {
        CapabilityKind::Retrieval
    }

    async fn invoke(&self, params: ValueBag) -> Outcome {
        let query = params.get_string("query", "");
        if query.is_empty() {
            return Outcome::failure("validation_failed: query is required");
        }
        let threshold = params.get_float("threshold", 0.7).clamp(0.0, 1.0);
        let body = json!({
            "query": query,
            "limit": params.get_int("limit", 10),
            "collection": params.get_string("collection", "documents"),
            "threshold": threshold,
        });

        match self.client.post("/retrieve", body, None).await {
            Ok(json) => Outcome::success(normalize(&json)),
            Err(error) => Outcome::failure(error),
        }
    }
}

fn normalize(json: &serde_json::Value) -> ValueBag {
    let mut data = ValueBag::new();
    let documents = json
        .get("documents")
        .and_then(serde_json::Value::as_array)
        .cloned()
        .unwrap_or_default();

    let mut contents = Vec::new();
    let mut sources = Vec::new();
    let mut document_ids = Vec::new();
    let mut scores = Vec::new();
    for doc in &documents {
        contents.push(
            doc.get("content")
                .and_then(serde_json::Value::as_str)
                .unwrap_or("")
                .to_string(),
        );
        let source = doc
            .get("source")
            .or_else(|| doc.get("metadata").and_then(|m| m.get("source")))
            .and_then(serde_json::Value::as_str)
            .unwrap_or("")
            .to_string();
        sources.push(source);
        document_ids.push(
            doc.get("id")
                .and_then(serde_json::Value::as_str)
                .unwrap_or("")
                .to_string(),
        );
        let score = doc.get("score").and_then(serde_json::Value::as_f64).unwrap_or(0.0);
        scores.push(score);
    }

    data.set("documents_count", documents.len() as i64);
    data.set("contents", contents);
    data.set("sources", sources);
    data.set("document_ids", document_ids);
    // scores is a list of floats; ValueBag's List kind is string-typed, so we
    // additionally stash scores as a nested bag keyed by index for callers
    // that need the numeric value, while exposing a stringified list too.
    let score_strings: Vec<String> = scores.iter().map(|s| format!("{s}")).collect();
    data.set("scores", score_strings);
    let mut score_bag = ValueBag::new();
    for (i, s) in scores.iter().enumerate() {
        score_bag.set(i.to_string(), *s);
    }
    data.set("scores_bag", score_bag);
    data
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::StubTransport;

    #[tokio::test]
    async fn normalizes_documents() {
        let stub = StubTransport::ok(
            r#"{"documents":[{"id":"d1","content":"c1","score":0.9,"source":"doc1"}]}"#,
        );
        let cap = DocumentRetrievalCapability::new(Arc::new(stub), "http://x");
        let mut params = ValueBag::new();
        params.set("query", "q");
        let outcome = cap.invoke(params).await;
        assert!(outcome.ok);
        assert_eq!(outcome.data.get_int("documents_count", -1), 1);
        assert_eq!(outcome.data.get_list("sources", vec![]), vec!["doc1"]);
    }

    #[tokio::test]
    async fn threshold_is_clamped() {
        // We can't observe the outgoing body directly through StubTransport,
        // but an out-of-range threshold must not cause a panic or failure.
        let stub = StubTransport::ok(r#"{"documents":[]}"#);
        let cap = DocumentRetrievalCapability::new(Arc::new(stub), "http://x");
        let mut params = ValueBag::new();
        params.set("query", "q");
        params.set("threshold", 5.0_f64);
        let outcome = cap.invoke(params).await;
        assert!(outcome.ok);
    }
}
