//! ABOUTME: Capability adapters that translate a capability invocation into
//! ABOUTME: an HTTP call against the backend (spec §4.3)

mod document_add;
mod document_parse;
mod document_remove;
mod document_retrieval;
mod embedding;
mod enhanced_web_search;
mod inference;
mod internet_search;
mod research_query_planning;
mod research_report_generation;

pub use document_add::DocumentAddCapability;
pub use document_parse::DocumentParseCapability;
pub use document_remove::DocumentRemoveCapability;
pub use document_retrieval::DocumentRetrievalCapability;
pub use embedding::EmbeddingCapability;
pub use enhanced_web_search::EnhancedWebSearchCapability;
pub use inference::InferenceCapability;
pub use internet_search::InternetSearchCapability;
pub use research_query_planning::ResearchQueryPlanningCapability;
pub use research_report_generation::ResearchReportGenerationCapability;

use crate::transport::{HttpResponse, Transport};
use serde_json::Value as Json;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Shared plumbing every backend-calling adapter needs: the transport, the
/// base endpoint, and a default per-call timeout used when the caller's
/// `params` do not override it.
pub(crate) struct BackendClient {
    transport: Arc<dyn Transport>,
    endpoint: String,
    default_timeout: Duration,
}

impl BackendClient {
    pub(crate) fn new(transport: Arc<dyn Transport>, endpoint: impl Into<String>) -> Self {
        Self {
            transport,
            endpoint: endpoint.into(),
            default_timeout: Duration::from_secs(30),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.endpoint.trim_end_matches('/'), path)
    }

    pub(crate) async fn post(
        &self,
        path: &str,
        body: Json,
        timeout: Option<Duration>,
    ) -> Result<Json, String> {
        let response = self
            .transport
            .post(
                &self.url(path),
                body,
                &HashMap::new(),
                timeout.unwrap_or(self.default_timeout),
                CancellationToken::new(),
            )
            .await
            .map_err(|detail| format!("transport: {detail}"))?;
        parse_backend_response(response)
    }

    pub(crate) async fn get(&self, path: &str) -> Result<Json, String> {
        let response = self
            .transport
            .get(
                &self.url(path),
                &HashMap::new(),
                self.default_timeout,
                CancellationToken::new(),
            )
            .await
            .map_err(|detail| format!("transport: {detail}"))?;
        parse_backend_response(response)
    }
}

/// Shared failure taxonomy (spec §4.3): non-2xx → `http_<code>`, malformed
/// JSON → `parse`, backend-signaled `"error"` field → `backend`.
fn parse_backend_response(response: HttpResponse) -> Result<Json, String> {
    if !(200..300).contains(&response.status) {
        let prefix: String = response.body.chars().take(200).collect();
        return Err(format!("http_{}: {prefix}", response.status));
    }
    let json: Json = serde_json::from_str(&response.body)
        .map_err(|e| format!("parse: {e}"))?;
    if let Some(message) = json.get("error").and_then(Json::as_str) {
        return Err(format!("backend: {message}"));
    }
    Ok(json)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_2xx_is_http_error() {
        let err = parse_backend_response(HttpResponse {
            status: 503,
            body: "overloaded upstream".into(),
        })
        .unwrap_err();
        assert!(err.starts_with("http_503:"));
    }

    #[test]
    fn malformed_json_is_parse_error() {
        let err = parse_backend_response(HttpResponse {
            status: 200,
            body: "not json".into(),
        })
        .unwrap_err();
        assert!(err.starts_with("parse:"));
    }

    #[test]
    fn backend_error_field_is_backend_error() {
        let err = parse_backend_response(HttpResponse {
            status: 200,
            body: r#"{"error":"no engine"}"#.into(),
        })
        .unwrap_err();
        assert_eq!(err, "backend: no engine");
    }

    #[test]
    fn ok_response_passes_through() {
        let json = parse_backend_response(HttpResponse {
            status: 200,
            body: r#"{"results":[]}"#.into(),
        })
        .unwrap();
        assert!(json.get("results").is_some());
    }
}
