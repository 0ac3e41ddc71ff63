//! ABOUTME: `research_report_generation` adapter - Phase 5 of the research pipeline

use super::BackendClient;
use crate::capability::{Capability, CapabilityKind, Outcome};
use crate::transport::Transport;
use crate::value_bag::ValueBag;
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;

/// Like `research_query_planning`, this adapter has no dedicated backend
/// endpoint and reuses the chat-completions endpoint. Its failure is
/// handled by the pipeline: "if unavailable or fails, synthesize a minimal
/// report from sections already produced" (spec §4.5 Phase 5).
pub struct ResearchReportGenerationCapability {
    client: BackendClient,
}

impl ResearchReportGenerationCapability {
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>, endpoint: impl Into<String>) -> Self {
        Self {
            client: BackendClient::new(transport, endpoint),
        }
    }
}

#[async_trait]
impl Capability for ResearchReportGenerationCapability {
    fn name(&self) -> &str {
        "research_report_generation"
    }

    fn description(&self) -> &str {
        "Assemble a final markdown report from the synthesis output and source counts"
    }

    fn kind(&self) -> CapabilityKind {
        CapabilityKind::Reporting
    }

    async fn invoke(&self, params: ValueBag) -> Outcome {
        let question = params.get_string("question", "");
        let executive_summary = params.get_string("executive_summary", "");
        let comprehensive_analysis = params.get_string("comprehensive_analysis", "");
        if question.is_empty() {
            return Outcome::failure("validation_failed: question is required");
        }
        let prompt = format!(
            "Format a final research report in markdown for the question \"{question}\". \
             Use the executive summary and analysis verbatim as the body:\n\n\
             Executive Summary:\n{executive_summary}\n\nAnalysis:\n{comprehensive_analysis}\n\n\
             Return only the markdown document, beginning with a level-1 heading."
        );
        let body = json!({
            "model": "default",
            "messages": [{"role": "user", "content": prompt}],
            "max_tokens": 1024,
            "temperature": 0.3,
        });

        match self.client.post("/v1/chat/completions", body, None).await {
            Ok(json) => match extract_text(&json) {
                Some(text) => Outcome::success_text(text),
                None => Outcome::failure("backend: no engine"),
            },
            Err(error) => Outcome::failure(error),
        }
    }
}

fn extract_text(json: &serde_json::Value) -> Option<String> {
    json.get("choices")?
        .as_array()?
        .first()?
        .get("message")?
        .get("content")?
        .as_str()
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::StubTransport;

    #[tokio::test]
    async fn returns_generated_markdown_as_text() {
        let stub = StubTransport::ok(
            r#"{"choices":[{"message":{"content":"# Report\nbody"}}]}"#,
        );
        let cap = ResearchReportGenerationCapability::new(Arc::new(stub), "http://x");
        let mut params = ValueBag::new();
        params.set("question", "q");
        let outcome = cap.invoke(params).await;
        assert!(outcome.ok);
        assert_eq!(outcome.text.unwrap(), "# Report\nbody");
    }

    #[tokio::test]
    async fn empty_question_is_validation_failure() {
        let cap = ResearchReportGenerationCapability::new(
            Arc::new(StubTransport::ok("{}")),
            "http://x",
        );
        let outcome = cap.invoke(ValueBag::new()).await;
        assert!(!outcome.ok);
    }
}
