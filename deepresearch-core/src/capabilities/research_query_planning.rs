//! ABOUTME: `research_query_planning` adapter - Phase 1 of the research pipeline
//! ABOUTME: asks the backend's inference engine to decompose a question

use super::BackendClient;
use crate::capability::{Capability, CapabilityKind, Outcome};
use crate::transport::Transport;
use crate::value_bag::ValueBag;
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;

/// No dedicated backend endpoint is documented for planning (spec §6's
/// wire table only covers search/retrieve/documents/chat); this adapter
/// reuses the chat-completions endpoint with a structured prompt, the same
/// pattern `inference` uses, and parses the JSON the model is asked to
/// emit. A malformed or unavailable model response degrades to an `Outcome`
/// failure — the pipeline (not this adapter) decides to fall back to using
/// the bare question as the sole sub-query (spec §4.5 Phase 1).
pub struct ResearchQueryPlanningCapability {
    client: BackendClient,
}

impl ResearchQueryPlanningCapability {
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>, endpoint: impl Into<String>) -> Self {
        Self {
            client: BackendClient::new(transport, endpoint),
        }
    }
}

#[async_trait]
impl Capability for ResearchQueryPlanningCapability {
    fn name(&self) -> &str {
        "research_query_planning"
    }

    fn description(&self) -> &str {
        "Decompose a research question into sub-queries, search terms, and recommended sources"
    }

    fn kind(&self) -> CapabilityKind {
        CapabilityKind::Planning
    }

    async fn invoke(&self, params: ValueBag) -> Outcome {
        let question = params.get_string("question", "");
        if question.is_empty() {
            return Outcome::failure("validation_failed: question is required");
        }
        let methodology = params.get_string("methodology", "comprehensive");
        let scope = params.get_string("scope", "moderate");
        let prompt = format!(
            "Plan a {methodology} research investigation (scope: {scope}) for the \
             question: \"{question}\". Respond ONLY with JSON of the shape \
             {{\"sub_queries\": [...], \"search_terms\": [...], \
             \"recommended_sources\": [...]}}."
        );
        let body = json!({
            "model": "default",
            "messages": [{"role": "user", "content": prompt}],
            "max_tokens": 512,
            "temperature": 0.2,
        });

        match self.client.post("/v1/chat/completions", body, None).await {
            Ok(json) => match parse_plan(&json) {
                Some(data) => Outcome::success(data),
                None => Outcome::failure("parse: planning response was not the expected shape"),
            },
            Err(error) => Outcome::failure(error),
        }
    }
}

fn parse_plan(json: &serde_json::Value) -> Option<ValueBag> {
    let text = json
        .get("choices")?
        .as_array()?
        .first()?
        .get("message")?
        .get("content")?
        .as_str()?;
    let plan: serde_json::Value = serde_json::from_str(text).ok()?;

    let mut data = ValueBag::new();
    data.set("sub_queries", string_array(&plan, "sub_queries"));
    data.set("search_terms", string_array(&plan, "search_terms"));
    data.set(
        "recommended_sources",
        string_array(&plan, "recommended_sources"),
    );
    Some(data)
}

fn string_array(value: &serde_json::Value, field: &str) -> Vec<String> {
    value
        .get(field)
        .and_then(serde_json::Value::as_array)
        .map(|a| {
            a.iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}
