//! ABOUTME: `enhanced_web_search` adapter - wraps internet_search with
//! ABOUTME: best-effort post-processing that never fails the outcome

use super::internet_search::InternetSearchCapability;
use crate::capability::{Capability, CapabilityKind, Outcome};
use crate::transport::Transport;
use crate::value_bag::ValueBag;
use async_trait::async_trait;
use std::sync::Arc;

pub struct EnhancedWebSearchCapability {
    inner: InternetSearchCapability,
}

impl EnhancedWebSearchCapability {
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>, endpoint: impl Into<String>) -> Self {
        Self {
            inner: InternetSearchCapability::new(transport, endpoint),
        }
    }
}

#[async_trait]
impl Capability for EnhancedWebSearchCapability {
    fn name(&self) -> &str {
        "enhanced_web_search"
    }

    fn description(&self) -> &str {
        "internet_search plus filtered snippets and first-sentence summaries"
    }

    fn kind(&self) -> CapabilityKind {
        CapabilityKind::Search
    }

    async fn invoke(&self, params: ValueBag) -> Outcome {
        let mut outcome = self.inner.invoke(params).await;
        if !outcome.ok {
            return outcome;
        }

        let snippets = outcome.data.get_list("snippets", vec![]);
        let filtered_snippets: Vec<String> = snippets
            .iter()
            .map(|s| collapse_whitespace(s))
            .filter(|s| s.len() >= 50)
            .collect();
        let summaries: Vec<String> = snippets.iter().map(|s| first_sentence(s, 200)).collect();

        outcome.data.set("filtered_snippets", filtered_snippets);
        outcome.data.set("summaries", summaries);
        outcome
    }
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn first_sentence(s: &str, max_len: usize) -> String {
    let collapsed = collapse_whitespace(s);
    let end = collapsed
        .find(['.', '!', '?'])
        .map_or(collapsed.len(), |i| i + 1);
    let cut = end.min(max_len);
    collapsed.chars().take(cut).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::StubTransport;

    #[tokio::test]
    async fn short_snippets_are_dropped_from_filtered_snippets() {
        let stub = StubTransport::ok(
            r#"{"results":[{"title":"A","url":"u1","content":"short"},{"title":"B","url":"u2","content":"this snippet is long enough to survive the fifty character threshold for sure"}]}"#,
        );
        let cap = EnhancedWebSearchCapability::new(Arc::new(stub), "http://x");
        let mut params = ValueBag::new();
        params.set("query", "q");
        let outcome = cap.invoke(params).await;
        assert!(outcome.ok);
        let filtered = outcome.data.get_list("filtered_snippets", vec![]);
        assert_eq!(filtered.len(), 1);
    }

    #[tokio::test]
    async fn post_processing_failure_never_fails_the_outcome() {
        // Zero results means snippets is empty; summaries/filtered_snippets
        // come back empty but ok stays true.
        let stub = StubTransport::ok(r#"{"results":[]}"#);
        let cap = EnhancedWebSearchCapability::new(Arc::new(stub), "http://x");
        let mut params = ValueBag::new();
        params.set("query", "q");
        let outcome = cap.invoke(params).await;
        assert!(outcome.ok);
        assert!(outcome.data.get_list("summaries", vec!["x".into()]).is_empty());
    }

    #[tokio::test]
    async fn upstream_failure_propagates() {
        let stub = StubTransport::with_status(503, "down");
        let cap = EnhancedWebSearchCapability::new(Arc::new(stub), "http://x");
        let mut params = ValueBag::new();
        params.set("query", "q");
        let outcome = cap.invoke(params).await;
        assert!(!outcome.ok);
    }
}
