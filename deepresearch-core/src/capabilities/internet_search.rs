//! ABOUTME: `internet_search` adapter - wraps the backend's /internet_search endpoint

use super::BackendClient;
use crate::capability::{Capability, CapabilityKind, Outcome};
use crate::transport::Transport;
use crate::value_bag::ValueBag;
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;

pub struct InternetSearchCapability {
    client: BackendClient,
}

impl InternetSearchCapability {
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>, endpoint: impl Into<String>) -> Self {
        Self {
            client: BackendClient::new(transport, endpoint),
        }
    }
}

#[async_trait]
impl Capability for InternetSearchCapability {
    fn name(&self) -> &str {
        "internet_search"
    }

    fn description(&self) -> &str {
        "Search the open web via the backend's search engines"
    }

    fn kind(&self) -> CapabilityKind {
        CapabilityKind::Search
    }

    async fn invoke(&self, params: ValueBag) -> Outcome {
        let query = params.get_string("query", "");
        if query.is_empty() {
            return Outcome::failure("validation_failed: query is required");
        }
        let results = params.get_int("results", 10).clamp(0, 50);
        let body = json!({
            "query": query,
            "results": results,
            "engines": params.get_string("engines", ""),
            "language": params.get_string("language", "en"),
            "categories": params.get_string("categories", ""),
            "safe_search": params.get_bool("safe_search", true),
            "timeout": params.get_int("timeout", 10),
            "format": "json",
        });

        match self.client.post("/internet_search", body, None).await {
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

    let mut titles = Vec::new();
    let mut urls = Vec::new();
    let mut snippets = Vec::new();
    for entry in &results {
        titles.push(string_field(entry, "title"));
        urls.push(string_field(entry, "url"));
        let snippet = entry
            .get("content")
            .or_else(|| entry.get("snippet"))
            .and_then(serde_json::Value::as_str)
            .unwrap_or("")
            .to_string();
        snippets.push(snippet);
    }
    let engines_used: Vec<String> = json
        .get("engines_used")
        .and_then(serde_json::Value::as_array)
        .map(|a| {
            a.iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default();

    data.set("results_count", results.len() as i64);
    data.set("titles", titles);
    data.set("urls", urls);
    data.set("snippets", snippets);
    data.set("engines_used", engines_used);
    data
}

fn string_field(entry: &serde_json::Value, field: &str) -> String {
    entry
        .get(field)
        .and_then(serde_json::Value::as_str)
        .unwrap_or("")
        .to_string()
}
