//! ABOUTME: External HTTP transport contract consumed by capability adapters
//! ABOUTME: Capabilities depend on the `Transport` trait, never on reqwest directly

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

/// Status code plus raw response body.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

/// Thin transport contract (spec §4.7): `post`/`get` with a deadline and a
/// cooperative cancellation handle. Retry is explicitly not this layer's
/// job — the workflow engine owns retry/backoff (spec §4.4).
#[async_trait]
pub trait Transport: Send + Sync {
    async fn post(
        &self,
        url: &str,
        body_json: serde_json::Value,
        headers: &HashMap<String, String>,
        timeout: Duration,
        cancel: CancellationToken,
    ) -> Result<HttpResponse, String>;

    async fn get(
        &self,
        url: &str,
        headers: &HashMap<String, String>,
        timeout: Duration,
        cancel: CancellationToken,
    ) -> Result<HttpResponse, String>;
}

/// `reqwest`-backed transport. One client is shared across all adapters so
/// connection pooling applies across the whole agent.
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    #[must_use]
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    #[instrument(skip(self, body_json, headers, cancel), fields(url = %url))]
    async fn post(
        &self,
        url: &str,
        body_json: serde_json::Value,
        headers: &HashMap<String, String>,
        timeout: Duration,
        cancel: CancellationToken,
    ) -> Result<HttpResponse, String> {
        let mut req = self.client.post(url).json(&body_json).timeout(timeout);
        for (k, v) in headers {
            req = req.header(k, v);
        }
        let send = req.send();
        tokio::select! {
            result = send => respond(result).await,
            () = cancel.cancelled() => Err("cancelled".to_string()),
        }
    }

    #[instrument(skip(self, headers, cancel), fields(url = %url))]
    async fn get(
        &self,
        url: &str,
        headers: &HashMap<String, String>,
        timeout: Duration,
        cancel: CancellationToken,
    ) -> Result<HttpResponse, String> {
        let mut req = self.client.get(url).timeout(timeout);
        for (k, v) in headers {
            req = req.header(k, v);
        }
        let send = req.send();
        tokio::select! {
            result = send => respond(result).await,
            () = cancel.cancelled() => Err("cancelled".to_string()),
        }
    }
}

async fn respond(result: reqwest::Result<reqwest::Response>) -> Result<HttpResponse, String> {
    let response = result.map_err(|e| e.to_string())?;
    let status = response.status().as_u16();
    let body = response.text().await.map_err(|e| e.to_string())?;
    Ok(HttpResponse { status, body })
}
