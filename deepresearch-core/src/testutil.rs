//! ABOUTME: Hand-rolled test doubles for the engine, kept beside the code
//! ABOUTME: they exercise rather than generated (mirrors test_utils.rs upstream)

use crate::capability::{Capability, CapabilityKind, Outcome};
use crate::transport::{HttpResponse, Transport};
use crate::value_bag::ValueBag;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// A [`Transport`] stub that always returns the same canned response,
/// counting how many times it was called.
pub struct StubTransport {
    status: u16,
    body: String,
    calls: AtomicUsize,
}

impl StubTransport {
    #[must_use]
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
            calls: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub fn with_status(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for StubTransport {
    async fn post(
        &self,
        _url: &str,
        _body: serde_json::Value,
        _headers: &HashMap<String, String>,
        _timeout: Duration,
        _cancel: CancellationToken,
    ) -> Result<HttpResponse, String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(HttpResponse {
            status: self.status,
            body: self.body.clone(),
        })
    }

    async fn get(
        &self,
        _url: &str,
        _headers: &HashMap<String, String>,
        _timeout: Duration,
        _cancel: CancellationToken,
    ) -> Result<HttpResponse, String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(HttpResponse {
            status: self.status,
            body: self.body.clone(),
        })
    }
}

/// A [`Transport`] that always fails at the connect/timeout level.
pub struct FailingTransport;

#[async_trait]
impl Transport for FailingTransport {
    async fn post(
        &self,
        _url: &str,
        _body: serde_json::Value,
        _headers: &HashMap<String, String>,
        _timeout: Duration,
        _cancel: CancellationToken,
    ) -> Result<HttpResponse, String> {
        Err("connection refused".to_string())
    }

    async fn get(
        &self,
        _url: &str,
        _headers: &HashMap<String, String>,
        _timeout: Duration,
        _cancel: CancellationToken,
    ) -> Result<HttpResponse, String> {
        Err("connection refused".to_string())
    }
}

/// A scripted, name-matched stub capability for exercising the dispatcher
/// and the workflow engine without a real backend. Each call pops the next
/// scripted outcome; once exhausted, the last one repeats.
pub struct StubCapability {
    name: String,
    kind: CapabilityKind,
    script: Mutex<Vec<Outcome>>,
    calls: AtomicUsize,
    delay: Option<Duration>,
}

impl StubCapability {
    #[must_use]
    pub fn new(name: impl Into<String>, outcomes: Vec<Outcome>) -> Self {
        Self {
            name: name.into(),
            kind: CapabilityKind::Local,
            script: Mutex::new(outcomes),
            calls: AtomicUsize::new(0),
            delay: None,
        }
    }

    #[must_use]
    pub fn always(name: impl Into<String>, outcome: Outcome) -> Self {
        Self::new(name, vec![outcome])
    }

    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Capability for StubCapability {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "scripted test stub"
    }

    fn kind(&self) -> CapabilityKind {
        self.kind
    }

    async fn invoke(&self, _params: ValueBag) -> Outcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let mut script = self.script.lock();
        if script.len() > 1 {
            script.remove(0)
        } else {
            script.first().cloned().unwrap_or_else(|| {
                Outcome::failure("internal: stub capability exhausted with no script")
            })
        }
    }
}
