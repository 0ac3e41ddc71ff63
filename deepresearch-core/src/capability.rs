//! ABOUTME: Capability trait, Outcome type, and the capability-kind taxonomy
//! ABOUTME: Every unit of work the engine can invoke implements Capability

use crate::value_bag::ValueBag;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Coarse discovery tag for a capability, used by `FunctionRegistry::list`
/// filters and the role-recommendation table (spec §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CapabilityKind {
    Search,
    Retrieval,
    DocumentStore,
    Parsing,
    Embedding,
    Inference,
    Planning,
    Reporting,
    Local,
}

/// Result of invoking a capability.
///
/// Invariant (spec §3): a failed outcome carries a non-empty `error`; a
/// successful outcome carries `data` populated or `text` non-empty (or
/// both).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Outcome {
    pub ok: bool,
    pub error: Option<String>,
    pub data: ValueBag,
    pub text: Option<String>,
    pub elapsed_ms: f64,
}

impl Outcome {
    #[must_use]
    pub fn success(data: ValueBag) -> Self {
        Self {
            ok: true,
            error: None,
            data,
            text: None,
            elapsed_ms: 0.0,
        }
    }

    #[must_use]
    pub fn success_text(text: impl Into<String>) -> Self {
        Self {
            ok: true,
            error: None,
            data: ValueBag::new(),
            text: Some(text.into()),
            elapsed_ms: 0.0,
        }
    }

    #[must_use]
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            error: Some(error.into()),
            data: ValueBag::new(),
            text: None,
            elapsed_ms: 0.0,
        }
    }

    #[must_use]
    pub fn with_elapsed_ms(mut self, ms: f64) -> Self {
        self.elapsed_ms = ms;
        self
    }
}

/// A named, self-describing unit of work.
///
/// Implementations back either a local pure function (e.g. the fallback
/// synthesizer) or a [`crate::transport::Transport`]-backed adapter that
/// talks to the external backend.
#[async_trait]
pub trait Capability: Send + Sync {
    /// Stable name, unique within a registry.
    fn name(&self) -> &str;

    /// Human-readable description surfaced through `describe`.
    fn description(&self) -> &str;

    /// Discovery tag.
    fn kind(&self) -> CapabilityKind;

    /// Perform the unit of work. Implementations should not throw/panic on
    /// ordinary failure paths — the dispatcher catches unexpected panics as
    /// a last resort (spec §4.2) but a well-behaved capability reports
    /// failure through `Outcome` instead.
    async fn invoke(&self, params: ValueBag) -> Outcome;
}
