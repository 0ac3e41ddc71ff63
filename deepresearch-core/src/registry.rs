//! ABOUTME: FunctionRegistry - insertion-ordered capability map and dispatcher
//! ABOUTME: The dispatcher is the fault boundary: unknown names and panics never escape

use crate::capability::{Capability, CapabilityKind, Outcome};
use crate::value_bag::ValueBag;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, instrument, warn};

/// Registration-time record kept alongside each capability for `describe`
/// and filtered `list` without re-locking the capability itself.
struct Registered {
    capability: Arc<dyn Capability>,
    description: String,
    kind: CapabilityKind,
}

/// Insertion-ordered name → capability map.
///
/// Backed by [`DashMap`] for lock-free concurrent `register`/`lookup`/
/// `invoke` (spec §3: "thread-safe for concurrent register, lookup, invoke,
/// list"). Registration happens during agent `initialize()` and is
/// effectively immutable afterward; readers never observe a partially
/// mutated registry because each entry is inserted atomically.
#[derive(Default)]
pub struct FunctionRegistry {
    entries: DashMap<String, Registered>,
    insertion_order: parking_lot::RwLock<Vec<String>>,
}

impl FunctionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, capability: Arc<dyn Capability>) {
        let name = capability.name().to_string();
        let description = capability.description().to_string();
        let kind = capability.kind();
        if self
            .entries
            .insert(
                name.clone(),
                Registered {
                    capability,
                    description,
                    kind,
                },
            )
            .is_none()
        {
            self.insertion_order.write().push(name);
        }
    }

    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    #[must_use]
    pub fn describe(&self, name: &str) -> Option<(String, CapabilityKind)> {
        self.entries
            .get(name)
            .map(|r| (r.description.clone(), r.kind))
    }

    /// List registered capability names, optionally filtered by kind, in
    /// registration order.
    #[must_use]
    pub fn list(&self, filter: Option<CapabilityKind>) -> Vec<String> {
        let order = self.insertion_order.read();
        order
            .iter()
            .filter(|name| {
                filter.is_none_or(|k| {
                    self.entries
                        .get(name.as_str())
                        .map(|r| r.kind == k)
                        .unwrap_or(false)
                })
            })
            .cloned()
            .collect()
    }

    /// Dispatch contract (spec §4.2):
    /// 1. Unknown name → `{ok=false, error="unknown_capability: <name>"}` in O(1).
    /// 2. Otherwise delegate, timing the call if the capability left
    ///    `elapsed_ms` at zero.
    /// 3. A capability panic is caught at this boundary and converted into
    ///    `{ok=false, error="internal: <message>"}` — the dispatcher is the
    ///    fault boundary, nothing escapes it.
    #[instrument(skip(self, params), fields(capability = %name))]
    pub async fn invoke(&self, name: &str, params: ValueBag) -> Outcome {
        let Some(entry) = self.entries.get(name).map(|r| r.capability.clone()) else {
            warn!("dispatch to unknown capability");
            return Outcome::failure(format!("unknown_capability: {name}"));
        };

        let start = Instant::now();
        let fut = std::panic::AssertUnwindSafe(entry.invoke(params));
        let result = futures::FutureExt::catch_unwind(fut).await;
        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;

        match result {
            Ok(mut outcome) => {
                if outcome.elapsed_ms == 0.0 {
                    outcome.elapsed_ms = elapsed_ms;
                }
                debug!(ok = outcome.ok, elapsed_ms, "capability invoked");
                outcome
            }
            Err(panic) => {
                let message = panic_message(&panic);
                warn!(%message, "capability panicked");
                Outcome::failure(format!("internal: {message}")).with_elapsed_ms(elapsed_ms)
            }
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "capability panicked with a non-string payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct Echo;

    #[async_trait]
    impl Capability for Echo {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            "echoes its input"
        }
        fn kind(&self) -> CapabilityKind {
            CapabilityKind::Local
        }
        async fn invoke(&self, params: ValueBag) -> Outcome {
            Outcome::success(params)
        }
    }

    struct Panicky;

    #[async_trait]
    impl Capability for Panicky {
        fn name(&self) -> &str {
            "panicky"
        }
        fn description(&self) -> &str {
            "always panics"
        }
        fn kind(&self) -> CapabilityKind {
            CapabilityKind::Local
        }
        async fn invoke(&self, _params: ValueBag) -> Outcome {
            panic!("boom");
        }
    }

    #[tokio::test]
    async fn unknown_capability_is_o1_failure() {
        let registry = FunctionRegistry::new();
        let outcome = registry.invoke("nope", ValueBag::new()).await;
        assert!(!outcome.ok);
        assert!(outcome
            .error
            .unwrap()
            .starts_with("unknown_capability: nope"));
    }

    #[tokio::test]
    async fn registered_capability_dispatches() {
        let registry = FunctionRegistry::new();
        registry.register(Arc::new(Echo));
        let mut params = ValueBag::new();
        params.set("k", "v");
        let outcome = registry.invoke("echo", params).await;
        assert!(outcome.ok);
        assert_eq!(outcome.data.get_string("k", ""), "v");
    }

    #[tokio::test]
    async fn panic_is_caught_at_dispatcher_boundary() {
        let registry = FunctionRegistry::new();
        registry.register(Arc::new(Panicky));
        let outcome = registry.invoke("panicky", ValueBag::new()).await;
        assert!(!outcome.ok);
        assert!(outcome.error.unwrap().starts_with("internal:"));
    }

    #[test]
    fn list_filters_by_kind_and_preserves_registration_order() {
        let registry = FunctionRegistry::new();
        registry.register(Arc::new(Echo));
        assert_eq!(registry.list(None), vec!["echo".to_string()]);
        assert_eq!(
            registry.list(Some(CapabilityKind::Local)),
            vec!["echo".to_string()]
        );
        assert!(registry.list(Some(CapabilityKind::Search)).is_empty());
    }

    #[test]
    fn describe_returns_description_and_kind() {
        let registry = FunctionRegistry::new();
        registry.register(Arc::new(Echo));
        let (desc, kind) = registry.describe("echo").unwrap();
        assert_eq!(desc, "echoes its input");
        assert_eq!(kind, CapabilityKind::Local);
    }
}
