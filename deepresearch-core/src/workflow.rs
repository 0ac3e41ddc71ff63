//! ABOUTME: Sequential workflow engine - ordered steps with retries, timeouts,
//! ABOUTME: preconditions, validation, cancellation, and lifecycle hooks (spec §4.4)

use crate::capability::Outcome;
use crate::registry::FunctionRegistry;
use crate::value_bag::ValueBag;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

type Precondition = Arc<dyn Fn(&ValueBag) -> bool + Send + Sync>;
type Validate = Arc<dyn Fn(&Outcome) -> bool + Send + Sync>;
type ProcessResult = Arc<dyn Fn(&ValueBag, &Outcome) -> ValueBag + Send + Sync>;
type OnStepComplete = Arc<dyn Fn(&str, &Outcome) + Send + Sync>;
type OnStepError = Arc<dyn Fn(&str, &str) + Send + Sync>;
type OnComplete = Arc<dyn Fn(&WorkflowResult) + Send + Sync>;

/// A single capability invocation with step-local parameters, timeout,
/// retry, and validation policy.
pub struct WorkflowStep {
    pub step_id: String,
    pub name: String,
    pub description: String,
    pub capability_name: String,
    pub parameters: ValueBag,
    pub timeout: Duration,
    pub max_retries: u32,
    pub continue_on_failure: bool,
    pub precondition: Option<Precondition>,
    pub validate: Option<Validate>,
    pub process_result: Option<ProcessResult>,
}

impl WorkflowStep {
    #[must_use]
    pub fn new(step_id: impl Into<String>, capability_name: impl Into<String>) -> Self {
        let step_id = step_id.into();
        Self {
            name: step_id.clone(),
            step_id,
            description: String::new(),
            capability_name: capability_name.into(),
            parameters: ValueBag::new(),
            timeout: Duration::from_secs(120),
            max_retries: 0,
            continue_on_failure: false,
            precondition: None,
            validate: None,
            process_result: None,
        }
    }

    #[must_use]
    pub fn with_parameters(mut self, parameters: ValueBag) -> Self {
        self.parameters = parameters;
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    #[must_use]
    pub fn with_continue_on_failure(mut self, continue_on_failure: bool) -> Self {
        self.continue_on_failure = continue_on_failure;
        self
    }

    #[must_use]
    pub fn with_precondition(
        mut self,
        f: impl Fn(&ValueBag) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.precondition = Some(Arc::new(f));
        self
    }

    #[must_use]
    pub fn with_validate(mut self, f: impl Fn(&Outcome) -> bool + Send + Sync + 'static) -> Self {
        self.validate = Some(Arc::new(f));
        self
    }

    #[must_use]
    pub fn with_process_result(
        mut self,
        f: impl Fn(&ValueBag, &Outcome) -> ValueBag + Send + Sync + 'static,
    ) -> Self {
        self.process_result = Some(Arc::new(f));
        self
    }

    fn default_process_result(context: &ValueBag, outcome: &Outcome) -> ValueBag {
        context.merged_over(&outcome.data)
    }
}

/// An ordered, named, validated sequence of steps with hooks.
pub struct Workflow {
    pub id: String,
    pub name: String,
    pub description: String,
    pub steps: Vec<WorkflowStep>,
    pub global_context: ValueBag,
    pub stop_on_failure: bool,
    pub max_total_time: Duration,
    pub metadata: HashMap<String, String>,
    pub on_step_complete: Option<OnStepComplete>,
    pub on_step_error: Option<OnStepError>,
    pub on_complete: Option<OnComplete>,
}

impl Workflow {
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, steps: Vec<WorkflowStep>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            steps,
            global_context: ValueBag::new(),
            stop_on_failure: true,
            max_total_time: Duration::from_secs(600),
            metadata: HashMap::new(),
            on_step_complete: None,
            on_step_error: None,
            on_complete: None,
        }
    }

    #[must_use]
    pub fn with_global_context(mut self, context: ValueBag) -> Self {
        self.global_context = context;
        self
    }

    #[must_use]
    pub fn with_stop_on_failure(mut self, stop: bool) -> Self {
        self.stop_on_failure = stop;
        self
    }

    #[must_use]
    pub fn with_max_total_time(mut self, max_total_time: Duration) -> Self {
        self.max_total_time = max_total_time;
        self
    }

    /// Structural validation at registration time. Deliberately does *not*
    /// require `capability_name` to already be registered — capability
    /// resolution is late-bound to execution time (spec §4.4, §9).
    fn validate(&self) -> Result<(), String> {
        if self.id.is_empty() {
            return Err("workflow id must not be empty".to_string());
        }
        if self.steps.is_empty() {
            return Err("workflow must have at least one step".to_string());
        }
        let mut seen = std::collections::HashSet::new();
        for step in &self.steps {
            if step.step_id.is_empty() {
                return Err("step id must not be empty".to_string());
            }
            if step.capability_name.is_empty() {
                return Err(format!("step {} has an empty capability_name", step.step_id));
            }
            if !seen.insert(step.step_id.clone()) {
                return Err(format!("duplicate step id: {}", step.step_id));
            }
        }
        Ok(())
    }
}

/// Outcome of a full workflow execution.
#[derive(Debug, Clone)]
pub struct WorkflowResult {
    pub id: String,
    pub name: String,
    pub success: bool,
    pub error: Option<String>,
    pub executed_step_ids: Vec<String>,
    pub step_outcomes: HashMap<String, Outcome>,
    pub step_durations: HashMap<String, Duration>,
    pub total_steps: usize,
    pub successful_steps: usize,
    pub failed_steps: usize,
    pub total_time: Duration,
    pub initial_context: ValueBag,
    pub final_context: ValueBag,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
}

/// Monotone counters for workflow executions (spec §4.4).
#[derive(Default)]
pub struct WorkflowMetrics {
    pub active: AtomicU64,
    pub completed: AtomicU64,
    pub failed: AtomicU64,
    pub registered: AtomicU64,
}

/// Sequential-per-workflow executor. Multiple workflows may run
/// concurrently on separate tasks; within one workflow, steps are strictly
/// sequential (spec §5).
pub struct WorkflowEngine {
    registry: Arc<FunctionRegistry>,
    workflows: DashMap<String, Arc<Workflow>>,
    cancellation_flags: DashMap<String, CancellationToken>,
    results: DashMap<String, WorkflowResult>,
    pub metrics: WorkflowMetrics,
}

impl WorkflowEngine {
    #[must_use]
    pub fn new(registry: Arc<FunctionRegistry>) -> Self {
        Self {
            registry,
            workflows: DashMap::new(),
            cancellation_flags: DashMap::new(),
            results: DashMap::new(),
            metrics: WorkflowMetrics::default(),
        }
    }

    pub fn register_workflow(&self, workflow: Workflow) -> Result<(), String> {
        workflow.validate()?;
        self.metrics.registered.fetch_add(1, Ordering::SeqCst);
        self.workflows.insert(workflow.id.clone(), Arc::new(workflow));
        Ok(())
    }

    #[must_use]
    pub fn has_workflow(&self, id: &str) -> bool {
        self.workflows.contains_key(id)
    }

    #[must_use]
    pub fn get_workflow(&self, id: &str) -> Option<Arc<Workflow>> {
        self.workflows.get(id).map(|w| w.clone())
    }

    #[must_use]
    pub fn list_workflows(&self) -> Vec<String> {
        self.workflows.iter().map(|e| e.key().clone()).collect()
    }

    pub fn cancel_workflow(&self, id: &str) {
        if let Some(flag) = self.cancellation_flags.get(id) {
            flag.cancel();
        }
    }

    /// Placeholder: pause/resume is not supported by this sequential
    /// engine (spec §9). Exists so callers have a stable, documented
    /// failure mode rather than a missing method.
    pub fn pause_workflow(&self, _id: &str) -> std::result::Result<(), &'static str> {
        Err("not_supported: pause/resume is not implemented")
    }

    pub fn resume_workflow(&self, _id: &str) -> std::result::Result<(), &'static str> {
        Err("not_supported: pause/resume is not implemented")
    }

    #[must_use]
    pub fn get_workflow_result(&self, id: &str) -> Option<WorkflowResult> {
        self.results.get(id).map(|r| r.clone())
    }

    #[instrument(skip(self, input_context), fields(workflow_id = %workflow_id))]
    pub async fn execute(&self, workflow_id: &str, input_context: ValueBag) -> WorkflowResult {
        let Some(workflow) = self.workflows.get(workflow_id).map(|w| w.clone()) else {
            return WorkflowResult {
                id: workflow_id.to_string(),
                name: String::new(),
                success: false,
                error: Some("internal: workflow not registered".to_string()),
                executed_step_ids: vec![],
                step_outcomes: HashMap::new(),
                step_durations: HashMap::new(),
                total_steps: 0,
                successful_steps: 0,
                failed_steps: 0,
                total_time: Duration::ZERO,
                initial_context: input_context.clone(),
                final_context: input_context,
                started_at: Utc::now(),
                ended_at: Utc::now(),
            };
        };

        self.metrics.active.fetch_add(1, Ordering::SeqCst);
        let cancel = CancellationToken::new();
        self.cancellation_flags
            .insert(workflow_id.to_string(), cancel.clone());

        let started_at = Utc::now();
        let wall_clock_start = Instant::now();
        let initial_context = workflow.global_context.merged_over(&input_context);
        let mut context = initial_context.clone();

        let mut executed_step_ids = Vec::new();
        let mut step_outcomes = HashMap::new();
        let mut step_durations = HashMap::new();
        let mut successful = 0usize;
        let mut failed = 0usize;
        let mut halted_error: Option<String> = None;

        for step in &workflow.steps {
            if cancel.is_cancelled() {
                halted_error = Some("cancelled".to_string());
                break;
            }
            if wall_clock_start.elapsed() > workflow.max_total_time {
                halted_error = Some("timeout_workflow".to_string());
                break;
            }

            let step_start = Instant::now();
            let (outcome, next_context) = self
                .run_step(step, &context, &cancel, wall_clock_start, workflow.max_total_time)
                .await;
            let step_elapsed = step_start.elapsed();

            executed_step_ids.push(step.step_id.clone());
            step_durations.insert(step.step_id.clone(), step_elapsed);

            if outcome.ok {
                successful += 1;
                context = next_context;
                if let Some(hook) = &workflow.on_step_complete {
                    hook(&step.step_id, &outcome);
                }
            } else {
                failed += 1;
                let error = outcome.error.clone().unwrap_or_default();
                if let Some(hook) = &workflow.on_step_error {
                    hook(&step.step_id, &error);
                }
                let should_continue = step.continue_on_failure || !workflow.stop_on_failure;
                if !should_continue {
                    step_outcomes.insert(step.step_id.clone(), outcome);
                    halted_error = if error == "cancelled" || error == "timeout_workflow" {
                        Some(error)
                    } else {
                        None
                    };
                    break;
                }
            }
            step_outcomes.insert(step.step_id.clone(), outcome);
        }

        let ended_at = Utc::now();
        let success = (failed == 0 || !workflow.stop_on_failure) && halted_error.is_none();

        let result = WorkflowResult {
            id: workflow.id.clone(),
            name: workflow.name.clone(),
            success,
            error: halted_error,
            executed_step_ids,
            step_outcomes,
            step_durations,
            total_steps: workflow.steps.len(),
            successful_steps: successful,
            failed_steps: failed,
            total_time: wall_clock_start.elapsed(),
            initial_context,
            final_context: context,
            started_at,
            ended_at,
        };

        if success {
            self.metrics.completed.fetch_add(1, Ordering::SeqCst);
            info!(workflow_id, "workflow completed successfully");
        } else {
            self.metrics.failed.fetch_add(1, Ordering::SeqCst);
            warn!(workflow_id, error = ?result.error, "workflow did not complete successfully");
        }
        self.metrics.active.fetch_sub(1, Ordering::SeqCst);
        self.cancellation_flags.remove(workflow_id);

        if let Some(hook) = &workflow.on_complete {
            hook(&result);
        }
        self.results.insert(workflow_id.to_string(), result.clone());
        result
    }

    /// Execute a single step through its precondition → retry/backoff →
    /// validate → process_result pipeline (spec §4.4 steps c–g).
    async fn run_step(
        &self,
        step: &WorkflowStep,
        context: &ValueBag,
        cancel: &CancellationToken,
        wall_clock_start: Instant,
        max_total_time: Duration,
    ) -> (Outcome, ValueBag) {
        if let Some(precondition) = &step.precondition {
            if !precondition(context) {
                return (Outcome::failure("precondition_failed"), context.clone());
            }
        }

        let effective_params = context.merged_over(&step.parameters);
        let mut last_outcome = Outcome::failure("internal: step never attempted");

        for attempt in 1..=(step.max_retries + 1) {
            if cancel.is_cancelled() {
                return (Outcome::failure("cancelled"), context.clone());
            }

            if !self.registry.has(&step.capability_name) {
                let outcome = self
                    .registry
                    .invoke(&step.capability_name, effective_params.clone())
                    .await;
                return (outcome, context.clone());
            }

            let invocation = self.registry.invoke(&step.capability_name, effective_params.clone());
            let mut outcome = tokio::select! {
                biased;
                () = cancel.cancelled() => return (Outcome::failure("cancelled"), context.clone()),
                result = tokio::time::timeout(step.timeout, invocation) => match result {
                    Ok(outcome) => outcome,
                    Err(_) => Outcome::failure("timeout_step"),
                },
            };

            if outcome.ok {
                if let Some(validate) = &step.validate {
                    if !validate(&outcome) {
                        outcome = Outcome::failure("validation_failed");
                    }
                }
            }

            if outcome.ok {
                let next_context = step
                    .process_result
                    .as_ref()
                    .map_or_else(|| WorkflowStep::default_process_result(context, &outcome), |f| f(context, &outcome));
                return (outcome, next_context);
            }

            last_outcome = outcome;
            if last_outcome.error.as_deref() == Some("cancelled") {
                return (last_outcome, context.clone());
            }

            let retries_remain = attempt < step.max_retries + 1;
            if !retries_remain {
                break;
            }
            let backoff = Duration::from_millis(u64::from(attempt) * 1000);
            if wall_clock_start.elapsed() + backoff > max_total_time {
                break;
            }
            tokio::select! {
                () = tokio::time::sleep(backoff) => {},
                () = cancel.cancelled() => return (Outcome::failure("cancelled"), context.clone()),
            }
        }

        (last_outcome, context.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::StubCapability;

    #[tokio::test]
    async fn register_rejects_empty_id() {
        let registry = Arc::new(FunctionRegistry::new());
        let engine = WorkflowEngine::new(registry);
        let wf = Workflow::new("", "x", vec![WorkflowStep::new("s1", "echo")]);
        assert!(engine.register_workflow(wf).is_err());
    }

    #[tokio::test]
    async fn register_rejects_duplicate_step_ids() {
        let registry = Arc::new(FunctionRegistry::new());
        let engine = WorkflowEngine::new(registry);
        let wf = Workflow::new(
            "wf",
            "x",
            vec![WorkflowStep::new("s1", "a"), WorkflowStep::new("s1", "b")],
        );
        assert!(engine.register_workflow(wf).is_err());
    }

    #[tokio::test]
    async fn register_does_not_require_capability_to_exist() {
        let registry = Arc::new(FunctionRegistry::new());
        let engine = WorkflowEngine::new(registry);
        let wf = Workflow::new("wf", "x", vec![WorkflowStep::new("s1", "not_yet_registered")]);
        assert!(engine.register_workflow(wf).is_ok());
    }

    #[tokio::test]
    async fn unknown_capability_fails_without_retry() {
        let registry = Arc::new(FunctionRegistry::new());
        let engine = WorkflowEngine::new(registry);
        let step = WorkflowStep::new("s1", "nope").with_max_retries(3);
        let wf = Workflow::new("wf", "x", vec![step]);
        engine.register_workflow(wf).unwrap();
        let result = engine.execute("wf", ValueBag::new()).await;
        assert!(!result.success);
        let outcome = &result.step_outcomes["s1"];
        assert!(outcome.error.as_ref().unwrap().starts_with("unknown_capability"));
    }

    #[tokio::test]
    async fn retries_up_to_max_retries_plus_one() {
        let registry = Arc::new(FunctionRegistry::new());
        let cap = Arc::new(StubCapability::always(
            "flaky",
            Outcome::failure("backend: down"),
        ));
        registry.register(cap.clone());
        let engine = WorkflowEngine::new(registry);
        let step = WorkflowStep::new("s1", "flaky").with_max_retries(2);
        let wf = Workflow::new("wf", "x", vec![step]).with_max_total_time(Duration::from_secs(10));
        engine.register_workflow(wf).unwrap();
        let result = engine.execute("wf", ValueBag::new()).await;
        assert!(!result.success);
        assert_eq!(cap.call_count(), 3);
    }

    #[tokio::test]
    async fn on_step_complete_fires_in_declared_order() {
        let registry = Arc::new(FunctionRegistry::new());
        registry.register(Arc::new(StubCapability::always(
            "ok1",
            Outcome::success(ValueBag::new()),
        )));
        registry.register(Arc::new(StubCapability::always(
            "ok2",
            Outcome::success(ValueBag::new()),
        )));
        let engine = WorkflowEngine::new(registry);
        let order: Arc<parking_lot::Mutex<Vec<String>>> = Arc::new(parking_lot::Mutex::new(vec![]));
        let order_clone = order.clone();
        let mut wf = Workflow::new(
            "wf",
            "x",
            vec![WorkflowStep::new("s1", "ok1"), WorkflowStep::new("s2", "ok2")],
        );
        wf.on_step_complete = Some(Arc::new(move |id, _outcome| {
            order_clone.lock().push(id.to_string());
        }));
        engine.register_workflow(wf).unwrap();
        let result = engine.execute("wf", ValueBag::new()).await;
        assert!(result.success);
        assert_eq!(*order.lock(), vec!["s1".to_string(), "s2".to_string()]);
    }

    #[tokio::test]
    async fn precondition_failure_is_not_retried() {
        let registry = Arc::new(FunctionRegistry::new());
        let cap = Arc::new(StubCapability::always(
            "cap",
            Outcome::success(ValueBag::new()),
        ));
        registry.register(cap.clone());
        let engine = WorkflowEngine::new(registry);
        let step = WorkflowStep::new("s1", "cap")
            .with_max_retries(3)
            .with_precondition(|_ctx| false);
        let wf = Workflow::new("wf", "x", vec![step]);
        engine.register_workflow(wf).unwrap();
        let result = engine.execute("wf", ValueBag::new()).await;
        assert!(!result.success);
        assert_eq!(cap.call_count(), 0);
        assert_eq!(
            result.step_outcomes["s1"].error.as_deref(),
            Some("precondition_failed")
        );
    }

    #[tokio::test]
    async fn step_timeout_is_recorded_and_workflow_fails() {
        let registry = Arc::new(FunctionRegistry::new());
        registry.register(Arc::new(
            StubCapability::always("slow", Outcome::success(ValueBag::new()))
                .with_delay(Duration::from_millis(300)),
        ));
        let engine = WorkflowEngine::new(registry);
        let step = WorkflowStep::new("s1", "slow").with_timeout(Duration::from_millis(50));
        let wf = Workflow::new("wf", "x", vec![step]);
        engine.register_workflow(wf).unwrap();
        let start = Instant::now();
        let result = engine.execute("wf", ValueBag::new()).await;
        assert!(!result.success);
        assert_eq!(result.step_outcomes["s1"].error.as_deref(), Some("timeout_step"));
        assert!(start.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn cancellation_mid_flight_halts_promptly() {
        let registry = Arc::new(FunctionRegistry::new());
        registry.register(Arc::new(
            StubCapability::always("slow", Outcome::success(ValueBag::new()))
                .with_delay(Duration::from_millis(500)),
        ));
        let engine = Arc::new(WorkflowEngine::new(registry));
        let steps = vec![
            WorkflowStep::new("s1", "slow"),
            WorkflowStep::new("s2", "slow"),
            WorkflowStep::new("s3", "slow"),
        ];
        let wf = Workflow::new("wf", "x", steps).with_max_total_time(Duration::from_secs(5));
        engine.register_workflow(wf).unwrap();

        let engine_clone = engine.clone();
        let handle = tokio::spawn(async move { engine_clone.execute("wf", ValueBag::new()).await });
        tokio::time::sleep(Duration::from_millis(600)).await;
        engine.cancel_workflow("wf");

        let result = tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("execution should return promptly after cancellation")
            .unwrap();
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("cancelled"));
        assert!((1..=2).contains(&result.executed_step_ids.len()));
    }

    #[tokio::test]
    async fn workflow_timeout_bounds_total_execution() {
        let registry = Arc::new(FunctionRegistry::new());
        registry.register(Arc::new(
            StubCapability::always("slow", Outcome::success(ValueBag::new()))
                .with_delay(Duration::from_millis(100)),
        ));
        let engine = WorkflowEngine::new(registry);
        let steps = (0..10)
            .map(|i| WorkflowStep::new(format!("s{i}"), "slow"))
            .collect();
        let wf = Workflow::new("wf", "x", steps).with_max_total_time(Duration::from_millis(250));
        engine.register_workflow(wf).unwrap();
        let result = engine.execute("wf", ValueBag::new()).await;
        assert!(!result.success);
        assert!(result.executed_step_ids.len() < 10);
    }

    #[test]
    fn pause_and_resume_are_documented_as_unsupported() {
        let engine = WorkflowEngine::new(Arc::new(FunctionRegistry::new()));
        assert!(engine.pause_workflow("anything").is_err());
        assert!(engine.resume_workflow("anything").is_err());
    }
}
