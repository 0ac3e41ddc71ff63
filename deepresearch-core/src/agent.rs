//! ABOUTME: Agent core - lifecycle, capability registration, and the public
//! ABOUTME: research-agent surface that aggregates C1-C5 (spec §4.6)

use crate::capabilities::{
    DocumentAddCapability, DocumentParseCapability, DocumentRemoveCapability,
    DocumentRetrievalCapability, EmbeddingCapability, EnhancedWebSearchCapability,
    InferenceCapability, InternetSearchCapability, ResearchQueryPlanningCapability,
    ResearchReportGenerationCapability,
};
use crate::capability::CapabilityKind;
use crate::error::{ResearchError, Result};
use crate::pipeline::{research_result_from_workflow, ResearchConfig, ResearchPipeline, ResearchResult};
use crate::registry::FunctionRegistry;
use crate::transport::{ReqwestTransport, Transport};
use crate::value_bag::ValueBag;
use crate::workflow::{Workflow, WorkflowEngine, WorkflowStep};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Lifecycle states an [`Agent`] moves through monotonically, mirroring the
/// `idle → running → stopped` shape of the teacher's state machines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentState {
    New,
    Initialized,
    Running,
    Stopped,
}

/// Role tags used for the capability-recommendation table (spec §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Researcher,
    Analyst,
    Developer,
    Assistant,
    Specialist,
}

impl Role {
    /// Fixed, documented capability recommendation per role (spec §6).
    #[must_use]
    pub fn recommended_capabilities(self) -> &'static [&'static str] {
        match self {
            Role::Researcher => &[
                "internet_search",
                "enhanced_web_search",
                "document_retrieval",
                "document_parse",
                "inference",
            ],
            Role::Analyst => &["document_retrieval", "inference", "enhanced_web_search"],
            Role::Developer => &["internet_search", "inference", "document_retrieval"],
            Role::Assistant => &["internet_search", "document_retrieval", "inference"],
            Role::Specialist => &[
                "enhanced_web_search",
                "document_retrieval",
                "embedding",
                "inference",
            ],
        }
    }
}

/// Construction-time options for [`Agent::new`].
#[derive(Debug, Clone)]
pub struct AgentOptions {
    pub backend_integration_enabled: bool,
    pub default_timeout: Duration,
}

impl Default for AgentOptions {
    fn default() -> Self {
        Self {
            backend_integration_enabled: true,
            default_timeout: Duration::from_secs(30),
        }
    }
}

/// Aggregates the value bag, registry, workflow engine, and pipeline into
/// the single public surface a hosting process drives (spec §4.6).
pub struct Agent {
    name: String,
    backend_url: RwLock<String>,
    backend_integration_enabled: AtomicBool,
    state: RwLock<AgentState>,
    registry: Arc<FunctionRegistry>,
    workflows: WorkflowEngine,
    pipeline: ResearchPipeline,
    research_config: RwLock<ResearchConfig>,
    transport: Arc<dyn Transport>,
}

impl Agent {
    /// Construct a new, un-initialized agent. No capabilities or workflows
    /// are registered until [`Agent::initialize`] runs.
    #[must_use]
    pub fn new(name: impl Into<String>, backend_endpoint: impl Into<String>, opts: AgentOptions) -> Self {
        let registry = Arc::new(FunctionRegistry::new());
        let transport: Arc<dyn Transport> = Arc::new(ReqwestTransport::new());
        Self {
            name: name.into(),
            backend_url: RwLock::new(backend_endpoint.into()),
            backend_integration_enabled: AtomicBool::new(opts.backend_integration_enabled),
            state: RwLock::new(AgentState::New),
            workflows: WorkflowEngine::new(registry.clone()),
            pipeline: ResearchPipeline::new(registry.clone()),
            registry,
            research_config: RwLock::new(ResearchConfig::default()),
            transport,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn state(&self) -> AgentState {
        *self.state.read()
    }

    /// Registers the built-in capability adapters and the three default
    /// workflows (`comprehensive`, `quick`, `academic`). Idempotent only in
    /// the sense that re-running replaces prior registrations by name;
    /// callers should invoke this exactly once per agent lifetime.
    pub fn initialize(&self) -> Result<()> {
        let endpoint = self.backend_url.read().clone();
        let transport = self.transport.clone();

        self.registry.register(Arc::new(InternetSearchCapability::new(
            transport.clone(),
            endpoint.clone(),
        )));
        self.registry.register(Arc::new(EnhancedWebSearchCapability::new(
            transport.clone(),
            endpoint.clone(),
        )));
        self.registry.register(Arc::new(DocumentRetrievalCapability::new(
            transport.clone(),
            endpoint.clone(),
        )));
        self.registry.register(Arc::new(DocumentAddCapability::new(
            transport.clone(),
            endpoint.clone(),
        )));
        self.registry.register(Arc::new(DocumentRemoveCapability::new(
            transport.clone(),
            endpoint.clone(),
        )));
        self.registry.register(Arc::new(DocumentParseCapability));
        self.registry.register(Arc::new(EmbeddingCapability::new(
            transport.clone(),
            endpoint.clone(),
        )));
        self.registry.register(Arc::new(InferenceCapability::new(
            transport.clone(),
            endpoint.clone(),
        )));
        self.registry.register(Arc::new(ResearchQueryPlanningCapability::new(
            transport.clone(),
            endpoint.clone(),
        )));
        self.registry.register(Arc::new(ResearchReportGenerationCapability::new(
            transport,
            endpoint,
        )));

        self.create_research_workflow(
            "comprehensive",
            "Comprehensive Research",
            &[
                "research_query_planning",
                "enhanced_web_search",
                "document_retrieval",
                "inference",
                "research_report_generation",
            ],
        )?;
        self.create_research_workflow(
            "quick",
            "Quick Research",
            &["internet_search", "inference"],
        )?;
        let mut academic_search_params = ValueBag::new();
        academic_search_params.set("academic", true);
        let academic_steps = vec![
            WorkflowStep::new("academic-step-0", "research_query_planning"),
            WorkflowStep::new("academic-step-1", "enhanced_web_search")
                .with_parameters(academic_search_params),
            WorkflowStep::new("academic-step-2", "inference"),
            WorkflowStep::new("academic-step-3", "research_report_generation"),
        ];
        self.workflows
            .register_workflow(Workflow::new("academic", "Academic Research", academic_steps))
            .map_err(|message| ResearchError::Internal { message })?;

        *self.state.write() = AgentState::Initialized;
        info!(agent = %self.name, "agent initialized");
        Ok(())
    }

    pub fn start(&self) -> Result<()> {
        let mut state = self.state.write();
        if *state == AgentState::New {
            return Err(ResearchError::PreconditionFailed);
        }
        *state = AgentState::Running;
        Ok(())
    }

    pub fn stop(&self) {
        *self.state.write() = AgentState::Stopped;
    }

    /// Runs the five-phase pipeline directly, bypassing the workflow engine.
    pub async fn conduct_research(&self, question: &str, config: Option<ResearchConfig>) -> ResearchResult {
        let cfg = config.unwrap_or_else(|| self.research_config.read().clone());
        self.pipeline.conduct_research(question, &cfg).await
    }

    /// Runs a registered workflow to completion, then folds its step
    /// outcomes and merged context into a [`ResearchResult`], so this and
    /// [`Agent::conduct_research`] share one return type (spec §6). An
    /// unregistered `workflow_id` is not a `Err` here — the workflow engine
    /// reports it as a failed [`crate::workflow::WorkflowResult`], which
    /// folds into a `ResearchResult` with `success: false`.
    pub async fn conduct_research_with_workflow(
        &self,
        workflow_id: &str,
        question: &str,
        extra: Option<ValueBag>,
    ) -> ResearchResult {
        let methodology = self.research_config.read().methodology.as_str().to_string();
        let mut context = ValueBag::new();
        context.set("question", question);
        if let Some(extra) = extra {
            context = context.merged_over(&extra);
        }
        let workflow_result = self.workflows.execute(workflow_id, context).await;
        research_result_from_workflow(question, &methodology, &workflow_result)
    }

    /// Builds a workflow whose steps are one capability per supplied name,
    /// with the default 120s timeout and no retries (spec §4.6).
    pub fn create_research_workflow(&self, id: &str, name: &str, capability_names: &[&str]) -> Result<()> {
        let steps = capability_names
            .iter()
            .enumerate()
            .map(|(i, capability_name)| WorkflowStep::new(format!("{id}-step-{i}"), *capability_name))
            .collect();
        let workflow = Workflow::new(id, name, steps);
        self.workflows
            .register_workflow(workflow)
            .map_err(|message| ResearchError::Internal { message })
    }

    #[must_use]
    pub fn get_available_workflows(&self) -> Vec<String> {
        self.workflows.list_workflows()
    }

    /// Performs a health GET against the backend and reports reachability.
    /// Never propagates a transport error — unreachability is a normal,
    /// expected outcome of this check.
    pub async fn test_backend_connection(&self) -> bool {
        let endpoint = self.backend_url.read().clone();
        let url = format!("{}/health", endpoint.trim_end_matches('/'));
        self.transport
            .get(
                &url,
                &std::collections::HashMap::new(),
                Duration::from_secs(5),
                tokio_util::sync::CancellationToken::new(),
            )
            .await
            .map(|response| (200..300).contains(&response.status))
            .unwrap_or(false)
    }

    #[must_use]
    pub fn recommended_capabilities(role: Role) -> &'static [&'static str] {
        role.recommended_capabilities()
    }

    #[must_use]
    pub fn list_capabilities(&self, filter: Option<CapabilityKind>) -> Vec<String> {
        self.registry.list(filter)
    }

    pub fn set_research_config(&self, config: ResearchConfig) {
        *self.research_config.write() = config;
    }

    #[must_use]
    pub fn get_research_config(&self) -> ResearchConfig {
        self.research_config.read().clone()
    }

    pub fn set_backend_url(&self, url: impl Into<String>) {
        *self.backend_url.write() = url.into();
    }

    #[must_use]
    pub fn get_backend_url(&self) -> String {
        self.backend_url.read().clone()
    }

    pub fn set_backend_integration_enabled(&self, enabled: bool) {
        self.backend_integration_enabled.store(enabled, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_backend_integration_enabled(&self) -> bool {
        self.backend_integration_enabled.load(Ordering::SeqCst)
    }
}
