//! ABOUTME: deepresearch-core - orchestration engine for the Deep Research Agent
//! ABOUTME: value bags, capability registry, workflow engine, and research pipeline

pub mod agent;
pub mod capabilities;
pub mod capability;
pub mod error;
pub mod pipeline;
pub mod registry;
pub mod transport;
pub mod value_bag;
pub mod workflow;

pub mod testutil;

pub use agent::{Agent, AgentOptions, AgentState, Role};
pub use capability::{Capability, CapabilityKind, Outcome};
pub use error::{ResearchError, Result};
pub use pipeline::{Depth, Methodology, ResearchConfig, ResearchResult};
pub use registry::FunctionRegistry;
pub use transport::{HttpResponse, ReqwestTransport, Transport};
pub use value_bag::{Value, ValueBag};
pub use workflow::{Workflow, WorkflowEngine, WorkflowResult, WorkflowStep};
