//! ABOUTME: Error taxonomy for the research engine
//! ABOUTME: Stable prefixes here are also what gets written into Outcome.error

use thiserror::Error;

/// Flat error enum covering every failure domain in the engine.
///
/// `Display` renders `"<prefix>: <detail>"` where `<prefix>` is the stable
/// tag a caller can match on (spec §7). Capability adapters, the dispatcher,
/// and the workflow engine all convert their failures into one of these
/// variants before handing them back across a component boundary.
#[derive(Debug, Error, Clone)]
pub enum ResearchError {
    #[error("unknown_capability: {name}")]
    UnknownCapability { name: String },

    #[error("transport: {detail}")]
    Transport { detail: String },

    #[error("http_{status}: {body_prefix}")]
    Http { status: u16, body_prefix: String },

    #[error("parse: {detail}")]
    Parse { detail: String },

    #[error("backend: {message}")]
    Backend { message: String },

    #[error("precondition_failed")]
    PreconditionFailed,

    #[error("validation_failed")]
    ValidationFailed,

    #[error("timeout_step")]
    TimeoutStep,

    #[error("timeout_workflow")]
    TimeoutWorkflow,

    #[error("cancelled")]
    Cancelled,

    #[error("internal: {message}")]
    Internal { message: String },
}

impl ResearchError {
    /// The stable prefix alone, without the detail — useful for assertions
    /// that only care about the error *class* (spec §8 property 1).
    #[must_use]
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::UnknownCapability { .. } => "unknown_capability",
            Self::Transport { .. } => "transport",
            Self::Http { .. } => "http",
            Self::Parse { .. } => "parse",
            Self::Backend { .. } => "backend",
            Self::PreconditionFailed => "precondition_failed",
            Self::ValidationFailed => "validation_failed",
            Self::TimeoutStep => "timeout_step",
            Self::TimeoutWorkflow => "timeout_workflow",
            Self::Cancelled => "cancelled",
            Self::Internal { .. } => "internal",
        }
    }
}

/// Convenience result alias used throughout the engine.
pub type Result<T> = std::result::Result<T, ResearchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_matches_display_start() {
        let err = ResearchError::Http {
            status: 503,
            body_prefix: "overloaded".into(),
        };
        assert!(err.to_string().starts_with(err.prefix()));
    }

    #[test]
    fn unknown_capability_carries_name() {
        let err = ResearchError::UnknownCapability {
            name: "foo".into(),
        };
        assert_eq!(err.to_string(), "unknown_capability: foo");
    }
}
