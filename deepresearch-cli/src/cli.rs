//! ABOUTME: CLI argument parsing for the deepresearch binary

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TraceLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<TraceLevel> for tracing::Level {
    fn from(level: TraceLevel) -> Self {
        match level {
            TraceLevel::Off | TraceLevel::Error => tracing::Level::ERROR,
            TraceLevel::Warn => tracing::Level::WARN,
            TraceLevel::Info => tracing::Level::INFO,
            TraceLevel::Debug => tracing::Level::DEBUG,
            TraceLevel::Trace => tracing::Level::TRACE,
        }
    }
}

/// Run a single research question through the agent and print the report.
#[derive(Parser, Debug)]
#[command(name = "deepresearch")]
#[command(version)]
#[command(about = "Deep Research Agent - multi-phase research orchestration CLI")]
pub struct Cli {
    /// The research question to investigate
    pub question: String,

    /// Path to a TOML configuration file (overrides the discovered default)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Backend base URL, overrides configuration
    #[arg(long, env = "DEEPRESEARCH_BACKEND_URL")]
    pub backend_url: Option<String>,

    /// Run a named workflow instead of the direct five-phase pipeline
    #[arg(long)]
    pub workflow: Option<String>,

    /// Tracing verbosity; RUST_LOG takes precedence when set
    #[arg(long, value_enum, default_value_t = TraceLevel::Info)]
    pub trace: TraceLevel,
}

impl Cli {
    #[must_use]
    pub fn config_path(&self) -> Option<&std::path::Path> {
        self.config.as_deref()
    }
}
