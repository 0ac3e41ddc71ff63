//! ABOUTME: Entry point for the deepresearch CLI - process bootstrap only
//! ABOUTME: All research orchestration lives in deepresearch-core

mod cli;
mod config;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, TraceLevel};
use deepresearch_core::{Agent, AgentOptions};
use std::io::{self, Write};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_tracing(cli.trace);

    let mut runtime_config = config::load_runtime_config(cli.config_path())?;
    if let Some(backend_url) = &cli.backend_url {
        runtime_config.backend_url = backend_url.clone();
    }

    let agent = Agent::new("deepresearch-cli", runtime_config.backend_url.clone(), AgentOptions::default());
    agent.initialize().map_err(|e| anyhow::anyhow!(e.to_string()))?;
    agent.start().map_err(|e| anyhow::anyhow!(e.to_string()))?;

    let research_config = runtime_config.to_research_config();

    let result = if let Some(workflow_id) = &cli.workflow {
        agent
            .conduct_research_with_workflow(workflow_id, &cli.question, None)
            .await
    } else {
        agent.conduct_research(&cli.question, Some(research_config)).await
    };
    if !result.success {
        tracing::warn!(error = ?result.error, "research did not complete successfully");
    }

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    writeln!(handle, "{}", result.full_report)?;
    agent.stop();
    Ok(())
}

/// Tracing init: `RUST_LOG` takes precedence over `--trace` (matches the
/// teacher's CLI behavior). Output goes to stderr to keep stdout reserved
/// for the rendered report.
fn setup_tracing(trace_level: TraceLevel) {
    use tracing_subscriber::EnvFilter;

    if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_writer(io::stderr)
            .with_target(false)
            .init();
    } else {
        let level: tracing::Level = trace_level.into();
        tracing_subscriber::fmt()
            .with_max_level(level)
            .with_writer(io::stderr)
            .with_target(false)
            .init();
    }
}
