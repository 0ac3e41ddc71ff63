//! ABOUTME: Layered runtime configuration: defaults < TOML file < DEEPRESEARCH_
//! ABOUTME: env vars < CLI flags. The core crate never sees this layer.

use anyhow::{Context, Result};
use deepresearch_core::{Depth, Methodology, ResearchConfig};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
pub struct RuntimeConfig {
    pub backend_url: String,
    pub log_level: String,
    pub methodology: String,
    pub depth: String,
    pub max_sources: i64,
    pub max_web_results: i64,
    pub relevance_threshold: f64,
    pub language: String,
}

/// Load configuration from defaults, an optional TOML file, and
/// `DEEPRESEARCH_`-prefixed environment variables (double-underscore
/// nesting), in ascending precedence. CLI flags are applied by the caller
/// after this returns.
pub fn load_runtime_config(config_path: Option<&Path>) -> Result<RuntimeConfig> {
    let mut builder = config::Config::builder()
        .set_default("backend_url", "http://localhost:8000")?
        .set_default("log_level", "info")?
        .set_default("methodology", "comprehensive")?
        .set_default("depth", "moderate")?
        .set_default("max_sources", 10)?
        .set_default("max_web_results", 10)?
        .set_default("relevance_threshold", 0.7)?
        .set_default("language", "en")?;

    if let Some(path) = config_path {
        builder = builder.add_source(config::File::from(path));
    } else {
        builder = builder.add_source(config::File::with_name("deepresearch").required(false));
    }

    builder = builder.add_source(
        config::Environment::with_prefix("DEEPRESEARCH")
            .separator("__")
            .try_parsing(true),
    );

    builder
        .build()
        .context("failed to assemble configuration layers")?
        .try_deserialize()
        .context("failed to deserialize configuration")
}

pub fn parse_methodology(tag: &str) -> Methodology {
    match tag {
        "systematic" => Methodology::Systematic,
        "exploratory" => Methodology::Exploratory,
        "rapid" => Methodology::Rapid,
        "academic" => Methodology::Academic,
        _ => Methodology::Comprehensive,
    }
}

pub fn parse_depth(tag: &str) -> Depth {
    match tag {
        "shallow" => Depth::Shallow,
        "comprehensive" => Depth::Comprehensive,
        "exhaustive" => Depth::Exhaustive,
        _ => Depth::Moderate,
    }
}

impl RuntimeConfig {
    #[must_use]
    pub fn to_research_config(&self) -> ResearchConfig {
        ResearchConfig {
            methodology: parse_methodology(&self.methodology),
            depth: parse_depth(&self.depth),
            max_sources: self.max_sources,
            max_web_results: self.max_web_results,
            relevance_threshold: self.relevance_threshold,
            language: self.language.clone(),
            ..ResearchConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_with_no_file_or_env() {
        // No explicit `--config` path: the optional `deepresearch.*` discovery
        // source is absent from this working directory, so every field must
        // resolve to the declared `set_default` value.
        let config = load_runtime_config(None).expect("default-only config should load");
        assert_eq!(config.backend_url, "http://localhost:8000");
        assert_eq!(config.log_level, "info");
        assert_eq!(config.methodology, "comprehensive");
        assert_eq!(config.depth, "moderate");
        assert_eq!(config.max_sources, 10);
        assert_eq!(config.max_web_results, 10);
        assert!((config.relevance_threshold - 0.7).abs() < f64::EPSILON);
        assert_eq!(config.language, "en");
    }

    #[test]
    fn missing_explicit_file_is_a_hard_error() {
        let config = load_runtime_config(Some(Path::new("/nonexistent/deepresearch.toml")));
        assert!(config.is_err());
    }

    #[test]
    fn methodology_and_depth_parse_known_tags() {
        assert!(matches!(parse_methodology("academic"), Methodology::Academic));
        assert!(matches!(parse_depth("exhaustive"), Depth::Exhaustive));
    }

    #[test]
    fn unknown_tags_fall_back_to_defaults() {
        assert!(matches!(parse_methodology("bogus"), Methodology::Comprehensive));
        assert!(matches!(parse_depth("bogus"), Depth::Moderate));
    }
}
