//! Pipeline configuration
//!
//! Settings are layered with increasing precedence:
//!
//! 1. Hardcoded defaults
//! 2. A config file (`--config`, or `postcraft.yml` / `postcraft.toml` in the working directory)
//! 3. Environment variables with the `POSTCRAFT_` prefix

pub mod loader;

pub use loader::{load_config, load_config_with};

use crate::error::{PipelineError, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Valid log levels for configuration validation.
pub const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Default data directory for persisted sessions
pub fn default_session_dir() -> Option<PathBuf> {
    ProjectDirs::from("com", "postcraft", "postcraft").map(|dirs| dirs.data_dir().join("sessions"))
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub log_level: Option<String>,
    pub llm: LlmConfig,
    /// Absent means the research pass is unconfigured and always skips
    pub research: Option<ResearchConfig>,
    pub rag: RagConfig,
    pub session: SessionSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: String::new(),
            model: "gpt-4o-mini".to_string(),
            timeout_secs: 120,
            max_retries: 3,
            retry_delay_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResearchConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl ResearchConfig {
    pub fn is_configured(&self) -> bool {
        !self.api_key.trim().is_empty()
    }
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.perplexity.ai".to_string(),
            api_key: String::new(),
            model: "sonar".to_string(),
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    pub enabled: bool,
    /// Number of gating signals required before retrieval fires
    pub trigger_threshold: u32,
    pub limit: usize,
    pub score_threshold: f32,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            trigger_threshold: 2,
            limit: 5,
            score_threshold: 0.7,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Sessions kept by the in-memory cache before LRU eviction
    pub capacity: usize,
    /// Persist sessions as JSON files here instead of memory
    pub storage_dir: Option<PathBuf>,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            capacity: 256,
            storage_dir: None,
        }
    }
}

impl PipelineConfig {
    /// Research settings, only if an API key is present
    pub fn active_research(&self) -> Option<&ResearchConfig> {
        self.research.as_ref().filter(|r| r.is_configured())
    }

    /// Check every setting and report all problems at once
    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();

        if let Some(level) = &self.log_level {
            if !VALID_LOG_LEVELS.contains(&level.as_str()) {
                errors.push(format!(
                    "log_level '{level}' must be one of {}",
                    VALID_LOG_LEVELS.join(", ")
                ));
            }
        }
        if self.llm.base_url.trim().is_empty() {
            errors.push("llm.base_url must not be empty".to_string());
        }
        if self.llm.model.trim().is_empty() {
            errors.push("llm.model must not be empty".to_string());
        }
        if self.rag.trigger_threshold == 0 {
            errors.push("rag.trigger_threshold must be at least 1".to_string());
        }
        if self.rag.limit == 0 {
            errors.push("rag.limit must be at least 1".to_string());
        }
        if !(0.0..=1.0).contains(&self.rag.score_threshold) {
            errors.push(format!(
                "rag.score_threshold {} must be between 0 and 1",
                self.rag.score_threshold
            ));
        }
        if self.session.capacity == 0 {
            errors.push("session.capacity must be at least 1".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(PipelineError::Config(errors.join("; ")))
        }
    }
}

#[cfg(test)]
mod tests;
