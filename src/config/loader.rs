use super::{PipelineConfig, ResearchConfig};
use crate::error::{PipelineError, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

const DEFAULT_CONFIG_FILES: &[&str] = &["postcraft.yml", "postcraft.yaml", "postcraft.toml"];

/// Load configuration from file and process environment
pub fn load_config(explicit_path: Option<&Path>, working_dir: &Path) -> Result<PipelineConfig> {
    load_config_with(explicit_path, working_dir, |key| std::env::var(key).ok())
}

/// Load configuration with an injectable environment lookup
pub fn load_config_with(
    explicit_path: Option<&Path>,
    working_dir: &Path,
    env: impl Fn(&str) -> Option<String>,
) -> Result<PipelineConfig> {
    let mut config = match resolve_config_path(explicit_path, working_dir)? {
        Some(path) => {
            debug!("Loading configuration from {}", path.display());
            parse_config_file(&path)?
        }
        None => PipelineConfig::default(),
    };

    merge_env_vars(&mut config, env);
    config.validate()?;
    Ok(config)
}

fn resolve_config_path(explicit_path: Option<&Path>, working_dir: &Path) -> Result<Option<PathBuf>> {
    if let Some(path) = explicit_path {
        if !path.exists() {
            return Err(PipelineError::Config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }
        return Ok(Some(path.to_path_buf()));
    }

    Ok(DEFAULT_CONFIG_FILES
        .iter()
        .map(|name| working_dir.join(name))
        .find(|path| path.exists()))
}

fn parse_config_file(path: &Path) -> Result<PipelineConfig> {
    let content = std::fs::read_to_string(path)?;
    match path.extension().and_then(|e| e.to_str()) {
        Some("toml") => toml::from_str(&content)
            .map_err(|e| PipelineError::Config(format!("Invalid TOML in {}: {e}", path.display()))),
        _ => Ok(serde_yaml::from_str(&content)?),
    }
}

fn merge_env_vars(config: &mut PipelineConfig, env: impl Fn(&str) -> Option<String>) {
    let non_empty = |key: &str| env(key).filter(|v| !v.trim().is_empty());

    if let Some(key) = non_empty("POSTCRAFT_LLM_API_KEY") {
        config.llm.api_key = key;
    }
    if let Some(url) = non_empty("POSTCRAFT_LLM_BASE_URL") {
        config.llm.base_url = url;
    }
    if let Some(model) = non_empty("POSTCRAFT_LLM_MODEL") {
        config.llm.model = model;
    }
    if let Some(key) = non_empty("POSTCRAFT_RESEARCH_API_KEY") {
        config
            .research
            .get_or_insert_with(ResearchConfig::default)
            .api_key = key;
    }
    if let Some(dir) = non_empty("POSTCRAFT_SESSION_DIR") {
        config.session.storage_dir = Some(PathBuf::from(dir));
    }
    if let Some(level) = non_empty("POSTCRAFT_LOG_LEVEL") {
        config.log_level = Some(level.to_lowercase());
    }
}
