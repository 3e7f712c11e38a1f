use super::*;
use std::collections::HashMap;
use tempfile::TempDir;

fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

#[test]
fn test_defaults_are_valid() {
    let config = PipelineConfig::default();
    assert!(config.validate().is_ok());
    assert_eq!(config.rag.trigger_threshold, 2);
    assert!(config.active_research().is_none());
}

#[test]
fn test_missing_file_falls_back_to_defaults() {
    let dir = TempDir::new().unwrap();
    let config = load_config_with(None, dir.path(), env_of(&[])).unwrap();
    assert_eq!(config, PipelineConfig::default());
}

#[test]
fn test_yaml_file_then_env_override() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("postcraft.yml"),
        "llm:\n  model: from-file\n  api_key: file-key\nrag:\n  limit: 3\n",
    )
    .unwrap();

    let config = load_config_with(
        None,
        dir.path(),
        env_of(&[("POSTCRAFT_LLM_API_KEY", "env-key")]),
    )
    .unwrap();

    assert_eq!(config.llm.model, "from-file");
    assert_eq!(config.llm.api_key, "env-key");
    assert_eq!(config.rag.limit, 3);
    // Unspecified fields keep their defaults
    assert_eq!(config.rag.trigger_threshold, 2);
}

#[test]
fn test_toml_file_is_supported() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("custom.toml");
    std::fs::write(
        &path,
        "[research]\napi_key = \"pplx\"\n\n[session]\ncapacity = 8\n",
    )
    .unwrap();

    let config = load_config_with(Some(&path), dir.path(), env_of(&[])).unwrap();
    assert_eq!(config.session.capacity, 8);
    assert_eq!(config.active_research().unwrap().model, "sonar");
}

#[test]
fn test_research_key_from_env_enables_research() {
    let dir = TempDir::new().unwrap();
    let config = load_config_with(
        None,
        dir.path(),
        env_of(&[("POSTCRAFT_RESEARCH_API_KEY", "pplx-123")]),
    )
    .unwrap();
    assert!(config.active_research().is_some());
}

#[test]
fn test_blank_env_values_are_ignored() {
    let dir = TempDir::new().unwrap();
    let config = load_config_with(
        None,
        dir.path(),
        env_of(&[("POSTCRAFT_LLM_MODEL", "  ")]),
    )
    .unwrap();
    assert_eq!(config.llm.model, LlmConfig::default().model);
}

#[test]
fn test_explicit_missing_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("nope.yml");
    let err = load_config_with(Some(&missing), dir.path(), env_of(&[])).unwrap_err();
    assert!(err.to_string().contains("Config file not found"));
}

#[test]
fn test_validation_accumulates_errors() {
    let config = PipelineConfig {
        log_level: Some("loud".to_string()),
        rag: RagConfig {
            trigger_threshold: 0,
            limit: 0,
            score_threshold: 1.5,
            ..RagConfig::default()
        },
        ..PipelineConfig::default()
    };

    let message = config.validate().unwrap_err().to_string();
    assert!(message.contains("log_level"));
    assert!(message.contains("trigger_threshold"));
    assert!(message.contains("rag.limit"));
    assert!(message.contains("score_threshold"));
}
