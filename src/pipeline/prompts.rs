//! Prompt template system
//!
//! Every pass renders a `<pass>_system` and `<pass>_user` template. Optional
//! context (product, brand, research, retrieved knowledge) is guarded by
//! `{% if %}` blocks so missing inputs drop out of the prompt instead of
//! failing the render.

use super::PassName;
use crate::error::{PipelineError, Result};
use crate::llm::CompletionRequest;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tera::{Context, Tera};
use tracing::debug;

const BUILTIN_TEMPLATES: &[(&str, &str)] = &[
    ("research_query", include_str!("templates/research_query.tera")),
    ("research_system", include_str!("templates/research_system.tera")),
    ("research_user", include_str!("templates/research_user.tera")),
    ("idea_system", include_str!("templates/idea_system.tera")),
    ("idea_user", include_str!("templates/idea_user.tera")),
    ("angle_system", include_str!("templates/angle_system.tera")),
    ("angle_user", include_str!("templates/angle_user.tera")),
    ("outline_system", include_str!("templates/outline_system.tera")),
    ("outline_user", include_str!("templates/outline_user.tera")),
    ("draft_system", include_str!("templates/draft_system.tera")),
    ("draft_user", include_str!("templates/draft_user.tera")),
    ("enhance_system", include_str!("templates/enhance_system.tera")),
    ("enhance_user", include_str!("templates/enhance_user.tera")),
    ("scoring_system", include_str!("templates/scoring_system.tera")),
    ("scoring_user", include_str!("templates/scoring_user.tera")),
];

/// Prompt template engine
pub struct PromptEngine {
    tera: Tera,
}

impl PromptEngine {
    /// Create an engine holding the built-in templates
    pub fn new() -> Result<Self> {
        let mut tera = Tera::default();
        tera.autoescape_on(vec![]);
        tera.add_raw_templates(BUILTIN_TEMPLATES.iter().copied())?;
        Ok(Self { tera })
    }

    /// Replace a built-in template
    pub fn override_template(&mut self, name: &str, source: &str) -> Result<()> {
        if !self.has_template(name) {
            return Err(PipelineError::Config(format!(
                "Unknown prompt template '{name}'"
            )));
        }
        self.tera.add_raw_template(name, source)?;
        Ok(())
    }

    /// Load `<template>.tera` overrides from a directory
    pub fn load_overrides(&mut self, dir: &Path) -> Result<usize> {
        if !dir.exists() {
            return Ok(0);
        }

        let mut loaded = 0;
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().and_then(|s| s.to_str()) != Some("tera") {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };

            let source = fs::read_to_string(&path)?;
            self.override_template(name, &source)?;
            debug!("Loaded prompt override {} from {}", name, path.display());
            loaded += 1;
        }
        Ok(loaded)
    }

    pub fn has_template(&self, name: &str) -> bool {
        self.tera.get_template_names().any(|n| n == name)
    }

    /// Render a template with variables
    pub fn render(&self, name: &str, vars: &Value) -> Result<String> {
        let context = Context::from_serialize(vars)?;
        let rendered = self.tera.render(name, &context)?;
        Ok(rendered.trim().to_string())
    }

    /// Render a pass's system and user prompts into a request
    pub fn completion_request(&self, pass: PassName, vars: &Value) -> Result<CompletionRequest> {
        let system = self.render(&format!("{pass}_system"), vars)?;
        let user = self.render(&format!("{pass}_user"), vars)?;
        debug!(
            "Rendered {} prompt: {} system chars, {} user chars",
            pass,
            system.len(),
            user.len()
        );
        Ok(CompletionRequest::new(system, user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn base_vars() -> Value {
        json!({
            "idea": "Highlight sustainable fishing",
            "title": null,
            "body": null,
            "content_type": "post",
            "product": null,
            "brand": null,
            "instruction": null,
        })
    }

    #[test]
    fn test_every_pass_has_templates() {
        let engine = PromptEngine::new().unwrap();
        for pass in PassName::ALL {
            if pass == PassName::Rag {
                continue;
            }
            assert!(engine.has_template(&format!("{pass}_system")), "{pass}");
            assert!(engine.has_template(&format!("{pass}_user")), "{pass}");
        }
    }

    #[test]
    fn test_absent_product_block_is_omitted() {
        let engine = PromptEngine::new().unwrap();
        let mut vars = base_vars();
        vars["research"] = Value::Null;
        vars["rag_context"] = Value::Null;

        let without = engine.render("idea_user", &vars).unwrap();
        assert!(!without.contains("Product hint"));

        vars["product"] = json!({
            "id": null,
            "name": "Tôm hùm Cô Tô",
            "description": null,
            "category": null,
        });
        let with = engine.render("idea_user", &vars).unwrap();
        assert!(with.contains("Product hint"));
        assert!(with.contains("Tôm hùm Cô Tô"));
    }

    #[test]
    fn test_idea_system_forbids_captions() {
        let engine = PromptEngine::new().unwrap();
        let system = engine.render("idea_system", &base_vars()).unwrap();
        assert!(system.contains("captions"));
        assert!(system.contains("JSON"));
    }

    #[test]
    fn test_override_replaces_builtin() {
        let mut engine = PromptEngine::new().unwrap();
        engine
            .override_template("scoring_system", "Score {{ content_type }}")
            .unwrap();
        assert_eq!(
            engine.render("scoring_system", &base_vars()).unwrap(),
            "Score post"
        );
    }

    #[test]
    fn test_unknown_override_is_rejected() {
        let mut engine = PromptEngine::new().unwrap();
        assert!(engine.override_template("nope_system", "x").is_err());
    }

    #[test]
    fn test_load_overrides_from_dir() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("angle_system.tera"), "Angles for {{ idea }}").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let mut engine = PromptEngine::new().unwrap();
        assert_eq!(engine.load_overrides(dir.path()).unwrap(), 1);
        assert_eq!(
            engine.render("angle_system", &base_vars()).unwrap(),
            "Angles for Highlight sustainable fishing"
        );
    }
}
