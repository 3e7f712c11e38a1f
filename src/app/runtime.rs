//! Runtime initialization and setup
//!
//! Loads the pipeline configuration, starts logging and wires the HTTP
//! adapters and session cache into an orchestrator.

use crate::app::{config::AppConfig, logging::init_logging};
use crate::config::{default_session_dir, load_config, PipelineConfig, SessionSettings};
use crate::error::Result;
use crate::llm::OpenAiCompatibleClient;
use crate::pipeline::{PipelineOrchestrator, PromptEngine};
use crate::research::PerplexityClient;
use crate::session::{FileSessionCache, InMemorySessionCache, SessionCache};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Load and validate configuration, then initialize logging
pub fn initialize_app(app: AppConfig) -> Result<PipelineConfig> {
    let config = load_config(app.config_path.as_deref(), &app.working_dir)?;
    config.validate()?;

    let app = app.with_configured_level(config.log_level.clone());
    init_logging(&app);
    Ok(config)
}

/// File-backed when a session directory is known, otherwise in memory
pub fn open_session_cache(settings: &SessionSettings) -> Arc<dyn SessionCache> {
    match settings.storage_dir.clone().or_else(default_session_dir) {
        Some(dir) => {
            debug!("Persisting sessions under {}", dir.display());
            Arc::new(FileSessionCache::new(dir))
        }
        None => {
            debug!("No session directory, keeping {} sessions in memory", settings.capacity);
            Arc::new(InMemorySessionCache::new(settings.capacity))
        }
    }
}

/// Wire the configured services into an orchestrator
pub fn build_orchestrator(
    config: &PipelineConfig,
    cache: Arc<dyn SessionCache>,
    prompts_dir: Option<&Path>,
) -> Result<PipelineOrchestrator> {
    let llm = Arc::new(OpenAiCompatibleClient::new(&config.llm)?);
    let mut builder = PipelineOrchestrator::builder(llm, cache).rag_config(config.rag.clone());

    match config.active_research() {
        Some(research) => builder = builder.research(Arc::new(PerplexityClient::new(research)?)),
        None => info!("No research API key configured, research pass will skip"),
    }

    if let Some(dir) = prompts_dir {
        let mut engine = PromptEngine::new()?;
        let loaded = engine.load_overrides(dir)?;
        debug!("Loaded {} prompt overrides from {}", loaded, dir.display());
        builder = builder.prompts(Arc::new(engine));
    }

    builder.build()
}
