//! Pipeline orchestrator
//!
//! Runs the passes strictly in order against one session, relays their events
//! and closes the stream with a single `final` or `error` event.

use super::context::{GenerationRequest, PassContext};
use super::events::{EventSink, GenerationEvent, DEFAULT_EVENT_BUFFER};
use super::passes::{
    AnglePass, DraftPass, EnhancePass, GenerationPass, IdeaPass, OutlinePass, RagPass,
    ResearchPass, ScoringPass,
};
use super::prompts::PromptEngine;
use super::result::FinalResult;
use super::PassName;
use crate::config::RagConfig;
use crate::error::{PipelineError, Result};
use crate::llm::LlmService;
use crate::research::ResearchService;
use crate::retrieval::{Embedder, VectorStore};
use crate::session::{GenerationSession, SessionCache, SessionId};
use std::sync::Arc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{error, info, warn};

/// Builder for [`PipelineOrchestrator`]
pub struct OrchestratorBuilder {
    llm: Arc<dyn LlmService>,
    cache: Arc<dyn SessionCache>,
    research: Option<Arc<dyn ResearchService>>,
    retrieval: Option<(Arc<dyn Embedder>, Arc<dyn VectorStore>)>,
    rag_config: RagConfig,
    prompts: Option<Arc<PromptEngine>>,
    event_buffer: usize,
}

impl OrchestratorBuilder {
    /// Create a builder with the two required collaborators
    pub fn new(llm: Arc<dyn LlmService>, cache: Arc<dyn SessionCache>) -> Self {
        Self {
            llm,
            cache,
            research: None,
            retrieval: None,
            rag_config: RagConfig::default(),
            prompts: None,
            event_buffer: DEFAULT_EVENT_BUFFER,
        }
    }

    pub fn research(mut self, service: Arc<dyn ResearchService>) -> Self {
        self.research = Some(service);
        self
    }

    pub fn retrieval(mut self, embedder: Arc<dyn Embedder>, store: Arc<dyn VectorStore>) -> Self {
        self.retrieval = Some((embedder, store));
        self
    }

    pub fn rag_config(mut self, config: RagConfig) -> Self {
        self.rag_config = config;
        self
    }

    /// Use a prompt engine with overridden templates
    pub fn prompts(mut self, prompts: Arc<PromptEngine>) -> Self {
        self.prompts = Some(prompts);
        self
    }

    pub fn event_buffer(mut self, size: usize) -> Self {
        self.event_buffer = size.max(1);
        self
    }

    pub fn build(self) -> Result<PipelineOrchestrator> {
        let prompts = match self.prompts {
            Some(prompts) => prompts,
            None => Arc::new(PromptEngine::new()?),
        };

        let passes: Vec<Box<dyn GenerationPass>> = vec![
            Box::new(ResearchPass::new(self.research)),
            Box::new(RagPass::new(self.retrieval, self.rag_config)),
            Box::new(IdeaPass),
            Box::new(AnglePass),
            Box::new(OutlinePass),
            Box::new(DraftPass),
            Box::new(EnhancePass),
            Box::new(ScoringPass),
        ];

        Ok(PipelineOrchestrator {
            llm: self.llm,
            cache: self.cache,
            prompts,
            passes,
            event_buffer: self.event_buffer,
        })
    }
}

pub struct PipelineOrchestrator {
    llm: Arc<dyn LlmService>,
    cache: Arc<dyn SessionCache>,
    prompts: Arc<PromptEngine>,
    passes: Vec<Box<dyn GenerationPass>>,
    event_buffer: usize,
}

impl PipelineOrchestrator {
    pub fn builder(llm: Arc<dyn LlmService>, cache: Arc<dyn SessionCache>) -> OrchestratorBuilder {
        OrchestratorBuilder::new(llm, cache)
    }

    pub fn pass_order(&self) -> Vec<PassName> {
        self.passes.iter().map(|p| p.name()).collect()
    }

    /// Run the pipeline, delivering events to `events`
    ///
    /// The returned result is the payload of the `final` event. On failure
    /// an `error` event has already been emitted, except for cancellation,
    /// which emits nothing further.
    pub async fn run(&self, request: GenerationRequest, events: &EventSink) -> Result<FinalResult> {
        let session_id = request.session_id.clone().unwrap_or_default();
        self.run_session(session_id, request, events).await
    }

    /// Start a run in the background and return its session id and events
    pub fn stream(
        self: Arc<Self>,
        request: GenerationRequest,
    ) -> (SessionId, ReceiverStream<GenerationEvent>) {
        let session_id = request.session_id.clone().unwrap_or_default();
        let (sink, rx) = EventSink::channel(self.event_buffer);

        let id = session_id.clone();
        tokio::spawn(async move {
            let _ = self.run_session(id, request, &sink).await;
        });

        (session_id, ReceiverStream::new(rx))
    }

    /// Run to completion and gather every event
    pub async fn collect(&self, request: GenerationRequest) -> Vec<GenerationEvent> {
        let (sink, mut rx) = EventSink::channel(self.event_buffer);

        let run = async move {
            let _ = self.run(request, &sink).await;
        };
        let gather = async {
            let mut events = Vec::new();
            while let Some(event) = rx.recv().await {
                events.push(event);
            }
            events
        };

        let ((), events) = tokio::join!(run, gather);
        events
    }

    async fn run_session(
        &self,
        session_id: SessionId,
        request: GenerationRequest,
        events: &EventSink,
    ) -> Result<FinalResult> {
        let ctx = PassContext::new(
            session_id,
            request,
            self.llm.clone(),
            self.cache.clone(),
            self.prompts.clone(),
        );

        match self.drive(&ctx, events).await {
            Ok(result) => {
                events
                    .emit(GenerationEvent::Final {
                        result: result.clone(),
                    })
                    .await?;
                info!(
                    "Pipeline finished for {} ({} passes with results)",
                    ctx.session_id,
                    result.metadata.passes_completed.len()
                );
                Ok(result)
            }
            Err(PipelineError::Cancelled) => {
                warn!("Consumer went away, stopping pipeline for {}", ctx.session_id);
                Err(PipelineError::Cancelled)
            }
            Err(e) => {
                error!("Pipeline failed for {}: {}", ctx.session_id, e);
                // A closed stream has nobody left to tell
                let _ = events
                    .emit(GenerationEvent::Error {
                        message: e.to_string(),
                    })
                    .await;
                Err(e)
            }
        }
    }

    async fn drive(&self, ctx: &PassContext, events: &EventSink) -> Result<FinalResult> {
        ctx.cache
            .get_or_create(&ctx.session_id, GenerationSession::new())
            .await?;

        for pass in &self.passes {
            pass.execute(ctx, events).await?;
        }

        let session = ctx.cache.get(&ctx.session_id).await?.ok_or_else(|| {
            PipelineError::Session(format!("session {} vanished during the run", ctx.session_id))
        })?;
        Ok(FinalResult::from_session(ctx, &session))
    }
}
