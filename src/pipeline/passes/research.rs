//! Research pass: web search distilled into insights, risks and angles

use super::normalize::normalize_list;
use super::{completed_and_unchanged, GenerationPass, SkipReason};
use crate::error::{PipelineError, Result};
use crate::llm::parse_json_response;
use crate::pipeline::{EventSink, PassContext, PassName};
use crate::research::{ResearchResult, ResearchService};
use crate::session::{GenerationSession, ResearchRecord};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ResearchSynthesis {
    insights: Vec<String>,
    risks: Vec<String>,
    recommended_angles: Vec<String>,
}

pub struct ResearchPass {
    service: Option<Arc<dyn ResearchService>>,
}

impl ResearchPass {
    pub fn new(service: Option<Arc<dyn ResearchService>>) -> Self {
        Self { service }
    }

    async fn synthesize(&self, ctx: &PassContext, found: &ResearchResult) -> Result<ResearchRecord> {
        let mut vars = ctx.prompt_vars();
        vars["research_content"] = found.content.clone().into();

        let request = ctx
            .prompts
            .completion_request(PassName::Research, &vars)?
            .with_temperature(0.2);
        let response = ctx.llm.generate_completion(request).await?;
        let synthesis: ResearchSynthesis =
            parse_json_response(PassName::Research, &response.content)?;

        Ok(ResearchRecord {
            insights: normalize_list(synthesis.insights),
            risks: normalize_list(synthesis.risks),
            recommended_angles: normalize_list(synthesis.recommended_angles),
            sources: found.citations.clone(),
        })
    }
}

#[async_trait]
impl GenerationPass for ResearchPass {
    fn name(&self) -> PassName {
        PassName::Research
    }

    fn skip_reason(&self, ctx: &PassContext, session: &GenerationSession) -> Option<SkipReason> {
        if ctx.idea.is_none() {
            return Some(SkipReason::NoInput);
        }
        if self.service.is_none() {
            return Some(SkipReason::Unconfigured);
        }
        completed_and_unchanged(ctx, session, PassName::Research)
    }

    async fn run(
        &self,
        ctx: &PassContext,
        _session: &GenerationSession,
        _events: &EventSink,
    ) -> Result<()> {
        let Some(service) = &self.service else {
            return Ok(());
        };

        let query = ctx.prompts.render("research_query", &ctx.prompt_vars())?;
        let record = match service.search(&query).await {
            Ok(found) if found.content.trim().is_empty() => {
                warn!("Research returned no content for {}", ctx.session_id);
                ResearchRecord {
                    sources: found.citations,
                    ..ResearchRecord::empty()
                }
            }
            Ok(found) => match self.synthesize(ctx, &found).await {
                Ok(record) => record,
                Err(e) if degrades(&e) => {
                    warn!("Research synthesis failed, continuing without it: {}", e);
                    ResearchRecord {
                        sources: found.citations,
                        ..ResearchRecord::empty()
                    }
                }
                Err(e) => return Err(e),
            },
            Err(e) if degrades(&e) => {
                warn!("Research search failed, continuing without it: {}", e);
                ResearchRecord::empty()
            }
            Err(e) => return Err(e),
        };

        debug!(
            "Research for {}: {} insights, {} risks, {} angles, {} sources",
            ctx.session_id,
            record.insights.len(),
            record.risks.len(),
            record.recommended_angles.len(),
            record.sources.len()
        );
        ctx.cache
            .update_session(&ctx.session_id, record.into())
            .await
    }
}

fn degrades(error: &PipelineError) -> bool {
    error.is_degradable() || error.is_response_error()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::passes::test_support::{context, seeded};
    use crate::pipeline::{GenerationEvent, GenerationRequest};
    use crate::research::Citation;
    use crate::session::SessionCache;
    use crate::testing::{MockLlm, MockResearch, RESEARCH_SYNTHESIS_JSON};

    fn citation() -> Citation {
        Citation {
            url: "https://example.org/quota".to_string(),
            title: "Lobster quotas".to_string(),
        }
    }

    fn drain(rx: &mut tokio::sync::mpsc::Receiver<GenerationEvent>) -> Vec<GenerationEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn test_skips_without_idea_or_service() {
        let llm = Arc::new(MockLlm::builder().build());
        let (ctx, _) = context(GenerationRequest::default(), llm.clone());
        let session = GenerationSession::new();

        let unconfigured = ResearchPass::new(None);
        assert_eq!(
            unconfigured.skip_reason(&ctx, &session),
            Some(SkipReason::NoInput)
        );

        let (ctx, _) = context(seeded("Sustainable fishing"), llm);
        assert_eq!(
            unconfigured.skip_reason(&ctx, &session),
            Some(SkipReason::Unconfigured)
        );
    }

    #[tokio::test]
    async fn test_synthesizes_and_keeps_citations() {
        let llm = Arc::new(
            MockLlm::builder()
                .completion(PassName::Research, RESEARCH_SYNTHESIS_JSON)
                .build(),
        );
        let research = Arc::new(MockResearch::returning(
            "Hand lines catch few juveniles.",
            vec![citation()],
        ));
        let (ctx, cache) = context(seeded("Sustainable fishing"), llm);
        let pass = ResearchPass::new(Some(research.clone()));
        let (sink, mut rx) = EventSink::channel(8);

        pass.execute(&ctx, &sink).await.unwrap();

        let record = cache
            .get(&ctx.session_id)
            .await
            .unwrap()
            .unwrap()
            .research_pass
            .unwrap();
        assert_eq!(record.insights, vec!["Hand-line fishing has low bycatch"]);
        assert_eq!(record.sources, vec![citation()]);
        assert!(research.queries()[0].contains("Sustainable fishing"));
        assert_eq!(
            drain(&mut rx),
            vec![
                GenerationEvent::PassStart { pass: PassName::Research },
                GenerationEvent::PassComplete { pass: PassName::Research },
            ]
        );
    }

    #[tokio::test]
    async fn test_search_failure_writes_empty_record() {
        let llm = Arc::new(MockLlm::builder().build());
        let (ctx, cache) = context(seeded("Sustainable fishing"), llm.clone());
        let pass = ResearchPass::new(Some(Arc::new(MockResearch::failing("timeout"))));
        let (sink, _rx) = EventSink::channel(8);

        pass.execute(&ctx, &sink).await.unwrap();

        let session = cache.get(&ctx.session_id).await.unwrap().unwrap();
        assert_eq!(session.research_pass, Some(ResearchRecord::empty()));
        assert_eq!(llm.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_malformed_synthesis_keeps_sources() {
        let llm = Arc::new(
            MockLlm::builder()
                .completion(PassName::Research, "not json at all")
                .build(),
        );
        let research = Arc::new(MockResearch::returning("Some facts.", vec![citation()]));
        let (ctx, cache) = context(seeded("Sustainable fishing"), llm);
        let (sink, _rx) = EventSink::channel(8);

        ResearchPass::new(Some(research))
            .execute(&ctx, &sink)
            .await
            .unwrap();

        let record = cache
            .get(&ctx.session_id)
            .await
            .unwrap()
            .unwrap()
            .research_pass
            .unwrap();
        assert!(record.is_empty());
        assert_eq!(record.sources.len(), 1);
    }
}
