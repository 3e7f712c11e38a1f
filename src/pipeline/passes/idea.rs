//! Idea pass: concept-level ideas, first one selected

use super::normalize::normalize_list;
use super::{completed_and_unchanged, GenerationPass, SkipReason};
use crate::error::{PipelineError, Result};
use crate::llm::parse_json_response;
use crate::pipeline::{EventSink, PassContext, PassName};
use crate::session::{GenerationSession, IdeaRecord};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

pub const MIN_IDEAS: usize = 3;

#[derive(Debug, Deserialize)]
struct IdeaResponse {
    ideas: Vec<String>,
}

/// Validate a raw model response into an idea record
pub fn parse_ideas(raw: &str) -> Result<IdeaRecord> {
    let response: IdeaResponse = parse_json_response(PassName::Idea, raw)?;
    let ideas = normalize_list(response.ideas);
    if ideas.len() < MIN_IDEAS {
        return Err(PipelineError::schema(
            PassName::Idea,
            format!("expected at least {MIN_IDEAS} distinct ideas, got {}", ideas.len()),
        ));
    }

    let selected_idea = ideas[0].clone();
    Ok(IdeaRecord {
        ideas,
        selected_idea,
    })
}

pub struct IdeaPass;

#[async_trait]
impl GenerationPass for IdeaPass {
    fn name(&self) -> PassName {
        PassName::Idea
    }

    fn skip_reason(&self, ctx: &PassContext, session: &GenerationSession) -> Option<SkipReason> {
        if !ctx.has_seed() {
            return Some(SkipReason::NoInput);
        }
        completed_and_unchanged(ctx, session, PassName::Idea)
    }

    async fn run(
        &self,
        ctx: &PassContext,
        session: &GenerationSession,
        _events: &EventSink,
    ) -> Result<()> {
        let mut vars = ctx.prompt_vars();
        vars["research"] = session
            .research_pass
            .as_ref()
            .filter(|r| !r.is_empty())
            .map(serde_json::to_value)
            .transpose()?
            .unwrap_or(Value::Null);
        vars["rag_context"] = session
            .rag_pass
            .as_ref()
            .map(|r| r.rag_context.clone())
            .filter(|c| !c.is_empty())
            .into();

        let request = ctx
            .prompts
            .completion_request(PassName::Idea, &vars)?
            .with_temperature(0.9);
        let response = ctx.llm.generate_completion(request).await?;
        let record = parse_ideas(&response.content)?;

        debug!(
            "Generated {} ideas for {}, selected: {}",
            record.ideas.len(),
            ctx.session_id,
            record.selected_idea
        );
        ctx.cache
            .update_session(&ctx.session_id, record.into())
            .await
    }
}
