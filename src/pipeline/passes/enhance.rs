//! Enhance pass: streams a polished version of the draft

use super::{completed_and_unchanged, stream_body, GenerationPass, SkipReason};
use crate::error::{PipelineError, Result};
use crate::pipeline::{EventSink, PassContext, PassName};
use crate::session::{EnhanceRecord, GenerationSession};
use async_trait::async_trait;

pub struct EnhancePass;

impl EnhancePass {
    /// Draft text, or the caller's body when the draft is blank
    fn source_text(ctx: &PassContext, session: &GenerationSession) -> Option<String> {
        session
            .draft_pass
            .as_ref()
            .map(|d| d.draft.clone())
            .filter(|d| !d.trim().is_empty())
            .or_else(|| ctx.body.clone())
    }
}

#[async_trait]
impl GenerationPass for EnhancePass {
    fn name(&self) -> PassName {
        PassName::Enhance
    }

    fn skip_reason(&self, ctx: &PassContext, session: &GenerationSession) -> Option<SkipReason> {
        if session.draft_pass.is_none() {
            return Some(SkipReason::MissingDependency(PassName::Draft));
        }
        completed_and_unchanged(ctx, session, PassName::Enhance)
    }

    async fn run(
        &self,
        ctx: &PassContext,
        session: &GenerationSession,
        events: &EventSink,
    ) -> Result<()> {
        let source = Self::source_text(ctx, session).ok_or_else(|| {
            PipelineError::schema(PassName::Enhance, "no draft text to enhance")
        })?;

        let mut vars = ctx.prompt_vars();
        vars["source_text"] = source.into();

        let request = ctx
            .prompts
            .completion_request(PassName::Enhance, &vars)?
            .with_temperature(0.4)
            .with_max_tokens(1500);
        let enhanced = stream_body(ctx, PassName::Enhance, request, events).await?;

        ctx.cache
            .update_session(&ctx.session_id, EnhanceRecord { enhanced }.into())
            .await
    }
}
