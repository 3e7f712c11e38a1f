//! Draft pass: streams the post body from the outline

use super::{completed_and_unchanged, stream_body, GenerationPass, SkipReason};
use crate::error::Result;
use crate::pipeline::{EventSink, PassContext, PassName};
use crate::session::{DraftRecord, GenerationSession};
use async_trait::async_trait;
use serde_json::Value;

pub struct DraftPass;

#[async_trait]
impl GenerationPass for DraftPass {
    fn name(&self) -> PassName {
        PassName::Draft
    }

    fn skip_reason(&self, ctx: &PassContext, session: &GenerationSession) -> Option<SkipReason> {
        if session.outline_pass.is_none() {
            return Some(SkipReason::MissingDependency(PassName::Outline));
        }
        completed_and_unchanged(ctx, session, PassName::Draft)
    }

    async fn run(
        &self,
        ctx: &PassContext,
        session: &GenerationSession,
        events: &EventSink,
    ) -> Result<()> {
        let outline = session
            .outline_pass
            .as_ref()
            .filter(|o| !o.outline.trim().is_empty());

        let mut vars = ctx.prompt_vars();
        vars["outline"] = outline
            .map(serde_json::to_value)
            .transpose()?
            .unwrap_or(Value::Null);
        // Without a usable outline the caller's text becomes the material
        vars["material"] = match outline {
            Some(_) => Value::Null,
            None => ctx.body.clone().or_else(|| ctx.idea.clone()).into(),
        };
        vars["selected_idea"] = session
            .idea_pass
            .as_ref()
            .map(|i| i.selected_idea.clone())
            .or_else(|| ctx.idea.clone())
            .into();
        vars["selected_angle"] = session
            .angle_pass
            .as_ref()
            .map(|a| a.selected_angle.clone())
            .into();
        vars["rag_context"] = session
            .rag_pass
            .as_ref()
            .map(|r| r.rag_context.clone())
            .filter(|c| !c.is_empty())
            .into();

        let request = ctx
            .prompts
            .completion_request(PassName::Draft, &vars)?
            .with_temperature(0.7)
            .with_max_tokens(1500);
        let draft = stream_body(ctx, PassName::Draft, request, events).await?;

        ctx.cache
            .update_session(&ctx.session_id, DraftRecord { draft }.into())
            .await
    }
}
