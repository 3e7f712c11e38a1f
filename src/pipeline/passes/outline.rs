//! Outline pass: title, Hook/Main points/CTA structure and hashtags
//!
//! The title and hashtags are announced with `title:ready` and
//! `hashtags:ready` as soon as the record is stored, ahead of the body.

use super::normalize::{clean_title, normalize_hashtags, strip_title_from_outline};
use super::{completed_and_unchanged, GenerationPass, SkipReason};
use crate::error::{PipelineError, Result};
use crate::llm::parse_json_response;
use crate::pipeline::{EventSink, GenerationEvent, PassContext, PassName};
use crate::session::{GenerationSession, OutlineRecord};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

/// Models return these fields both as a string and as a list
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StringOrList {
    Text(String),
    List(Vec<String>),
}

impl StringOrList {
    fn into_parts(self) -> Vec<String> {
        match self {
            StringOrList::Text(text) => vec![text],
            StringOrList::List(items) => items,
        }
    }
}

#[derive(Debug, Deserialize)]
struct OutlineResponse {
    title: String,
    outline: StringOrList,
    hashtags: StringOrList,
}

const MIN_HASHTAGS: usize = 3;

pub fn parse_outline(raw: &str) -> Result<OutlineRecord> {
    let response: OutlineResponse = parse_json_response(PassName::Outline, raw)?;

    let title = clean_title(&response.title)
        .ok_or_else(|| PipelineError::schema(PassName::Outline, "title is empty"))?;

    let outline = strip_title_from_outline(&response.outline.into_parts().join("\n"), &title);
    if outline.is_empty() {
        return Err(PipelineError::schema(PassName::Outline, "outline is empty"));
    }

    let hashtags = normalize_hashtags(response.hashtags.into_parts());
    let count = hashtags.split_whitespace().count();
    if count < MIN_HASHTAGS {
        return Err(PipelineError::schema(
            PassName::Outline,
            format!("expected at least {MIN_HASHTAGS} hashtags, got {count}"),
        ));
    }

    Ok(OutlineRecord {
        title,
        outline,
        hashtags,
    })
}

pub struct OutlinePass;

#[async_trait]
impl GenerationPass for OutlinePass {
    fn name(&self) -> PassName {
        PassName::Outline
    }

    fn skip_reason(&self, ctx: &PassContext, session: &GenerationSession) -> Option<SkipReason> {
        if session.idea_pass.is_none() {
            return Some(SkipReason::MissingDependency(PassName::Idea));
        }
        if session.angle_pass.is_none() {
            return Some(SkipReason::MissingDependency(PassName::Angle));
        }
        completed_and_unchanged(ctx, session, PassName::Outline)
    }

    async fn run(
        &self,
        ctx: &PassContext,
        session: &GenerationSession,
        events: &EventSink,
    ) -> Result<()> {
        let (Some(idea), Some(angle)) = (&session.idea_pass, &session.angle_pass) else {
            return Err(PipelineError::Session(
                "outline pass ran without idea and angle records".to_string(),
            ));
        };

        let mut vars = ctx.prompt_vars();
        vars["selected_idea"] = idea.selected_idea.clone().into();
        vars["selected_angle"] = angle.selected_angle.clone().into();

        let request = ctx
            .prompts
            .completion_request(PassName::Outline, &vars)?
            .with_temperature(0.6);
        let response = ctx.llm.generate_completion(request).await?;
        let record = parse_outline(&response.content)?;

        let title = record.title.clone();
        let hashtags = record.hashtags.clone();
        debug!("Outline for {}: {:?} {}", ctx.session_id, title, hashtags);

        ctx.cache
            .update_session(&ctx.session_id, record.into())
            .await?;
        events.emit(GenerationEvent::TitleReady { title }).await?;
        events
            .emit(GenerationEvent::HashtagsReady { hashtags })
            .await
    }
}
