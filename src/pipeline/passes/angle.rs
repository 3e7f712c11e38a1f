//! Angle pass: three distinct framings of the selected idea

use super::normalize::normalize_list;
use super::{completed_and_unchanged, GenerationPass, SkipReason};
use crate::error::{PipelineError, Result};
use crate::llm::parse_json_response;
use crate::pipeline::{EventSink, PassContext, PassName};
use crate::session::{AngleRecord, GenerationSession};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

pub const ANGLE_COUNT: usize = 3;

#[derive(Debug, Deserialize)]
struct AngleResponse {
    angles: Vec<String>,
}

pub fn parse_angles(raw: &str) -> Result<AngleRecord> {
    let response: AngleResponse = parse_json_response(PassName::Angle, raw)?;
    let mut angles = normalize_list(response.angles);
    if angles.len() < ANGLE_COUNT {
        return Err(PipelineError::schema(
            PassName::Angle,
            format!("expected {ANGLE_COUNT} distinct angles, got {}", angles.len()),
        ));
    }
    angles.truncate(ANGLE_COUNT);

    let selected_angle = angles[0].clone();
    Ok(AngleRecord {
        angles,
        selected_angle,
    })
}

pub struct AnglePass;

#[async_trait]
impl GenerationPass for AnglePass {
    fn name(&self) -> PassName {
        PassName::Angle
    }

    fn skip_reason(&self, ctx: &PassContext, session: &GenerationSession) -> Option<SkipReason> {
        if session.idea_pass.is_none() {
            return Some(SkipReason::MissingDependency(PassName::Idea));
        }
        completed_and_unchanged(ctx, session, PassName::Angle)
    }

    async fn run(
        &self,
        ctx: &PassContext,
        session: &GenerationSession,
        _events: &EventSink,
    ) -> Result<()> {
        let Some(idea) = &session.idea_pass else {
            return Err(PipelineError::Session(
                "angle pass ran without an idea record".to_string(),
            ));
        };

        let mut vars = ctx.prompt_vars();
        vars["selected_idea"] = idea.selected_idea.clone().into();
        vars["research"] = session
            .research_pass
            .as_ref()
            .filter(|r| !r.is_empty())
            .map(serde_json::to_value)
            .transpose()?
            .unwrap_or(Value::Null);

        let request = ctx
            .prompts
            .completion_request(PassName::Angle, &vars)?
            .with_temperature(0.8);
        let response = ctx.llm.generate_completion(request).await?;
        let record = parse_angles(&response.content)?;

        debug!("Selected angle for {}: {}", ctx.session_id, record.selected_angle);
        ctx.cache
            .update_session(&ctx.session_id, record.into())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::passes::test_support::{context, seeded};
    use crate::session::{IdeaRecord, SessionCache};
    use crate::testing::{MockLlm, ANGLES_JSON};
    use std::sync::Arc;

    #[test]
    fn test_extra_angles_are_truncated() {
        let record =
            parse_angles(r#"{"angles": ["Educational", "Experiential", "Outcome", "Behind the scenes"]}"#)
                .unwrap();
        assert_eq!(record.angles, vec!["Educational", "Experiential", "Outcome"]);
        assert_eq!(record.selected_angle, "Educational");
    }

    #[test]
    fn test_fenced_response_parses() {
        let record = parse_angles(ANGLES_JSON).unwrap();
        assert_eq!(record.angles.len(), ANGLE_COUNT);
    }

    #[test]
    fn test_two_angles_is_schema_error() {
        let err = parse_angles(r#"{"angles": ["Educational", "Experiential"]}"#).unwrap_err();
        assert!(err.is_response_error());
    }

    #[tokio::test]
    async fn test_never_runs_without_idea() {
        let llm = Arc::new(MockLlm::builder().completion(PassName::Angle, ANGLES_JSON).build());
        let (ctx, cache) = context(seeded("Highlight sustainable fishing"), llm.clone());
        let (sink, mut rx) = EventSink::channel(8);

        AnglePass.execute(&ctx, &sink).await.unwrap();

        assert_eq!(
            rx.try_recv().unwrap(),
            crate::pipeline::GenerationEvent::PassSkip { pass: PassName::Angle }
        );
        assert_eq!(llm.total_calls(), 0);
        let session = cache.get(&ctx.session_id).await.unwrap().unwrap();
        assert!(session.angle_pass.is_none());
    }

    #[tokio::test]
    async fn test_prompt_carries_selected_idea() {
        let llm = Arc::new(MockLlm::builder().completion(PassName::Angle, ANGLES_JSON).build());
        let (ctx, cache) = context(seeded("Highlight sustainable fishing"), llm.clone());
        cache
            .update_session(
                &ctx.session_id,
                IdeaRecord {
                    ideas: vec!["Dawn trip".into(), "Quotas".into(), "Crews".into()],
                    selected_idea: "Dawn trip".into(),
                }
                .into(),
            )
            .await
            .unwrap();
        let (sink, _rx) = EventSink::channel(8);

        AnglePass.execute(&ctx, &sink).await.unwrap();

        assert!(llm.requests_for(PassName::Angle)[0]
            .prompt
            .contains("Idea: Dawn trip"));
        let session = cache.get(&ctx.session_id).await.unwrap().unwrap();
        assert_eq!(session.angle_pass.unwrap().angles.len(), 3);
    }
}
