//! Scoring pass: best-effort quality review of the final body
//!
//! A response that cannot be parsed drops any earlier score and the run
//! continues; the final result then simply carries no score.

use super::normalize::normalize_list;
use super::{completed_and_unchanged, GenerationPass, SkipReason};
use crate::error::{PipelineError, Result};
use crate::llm::parse_json_response;
use crate::pipeline::{EventSink, PassContext, PassName};
use crate::session::{GenerationSession, ScoreBreakdown, ScoringRecord, SessionPatch};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawBreakdown {
    clarity: Option<f64>,
    engagement: Option<f64>,
    brand_voice: Option<f64>,
    platform_fit: Option<f64>,
    safety: Option<f64>,
}

impl RawBreakdown {
    fn is_complete(&self) -> bool {
        self.clarity.is_some()
            && self.engagement.is_some()
            && self.brand_voice.is_some()
            && self.platform_fit.is_some()
            && self.safety.is_some()
    }

    fn to_breakdown(&self) -> ScoreBreakdown {
        let max = f64::from(ScoreBreakdown::MAX_PER_DIMENSION);
        let points = |v: Option<f64>| v.unwrap_or(0.0).round().clamp(0.0, max) as u32;
        ScoreBreakdown {
            clarity: points(self.clarity),
            engagement: points(self.engagement),
            brand_voice: points(self.brand_voice),
            platform_fit: points(self.platform_fit),
            safety: points(self.safety),
        }
    }
}

/// Sub-scores may be top-level or nested under `scoreBreakdown`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScoreResponse {
    #[serde(default)]
    score_breakdown: Option<RawBreakdown>,
    #[serde(flatten)]
    flat: RawBreakdown,
    #[serde(default)]
    weaknesses: Vec<String>,
    #[serde(default)]
    suggested_fixes: Vec<String>,
}

pub fn parse_score(raw: &str) -> Result<ScoringRecord> {
    let response: ScoreResponse = parse_json_response(PassName::Scoring, raw)?;

    let raw_breakdown = match &response.score_breakdown {
        Some(nested) if nested.is_complete() => nested,
        _ => &response.flat,
    };
    if !raw_breakdown.is_complete() {
        return Err(PipelineError::schema(
            PassName::Scoring,
            "missing one or more score dimensions",
        ));
    }

    let score_breakdown = raw_breakdown.to_breakdown().clamped();
    Ok(ScoringRecord {
        score: score_breakdown.total(),
        score_breakdown,
        weaknesses: normalize_list(response.weaknesses),
        suggested_fixes: normalize_list(response.suggested_fixes),
    })
}

pub struct ScoringPass;

impl ScoringPass {
    async fn score(&self, ctx: &PassContext, session: &GenerationSession) -> Result<ScoringRecord> {
        let content = session.final_body().unwrap_or_default();
        let title = session
            .outline_pass
            .as_ref()
            .map(|o| o.title.clone())
            .or_else(|| ctx.title.clone());

        let mut vars = ctx.prompt_vars();
        vars["content"] = content.into();
        vars["title"] = title.into();

        let request = ctx
            .prompts
            .completion_request(PassName::Scoring, &vars)?
            .with_temperature(0.2);
        let response = ctx.llm.generate_completion(request).await?;
        parse_score(&response.content)
    }
}

#[async_trait]
impl GenerationPass for ScoringPass {
    fn name(&self) -> PassName {
        PassName::Scoring
    }

    fn skip_reason(&self, ctx: &PassContext, session: &GenerationSession) -> Option<SkipReason> {
        if session.final_body().is_none() {
            return Some(SkipReason::MissingDependency(PassName::Draft));
        }
        completed_and_unchanged(ctx, session, PassName::Scoring)
    }

    async fn run(
        &self,
        ctx: &PassContext,
        session: &GenerationSession,
        _events: &EventSink,
    ) -> Result<()> {
        match self.score(ctx, session).await {
            Ok(record) => {
                debug!("Scored {}: {}/100", ctx.session_id, record.score);
                ctx.cache
                    .update_session(&ctx.session_id, record.into())
                    .await
            }
            Err(e) if e.is_response_error() || e.is_degradable() => {
                warn!("Scoring failed for {}, omitting score: {}", ctx.session_id, e);
                ctx.cache
                    .update_session(&ctx.session_id, SessionPatch::clear([PassName::Scoring]))
                    .await
            }
            Err(e) => Err(e),
        }
    }
}
