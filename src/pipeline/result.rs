//! The synthesized post delivered in the `final` event

use super::context::PassContext;
use super::PassName;
use crate::session::{GenerationSession, ScoreBreakdown, SessionId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultMetadata {
    /// Passes holding a record in the session, in pipeline order
    pub passes_completed: Vec<PassName>,
    pub idea_count: usize,
    pub angle_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score_breakdown: Option<ScoreBreakdown>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weaknesses: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_fixes: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalResult {
    pub session_id: SessionId,
    pub title: String,
    pub body: String,
    pub hashtags: String,
    pub metadata: ResultMetadata,
}

impl FinalResult {
    /// Assemble the result from session state alone, falling back to the
    /// caller's own title/body/hashtags where no pass produced one
    pub fn from_session(ctx: &PassContext, session: &GenerationSession) -> Self {
        let outline = session.outline_pass.as_ref();
        let scoring = session.scoring_pass.as_ref();

        let title = outline
            .map(|o| o.title.clone())
            .or_else(|| ctx.title.clone())
            .unwrap_or_default();
        let body = session
            .final_body()
            .map(str::to_string)
            .or_else(|| ctx.body.clone())
            .unwrap_or_default();
        let hashtags = outline
            .map(|o| o.hashtags.clone())
            .or_else(|| ctx.hashtags.clone())
            .unwrap_or_default();

        Self {
            session_id: ctx.session_id.clone(),
            title,
            body,
            hashtags,
            metadata: ResultMetadata {
                passes_completed: session.completed_passes(),
                idea_count: session.idea_pass.as_ref().map_or(0, |i| i.ideas.len()),
                angle_count: session.angle_pass.as_ref().map_or(0, |a| a.angles.len()),
                score: scoring.map(|s| s.score),
                score_breakdown: scoring.map(|s| s.score_breakdown),
                weaknesses: scoring.map(|s| s.weaknesses.clone()),
                suggested_fixes: scoring.map(|s| s.suggested_fixes.clone()),
            },
        }
    }
}
