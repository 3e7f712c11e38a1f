//! Generation passes
//!
//! Every stage implements [`GenerationPass`]. The provided
//! [`GenerationPass::execute`] owns the event framing: it evaluates the skip
//! policy before any model call and brackets [`GenerationPass::run`] with
//! `pass:start` and `pass:complete`. A pass writes its session key from inside
//! `run`, and only once it holds a complete result.
//!
//! A pass about to recompute first drops its own record and every downstream
//! record, so a failure part-way through never leaves results derived from
//! older inputs. On a changed run, a pass that skips for any reason other
//! than [`SkipReason::AlreadyCompleted`] drops its own record as well.

pub mod angle;
pub mod draft;
pub mod enhance;
pub mod idea;
pub mod normalize;
pub mod outline;
pub mod rag;
pub mod research;
pub mod scoring;

pub use angle::AnglePass;
pub use draft::DraftPass;
pub use enhance::EnhancePass;
pub use idea::IdeaPass;
pub use outline::OutlinePass;
pub use rag::RagPass;
pub use research::ResearchPass;
pub use scoring::ScoringPass;

use super::context::PassContext;
use super::events::{EventSink, GenerationEvent};
use super::PassName;
use crate::error::{PipelineError, Result};
use crate::llm::CompletionRequest;
use crate::session::{GenerationSession, SessionPatch};
use async_trait::async_trait;
use futures::StreamExt;
use std::fmt;
use tracing::{debug, info};

/// Why a pass declined to run
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    /// Nothing to act on
    NoInput,
    /// An upstream pass has not produced its record
    MissingDependency(PassName),
    /// A record exists and the caller reported no change
    AlreadyCompleted,
    /// The backing service is not wired in
    Unconfigured,
    /// Retrieval gating did not reach its threshold
    BelowThreshold { score: u32, threshold: u32 },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NoInput => write!(f, "no input to act on"),
            SkipReason::MissingDependency(pass) => write!(f, "{pass} pass has not completed"),
            SkipReason::AlreadyCompleted => write!(f, "already completed and unchanged"),
            SkipReason::Unconfigured => write!(f, "service not configured"),
            SkipReason::BelowThreshold { score, threshold } => {
                write!(f, "gating score {score} below threshold {threshold}")
            }
        }
    }
}

#[async_trait]
pub trait GenerationPass: Send + Sync {
    fn name(&self) -> PassName;

    /// Evaluated before any model call; `Some` turns the pass into a skip
    fn skip_reason(&self, ctx: &PassContext, session: &GenerationSession) -> Option<SkipReason>;

    /// Produce the result, emit any token/ready events and update the session
    async fn run(
        &self,
        ctx: &PassContext,
        session: &GenerationSession,
        events: &EventSink,
    ) -> Result<()>;

    async fn execute(&self, ctx: &PassContext, events: &EventSink) -> Result<()> {
        let pass = self.name();
        let session = ctx
            .cache
            .get_or_create(&ctx.session_id, GenerationSession::new())
            .await?;

        if let Some(reason) = self.skip_reason(ctx, &session) {
            debug!("Skipping {} pass for {}: {}", pass, ctx.session_id, reason);
            if ctx.has_change && reason != SkipReason::AlreadyCompleted && session.has_record(pass)
            {
                debug!("Dropping stale {} record for {}", pass, ctx.session_id);
                ctx.cache
                    .update_session(&ctx.session_id, SessionPatch::clear([pass]))
                    .await?;
            }
            return events.emit(GenerationEvent::PassSkip { pass }).await;
        }

        info!("Running {} pass for {}", pass, ctx.session_id);
        events.emit(GenerationEvent::PassStart { pass }).await?;
        let stale = stale_records(&session, pass);
        if !stale.is_empty() {
            debug!("Invalidating {:?} for {}", stale, ctx.session_id);
            ctx.cache
                .update_session(&ctx.session_id, SessionPatch::clear(stale))
                .await?;
        }
        self.run(ctx, &session, events).await?;
        events.emit(GenerationEvent::PassComplete { pass }).await
    }
}

/// Stored records that a fresh run of `pass` makes obsolete
fn stale_records(session: &GenerationSession, pass: PassName) -> Vec<PassName> {
    std::iter::once(pass)
        .chain(pass.downstream().iter().copied())
        .filter(|p| session.has_record(*p))
        .collect()
}

/// Idempotence rule shared by every pass
pub(crate) fn completed_and_unchanged(
    ctx: &PassContext,
    session: &GenerationSession,
    pass: PassName,
) -> Option<SkipReason> {
    (session.has_record(pass) && !ctx.has_change).then_some(SkipReason::AlreadyCompleted)
}

/// Relay a streaming completion as `body:token` events and return the full text
///
/// The returned text is exactly the concatenation of the emitted tokens.
pub(crate) async fn stream_body(
    ctx: &PassContext,
    pass: PassName,
    request: CompletionRequest,
    events: &EventSink,
) -> Result<String> {
    let mut tokens = ctx.llm.generate_streaming_completion(request).await?;
    let mut body = String::new();
    let mut count = 0usize;

    while let Some(token) = tokens.next().await {
        let token = token?;
        if token.is_empty() {
            continue;
        }
        body.push_str(&token);
        count += 1;
        events
            .emit(GenerationEvent::BodyToken {
                pass,
                content: token,
            })
            .await?;
    }

    if body.trim().is_empty() {
        return Err(PipelineError::Stream(format!(
            "{pass} pass produced no text"
        )));
    }

    debug!("{} pass streamed {} tokens ({} chars)", pass, count, body.len());
    Ok(body)
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{DraftRecord, EnhanceRecord, IdeaRecord};

    #[test]
    fn test_stale_records_cover_pass_and_downstream() {
        let mut session = GenerationSession::new();
        session.apply(
            IdeaRecord {
                ideas: vec!["a".into(), "b".into(), "c".into()],
                selected_idea: "a".into(),
            }
            .into(),
        );
        session.apply(DraftRecord { draft: "old".into() }.into());
        session.apply(EnhanceRecord { enhanced: "older".into() }.into());

        assert_eq!(
            stale_records(&session, PassName::Draft),
            vec![PassName::Draft, PassName::Enhance]
        );
        assert_eq!(
            stale_records(&session, PassName::Angle),
            vec![PassName::Draft, PassName::Enhance]
        );
        assert!(stale_records(&session, PassName::Scoring).is_empty());
    }

    #[test]
    fn test_skip_reason_messages() {
        assert_eq!(
            SkipReason::MissingDependency(PassName::Idea).to_string(),
            "idea pass has not completed"
        );
        assert_eq!(
            SkipReason::BelowThreshold {
                score: 1,
                threshold: 2
            }
            .to_string(),
            "gating score 1 below threshold 2"
        );
    }
}
