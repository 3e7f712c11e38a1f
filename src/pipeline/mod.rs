//! Multi-pass content generation pipeline
//!
//! A request flows through a fixed sequence of passes:
//!
//! ```text
//! research -> rag -> idea -> angle -> outline -> draft -> enhance -> scoring
//! ```
//!
//! Each pass reads earlier results from the session, decides whether it has
//! anything to do, and if so writes exactly one session key. Progress is
//! reported as a stream of [`GenerationEvent`]s that ends with either a
//! `final` or an `error` event.

pub mod context;
pub mod events;
pub mod orchestrator;
pub mod passes;
pub mod prompts;
pub mod result;

pub use context::{BrandMemory, ContentType, GenerationRequest, PassContext, Product};
pub use events::{EventSink, GenerationEvent};
pub use orchestrator::{OrchestratorBuilder, PipelineOrchestrator};
pub use passes::{GenerationPass, SkipReason};
pub use prompts::PromptEngine;
pub use result::{FinalResult, ResultMetadata};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stage identifiers, declared in pipeline order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PassName {
    Research,
    Rag,
    Idea,
    Angle,
    Outline,
    Draft,
    Enhance,
    Scoring,
}

impl PassName {
    pub const ALL: [PassName; 8] = [
        PassName::Research,
        PassName::Rag,
        PassName::Idea,
        PassName::Angle,
        PassName::Outline,
        PassName::Draft,
        PassName::Enhance,
        PassName::Scoring,
    ];

    /// Passes that consume this pass's output, directly or transitively
    pub fn downstream(&self) -> &'static [PassName] {
        &Self::ALL[*self as usize + 1..]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PassName::Research => "research",
            PassName::Rag => "rag",
            PassName::Idea => "idea",
            PassName::Angle => "angle",
            PassName::Outline => "outline",
            PassName::Draft => "draft",
            PassName::Enhance => "enhance",
            PassName::Scoring => "scoring",
        }
    }
}

impl fmt::Display for PassName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
