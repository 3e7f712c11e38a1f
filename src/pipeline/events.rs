//! Event protocol streamed to the caller

use super::result::FinalResult;
use super::PassName;
use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Everything a caller can observe during a pipeline run
///
/// For a pass that runs, events arrive as start, then any token/ready
/// events, then complete. A skipped pass emits only `pass:skip`. A run ends
/// with exactly one `final` or `error`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GenerationEvent {
    #[serde(rename = "pass:start")]
    PassStart { pass: PassName },

    #[serde(rename = "pass:skip")]
    PassSkip { pass: PassName },

    #[serde(rename = "title:ready")]
    TitleReady { title: String },

    #[serde(rename = "hashtags:ready")]
    HashtagsReady { hashtags: String },

    #[serde(rename = "body:token")]
    BodyToken { pass: PassName, content: String },

    #[serde(rename = "pass:complete")]
    PassComplete { pass: PassName },

    #[serde(rename = "final")]
    Final { result: FinalResult },

    #[serde(rename = "error")]
    Error { message: String },
}

impl GenerationEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Final { .. } | Self::Error { .. })
    }

    /// Pass the event belongs to, if any
    pub fn pass(&self) -> Option<PassName> {
        match self {
            Self::PassStart { pass }
            | Self::PassSkip { pass }
            | Self::BodyToken { pass, .. }
            | Self::PassComplete { pass } => Some(*pass),
            Self::TitleReady { .. } | Self::HashtagsReady { .. } => Some(PassName::Outline),
            Self::Final { .. } | Self::Error { .. } => None,
        }
    }
}

pub const DEFAULT_EVENT_BUFFER: usize = 64;

/// Sending half of a run's event stream
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: mpsc::Sender<GenerationEvent>,
}

impl EventSink {
    pub fn new(tx: mpsc::Sender<GenerationEvent>) -> Self {
        Self { tx }
    }

    /// Create a bounded sink/receiver pair
    pub fn channel(buffer: usize) -> (Self, mpsc::Receiver<GenerationEvent>) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        (Self::new(tx), rx)
    }

    /// Deliver an event, failing with `Cancelled` once the consumer is gone
    pub async fn emit(&self, event: GenerationEvent) -> Result<()> {
        self.tx
            .send(event)
            .await
            .map_err(|_| PipelineError::Cancelled)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
