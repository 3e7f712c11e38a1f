//! Generation session state
//!
//! A session memoizes the output of every pipeline pass under a caller-supplied
//! id so that re-running the pipeline on unchanged input is a cheap no-op.
//! Storage is pluggable through [`SessionCache`]; the host decides lifecycle
//! and eviction by choosing and sizing the cache it injects.

pub mod manager;
pub mod records;
pub mod state;
pub mod storage;

pub use manager::{InMemorySessionCache, SessionCache};
pub use records::{
    AngleRecord, DraftRecord, EnhanceRecord, IdeaRecord, OutlineRecord, RagRecord, RagSource,
    ResearchRecord, ScoreBreakdown, ScoringRecord,
};
pub use state::{GenerationSession, SessionPatch};
pub use storage::FileSessionCache;

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a generation session
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Create a new session ID
    pub fn new() -> Self {
        Self(format!("session-{}", Uuid::new_v4()))
    }

    /// Create from an existing string
    pub fn from_string(id: String) -> Self {
        Self(id)
    }

    /// Get the inner string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the id can be used as a file name without escaping its directory
    pub fn is_path_safe(&self) -> bool {
        !self.0.is_empty()
            && self.0.len() <= 128
            && self
                .0
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SessionId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

#[cfg(test)]
mod tests;
