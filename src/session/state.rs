//! The memoized pipeline state for one session and its merge-patch

use super::records::*;
use crate::pipeline::PassName;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One optional record per pass; a record exists only once that pass has completed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationSession {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub research_pass: Option<ResearchRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rag_pass: Option<RagRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idea_pass: Option<IdeaRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub angle_pass: Option<AngleRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outline_pass: Option<OutlineRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub draft_pass: Option<DraftRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enhance_pass: Option<EnhanceRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scoring_pass: Option<ScoringRecord>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl GenerationSession {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            research_pass: None,
            rag_pass: None,
            idea_pass: None,
            angle_pass: None,
            outline_pass: None,
            draft_pass: None,
            enhance_pass: None,
            scoring_pass: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn has_record(&self, pass: PassName) -> bool {
        match pass {
            PassName::Research => self.research_pass.is_some(),
            PassName::Rag => self.rag_pass.is_some(),
            PassName::Idea => self.idea_pass.is_some(),
            PassName::Angle => self.angle_pass.is_some(),
            PassName::Outline => self.outline_pass.is_some(),
            PassName::Draft => self.draft_pass.is_some(),
            PassName::Enhance => self.enhance_pass.is_some(),
            PassName::Scoring => self.scoring_pass.is_some(),
        }
    }

    /// Passes holding a record, in pipeline order
    pub fn completed_passes(&self) -> Vec<PassName> {
        PassName::ALL
            .into_iter()
            .filter(|pass| self.has_record(*pass))
            .collect()
    }

    /// Body text the pipeline would publish: enhanced if present, else draft
    pub fn final_body(&self) -> Option<&str> {
        self.enhance_pass
            .as_ref()
            .map(|r| r.enhanced.as_str())
            .or_else(|| self.draft_pass.as_ref().map(|r| r.draft.as_str()))
    }

    /// Drop the record stored for `pass`
    pub fn clear(&mut self, pass: PassName) {
        match pass {
            PassName::Research => self.research_pass = None,
            PassName::Rag => self.rag_pass = None,
            PassName::Idea => self.idea_pass = None,
            PassName::Angle => self.angle_pass = None,
            PassName::Outline => self.outline_pass = None,
            PassName::Draft => self.draft_pass = None,
            PassName::Enhance => self.enhance_pass = None,
            PassName::Scoring => self.scoring_pass = None,
        }
    }

    /// Shallow merge: cleared keys are dropped first, then the keys present
    /// in the patch are replaced
    pub fn apply(&mut self, patch: SessionPatch) {
        let SessionPatch {
            research_pass,
            rag_pass,
            idea_pass,
            angle_pass,
            outline_pass,
            draft_pass,
            enhance_pass,
            scoring_pass,
            cleared,
        } = patch;

        for pass in cleared {
            self.clear(pass);
        }

        if research_pass.is_some() {
            self.research_pass = research_pass;
        }
        if rag_pass.is_some() {
            self.rag_pass = rag_pass;
        }
        if idea_pass.is_some() {
            self.idea_pass = idea_pass;
        }
        if angle_pass.is_some() {
            self.angle_pass = angle_pass;
        }
        if outline_pass.is_some() {
            self.outline_pass = outline_pass;
        }
        if draft_pass.is_some() {
            self.draft_pass = draft_pass;
        }
        if enhance_pass.is_some() {
            self.enhance_pass = enhance_pass;
        }
        if scoring_pass.is_some() {
            self.scoring_pass = scoring_pass;
        }
        self.updated_at = Utc::now();
    }
}

impl Default for GenerationSession {
    fn default() -> Self {
        Self::new()
    }
}

/// Partial update of a session; absent keys are left untouched
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionPatch {
    pub research_pass: Option<ResearchRecord>,
    pub rag_pass: Option<RagRecord>,
    pub idea_pass: Option<IdeaRecord>,
    pub angle_pass: Option<AngleRecord>,
    pub outline_pass: Option<OutlineRecord>,
    pub draft_pass: Option<DraftRecord>,
    pub enhance_pass: Option<EnhanceRecord>,
    pub scoring_pass: Option<ScoringRecord>,
    /// Keys to remove from the session
    pub cleared: Vec<PassName>,
}

impl SessionPatch {
    /// Patch that only removes the given records
    pub fn clear(passes: impl IntoIterator<Item = PassName>) -> Self {
        Self {
            cleared: passes.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Keys this patch would overwrite
    pub fn touched(&self) -> Vec<PassName> {
        let mut scratch = GenerationSession::new();
        scratch.apply(self.clone());
        scratch.completed_passes()
    }
}

macro_rules! patch_from_record {
    ($record:ty, $field:ident) => {
        impl From<$record> for SessionPatch {
            fn from(record: $record) -> Self {
                Self {
                    $field: Some(record),
                    ..Self::default()
                }
            }
        }
    };
}

patch_from_record!(ResearchRecord, research_pass);
patch_from_record!(RagRecord, rag_pass);
patch_from_record!(IdeaRecord, idea_pass);
patch_from_record!(AngleRecord, angle_pass);
patch_from_record!(OutlineRecord, outline_pass);
patch_from_record!(DraftRecord, draft_pass);
patch_from_record!(EnhanceRecord, enhance_pass);
patch_from_record!(ScoringRecord, scoring_pass);
