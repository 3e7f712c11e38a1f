//! Structured output of each pass, as stored in the session

use crate::research::Citation;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResearchRecord {
    #[serde(default)]
    pub insights: Vec<String>,
    #[serde(default)]
    pub risks: Vec<String>,
    #[serde(default)]
    pub recommended_angles: Vec<String>,
    #[serde(default)]
    pub sources: Vec<Citation>,
}

impl ResearchRecord {
    /// Record written when research failed and downstream passes should degrade
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.insights.is_empty() && self.risks.is_empty() && self.recommended_angles.is_empty()
    }
}

/// Provenance of one retrieved knowledge chunk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RagSource {
    pub title: String,
    pub content: String,
    pub similarity: f32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RagRecord {
    pub rag_context: String,
    #[serde(default)]
    pub sources: Vec<RagSource>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdeaRecord {
    pub ideas: Vec<String>,
    pub selected_idea: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AngleRecord {
    pub angles: Vec<String>,
    pub selected_angle: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutlineRecord {
    pub title: String,
    pub outline: String,
    /// Space-joined, `#`-prefixed, lowercase tags
    pub hashtags: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftRecord {
    pub draft: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnhanceRecord {
    pub enhanced: String,
}

/// Five 0-20 sub-scores that sum to the overall 0-100 score
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBreakdown {
    pub clarity: u32,
    pub engagement: u32,
    pub brand_voice: u32,
    pub platform_fit: u32,
    pub safety: u32,
}

impl ScoreBreakdown {
    pub const MAX_PER_DIMENSION: u32 = 20;

    pub fn clamped(self) -> Self {
        let clamp = |v: u32| v.min(Self::MAX_PER_DIMENSION);
        Self {
            clarity: clamp(self.clarity),
            engagement: clamp(self.engagement),
            brand_voice: clamp(self.brand_voice),
            platform_fit: clamp(self.platform_fit),
            safety: clamp(self.safety),
        }
    }

    pub fn total(&self) -> u32 {
        self.clarity + self.engagement + self.brand_voice + self.platform_fit + self.safety
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoringRecord {
    pub score: u32,
    pub score_breakdown: ScoreBreakdown,
    #[serde(default)]
    pub weaknesses: Vec<String>,
    #[serde(default)]
    pub suggested_fixes: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_breakdown_clamps_each_dimension() {
        let breakdown = ScoreBreakdown {
            clarity: 25,
            engagement: 18,
            brand_voice: 20,
            platform_fit: 40,
            safety: 3,
        }
        .clamped();

        assert_eq!(breakdown.clarity, 20);
        assert_eq!(breakdown.platform_fit, 20);
        assert_eq!(breakdown.total(), 81);
    }

    #[test]
    fn test_research_record_wire_names() {
        let record = ResearchRecord {
            recommended_angles: vec!["behind the catch".to_string()],
            ..ResearchRecord::empty()
        };
        let json = serde_json::to_value(&record).unwrap();
        assert!(json.get("recommendedAngles").is_some());
        assert!(!record.is_empty());
    }
}
