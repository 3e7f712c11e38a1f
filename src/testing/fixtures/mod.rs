//! Canned requests and model responses for a complete pipeline run

use super::mocks::MockLlmBuilder;
use crate::pipeline::{ContentType, GenerationRequest, PassName, Product};
use crate::retrieval::KnowledgeChunk;
use serde_json::json;

pub const IDEAS_JSON: &str = r#"{"ideas": [
    "Show a dawn fishing trip with line-caught lobster",
    "Explain how seasonal quotas keep lobster stocks healthy",
    "Profile the family crews who have fished Cô Tô for generations"
]}"#;

pub const ANGLES_JSON: &str = r#"```json
{"angles": [
    "Educational: what makes a catch sustainable",
    "Experiential: a morning aboard the boat",
    "Customer-centric: why it matters for the dinner table"
]}
```"#;

pub const OUTLINE_JSON: &str = r##"{
    "title": "Fresh From Cô Tô: How We Fish Responsibly",
    "outline": "Hook: open on the boats leaving at dawn\nMain points: hand lines, quota limits, release of small lobsters\nCTA: invite readers to ask about the catch",
    "hashtags": "#Seafood #sustainable #seafood #CôTô"
}"##;

pub const SCORE_JSON: &str = r#"{
    "clarity": 17,
    "engagement": 15,
    "brandVoice": 18,
    "platformFit": 16,
    "safety": 19,
    "weaknesses": ["CTA is generic"],
    "suggestedFixes": ["Name the harbor in the CTA"]
}"#;

pub const RESEARCH_SYNTHESIS_JSON: &str = r#"{
    "insights": ["Hand-line fishing has low bycatch"],
    "risks": ["Avoid claiming certification without proof"],
    "recommendedAngles": ["Behind the catch"]
}"#;

pub const DRAFT_TOKENS: &[&str] = &[
    "At dawn ",
    "the boats leave Cô Tô ",
    "with hand lines, ",
    "not nets.",
];

pub const ENHANCE_TOKENS: &[&str] = &[
    "At first light, ",
    "our boats leave Cô Tô ",
    "with hand lines, ",
    "never nets.",
];

/// Every pass scripted with a well-formed response
pub fn scripted_llm() -> MockLlmBuilder {
    MockLlmBuilder::new()
        .completion(PassName::Research, RESEARCH_SYNTHESIS_JSON)
        .completion(PassName::Idea, IDEAS_JSON)
        .completion(PassName::Angle, ANGLES_JSON)
        .completion(PassName::Outline, OUTLINE_JSON)
        .stream(PassName::Draft, DRAFT_TOKENS.to_vec())
        .stream(PassName::Enhance, ENHANCE_TOKENS.to_vec())
        .completion(PassName::Scoring, SCORE_JSON)
}

/// Generic creative request with a product attached
pub fn sustainable_fishing_request() -> GenerationRequest {
    GenerationRequest {
        idea: Some("Highlight sustainable fishing".to_string()),
        content_type: Some(ContentType::Post),
        product: Some(Product {
            name: "Tôm hùm Cô Tô".to_string(),
            ..Product::default()
        }),
        ..GenerationRequest::default()
    }
}

pub fn knowledge_chunk(id: &str, title: &str, content: &str, score: f32) -> KnowledgeChunk {
    KnowledgeChunk {
        id: id.to_string(),
        content: content.to_string(),
        score,
        metadata: json!({ "title": title }),
    }
}
