//! Request inputs and the per-invocation pass context

use super::prompts::PromptEngine;
use crate::llm::LlmService;
use crate::session::{SessionCache, SessionId};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::sync::Arc;

/// Kind of content being drafted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    #[default]
    Post,
    Story,
    Reel,
    Ad,
    Product,
    Faq,
    Support,
    Landing,
    #[serde(other)]
    Other,
}

impl ContentType {
    /// Content where an invented fact would be a customer-facing error
    pub fn is_fact_sensitive(&self) -> bool {
        matches!(
            self,
            ContentType::Ad
                | ContentType::Product
                | ContentType::Faq
                | ContentType::Support
                | ContentType::Landing
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Post => "post",
            ContentType::Story => "story",
            ContentType::Reel => "reel",
            ContentType::Ad => "ad",
            ContentType::Product => "product",
            ContentType::Faq => "faq",
            ContentType::Support => "support",
            ContentType::Landing => "landing",
            ContentType::Other => "other",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ContentType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(serde_json::from_value(Value::String(s.trim().to_lowercase()))
            .unwrap_or(ContentType::Other))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

/// Brand voice descriptor steering every prompt
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BrandMemory {
    pub name: Option<String>,
    pub niche: Option<String>,
    pub voice: Option<String>,
    pub tone: Option<String>,
    pub target_audience: Option<String>,
    pub key_points: Vec<String>,
    pub cta_library: Vec<String>,
}

/// Inbound contract of one pipeline invocation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GenerationRequest {
    /// Absent means a fresh session is created
    pub session_id: Option<SessionId>,
    pub idea: Option<String>,
    pub title: Option<String>,
    pub body: Option<String>,
    pub hashtags: Option<String>,
    pub content_type: Option<ContentType>,
    pub product: Option<Product>,
    pub brand: Option<BrandMemory>,
    pub content_instruction: Option<String>,
    /// Upstream inputs changed since the last run; forces recomputation
    pub has_change: bool,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Everything a pass may read during one invocation
pub struct PassContext {
    pub session_id: SessionId,
    pub idea: Option<String>,
    pub title: Option<String>,
    pub body: Option<String>,
    pub hashtags: Option<String>,
    pub content_type: ContentType,
    pub product: Option<Product>,
    pub brand: Option<BrandMemory>,
    pub content_instruction: Option<String>,
    pub has_change: bool,
    pub llm: Arc<dyn LlmService>,
    pub cache: Arc<dyn SessionCache>,
    pub prompts: Arc<PromptEngine>,
}

impl PassContext {
    pub fn new(
        session_id: SessionId,
        request: GenerationRequest,
        llm: Arc<dyn LlmService>,
        cache: Arc<dyn SessionCache>,
        prompts: Arc<PromptEngine>,
    ) -> Self {
        Self {
            session_id,
            idea: non_blank(request.idea),
            title: non_blank(request.title),
            body: non_blank(request.body),
            hashtags: non_blank(request.hashtags),
            content_type: request.content_type.unwrap_or_default(),
            product: request
                .product
                .filter(|p| !p.name.trim().is_empty()),
            brand: request.brand,
            content_instruction: non_blank(request.content_instruction),
            has_change: request.has_change,
            llm,
            cache,
            prompts,
        }
    }

    /// Whether any input exists that an idea could be built from
    pub fn has_seed(&self) -> bool {
        self.idea.is_some()
            || self.product.is_some()
            || self.brand.is_some()
            || self.content_instruction.is_some()
    }

    /// Variables shared by every prompt template
    pub fn prompt_vars(&self) -> Value {
        json!({
            "idea": self.idea,
            "title": self.title,
            "body": self.body,
            "content_type": self.content_type.as_str(),
            "product": self.product,
            "brand": self.brand,
            "instruction": self.content_instruction,
        })
    }
}
