//! LLM completion capability
//!
//! Passes talk to the model only through [`LlmService`], which keeps the
//! pipeline testable with scripted responses and lets the host pick any
//! provider. [`api::OpenAiCompatibleClient`] is the bundled HTTP adapter.

pub mod api;
pub mod json;

pub use api::OpenAiCompatibleClient;
pub use json::{parse_json_response, strip_code_fences};

use crate::error::Result;
use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

/// Parameters shared by blocking and streaming completions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionRequest {
    pub system_prompt: String,
    pub prompt: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl CompletionRequest {
    pub fn new(system_prompt: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            prompt: prompt.into(),
            temperature: 0.7,
            max_tokens: 1024,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionResponse {
    pub content: String,
}

/// Ordered text fragments of a streaming completion
pub type TokenStream = BoxStream<'static, Result<String>>;

#[async_trait]
pub trait LlmService: Send + Sync {
    async fn generate_completion(&self, request: CompletionRequest) -> Result<CompletionResponse>;

    async fn generate_streaming_completion(&self, request: CompletionRequest)
        -> Result<TokenStream>;
}
