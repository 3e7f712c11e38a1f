//! Web research capability used to ground generated content in facts

use crate::config::ResearchConfig;
use crate::error::{PipelineError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    pub url: String,
    #[serde(default)]
    pub title: String,
}

/// Raw research answer plus the pages it was drawn from
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResearchResult {
    pub content: String,
    #[serde(default)]
    pub citations: Vec<Citation>,
}

#[async_trait]
pub trait ResearchService: Send + Sync {
    async fn search(&self, query: &str) -> Result<ResearchResult>;
}

/// Client for Perplexity's chat completions endpoint
pub struct PerplexityClient {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl PerplexityClient {
    pub fn new(config: &ResearchConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| PipelineError::Config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        })
    }
}

#[async_trait]
impl ResearchService for PerplexityClient {
    async fn search(&self, query: &str) -> Result<ResearchResult> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                {
                    "role": "system",
                    "content": "You are a research assistant. Answer only with facts found in your sources.",
                },
                { "role": "user", "content": query },
            ],
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| PipelineError::Research(format!("Request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(PipelineError::Research(format!(
                "API error {status}: {error_text}"
            )));
        }

        let api_response: SearchResponse = response
            .json()
            .await
            .map_err(|e| PipelineError::Research(format!("Failed to parse response: {e}")))?;

        let result = api_response.into_result();
        debug!(
            "Research returned {} chars and {} citations",
            result.content.len(),
            result.citations.len()
        );
        Ok(result)
    }
}

// Internal API response structures
#[derive(Debug, Deserialize)]
struct SearchResponse {
    choices: Vec<SearchChoice>,
    #[serde(default)]
    citations: Vec<String>,
    #[serde(default)]
    search_results: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchChoice {
    message: SearchMessage,
}

#[derive(Debug, Deserialize)]
struct SearchMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    url: String,
    #[serde(default)]
    title: String,
}

impl SearchResponse {
    /// Prefer titled search results, falling back to bare citation urls
    fn into_result(self) -> ResearchResult {
        let content = self
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .unwrap_or_default();

        let citations = if self.search_results.is_empty() {
            self.citations
                .into_iter()
                .map(|url| Citation {
                    title: url.clone(),
                    url,
                })
                .collect()
        } else {
            self.search_results
                .into_iter()
                .map(|hit| Citation {
                    url: hit.url,
                    title: hit.title,
                })
                .collect()
        };

        ResearchResult { content, citations }
    }
}
