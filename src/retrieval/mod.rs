//! Knowledge-base retrieval contracts
//!
//! Embedding and vector search live outside this crate; the RAG pass only
//! needs these two capabilities.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Chunks ranked by similarity, best first
    async fn search_similar(
        &self,
        vector: &[f32],
        options: &SearchOptions,
    ) -> Result<Vec<KnowledgeChunk>>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchOptions {
    pub limit: usize,
    pub score_threshold: f32,
    /// Exact-match metadata constraints
    #[serde(default)]
    pub filter: BTreeMap<String, String>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            limit: 5,
            score_threshold: 0.7,
            filter: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeChunk {
    pub id: String,
    pub content: String,
    pub score: f32,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl KnowledgeChunk {
    /// Document title from metadata, or the chunk id
    pub fn title(&self) -> String {
        self.metadata
            .get("title")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| self.id.clone())
    }
}
