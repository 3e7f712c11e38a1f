//! Mock embedding and vector search

use crate::error::{PipelineError, Result};
use crate::retrieval::{Embedder, KnowledgeChunk, SearchOptions, VectorStore};
use async_trait::async_trait;
use std::sync::{Arc, Mutex, PoisonError};

/// Embeds every text to the same short vector
pub struct MockEmbedder {
    fail_with: Option<String>,
    texts: Arc<Mutex<Vec<String>>>,
}

impl MockEmbedder {
    pub fn new() -> Self {
        Self {
            fail_with: None,
            texts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            fail_with: Some(message.to_string()),
            ..Self::new()
        }
    }

    pub fn embedded_texts(&self) -> Vec<String> {
        self.texts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Default for MockEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Embedder for MockEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.texts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(text.to_string());

        match &self.fail_with {
            Some(message) => Err(PipelineError::Retrieval(message.clone())),
            None => Ok(vec![0.1, 0.2, 0.3]),
        }
    }
}

/// In-memory knowledge base honoring limit, threshold and metadata filters
pub struct MockVectorStore {
    chunks: Vec<KnowledgeChunk>,
    searches: Arc<Mutex<Vec<SearchOptions>>>,
}

impl MockVectorStore {
    pub fn new(chunks: Vec<KnowledgeChunk>) -> Self {
        Self {
            chunks,
            searches: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Options of every search, oldest first
    pub fn searches(&self) -> Vec<SearchOptions> {
        self.searches
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl VectorStore for MockVectorStore {
    async fn search_similar(
        &self,
        _vector: &[f32],
        options: &SearchOptions,
    ) -> Result<Vec<KnowledgeChunk>> {
        self.searches
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(options.clone());

        let mut hits: Vec<KnowledgeChunk> = self
            .chunks
            .iter()
            .filter(|chunk| chunk.score >= options.score_threshold)
            .filter(|chunk| {
                options.filter.iter().all(|(key, value)| {
                    chunk.metadata.get(key).and_then(|v| v.as_str()) == Some(value.as_str())
                })
            })
            .cloned()
            .collect();

        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(options.limit);
        Ok(hits)
    }
}
