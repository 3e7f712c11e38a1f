//! Mock research service

use crate::error::{PipelineError, Result};
use crate::research::{Citation, ResearchResult, ResearchService};
use async_trait::async_trait;
use std::sync::{Arc, Mutex, PoisonError};

pub struct MockResearch {
    outcome: std::result::Result<ResearchResult, String>,
    queries: Arc<Mutex<Vec<String>>>,
}

impl MockResearch {
    pub fn returning(content: &str, citations: Vec<Citation>) -> Self {
        Self {
            outcome: Ok(ResearchResult {
                content: content.to_string(),
                citations,
            }),
            queries: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            outcome: Err(message.to_string()),
            queries: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl ResearchService for MockResearch {
    async fn search(&self, query: &str) -> Result<ResearchResult> {
        self.queries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(query.to_string());

        self.outcome
            .clone()
            .map_err(PipelineError::Research)
    }
}
