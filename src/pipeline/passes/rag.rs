//! RAG pass: gated retrieval from the internal knowledge base

use super::{completed_and_unchanged, GenerationPass, SkipReason};
use crate::config::RagConfig;
use crate::error::Result;
use crate::pipeline::{ContentType, EventSink, PassContext, PassName};
use crate::retrieval::{Embedder, KnowledgeChunk, SearchOptions, VectorStore};
use crate::session::{GenerationSession, RagRecord, RagSource, ResearchRecord};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Terms suggesting the post needs facts only the knowledge base holds
const KNOWLEDGE_KEYWORDS: &[&str] = &[
    "policy",
    "policies",
    "warranty",
    "warranties",
    "shipping",
    "delivery",
    "deliveries",
    "price",
    "pricing",
    "refund",
    "return",
    "guarantee",
    "certificate",
    "origin",
    "ingredient",
    "storage",
    "preserve",
    "giao hàng",
    "vận chuyển",
    "giá",
    "bảo hành",
    "đổi trả",
    "hoàn tiền",
    "chính sách",
    "chứng nhận",
    "xuất xứ",
    "nguồn gốc",
    "thành phần",
    "bảo quản",
];

/// Whole-word match on any keyword, allowing a plain plural suffix
static KNOWLEDGE_TERMS: Lazy<Regex> = Lazy::new(|| {
    let alternatives = KNOWLEDGE_KEYWORDS
        .iter()
        .map(|k| regex::escape(k))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"(?i)\b(?:{alternatives})(?:e?s)?\b"))
        .expect("keyword pattern is valid")
});

/// Additive retrieval signal, one point per matching condition
pub fn gating_score(
    idea: &str,
    has_product: bool,
    content_type: ContentType,
    research: Option<&ResearchRecord>,
) -> u32 {
    let signals = [
        KNOWLEDGE_TERMS.is_match(idea),
        has_product,
        content_type.is_fact_sensitive(),
        research.is_some_and(|r| !r.risks.is_empty()),
    ];
    signals.iter().filter(|hit| **hit).count() as u32
}

pub struct RagPass {
    retrieval: Option<(Arc<dyn Embedder>, Arc<dyn VectorStore>)>,
    config: RagConfig,
}

impl RagPass {
    pub fn new(
        retrieval: Option<(Arc<dyn Embedder>, Arc<dyn VectorStore>)>,
        config: RagConfig,
    ) -> Self {
        Self { retrieval, config }
    }

    fn search_options(&self, ctx: &PassContext) -> SearchOptions {
        let mut filter = BTreeMap::new();
        if let Some(id) = ctx.product.as_ref().and_then(|p| p.id.clone()) {
            filter.insert("productId".to_string(), id);
        }
        SearchOptions {
            limit: self.config.limit,
            score_threshold: self.config.score_threshold,
            filter,
        }
    }

    async fn retrieve(
        &self,
        embedder: &dyn Embedder,
        store: &dyn VectorStore,
        ctx: &PassContext,
        idea: &str,
    ) -> Result<Vec<KnowledgeChunk>> {
        let vector = embedder.embed(idea).await?;
        store
            .search_similar(&vector, &self.search_options(ctx))
            .await
    }
}

fn into_record(chunks: Vec<KnowledgeChunk>) -> RagRecord {
    let rag_context = chunks
        .iter()
        .map(|chunk| format!("[{}]\n{}", chunk.title(), chunk.content.trim()))
        .collect::<Vec<_>>()
        .join("\n\n");

    let sources = chunks
        .into_iter()
        .map(|chunk| RagSource {
            title: chunk.title(),
            content: chunk.content,
            similarity: chunk.score,
        })
        .collect();

    RagRecord {
        rag_context,
        sources,
    }
}

#[async_trait]
impl GenerationPass for RagPass {
    fn name(&self) -> PassName {
        PassName::Rag
    }

    fn skip_reason(&self, ctx: &PassContext, session: &GenerationSession) -> Option<SkipReason> {
        if !self.config.enabled || self.retrieval.is_none() {
            return Some(SkipReason::Unconfigured);
        }
        let Some(idea) = ctx.idea.as_deref() else {
            return Some(SkipReason::NoInput);
        };
        if let Some(reason) = completed_and_unchanged(ctx, session, PassName::Rag) {
            return Some(reason);
        }

        let score = gating_score(
            idea,
            ctx.product.is_some(),
            ctx.content_type,
            session.research_pass.as_ref(),
        );
        let threshold = self.config.trigger_threshold;
        (score < threshold).then_some(SkipReason::BelowThreshold { score, threshold })
    }

    async fn run(
        &self,
        ctx: &PassContext,
        _session: &GenerationSession,
        _events: &EventSink,
    ) -> Result<()> {
        let (Some((embedder, store)), Some(idea)) = (&self.retrieval, ctx.idea.as_deref()) else {
            return Ok(());
        };

        let record = match self.retrieve(embedder.as_ref(), store.as_ref(), ctx, idea).await {
            Ok(chunks) => {
                debug!("Retrieved {} knowledge chunks for {}", chunks.len(), ctx.session_id);
                into_record(chunks)
            }
            Err(e) if e.is_degradable() => {
                warn!("Retrieval failed, continuing without knowledge: {}", e);
                RagRecord::default()
            }
            Err(e) => return Err(e),
        };

        ctx.cache
            .update_session(&ctx.session_id, record.into())
            .await
    }
}
