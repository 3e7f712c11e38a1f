//! Session cache contract and the in-memory LRU implementation

use super::{GenerationSession, SessionId, SessionPatch};
use crate::error::Result;
use async_trait::async_trait;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::trace;

/// Key-value store of generation sessions
#[async_trait]
pub trait SessionCache: Send + Sync {
    /// Fetch a session if one exists for this id
    async fn get(&self, id: &SessionId) -> Result<Option<GenerationSession>>;

    /// Fetch a session, storing `seed` first if none exists
    async fn get_or_create(
        &self,
        id: &SessionId,
        seed: GenerationSession,
    ) -> Result<GenerationSession>;

    /// Shallow-merge `patch` into the session, creating it if absent
    async fn update_session(&self, id: &SessionId, patch: SessionPatch) -> Result<()>;
}

pub const DEFAULT_CAPACITY: usize = 256;

/// In-process cache; least recently used sessions are evicted past capacity
pub struct InMemorySessionCache {
    sessions: Arc<RwLock<LruCache<SessionId, GenerationSession>>>,
}

impl InMemorySessionCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            sessions: Arc::new(RwLock::new(LruCache::new(capacity))),
        }
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

impl Default for InMemorySessionCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[async_trait]
impl SessionCache for InMemorySessionCache {
    async fn get(&self, id: &SessionId) -> Result<Option<GenerationSession>> {
        // LRU lookups bump recency, so even reads take the write lock
        let mut sessions = self.sessions.write().await;
        Ok(sessions.get(id).cloned())
    }

    async fn get_or_create(
        &self,
        id: &SessionId,
        seed: GenerationSession,
    ) -> Result<GenerationSession> {
        let mut sessions = self.sessions.write().await;
        if let Some(existing) = sessions.get(id) {
            return Ok(existing.clone());
        }

        trace!("Creating session {}", id);
        sessions.put(id.clone(), seed.clone());
        Ok(seed)
    }

    async fn update_session(&self, id: &SessionId, patch: SessionPatch) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        match sessions.get_mut(id) {
            Some(session) => session.apply(patch),
            None => {
                let mut session = GenerationSession::new();
                session.apply(patch);
                sessions.put(id.clone(), session);
            }
        }
        Ok(())
    }
}
