//! File-backed session cache so sessions survive across process runs

use super::{GenerationSession, SessionCache, SessionId, SessionPatch};
use crate::error::{PipelineError, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::debug;

/// One JSON file per session under `base_path`
pub struct FileSessionCache {
    base_path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileSessionCache {
    /// Create new file cache
    pub fn new(base_path: PathBuf) -> Self {
        Self {
            base_path,
            write_lock: Mutex::new(()),
        }
    }

    /// Get path for a session
    fn session_path(&self, id: &SessionId) -> Result<PathBuf> {
        if !id.is_path_safe() {
            return Err(PipelineError::Session(format!(
                "Session id '{id}' contains characters not allowed in a file name"
            )));
        }
        Ok(self.base_path.join(format!("{id}.json")))
    }

    async fn load(&self, id: &SessionId) -> Result<Option<GenerationSession>> {
        let path = self.session_path(id)?;
        if !fs::try_exists(&path).await? {
            return Ok(None);
        }

        let json = fs::read_to_string(&path).await?;
        let session = serde_json::from_str(&json)?;
        Ok(Some(session))
    }

    /// Write through a temp file so readers never observe a partial session
    async fn save(&self, id: &SessionId, session: &GenerationSession) -> Result<()> {
        fs::create_dir_all(&self.base_path).await?;

        let path = self.session_path(id)?;
        let tmp_path = self.base_path.join(format!(".{id}.json.tmp"));
        let json = serde_json::to_string_pretty(session)?;
        fs::write(&tmp_path, json).await?;
        fs::rename(&tmp_path, &path).await?;

        debug!("Saved session {} to {}", id, path.display());
        Ok(())
    }
}

#[async_trait]
impl SessionCache for FileSessionCache {
    async fn get(&self, id: &SessionId) -> Result<Option<GenerationSession>> {
        self.load(id).await
    }

    async fn get_or_create(
        &self,
        id: &SessionId,
        seed: GenerationSession,
    ) -> Result<GenerationSession> {
        let _guard = self.write_lock.lock().await;
        if let Some(existing) = self.load(id).await? {
            return Ok(existing);
        }
        self.save(id, &seed).await?;
        Ok(seed)
    }

    async fn update_session(&self, id: &SessionId, patch: SessionPatch) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut session = self.load(id).await?.unwrap_or_default();
        session.apply(patch);
        self.save(id, &session).await
    }
}
