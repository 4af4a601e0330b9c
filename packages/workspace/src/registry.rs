//! Open sessions, keyed by session id.
//!
//! The registry is the only place that knows which documents are open. It is
//! owned by whoever runs the workspace (the CLI's `serve`, a test) and passed
//! around explicitly.

use crate::actor::{SessionHandle, SessionSpec};
use crate::errors::{WorkspaceError, WorkspaceResult};
use crate::mirror::FileMirror;
use codeweave_editor::{SessionId, SyncConfig};
use codeweave_lexer::{get_document_id, ProfileRegistry};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, instrument};

pub struct SessionRegistry {
    sessions: RwLock<HashMap<SessionId, SessionHandle>>,
    profiles: ProfileRegistry,
    config: SyncConfig,
}

impl SessionRegistry {
    pub fn new(profiles: ProfileRegistry, config: SyncConfig) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            profiles,
            config,
        }
    }

    pub fn profiles(&self) -> &ProfileRegistry {
        &self.profiles
    }

    /// Session id for a file path (stable across runs)
    pub fn session_id_for(path: &Path) -> SessionId {
        SessionId::new(get_document_id(&path.to_string_lossy()))
    }

    /// Open a file-backed session, or return the one already open for `path`
    #[instrument(skip(self), fields(path = %path.display()))]
    pub async fn open_file(&self, path: &Path) -> WorkspaceResult<SessionHandle> {
        let id = Self::session_id_for(path);
        if let Some(handle) = self.get(&id).await {
            return Ok(handle);
        }

        let mirror = FileMirror::new(path);
        let text = mirror.read().await?;
        let profile = self.profiles.detect(Some(path), &text)?;
        info!(session = %id, language = %profile.id, "Opening file");

        let spec = SessionSpec {
            id: id.clone(),
            text,
            profile: Arc::new(profile.clone()),
            config: self.config.clone(),
            mirror: Some(mirror),
        };
        self.start(spec).await
    }

    /// Open an in-memory session for `text` in `language`
    pub async fn open_text(&self, id: SessionId, text: String, language: &str) -> WorkspaceResult<SessionHandle> {
        if let Some(handle) = self.get(&id).await {
            return Ok(handle);
        }

        let profile = self.profiles.get(language)?;
        let spec = SessionSpec {
            id,
            text,
            profile: Arc::new(profile.clone()),
            config: self.config.clone(),
            mirror: None,
        };
        self.start(spec).await
    }

    async fn start(&self, spec: SessionSpec) -> WorkspaceResult<SessionHandle> {
        let id = spec.id.clone();
        let (handle, opened) = SessionHandle::spawn(spec);
        opened
            .await
            .map_err(|_| WorkspaceError::SessionGone(id.clone()))??;

        let mut sessions = self.sessions.write().await;
        // Another caller may have opened the same id meanwhile; keep theirs
        if let Some(existing) = sessions.get(&id) {
            let existing = existing.clone();
            drop(sessions);
            let _ = handle.close().await;
            return Ok(existing);
        }
        sessions.insert(id, handle.clone());
        Ok(handle)
    }

    pub async fn get(&self, id: &SessionId) -> Option<SessionHandle> {
        self.sessions.read().await.get(id).cloned()
    }

    /// Close and forget a session
    pub async fn close(&self, id: &SessionId) -> WorkspaceResult<()> {
        let handle = self
            .sessions
            .write()
            .await
            .remove(id)
            .ok_or_else(|| WorkspaceError::SessionNotFound(id.clone()))?;

        info!(session = %id, "Closing session");
        match handle.close().await {
            // Already stopped on its own
            Ok(()) | Err(WorkspaceError::SessionGone(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Close every session
    pub async fn close_all(&self) {
        let handles: Vec<SessionHandle> = self.sessions.write().await.drain().map(|(_, h)| h).collect();
        for handle in handles {
            let _ = handle.close().await;
        }
    }

    pub async fn ids(&self) -> Vec<SessionId> {
        let mut ids: Vec<SessionId> = self.sessions.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}
