//! On-disk copy of a session's document.

use crate::errors::{WorkspaceError, WorkspaceResult};
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Record of the last write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorWrite {
    pub revision: u64,
    pub bytes: usize,
    pub at: DateTime<Utc>,
}

/// Writes flattened document text back to its file
#[derive(Debug)]
pub struct FileMirror {
    path: PathBuf,
    last_write: Option<MirrorWrite>,
}

impl FileMirror {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            last_write: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn last_write(&self) -> Option<&MirrorWrite> {
        self.last_write.as_ref()
    }

    pub async fn read(&self) -> WorkspaceResult<String> {
        tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| WorkspaceError::io(&self.path, e))
    }

    /// Replace the file contents with `text`.
    ///
    /// Goes through a sibling temp file and a rename so the watcher never
    /// reads a half-written file.
    pub async fn write(&mut self, revision: u64, text: &str) -> WorkspaceResult<()> {
        let temp = self.temp_path();
        tokio::fs::write(&temp, text)
            .await
            .map_err(|e| WorkspaceError::io(&temp, e))?;
        tokio::fs::rename(&temp, &self.path)
            .await
            .map_err(|e| WorkspaceError::io(&self.path, e))?;

        debug!(path = %self.path.display(), revision, bytes = text.len(), "File written");
        self.last_write = Some(MirrorWrite {
            revision,
            bytes: text.len(),
            at: Utc::now(),
        });
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.path.with_file_name(format!(".{}.codeweave-tmp", name))
    }
}
