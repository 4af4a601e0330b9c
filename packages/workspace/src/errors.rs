//! Error types for the workspace runtime

use codeweave_editor::{SessionError, SessionId};
use codeweave_lexer::SegmentError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WorkspaceError {
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Segmentation failed: {0}")]
    Segment(#[from] SegmentError),

    #[error("Watcher error: {0}")]
    Watcher(#[from] crate::watcher::WatcherError),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Session not found: {0}")]
    SessionNotFound(SessionId),

    #[error("Session {0} has shut down")]
    SessionGone(SessionId),
}

impl WorkspaceError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type WorkspaceResult<T> = Result<T, WorkspaceError>;
