//! Error types for the editor

use crate::session::SessionState;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Segmentation failed: {0}")]
    Segment(#[from] codeweave_lexer::SegmentError),

    #[error("Reconcile error: {0}")]
    Reconcile(#[from] crate::patch::ReconcileError),

    #[error("No document is open")]
    NotOpen,

    #[error("Session is closed")]
    Closed,

    #[error("Operation not allowed while {0:?}")]
    InvalidState(SessionState),
}

pub type SessionResult<T> = Result<T, SessionError>;

impl SessionError {
    /// Whether the caller can recover by re-syncing
    pub fn is_recoverable(&self) -> bool {
        matches!(self, SessionError::Reconcile(_) | SessionError::InvalidState(_))
    }
}
