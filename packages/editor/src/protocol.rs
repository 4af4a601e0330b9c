//! Messages exchanged between a session and its peers.
//!
//! On the wire every message is a JSON object:
//!
//! ```text
//! { "sessionId": "…", "type": "patch" | "ack" | "superseded" | "fullDocument",
//!   "payload": { … } }
//! ```

use crate::document::{Block, Document};
use crate::patch::{Patch, ReconcileError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Session identity
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A participant in a session: a view client, the file mirror, or the local editor
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeerId(String);

impl PeerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The on-disk file
    pub fn file_system() -> Self {
        Self::new("fs")
    }

    /// Edits made through the session's own API
    pub fn local() -> Self {
        Self::new("local")
    }

    pub fn is_file_system(&self) -> bool {
        self.0 == "fs"
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Why a peer's edit did not stand
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SupersedeReason {
    /// Another peer's edit to the same block won
    Conflict,
    /// The edit was based on a revision the session can no longer rebase from
    RevisionMismatch,
    /// The edit referenced a block that does not exist
    UnknownBlock,
    /// No acknowledgement arrived in time
    PeerTimeout,
}

impl From<&ReconcileError> for SupersedeReason {
    fn from(error: &ReconcileError) -> Self {
        match error {
            ReconcileError::RevisionMismatch { .. } => SupersedeReason::RevisionMismatch,
            ReconcileError::UnknownBlockId(_) | ReconcileError::DuplicateBlockId(_) => {
                SupersedeReason::UnknownBlock
            }
        }
    }
}

/// Complete state for a peer that has to start over
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSnapshot {
    pub revision: u64,
    pub language: String,
    pub text: String,
    pub blocks: Vec<Block>,
}

impl From<&Document> for DocumentSnapshot {
    fn from(document: &Document) -> Self {
        Self {
            revision: document.revision(),
            language: document.profile().id.clone(),
            text: document.flatten(),
            blocks: document.blocks().to_vec(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum MessageBody {
    Patch(Patch),
    Ack { revision: u64 },
    Superseded { revision: u64, reason: SupersedeReason },
    /// From the session: full state. From a peer: a request for it.
    FullDocument(Option<DocumentSnapshot>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeerMessage {
    pub session_id: SessionId,
    #[serde(flatten)]
    pub body: MessageBody,
}

impl PeerMessage {
    pub fn new(session_id: SessionId, body: MessageBody) -> Self {
        Self { session_id, body }
    }

    pub fn patch(session_id: SessionId, patch: Patch) -> Self {
        Self::new(session_id, MessageBody::Patch(patch))
    }

    pub fn ack(session_id: SessionId, revision: u64) -> Self {
        Self::new(session_id, MessageBody::Ack { revision })
    }

    pub fn superseded(session_id: SessionId, revision: u64, reason: SupersedeReason) -> Self {
        Self::new(session_id, MessageBody::Superseded { revision, reason })
    }

    pub fn full_document(session_id: SessionId, document: &Document) -> Self {
        Self::new(session_id, MessageBody::FullDocument(Some(document.into())))
    }

    /// A peer asking for the current state
    pub fn resync_request(session_id: SessionId) -> Self {
        Self::new(session_id, MessageBody::FullDocument(None))
    }

    /// Get a debug name for this message
    pub fn kind(&self) -> &'static str {
        match self.body {
            MessageBody::Patch(_) => "patch",
            MessageBody::Ack { .. } => "ack",
            MessageBody::Superseded { .. } => "superseded",
            MessageBody::FullDocument(_) => "fullDocument",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patch::PatchOp;
    use codeweave_lexer::BlockId;

    #[test]
    fn test_wire_format() {
        let message = PeerMessage::patch(
            SessionId::new("s1"),
            Patch::new(0, vec![PatchOp::DeleteBlock { id: BlockId::new("b1") }]),
        );
        let json = serde_json::to_value(&message).unwrap();

        assert_eq!(json["sessionId"], "s1");
        assert_eq!(json["type"], "patch");
        assert_eq!(json["payload"]["baseRevision"], 0);
        assert_eq!(json["payload"]["ops"][0]["op"], "deleteBlock");
    }

    #[test]
    fn test_parse_superseded() {
        let json = r#"{"sessionId":"s1","type":"superseded","payload":{"revision":4,"reason":"peerTimeout"}}"#;
        let message: PeerMessage = serde_json::from_str(json).unwrap();

        assert_eq!(message.kind(), "superseded");
        assert_eq!(
            message.body,
            MessageBody::Superseded {
                revision: 4,
                reason: SupersedeReason::PeerTimeout
            }
        );
    }

    #[test]
    fn test_resync_request_has_null_payload() {
        let json = serde_json::to_value(PeerMessage::resync_request(SessionId::new("s1"))).unwrap();
        assert_eq!(json["type"], "fullDocument");
        assert!(json["payload"].is_null());
    }
}
