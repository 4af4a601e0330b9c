//! # CodeWeave Editor
//!
//! Block-structured documents and the machinery that keeps a source file and
//! its rendered view in sync.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ lexer: source text → code/doc segments      │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ editor: Document + Patch + SyncSession      │
//! │  - Build blocks with stable ids             │
//! │  - diff / apply / rebase                    │
//! │  - Order concurrent edits, settle conflicts │
//! └─────────────────────────────────────────────┘
//!          ↓                          ↓
//! ┌──────────────────┐     ┌────────────────────┐
//! │ file (flatten)   │     │ view (rendered)    │
//! └──────────────────┘     └────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **The session's document is canonical**: the file and every view are
//!    projections of it
//! 2. **Block ids are identity**: edits name blocks, never offsets
//! 3. **Lossless**: flattening a document gives back the exact file text
//! 4. **Rebase before reject**: stale patches are carried forward when they can be
//!
//! ## Usage
//!
//! ```rust,ignore
//! use codeweave_editor::{PeerId, SessionId, SyncConfig, SyncSession};
//!
//! let mut session = SyncSession::new(SessionId::new("main.py"), SyncConfig::default());
//! session.open(&text, registry.get("python")?)?;
//! session.subscribe(PeerId::new("view-1"));
//!
//! // A view edited block b2
//! session.submit(PeerId::new("view-1"), patch)?;
//!
//! for event in session.take_events() {
//!     // deliver messages, write the file
//! }
//! ```

mod builder;
mod config;
mod document;
mod errors;
mod patch;
mod protocol;
mod reconciler;
mod session;
mod view;

pub use builder::{build, flatten};
pub use config::{ConflictPolicy, SyncConfig};
pub use document::{Block, BlockKind, Document};
pub use errors::{SessionError, SessionResult};
pub use patch::{Patch, PatchOp, ReconcileError, ReconcileResult};
pub use protocol::{
    DocumentSnapshot, MessageBody, PeerId, PeerMessage, SessionId, SupersedeReason,
};
pub use reconciler::{apply, diff, rebase, Rebased};
pub use session::{PendingAck, SessionEvent, SessionState, SyncSession};
pub use view::RenderedBlock;

// Re-export lexer types that appear in this crate's API
pub use codeweave_lexer::{BlockId, IDGenerator, LanguageProfile};
