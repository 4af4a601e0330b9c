//! # CodeWeave Workspace
//!
//! Runtime around [`codeweave_editor::SyncSession`]: a registry of open
//! sessions, one tokio task per session, and the file-system side (watcher
//! and write-through mirror).
//!
//! ```text
//! view peers ──mpsc──► SessionHandle ──► session task ──► FileMirror ──► disk
//!      ▲                     ▲                │                          │
//!      └──── outboxes ◄──────┼────────────────┘                          │
//!                            └──────────── FileWatcher ◄─────────────────┘
//! ```

pub mod actor;
pub mod errors;
pub mod mirror;
pub mod registry;
pub mod watcher;

pub use actor::{SessionHandle, SessionSpec};
pub use errors::{WorkspaceError, WorkspaceResult};
pub use mirror::{FileMirror, MirrorWrite};
pub use registry::SessionRegistry;
pub use watcher::{FileWatcher, WatchConfig, WatchEvent, WatcherError, WatcherResult};
