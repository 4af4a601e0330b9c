//! # CodeWeave Lexer
//!
//! Turns source text into an ordered sequence of code and documentation
//! segments, driven entirely by per-language data records.
//!
//! ```rust,ignore
//! use codeweave_lexer::{segment, ProfileRegistry};
//!
//! let registry = ProfileRegistry::builtin();
//! let profile = registry.get("python")?;
//! let segments = segment("# Title\nx = 1\n", profile)?;
//! assert_eq!(segments.len(), 2);
//! ```

pub mod doc_comment;
pub mod eol;
pub mod error;
pub mod id_generator;
pub mod profile;
pub mod registry;
pub mod segmenter;
pub mod supported_languages;

pub use doc_comment::DocComment;
pub use eol::{eol_convert, find_eol_type, EolType};
pub use error::{SegmentError, SegmentResult};
pub use id_generator::{get_document_id, BlockId, IDGenerator};
pub use profile::{BlockCommentDelim, HeredocDelim, LanguageProfile, StringDelim};
pub use registry::ProfileRegistry;
pub use segmenter::{segment, Segment, SegmentKind};

#[cfg(feature = "pretty-errors")]
pub use error::format_error;
