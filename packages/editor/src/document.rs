//! # Document Model
//!
//! A [`Document`] is the canonical, block-structured form of one source file:
//! an ordered list of code and doc blocks plus a revision counter.
//!
//! ## Invariants
//!
//! - Block ids are unique within the document and never reused
//! - Concatenating block contents in order reproduces the file text
//! - Every successful patch increments the revision by exactly one
//!
//! ## Lifecycle
//!
//! ```text
//! text → segment → build → Document ⇄ apply(Patch) → flatten → text
//! ```

use crate::builder;
use codeweave_lexer::{BlockId, DocComment, IDGenerator, LanguageProfile, SegmentResult};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub use codeweave_lexer::SegmentKind as BlockKind;

/// Smallest unit of identity and editing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub id: BlockId,
    pub kind: BlockKind,
    /// Raw source text, delimiters included
    pub content: String,
}

impl Block {
    pub fn new(id: BlockId, kind: BlockKind, content: impl Into<String>) -> Self {
        Self {
            id,
            kind,
            content: content.into(),
        }
    }

    pub fn is_doc(&self) -> bool {
        self.kind == BlockKind::Doc
    }

    /// Structured view of a doc block; `None` for code blocks
    pub fn doc_comment(&self, profile: &LanguageProfile) -> Option<DocComment> {
        if !self.is_doc() {
            return None;
        }
        DocComment::parse(&self.content, profile)
    }
}

/// Canonical document for one session
#[derive(Debug, Clone)]
pub struct Document {
    blocks: Vec<Block>,

    /// Current revision (increments on each applied patch)
    revision: u64,

    profile: Arc<LanguageProfile>,

    /// Source of fresh block ids
    ids: IDGenerator,
}

impl Document {
    /// Segment `text` and build a revision-0 document from it
    pub fn open(text: &str, profile: &LanguageProfile) -> SegmentResult<Self> {
        Self::open_with_ids(text, Arc::new(profile.clone()), IDGenerator::new())
    }

    /// Like [`Document::open`], minting ids from the given generator
    pub fn open_with_ids(
        text: &str,
        profile: Arc<LanguageProfile>,
        ids: IDGenerator,
    ) -> SegmentResult<Self> {
        let segments = codeweave_lexer::segment(text, &profile)?;
        Ok(builder::build(segments, profile, ids))
    }

    pub(crate) fn from_parts(
        blocks: Vec<Block>,
        revision: u64,
        profile: Arc<LanguageProfile>,
        ids: IDGenerator,
    ) -> Self {
        Self {
            blocks,
            revision,
            profile,
            ids,
        }
    }

    /// Successor document after a patch
    pub(crate) fn advance(&self, blocks: Vec<Block>, ids: IDGenerator) -> Self {
        Self::from_parts(blocks, self.revision + 1, self.profile.clone(), ids)
    }

    /// Same blocks, relabelled as `revision`
    pub(crate) fn at_revision(self, revision: u64) -> Self {
        Self { revision, ..self }
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn block(&self, id: &BlockId) -> Option<&Block> {
        self.blocks.iter().find(|b| &b.id == id)
    }

    pub fn position(&self, id: &BlockId) -> Option<usize> {
        crate::patch::position(&self.blocks, id)
    }

    pub fn contains(&self, id: &BlockId) -> bool {
        self.position(id).is_some()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn profile(&self) -> &LanguageProfile {
        &self.profile
    }

    pub(crate) fn profile_arc(&self) -> Arc<LanguageProfile> {
        self.profile.clone()
    }

    pub fn ids(&self) -> &IDGenerator {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// File text for this document
    pub fn flatten(&self) -> String {
        builder::flatten(self)
    }

    /// Same blocks (ids, kinds, contents) in the same order, ignoring revision
    pub fn same_content(&self, other: &Document) -> bool {
        self.blocks == other.blocks
    }
}
