//! # Block Patches
//!
//! A [`Patch`] is an ordered list of block-level operations scoped to one
//! document revision.
//!
//! ## Operation semantics
//!
//! ### InsertBlock / MoveBlock
//! - Position is an anchor: `after: None` puts the block first, `after:
//!   Some(id)` directly after block `id`
//! - Anchors survive rebases because they name blocks, not indexes
//!
//! ### ReplaceBlockContent
//! - Atomic replacement of the block's text (not a character diff)
//! - The block keeps its id and kind
//!
//! ### DeleteBlock
//! - Removes the block; its id is never handed out again

use crate::document::Block;
use codeweave_lexer::BlockId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Revision-scoped, ordered set of block operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Patch {
    pub base_revision: u64,
    pub ops: Vec<PatchOp>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum PatchOp {
    InsertBlock {
        block: Block,
        after: Option<BlockId>,
    },

    DeleteBlock {
        id: BlockId,
    },

    ReplaceBlockContent {
        id: BlockId,
        content: String,
    },

    MoveBlock {
        id: BlockId,
        after: Option<BlockId>,
    },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReconcileError {
    #[error("Revision mismatch: document is at {current}, patch is based on {base}")]
    RevisionMismatch { current: u64, base: u64 },

    #[error("Unknown block id: {0}")]
    UnknownBlockId(BlockId),

    #[error("Block id already in use: {0}")]
    DuplicateBlockId(BlockId),
}

pub type ReconcileResult<T> = Result<T, ReconcileError>;

impl Patch {
    pub fn new(base_revision: u64, ops: Vec<PatchOp>) -> Self {
        Self { base_revision, ops }
    }

    /// Patch with no operations
    pub fn noop(base_revision: u64) -> Self {
        Self::new(base_revision, Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }
}

impl PatchOp {
    /// The block this operation acts on
    pub fn block_id(&self) -> &BlockId {
        match self {
            PatchOp::InsertBlock { block, .. } => &block.id,
            PatchOp::DeleteBlock { id } => id,
            PatchOp::ReplaceBlockContent { id, .. } => id,
            PatchOp::MoveBlock { id, .. } => id,
        }
    }

    /// Get a debug name for this operation
    pub fn name(&self) -> &'static str {
        match self {
            PatchOp::InsertBlock { .. } => "insertBlock",
            PatchOp::DeleteBlock { .. } => "deleteBlock",
            PatchOp::ReplaceBlockContent { .. } => "replaceBlockContent",
            PatchOp::MoveBlock { .. } => "moveBlock",
        }
    }

    /// Apply this operation to a block list in place
    pub(crate) fn apply_to(&self, blocks: &mut Vec<Block>) -> ReconcileResult<()> {
        match self {
            PatchOp::InsertBlock { block, after } => Self::apply_insert(blocks, block, after.as_ref()),
            PatchOp::DeleteBlock { id } => Self::apply_delete(blocks, id),
            PatchOp::ReplaceBlockContent { id, content } => Self::apply_replace(blocks, id, content),
            PatchOp::MoveBlock { id, after } => Self::apply_move(blocks, id, after.as_ref()),
        }
    }

    fn apply_insert(blocks: &mut Vec<Block>, block: &Block, after: Option<&BlockId>) -> ReconcileResult<()> {
        if position(blocks, &block.id).is_some() {
            return Err(ReconcileError::DuplicateBlockId(block.id.clone()));
        }
        let index = anchor_index(blocks, after)?;
        blocks.insert(index, block.clone());
        Ok(())
    }

    fn apply_delete(blocks: &mut Vec<Block>, id: &BlockId) -> ReconcileResult<()> {
        let index = position(blocks, id).ok_or_else(|| ReconcileError::UnknownBlockId(id.clone()))?;
        blocks.remove(index);
        Ok(())
    }

    fn apply_replace(blocks: &mut [Block], id: &BlockId, content: &str) -> ReconcileResult<()> {
        let block = blocks
            .iter_mut()
            .find(|b| &b.id == id)
            .ok_or_else(|| ReconcileError::UnknownBlockId(id.clone()))?;
        block.content = content.to_string();
        Ok(())
    }

    fn apply_move(blocks: &mut Vec<Block>, id: &BlockId, after: Option<&BlockId>) -> ReconcileResult<()> {
        let from = position(blocks, id).ok_or_else(|| ReconcileError::UnknownBlockId(id.clone()))?;
        let block = blocks.remove(from);
        // Moving a block after itself leaves its anchor missing
        match anchor_index(blocks, after) {
            Ok(to) => {
                blocks.insert(to, block);
                Ok(())
            }
            Err(e) => {
                blocks.insert(from, block);
                Err(e)
            }
        }
    }
}

pub(crate) fn position(blocks: &[Block], id: &BlockId) -> Option<usize> {
    blocks.iter().position(|b| &b.id == id)
}

/// Index at which a block anchored `after` should be inserted
fn anchor_index(blocks: &[Block], after: Option<&BlockId>) -> ReconcileResult<usize> {
    match after {
        None => Ok(0),
        Some(anchor) => position(blocks, anchor)
            .map(|i| i + 1)
            .ok_or_else(|| ReconcileError::UnknownBlockId(anchor.clone())),
    }
}
