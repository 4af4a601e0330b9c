//! # Edit Reconciler
//!
//! Three pure functions over [`Document`]s and [`Patch`]es:
//!
//! - [`diff`]: minimal op sequence turning one document into another
//! - [`apply`]: atomic, revision-checked application of a patch
//! - [`rebase`]: re-derive a stale patch against a document that has moved on
//!
//! ## Matching
//!
//! `diff` pairs old and new blocks in three passes:
//!
//! 1. **Identity**: same id and kind
//! 2. **Content**: same kind and text, choosing the pairing that keeps the
//!    longest common subsequence of block order; leftovers with equal text
//!    become moves
//! 3. **Gap**: an unpaired new block sitting where an unpaired old block of
//!    the same kind used to be is treated as an edit of that block
//!
//! Everything still unpaired is inserted or deleted. Paired blocks outside the
//! longest increasing run of old positions are moved.

use crate::config::ConflictPolicy;
use crate::document::{Block, BlockKind, Document};
use crate::patch::{position, Patch, PatchOp, ReconcileError, ReconcileResult};
use codeweave_lexer::BlockId;
use std::collections::{HashMap, HashSet, VecDeque};
use tracing::{debug, instrument};

/// Apply `patch` to `document`, producing the next revision.
///
/// All-or-nothing: on error the input document is untouched and no partial
/// result escapes.
#[instrument(skip_all, fields(revision = document.revision(), ops = patch.len()))]
pub fn apply(document: &Document, patch: &Patch) -> ReconcileResult<Document> {
    if patch.base_revision != document.revision() {
        return Err(ReconcileError::RevisionMismatch {
            current: document.revision(),
            base: patch.base_revision,
        });
    }

    let mut blocks = document.blocks().to_vec();
    let mut ids = document.ids().clone();
    for op in &patch.ops {
        op.apply_to(&mut blocks)?;
        if let PatchOp::InsertBlock { block, .. } = op {
            ids.observe(&block.id);
        }
    }

    debug!(blocks = blocks.len(), "Patch applied");
    Ok(document.advance(blocks, ids))
}

/// Compute the patch that turns `old` into `new`.
///
/// Inserted blocks get ids minted from `old`'s generator, so the patch can be
/// applied to `old` without collisions.
#[instrument(skip_all, fields(old = old.len(), new = new.len()))]
pub fn diff(old: &Document, new: &Document) -> Patch {
    let old_blocks = old.blocks();
    let new_blocks = new.blocks();
    let mut matching = Matching::new(old_blocks.len(), new_blocks.len());

    matching.by_identity(old_blocks, new_blocks);
    matching.by_content(old_blocks, new_blocks);
    matching.by_gap(old_blocks, new_blocks);

    let patch = matching.into_patch(old, new_blocks);
    debug!(ops = patch.len(), "Diff computed");
    patch
}

/// Pairing between old and new block indexes
struct Matching {
    old_to_new: Vec<Option<usize>>,
    new_to_old: Vec<Option<usize>>,
}

impl Matching {
    fn new(old_len: usize, new_len: usize) -> Self {
        Self {
            old_to_new: vec![None; old_len],
            new_to_old: vec![None; new_len],
        }
    }

    fn pair(&mut self, old: usize, new: usize) {
        self.old_to_new[old] = Some(new);
        self.new_to_old[new] = Some(old);
    }

    fn free_old(&self) -> Vec<usize> {
        (0..self.old_to_new.len())
            .filter(|&o| self.old_to_new[o].is_none())
            .collect()
    }

    fn free_new(&self) -> Vec<usize> {
        (0..self.new_to_old.len())
            .filter(|&n| self.new_to_old[n].is_none())
            .collect()
    }

    fn by_identity(&mut self, old: &[Block], new: &[Block]) {
        let index: HashMap<&BlockId, usize> =
            old.iter().enumerate().map(|(i, b)| (&b.id, i)).collect();

        for (n, block) in new.iter().enumerate() {
            if let Some(&o) = index.get(&block.id) {
                if old[o].kind == block.kind && self.old_to_new[o].is_none() {
                    self.pair(o, n);
                }
            }
        }
    }

    fn by_content(&mut self, old: &[Block], new: &[Block]) {
        let free_old = self.free_old();
        let free_new = self.free_new();
        if free_old.is_empty() || free_new.is_empty() {
            return;
        }

        let same = |o: usize, n: usize| old[o].kind == new[n].kind && old[o].content == new[n].content;

        // lcs[i][j]: LCS length of free_old[i..] and free_new[j..]
        let (h, w) = (free_old.len(), free_new.len());
        let stride = w + 1;
        let mut lcs = vec![0u32; (h + 1) * stride];
        for i in (0..h).rev() {
            for j in (0..w).rev() {
                lcs[i * stride + j] = if same(free_old[i], free_new[j]) {
                    lcs[(i + 1) * stride + j + 1] + 1
                } else {
                    lcs[(i + 1) * stride + j].max(lcs[i * stride + j + 1])
                };
            }
        }

        let (mut i, mut j) = (0, 0);
        while i < h && j < w {
            if same(free_old[i], free_new[j]) {
                self.pair(free_old[i], free_new[j]);
                i += 1;
                j += 1;
            } else if lcs[(i + 1) * stride + j] >= lcs[i * stride + j + 1] {
                i += 1;
            } else {
                j += 1;
            }
        }

        // Equal text out of order: a move
        let mut by_text: HashMap<(BlockKind, &str), VecDeque<usize>> = HashMap::new();
        for o in self.free_old() {
            by_text
                .entry((old[o].kind, old[o].content.as_str()))
                .or_default()
                .push_back(o);
        }
        for n in self.free_new() {
            let key = (new[n].kind, new[n].content.as_str());
            if let Some(o) = by_text.get_mut(&key).and_then(VecDeque::pop_front) {
                self.pair(o, n);
            }
        }
    }

    fn by_gap(&mut self, old: &[Block], new: &[Block]) {
        let mut floor = 0;
        for n in 0..new.len() {
            if let Some(o) = self.new_to_old[n] {
                floor = o + 1;
                continue;
            }

            let mut o = floor;
            while o < old.len() && self.old_to_new[o].is_none() {
                if old[o].kind == new[n].kind {
                    self.pair(o, n);
                    floor = o + 1;
                    break;
                }
                o += 1;
            }
        }
    }

    fn into_patch(self, old: &Document, new: &[Block]) -> Patch {
        let old_blocks = old.blocks();
        let mut ops = Vec::new();

        for (o, block) in old_blocks.iter().enumerate() {
            if self.old_to_new[o].is_none() {
                ops.push(PatchOp::DeleteBlock { id: block.id.clone() });
            }
        }

        let kept: Vec<(usize, usize)> = self
            .new_to_old
            .iter()
            .enumerate()
            .filter_map(|(n, o)| o.map(|o| (n, o)))
            .collect();
        let stationary = longest_increasing_run(&kept);

        let mut ids = old.ids().clone();
        let mut after: Option<BlockId> = None;
        for (n, block) in new.iter().enumerate() {
            let id = match self.new_to_old[n] {
                None => {
                    let id = ids.new_id();
                    ops.push(PatchOp::InsertBlock {
                        block: Block::new(id.clone(), block.kind, block.content.clone()),
                        after: after.clone(),
                    });
                    id
                }
                Some(o) => {
                    let existing = &old_blocks[o];
                    if !stationary.contains(&n) {
                        ops.push(PatchOp::MoveBlock {
                            id: existing.id.clone(),
                            after: after.clone(),
                        });
                    }
                    if existing.content != block.content {
                        ops.push(PatchOp::ReplaceBlockContent {
                            id: existing.id.clone(),
                            content: block.content.clone(),
                        });
                    }
                    existing.id.clone()
                }
            };
            after = Some(id);
        }

        Patch::new(old.revision(), ops)
    }
}

/// New-side indexes of the longest run of pairs whose old indexes increase
fn longest_increasing_run(pairs: &[(usize, usize)]) -> HashSet<usize> {
    let mut tails: Vec<usize> = Vec::new();
    let mut prev: Vec<Option<usize>> = vec![None; pairs.len()];

    for (i, &(_, o)) in pairs.iter().enumerate() {
        let at = tails.partition_point(|&t| pairs[t].1 < o);
        if at > 0 {
            prev[i] = Some(tails[at - 1]);
        }
        if at == tails.len() {
            tails.push(i);
        } else {
            tails[at] = i;
        }
    }

    let mut run = HashSet::new();
    let mut cursor = tails.last().copied();
    while let Some(i) = cursor {
        run.insert(pairs[i].0);
        cursor = prev[i];
    }
    run
}

/// Outcome of [`rebase`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rebased {
    /// Equivalent patch based on the current revision
    pub patch: Patch,

    /// Blocks whose content both patches changed
    pub conflicts: Vec<BlockId>,
}

impl Rebased {
    pub fn has_conflicts(&self) -> bool {
        !self.conflicts.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Touch {
    Replaced,
    Deleted,
}

/// Re-derive `later` against `current`, where `current` is `before` with
/// `earlier` applied and both patches were based on `before`.
///
/// Block ids are stable across the rebase, so most ops carry over as-is:
///
/// - Inserted ids that collide with the earlier patch's are re-minted
/// - Anchors that the earlier patch deleted fall back to the nearest
///   surviving predecessor
/// - Ops on blocks the earlier patch deleted are dropped, except a content
///   replace under [`ConflictPolicy::LaterWins`], which restores the block
/// - Two content changes to the same block are a conflict settled by `policy`
#[instrument(skip_all, fields(base = before.revision(), current = current.revision()))]
pub fn rebase(
    later: &Patch,
    earlier: &Patch,
    before: &Document,
    current: &Document,
    policy: ConflictPolicy,
) -> ReconcileResult<Rebased> {
    for base in [later.base_revision, earlier.base_revision] {
        if base != before.revision() {
            return Err(ReconcileError::RevisionMismatch {
                current: before.revision(),
                base,
            });
        }
    }
    if current.revision() != before.revision() + 1 {
        return Err(ReconcileError::RevisionMismatch {
            current: current.revision(),
            base: before.revision() + 1,
        });
    }

    let mut touched: HashMap<&BlockId, (Touch, Option<&str>)> = HashMap::new();
    for op in &earlier.ops {
        match op {
            PatchOp::ReplaceBlockContent { id, content } => {
                touched.insert(id, (Touch::Replaced, Some(content.as_str())));
            }
            PatchOp::DeleteBlock { id } => {
                touched.insert(id, (Touch::Deleted, None));
            }
            _ => {}
        }
    }

    let mut rebaser = Rebaser {
        before,
        working: current.blocks().to_vec(),
        ids: current.ids().clone(),
        renamed: HashMap::new(),
    };
    let mut ops = Vec::new();
    let mut conflicts = Vec::new();

    for op in &later.ops {
        let carried = match op {
            PatchOp::InsertBlock { block, after } => {
                let mut block = block.clone();
                if rebaser.contains(&block.id) {
                    let fresh = rebaser.ids.new_id();
                    rebaser.renamed.insert(block.id.clone(), fresh.clone());
                    block.id = fresh;
                } else {
                    rebaser.ids.observe(&block.id);
                }
                let after = rebaser.anchor(after.as_ref());
                Some(PatchOp::InsertBlock { block, after })
            }

            PatchOp::DeleteBlock { id } => {
                let id = rebaser.resolve(id);
                match (rebaser.contains(&id), touched.get(&id)) {
                    (true, Some((Touch::Replaced, _))) => {
                        conflicts.push(id.clone());
                        match policy {
                            ConflictPolicy::LaterWins => Some(PatchOp::DeleteBlock { id }),
                            ConflictPolicy::EarlierWins => None,
                        }
                    }
                    (true, _) => Some(PatchOp::DeleteBlock { id }),
                    (false, Some((Touch::Deleted, _))) => None,
                    (false, _) => return Err(ReconcileError::UnknownBlockId(id)),
                }
            }

            PatchOp::ReplaceBlockContent { id, content } => {
                let id = rebaser.resolve(id);
                match (rebaser.contains(&id), touched.get(&id)) {
                    (true, Some((Touch::Replaced, Some(theirs)))) if *theirs != content.as_str() => {
                        conflicts.push(id.clone());
                        match policy {
                            ConflictPolicy::LaterWins => Some(PatchOp::ReplaceBlockContent {
                                id,
                                content: content.clone(),
                            }),
                            ConflictPolicy::EarlierWins => None,
                        }
                    }
                    (true, _) => Some(PatchOp::ReplaceBlockContent {
                        id,
                        content: content.clone(),
                    }),
                    (false, Some((Touch::Deleted, _))) => {
                        conflicts.push(id.clone());
                        match policy {
                            ConflictPolicy::LaterWins => Some(rebaser.restore(&id, content)?),
                            ConflictPolicy::EarlierWins => None,
                        }
                    }
                    (false, _) => return Err(ReconcileError::UnknownBlockId(id)),
                }
            }

            PatchOp::MoveBlock { id, after } => {
                let id = rebaser.resolve(id);
                match (rebaser.contains(&id), touched.get(&id)) {
                    (true, _) => {
                        let after = rebaser.anchor(after.as_ref()).filter(|a| a != &id);
                        Some(PatchOp::MoveBlock { id, after })
                    }
                    (false, Some((Touch::Deleted, _))) => None,
                    (false, _) => return Err(ReconcileError::UnknownBlockId(id)),
                }
            }
        };

        if let Some(op) = carried {
            op.apply_to(&mut rebaser.working)?;
            ops.push(op);
        }
    }

    debug!(
        ops = ops.len(),
        conflicts = conflicts.len(),
        "Patch rebased"
    );

    Ok(Rebased {
        patch: Patch::new(current.revision(), ops),
        conflicts,
    })
}

/// Working state while carrying ops across
struct Rebaser<'a> {
    before: &'a Document,
    working: Vec<Block>,
    ids: codeweave_lexer::IDGenerator,
    /// Inserted ids that had to be re-minted
    renamed: HashMap<BlockId, BlockId>,
}

impl Rebaser<'_> {
    fn contains(&self, id: &BlockId) -> bool {
        position(&self.working, id).is_some()
    }

    fn resolve(&self, id: &BlockId) -> BlockId {
        self.renamed.get(id).cloned().unwrap_or_else(|| id.clone())
    }

    /// Anchor still present, or the nearest predecessor in the base order that is
    fn anchor(&self, after: Option<&BlockId>) -> Option<BlockId> {
        let anchor = self.resolve(after?);
        if self.contains(&anchor) {
            return Some(anchor);
        }
        self.surviving_predecessor(&anchor)
    }

    fn surviving_predecessor(&self, id: &BlockId) -> Option<BlockId> {
        let at = self.before.position(id)?;
        self.before.blocks()[..at]
            .iter()
            .rev()
            .find(|b| self.contains(&b.id))
            .map(|b| b.id.clone())
    }

    /// Re-insert a block the earlier patch deleted, carrying the later content
    fn restore(&self, id: &BlockId, content: &str) -> ReconcileResult<PatchOp> {
        let original = self
            .before
            .block(id)
            .ok_or_else(|| ReconcileError::UnknownBlockId(id.clone()))?;
        Ok(PatchOp::InsertBlock {
            block: Block::new(id.clone(), original.kind, content),
            after: self.surviving_predecessor(id),
        })
    }
}
