//! Segments → blocks and back.

use crate::document::{Block, Document};
use codeweave_lexer::{IDGenerator, LanguageProfile, Segment};
use std::sync::Arc;

/// Turn segments into a revision-0 document, one block per segment.
///
/// Ids come from `ids` in segment order, so building the same text twice with
/// fresh generators gives the same ids.
pub fn build(segments: Vec<Segment>, profile: Arc<LanguageProfile>, mut ids: IDGenerator) -> Document {
    let blocks = segments
        .into_iter()
        .map(|segment| Block::new(ids.new_id(), segment.kind, segment.text))
        .collect();

    Document::from_parts(blocks, 0, profile, ids)
}

/// Concatenate block contents in order
pub fn flatten(document: &Document) -> String {
    let mut out = String::with_capacity(document.blocks().iter().map(|b| b.content.len()).sum());
    for block in document.blocks() {
        out.push_str(&block.content);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::BlockKind;
    use codeweave_lexer::{segment, ProfileRegistry};

    #[test]
    fn test_build_then_flatten_is_identity() {
        let registry = ProfileRegistry::builtin();
        let profile = registry.get("rust").unwrap();
        let text = "/// Adds\nfn add() {}\n/* note */\nconst X: u8 = 1;\n";

        let segments = segment(text, profile).unwrap();
        let doc = build(segments, Arc::new(profile.clone()), IDGenerator::new());

        assert_eq!(flatten(&doc), text);
        let kinds: Vec<BlockKind> = doc.blocks().iter().map(|b| b.kind).collect();
        assert_eq!(
            kinds,
            vec![BlockKind::Doc, BlockKind::Code, BlockKind::Doc, BlockKind::Code]
        );
    }

    #[test]
    fn test_seeded_ids() {
        let registry = ProfileRegistry::builtin();
        let profile = registry.get("python").unwrap();
        let segments = segment("# a\nx\n", profile).unwrap();

        let doc = build(segments, Arc::new(profile.clone()), IDGenerator::from_seed("view"));
        assert_eq!(doc.blocks()[0].id.as_str(), "view-b1");
        assert_eq!(doc.ids().count(), 2);
    }
}
