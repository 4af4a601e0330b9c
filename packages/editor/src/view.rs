//! # View Bridge
//!
//! The rendered view shows doc blocks as prose (delimiters stripped) and code
//! blocks verbatim, always with `\n` line endings. Edits come back as a full
//! list of [`RenderedBlock`]s, which are turned into a candidate [`Document`]
//! and diffed against the canonical one.

use crate::document::{Block, BlockKind, Document};
use codeweave_lexer::{eol_convert, find_eol_type, DocComment, EolType, IDGenerator, SegmentResult};
use serde::{Deserialize, Serialize};

/// One block as the view sees it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedBlock {
    pub kind: BlockKind,
    /// Profile id, so the view can pick a highlighter
    pub language: String,
    pub content: String,
}

impl Document {
    /// Project the document for display
    pub fn rendered(&self) -> Vec<RenderedBlock> {
        let language = self.profile().id.clone();
        self.blocks()
            .iter()
            .map(|block| {
                let text = match block.doc_comment(self.profile()) {
                    Some(comment) => comment.contents,
                    None => block.content.clone(),
                };
                RenderedBlock {
                    kind: block.kind,
                    language: language.clone(),
                    content: eol_convert(&text, EolType::Lf),
                }
            })
            .collect()
    }

    /// Rebuild source blocks from edited view blocks.
    ///
    /// Doc blocks reuse the delimiter and indent of the doc block at the same
    /// position, and come back byte-identical when their prose is unchanged.
    /// Line endings follow this document's style.
    ///
    /// The result is re-segmented, so its blocks are exactly what reopening
    /// the flattened text would give: a comment typed into a code block
    /// becomes its own doc block, and neighbouring code blocks merge. It
    /// carries throwaway ids; pass it to [`crate::diff`] against `self`.
    pub fn candidate_from_rendered(&self, rendered: &[RenderedBlock]) -> SegmentResult<Document> {
        let eol = find_eol_type(&self.flatten());

        let text: String = rendered
            .iter()
            .enumerate()
            .map(|(i, view)| {
                let original = self.blocks().get(i).filter(|b| b.kind == view.kind);
                let is_last = i + 1 == rendered.len();
                match view.kind {
                    BlockKind::Code => eol_convert(&terminated(&view.content, is_last), eol),
                    BlockKind::Doc => self.doc_source(original, &view.content, is_last, eol),
                }
            })
            .collect();

        let candidate = Document::open_with_ids(&text, self.profile_arc(), IDGenerator::from_seed("view"))?;
        Ok(candidate.at_revision(self.revision()))
    }

    fn doc_source(&self, original: Option<&Block>, prose: &str, is_last: bool, eol: EolType) -> String {
        let profile = self.profile();
        let existing = original.and_then(|b| b.doc_comment(profile).map(|c| (b, c)));

        if let Some((block, comment)) = &existing {
            if eol_convert(&comment.contents, EolType::Lf) == prose {
                return block.content.clone();
            }
        }

        let (indent, delimiter) = match existing {
            Some((_, comment)) => (comment.indent, comment.delimiter),
            None => (String::new(), default_delimiter(profile)),
        };
        let comment = DocComment {
            indent,
            delimiter,
            contents: terminated(prose, is_last),
        };
        let source = comment
            .to_source(profile)
            .unwrap_or_else(|| comment.contents.clone());
        eol_convert(&source, eol)
    }
}

/// Every block but the last must end its line, or it would merge with the next
fn terminated(text: &str, is_last: bool) -> String {
    if is_last || text.ends_with('\n') {
        text.to_string()
    } else {
        format!("{}\n", text)
    }
}

fn default_delimiter(profile: &codeweave_lexer::LanguageProfile) -> String {
    profile
        .line_comments
        .first()
        .cloned()
        .or_else(|| profile.block_comments.first().map(|bc| bc.opening.clone()))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconciler::{apply, diff};
    use crate::patch::PatchOp;
    use codeweave_lexer::{BlockId, ProfileRegistry};

    fn open(language: &str, text: &str) -> Document {
        let registry = ProfileRegistry::builtin();
        Document::open(text, registry.get(language).unwrap()).unwrap()
    }

    #[test]
    fn test_rendered_strips_delimiters() {
        let doc = open("python", "# Title\n#\n# Body\nx = 1\n");
        let rendered = doc.rendered();

        assert_eq!(rendered.len(), 2);
        assert_eq!(rendered[0].content, "Title\n\nBody\n");
        assert_eq!(rendered[0].language, "python");
        assert_eq!(rendered[1].content, "x = 1\n");
    }

    #[test]
    fn test_unchanged_view_produces_empty_diff() {
        let doc = open("c_cpp", "/* Block\n   doc */\nint x;\n// line\n");
        let candidate = doc.candidate_from_rendered(&doc.rendered()).unwrap();

        assert_eq!(candidate.flatten(), doc.flatten());
        assert!(diff(&doc, &candidate).is_empty());
    }

    #[test]
    fn test_prose_edit_becomes_single_replace() {
        let doc = open("rust", "fn a() {}\n    // Old words\nfn b() {}\n");
        let mut rendered = doc.rendered();
        rendered[1].content = "New words\n".to_string();

        let patch = diff(&doc, &doc.candidate_from_rendered(&rendered).unwrap());
        assert_eq!(patch.ops, vec![PatchOp::ReplaceBlockContent {
            id: BlockId::new("b2"),
            content: "    // New words\n".to_string(),
        }]);
        assert_eq!(
            apply(&doc, &patch).unwrap().flatten(),
            "fn a() {}\n    // New words\nfn b() {}\n"
        );
    }

    #[test]
    fn test_crlf_file_keeps_its_line_endings() {
        let doc = open("python", "# One\r\nx = 1\r\n");
        let mut rendered = doc.rendered();
        assert_eq!(rendered[0].content, "One\n");

        rendered[0].content = "One\nTwo\n".to_string();
        rendered[1].content = "x = 2".to_string();
        let candidate = doc.candidate_from_rendered(&rendered).unwrap();

        assert_eq!(candidate.flatten(), "# One\r\n# Two\r\nx = 2");
    }

    #[test]
    fn test_new_doc_block_uses_default_delimiter() {
        let doc = open("sql", "SELECT 1;\n");
        let mut rendered = doc.rendered();
        rendered.insert(0, RenderedBlock {
            kind: BlockKind::Doc,
            language: "sql".to_string(),
            content: "Query".to_string(),
        });

        let candidate = doc.candidate_from_rendered(&rendered).unwrap();
        assert_eq!(candidate.flatten(), "-- Query\nSELECT 1;\n");
    }

    #[test]
    fn test_comment_typed_into_code_becomes_doc_block() {
        let doc = open("python", "x = 1\n");
        let mut rendered = doc.rendered();
        rendered[0].content = "x = 1\n# note\n".to_string();

        let candidate = doc.candidate_from_rendered(&rendered).unwrap();
        let kinds: Vec<BlockKind> = candidate.blocks().iter().map(|b| b.kind).collect();
        assert_eq!(kinds, vec![BlockKind::Code, BlockKind::Doc]);
        assert_eq!(candidate.blocks()[1].content, "# note\n");
        assert_eq!(candidate.revision(), doc.revision());
    }

    #[test]
    fn test_unterminated_comment_in_view_is_an_error() {
        let doc = open("c_cpp", "int x;\n");
        let mut rendered = doc.rendered();
        rendered[0].content = "int x; /* oops\n".to_string();

        assert!(doc.candidate_from_rendered(&rendered).is_err());
    }
}
