//! diff/apply on generated documents.

use codeweave_editor::{apply, diff, BlockKind, Document};
use codeweave_lexer::ProfileRegistry;
use proptest::prelude::*;
use std::collections::HashSet;

const PYTHON_LINES: &[&str] = &[
    "# doc\n",
    "# more words\n",
    "    # indented\n",
    "x = 1\n",
    "y = '# not doc'\n",
    "\n",
    "def f():\n",
    "    pass\n",
];

const C_LINES: &[&str] = &[
    "// doc\n",
    "/* block */\n",
    "/* two\n   lines */\n",
    "int x;\n",
    "s = \"// str\";\n",
    "\n",
    "  // indented\n",
    "int y; // trailing\n",
];

fn arb_lines(pool: &'static [&'static str]) -> impl Strategy<Value = String> {
    prop::collection::vec(prop::sample::select(pool), 0..12).prop_map(|lines| lines.concat())
}

/// A language with two sources in it
fn arb_edit() -> impl Strategy<Value = (&'static str, String, String)> {
    prop_oneof![
        (Just("python"), arb_lines(PYTHON_LINES), arb_lines(PYTHON_LINES)),
        (Just("c_cpp"), arb_lines(C_LINES), arb_lines(C_LINES)),
    ]
}

fn shape(document: &Document) -> Vec<(BlockKind, String)> {
    document.blocks().iter().map(|b| (b.kind, b.content.clone())).collect()
}

proptest! {
    #[test]
    fn diff_then_apply_reaches_the_target((language, old, new) in arb_edit()) {
        let registry = ProfileRegistry::builtin();
        let profile = registry.get(language).unwrap();
        let old_doc = Document::open(&old, profile).unwrap();
        let new_doc = Document::open(&new, profile).unwrap();

        let patch = diff(&old_doc, &new_doc);
        prop_assert_eq!(patch.base_revision, old_doc.revision());

        let next = apply(&old_doc, &patch).unwrap();
        prop_assert_eq!(next.flatten(), new);
        prop_assert_eq!(shape(&next), shape(&new_doc));
        prop_assert_eq!(next.revision(), old_doc.revision() + 1);

        let ids: HashSet<_> = next.blocks().iter().map(|b| b.id.clone()).collect();
        prop_assert_eq!(ids.len(), next.len());
    }

    #[test]
    fn self_diff_is_empty((language, text, _) in arb_edit()) {
        let registry = ProfileRegistry::builtin();
        let doc = Document::open(&text, registry.get(language).unwrap()).unwrap();

        let patch = diff(&doc, &doc);
        prop_assert!(patch.is_empty());

        let next = apply(&doc, &patch).unwrap();
        prop_assert!(next.same_content(&doc));
        prop_assert_eq!(next.revision(), doc.revision() + 1);
    }

    #[test]
    fn surviving_ids_keep_their_kind((language, old, new) in arb_edit()) {
        let registry = ProfileRegistry::builtin();
        let profile = registry.get(language).unwrap();
        let old_doc = Document::open(&old, profile).unwrap();
        let new_doc = Document::open(&new, profile).unwrap();

        let next = apply(&old_doc, &diff(&old_doc, &new_doc)).unwrap();
        // Code never turns into doc (or back) under the same id
        for block in next.blocks() {
            if let Some(original) = old_doc.block(&block.id) {
                prop_assert_eq!(original.kind, block.kind);
            }
        }
    }
}
