//! Per-language lexing data.
//!
//! A [`LanguageProfile`] is a plain record: which comment delimiters the
//! language has and how its string literals look. The segmenter never
//! dispatches on the language itself, only on this data, so new languages can
//! be registered from configuration without code changes.

use crate::error::{SegmentError, SegmentResult};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Opening/closing pair for a block comment (`/*` ... `*/`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockCommentDelim {
    pub opening: String,
    pub closing: String,
}

/// Recognizer for one kind of string literal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StringDelim {
    /// Opening delimiter, e.g. `"` or `r#"`
    pub delimiter: String,

    /// Closing delimiter when it differs from the opening one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closing: Option<String>,

    /// Escape character; `None` for raw strings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub escape: Option<char>,

    /// Whether an unescaped newline continues the string
    #[serde(default)]
    pub multiline: bool,

    /// `${ ... }` inside the string holds code (JavaScript template literals)
    #[serde(default)]
    pub template: bool,
}

impl StringDelim {
    /// Single-line string with `\` escapes
    pub fn escaped(delimiter: &str) -> Self {
        Self {
            delimiter: delimiter.to_string(),
            closing: None,
            escape: Some('\\'),
            multiline: false,
            template: false,
        }
    }

    /// String that may span lines, with `\` escapes
    pub fn multiline(delimiter: &str) -> Self {
        Self {
            multiline: true,
            ..Self::escaped(delimiter)
        }
    }

    /// Raw string: no escapes, may span lines
    pub fn raw(opening: &str, closing: &str) -> Self {
        Self {
            delimiter: opening.to_string(),
            closing: Some(closing.to_string()),
            escape: None,
            multiline: true,
            template: false,
        }
    }

    /// Multi-line string with `\` escapes and `${ ... }` interpolations
    pub fn template(delimiter: &str) -> Self {
        Self {
            template: true,
            ..Self::multiline(delimiter)
        }
    }

    /// Single-line string without escapes (e.g. YAML/TOML literal strings)
    pub fn literal(delimiter: &str) -> Self {
        Self {
            escape: None,
            ..Self::escaped(delimiter)
        }
    }

    pub fn closing(&self) -> &str {
        self.closing.as_deref().unwrap_or(&self.delimiter)
    }
}

/// String literal whose terminator is chosen by the writer, like C++'s
/// `R"tag( ... )tag"`: `start_prefix`, an identifier matching
/// `ident_pattern`, then `start_suffix` opens it; `stop_prefix`, the same
/// identifier and `stop_suffix` close it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeredocDelim {
    pub start_prefix: String,
    /// Regex for the identifier, without anchors
    pub ident_pattern: String,
    pub start_suffix: String,
    pub stop_prefix: String,
    #[serde(default)]
    pub stop_suffix: String,
}

impl HeredocDelim {
    /// Anchored regex matching the opener, identifier in group 1
    pub(crate) fn opener(&self) -> Result<Regex, regex::Error> {
        Regex::new(&format!(
            "^{}({}){}",
            regex::escape(&self.start_prefix),
            self.ident_pattern,
            regex::escape(&self.start_suffix)
        ))
    }

    pub(crate) fn terminator(&self, ident: &str) -> String {
        format!("{}{}{}", self.stop_prefix, ident, self.stop_suffix)
    }
}

/// Comment and string syntax for one source language
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LanguageProfile {
    /// Identifier used for lookups and in-file lexer directives
    pub id: String,

    /// File extensions, including the leading dot
    #[serde(default)]
    pub extensions: Vec<String>,

    #[serde(default)]
    pub line_comments: Vec<String>,

    #[serde(default)]
    pub block_comments: Vec<BlockCommentDelim>,

    #[serde(default)]
    pub strings: Vec<StringDelim>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub heredocs: Vec<HeredocDelim>,

    /// Marker that continues a line comment onto the next line (C's `\`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_continuation: Option<String>,
}

impl LanguageProfile {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            extensions: Vec::new(),
            line_comments: Vec::new(),
            block_comments: Vec::new(),
            strings: Vec::new(),
            heredocs: Vec::new(),
            line_continuation: None,
        }
    }

    pub fn with_extensions(mut self, extensions: &[&str]) -> Self {
        self.extensions = extensions.iter().map(|e| e.to_string()).collect();
        self
    }

    pub fn with_line_comments(mut self, delimiters: &[&str]) -> Self {
        self.line_comments = delimiters.iter().map(|d| d.to_string()).collect();
        self
    }

    pub fn with_block_comment(mut self, opening: &str, closing: &str) -> Self {
        self.block_comments.push(BlockCommentDelim {
            opening: opening.to_string(),
            closing: closing.to_string(),
        });
        self
    }

    pub fn with_string(mut self, string: StringDelim) -> Self {
        self.strings.push(string);
        self
    }

    pub fn with_heredoc(mut self, heredoc: HeredocDelim) -> Self {
        self.heredocs.push(heredoc);
        self
    }

    pub fn with_line_continuation(mut self, marker: &str) -> Self {
        self.line_continuation = Some(marker.to_string());
        self
    }

    /// A profile is usable only if it can tell strings apart from comments.
    pub fn validate(&self) -> SegmentResult<()> {
        if self.strings.is_empty() {
            return Err(SegmentError::unsupported(format!(
                "{} (no string-literal recognizer configured)",
                self.id
            )));
        }
        if self.line_comments.is_empty() && self.block_comments.is_empty() {
            return Err(SegmentError::unsupported(format!(
                "{} (no comment delimiters configured)",
                self.id
            )));
        }
        let has_empty_delimiter = self.line_comments.iter().any(String::is_empty)
            || self
                .block_comments
                .iter()
                .any(|bc| bc.opening.is_empty() || bc.closing.is_empty())
            || self
                .strings
                .iter()
                .any(|s| s.delimiter.is_empty() || s.closing().is_empty());
        if has_empty_delimiter {
            return Err(SegmentError::unsupported(format!(
                "{} (empty delimiter)",
                self.id
            )));
        }
        for heredoc in &self.heredocs {
            if heredoc.start_prefix.is_empty() || heredoc.opener().is_err() {
                return Err(SegmentError::unsupported(format!(
                    "{} (invalid heredoc delimiter)",
                    self.id
                )));
            }
        }
        Ok(())
    }

    pub fn is_line_comment(&self, delimiter: &str) -> bool {
        self.line_comments.iter().any(|d| d == delimiter)
    }

    /// Closing delimiter matching a block-comment opener
    pub fn closing_for(&self, opening: &str) -> Option<&str> {
        self.block_comments
            .iter()
            .find(|bc| bc.opening == opening)
            .map(|bc| bc.closing.as_str())
    }

    pub fn matches_extension(&self, ext: &str) -> bool {
        let ext = ext.trim_start_matches('.');
        self.extensions
            .iter()
            .any(|e| e.trim_start_matches('.').eq_ignore_ascii_case(ext))
    }

    /// Line-comment delimiters, longest first so `///` wins over `//`
    pub(crate) fn line_comments_longest_first(&self) -> Vec<&str> {
        let mut delims: Vec<&str> = self.line_comments.iter().map(String::as_str).collect();
        delims.sort_by(|a, b| b.len().cmp(&a.len()));
        delims
    }

    pub(crate) fn block_comments_longest_first(&self) -> Vec<(&str, &str)> {
        let mut delims: Vec<(&str, &str)> = self
            .block_comments
            .iter()
            .map(|bc| (bc.opening.as_str(), bc.closing.as_str()))
            .collect();
        delims.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
        delims
    }

    /// `"""` must be tried before `"`
    pub(crate) fn strings_longest_first(&self) -> Vec<&StringDelim> {
        let mut strings: Vec<&StringDelim> = self.strings.iter().collect();
        strings.sort_by(|a, b| b.delimiter.len().cmp(&a.delimiter.len()));
        strings
    }
}
