//! Structured view of a documentation segment.
//!
//! The raw text of a doc segment keeps its delimiters and indentation; the
//! rendering side only wants the prose. [`DocComment`] converts between the
//! two.

use crate::profile::LanguageProfile;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocComment {
    /// Whitespace before the delimiter
    pub indent: String,
    /// Opening delimiter (`#`, `//`, `/*`, …)
    pub delimiter: String,
    /// Prose with delimiters and the separating space removed
    pub contents: String,
}

impl DocComment {
    /// Parse the raw text of a doc segment. Returns `None` when the text does
    /// not start with one of the profile's comment delimiters.
    pub fn parse(raw: &str, profile: &LanguageProfile) -> Option<Self> {
        let indent_len = raw.len() - raw.trim_start_matches([' ', '\t']).len();
        let indent = &raw[..indent_len];
        let rest = &raw[indent_len..];

        if let Some(delim) = profile
            .line_comments_longest_first()
            .into_iter()
            .find(|d| rest.starts_with(d))
        {
            let contents = raw
                .split_inclusive('\n')
                .map(|line| {
                    let line = line.strip_prefix(indent).unwrap_or(line);
                    let line = line.strip_prefix(delim).unwrap_or(line);
                    line.strip_prefix(' ').unwrap_or(line)
                })
                .collect();
            return Some(Self {
                indent: indent.to_string(),
                delimiter: delim.to_string(),
                contents,
            });
        }

        let (opening, closing) = profile
            .block_comments_longest_first()
            .into_iter()
            .find(|(o, _)| rest.starts_with(o))?;
        let body = &rest[opening.len()..];
        let close = body.rfind(closing)?;
        let had_newline = body[close + closing.len()..].contains('\n');

        let inner = &body[..close];
        let inner = inner.strip_prefix(' ').unwrap_or(inner);
        let inner = inner.strip_suffix(' ').unwrap_or(inner);

        let mut contents = inner
            .split('\n')
            .enumerate()
            .map(|(i, line)| {
                if i == 0 {
                    line
                } else {
                    line.strip_prefix(indent).unwrap_or(line)
                }
            })
            .collect::<Vec<_>>()
            .join("\n");
        if had_newline {
            contents.push('\n');
        }

        Some(Self {
            indent: indent.to_string(),
            delimiter: opening.to_string(),
            contents,
        })
    }

    /// Render back to source text.
    ///
    /// Returns `None` if the delimiter is not known to the profile.
    pub fn to_source(&self, profile: &LanguageProfile) -> Option<String> {
        let mut out = String::new();

        if profile.is_line_comment(&self.delimiter) {
            if self.contents.is_empty() {
                out.push_str(&self.indent);
                out.push_str(&self.delimiter);
                return Some(out);
            }
            for line in self.contents.split_inclusive('\n') {
                out.push_str(&self.indent);
                out.push_str(&self.delimiter);
                if !line.trim_end_matches(['\r', '\n']).is_empty() {
                    out.push(' ');
                }
                out.push_str(line);
            }
            return Some(out);
        }

        let closing = profile.closing_for(&self.delimiter)?;
        let (body, had_newline) = match self.contents.strip_suffix('\n') {
            Some(body) => (body, true),
            None => (self.contents.as_str(), false),
        };

        out.push_str(&self.indent);
        out.push_str(&self.delimiter);
        out.push(' ');
        for (i, line) in body.split('\n').enumerate() {
            if i > 0 {
                out.push('\n');
                if !line.is_empty() {
                    out.push_str(&self.indent);
                }
            }
            out.push_str(line);
        }
        if !body.is_empty() {
            out.push(' ');
        }
        out.push_str(closing);
        if had_newline {
            out.push('\n');
        }
        Some(out)
    }
}
