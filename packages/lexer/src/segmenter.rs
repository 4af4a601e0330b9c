//! # Lexical Segmenter
//!
//! Splits source text into an ordered run of code and documentation
//! segments. Concatenating the segment texts gives back the input exactly.
//!
//! ## What counts as documentation
//!
//! - A line whose first non-blank text is a line-comment delimiter followed by
//!   a space, a line ending or end of input. Consecutive such lines with the
//!   same indent and delimiter form one segment.
//! - A block comment whose opener sits alone at the start of a line (after
//!   blanks) and whose closer is followed only by blanks up to the line end.
//!
//! Everything else is code, including trailing comments (`x = 1 # note`) and
//! comments glued to their delimiter (`#note`). Comment delimiters inside
//! string literals are never recognized.

use crate::error::{SegmentError, SegmentResult};
use crate::profile::{HeredocDelim, LanguageProfile, StringDelim};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::ops::Range;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SegmentKind {
    Code,
    Doc,
}

/// A maximal run of source text classified as code or documentation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub kind: SegmentKind,
    pub text: String,
    /// Byte range in the original source
    pub range: Range<usize>,
}

/// Segment `source` using `profile`
pub fn segment(source: &str, profile: &LanguageProfile) -> SegmentResult<Vec<Segment>> {
    profile.validate()?;
    Segmenter::new(source, profile)?.run()
}

struct Segmenter<'a> {
    src: &'a str,
    line_comments: Vec<&'a str>,
    block_comments: Vec<(&'a str, &'a str)>,
    strings: Vec<&'a StringDelim>,
    heredocs: Vec<(&'a HeredocDelim, Regex)>,
    continuation: Option<&'a str>,
    code_start: Option<usize>,
    segments: Vec<Segment>,
}

impl<'a> Segmenter<'a> {
    fn new(src: &'a str, profile: &'a LanguageProfile) -> SegmentResult<Self> {
        let heredocs = profile
            .heredocs
            .iter()
            .map(|h| h.opener().map(|re| (h, re)))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| SegmentError::unsupported(format!("{} ({})", profile.id, e)))?;

        Ok(Self {
            src,
            line_comments: profile.line_comments_longest_first(),
            block_comments: profile.block_comments_longest_first(),
            strings: profile.strings_longest_first(),
            heredocs,
            continuation: profile.line_continuation.as_deref(),
            code_start: None,
            segments: Vec::new(),
        })
    }

    fn run(mut self) -> SegmentResult<Vec<Segment>> {
        let mut pos = 0;
        while pos < self.src.len() {
            // `pos` is always at the start of a line here
            if let Some(end) = self.doc_run_at(pos)? {
                self.flush_code(pos);
                self.push(SegmentKind::Doc, pos..end);
                pos = end;
                continue;
            }

            if self.code_start.is_none() {
                self.code_start = Some(pos);
            }
            pos = self.scan_code_line(pos)?;
        }
        self.flush_code(self.src.len());
        Ok(self.segments)
    }

    fn push(&mut self, kind: SegmentKind, range: Range<usize>) {
        self.segments.push(Segment {
            kind,
            text: self.src[range.clone()].to_string(),
            range,
        });
    }

    fn flush_code(&mut self, end: usize) {
        if let Some(start) = self.code_start.take() {
            if start < end {
                self.push(SegmentKind::Code, start..end);
            }
        }
    }

    // ## Documentation runs

    /// If a documentation run starts at `line_start`, return its end
    fn doc_run_at(&self, line_start: usize) -> SegmentResult<Option<usize>> {
        let indent_end = self.skip_blanks(line_start);
        let indent = &self.src[line_start..indent_end];

        if let Some(delim) = self.doc_line_delimiter(indent_end) {
            let mut end = self.line_end(indent_end);
            while end < self.src.len() {
                let next_indent_end = self.skip_blanks(end);
                if &self.src[end..next_indent_end] != indent
                    || self.doc_line_delimiter(next_indent_end) != Some(delim)
                {
                    break;
                }
                end = self.line_end(next_indent_end);
            }
            return Ok(Some(end));
        }

        for &(opening, closing) in &self.block_comments {
            if !self.src[indent_end..].starts_with(opening) {
                continue;
            }
            let body_start = indent_end + opening.len();
            if !self.is_separator(body_start) {
                // `/**` and friends are ordinary comments
                return Ok(None);
            }
            let close = self.src[body_start..]
                .find(closing)
                .map(|i| body_start + i)
                .ok_or_else(|| SegmentError::malformed(indent_end, opening, closing))?;

            let after = self.skip_trailing_blanks(close + closing.len());
            return Ok(match self.src.as_bytes().get(after) {
                None => Some(after),
                Some(b'\n') => Some(after + 1),
                // Code follows the closer on the same line
                Some(_) => None,
            });
        }

        Ok(None)
    }

    /// Line-comment delimiter introducing a doc line at `pos`, if any
    fn doc_line_delimiter(&self, pos: usize) -> Option<&'a str> {
        let rest = &self.src[pos..];
        let delim = self.line_comments.iter().copied().find(|d| rest.starts_with(d))?;
        self.is_separator(pos + delim.len()).then_some(delim)
    }

    /// A delimiter must be followed by a blank, a line ending or end of input
    fn is_separator(&self, pos: usize) -> bool {
        matches!(
            self.src.as_bytes().get(pos),
            None | Some(b' ') | Some(b'\t') | Some(b'\n') | Some(b'\r')
        )
    }

    // ## Code

    /// Consume one logical code line starting at `start` and return the
    /// position just past its terminating newline (or end of input)
    fn scan_code_line(&self, start: usize) -> SegmentResult<usize> {
        let bytes = self.src.as_bytes();
        let mut i = start;
        while i < self.src.len() {
            if bytes[i] == b'\n' {
                return Ok(i + 1);
            }
            i = match self.skip_token(i)? {
                Some(end) => end,
                None => i + self.char_len(i),
            };
        }
        Ok(self.src.len())
    }

    /// Skip the comment, heredoc or string starting at `i`, if there is one.
    ///
    /// A trailing line comment stops before its newline.
    fn skip_token(&self, i: usize) -> SegmentResult<Option<usize>> {
        let rest = &self.src[i..];

        if let Some(&(opening, closing)) = self.block_comments.iter().find(|(o, _)| rest.starts_with(o)) {
            let body_start = i + opening.len();
            let close = self.src[body_start..]
                .find(closing)
                .ok_or_else(|| SegmentError::malformed(i, opening, closing))?;
            return Ok(Some(body_start + close + closing.len()));
        }

        if self.line_comments.iter().any(|d| rest.starts_with(d)) {
            return Ok(Some(self.skip_line_comment(i)));
        }

        if let Some(end) = self.skip_heredoc(i) {
            return Ok(Some(end));
        }

        match self.strings.iter().find(|s| rest.starts_with(&s.delimiter)) {
            Some(string) => self.skip_string(i, string).map(Some),
            None => Ok(None),
        }
    }

    /// Skip a trailing comment, stopping at the newline that ends it
    fn skip_line_comment(&self, start: usize) -> usize {
        let mut end = self.newline_at_or_after(start);
        while let Some(marker) = self.continuation {
            let line = self.src[start..end].trim_end_matches('\r');
            if end >= self.src.len() || !line.ends_with(marker) {
                break;
            }
            end = self.newline_at_or_after(end + 1);
        }
        end
    }

    /// Skip a string literal starting at `start`
    ///
    /// Single-line strings end at an unescaped newline, which is left for the
    /// caller. Unterminated strings run to end of input.
    fn skip_string(&self, start: usize, string: &StringDelim) -> SegmentResult<usize> {
        let closing = string.closing();
        let mut j = start + string.delimiter.len();
        while j < self.src.len() {
            let rest = &self.src[j..];
            if rest.starts_with(closing) {
                return Ok(j + closing.len());
            }
            let Some(c) = rest.chars().next() else {
                break;
            };
            if Some(c) == string.escape {
                j += c.len_utf8();
                if j < self.src.len() {
                    j += self.char_len(j);
                }
                continue;
            }
            if string.template && rest.starts_with("${") {
                j = self.skip_interpolation(j + 2)?;
                continue;
            }
            if c == '\n' && !string.multiline {
                return Ok(j);
            }
            j += c.len_utf8();
        }
        Ok(self.src.len())
    }

    /// Skip the code inside `${ ... }`, from just after `${` to just past the
    /// matching `}`. Strings and comments inside are lexed as code.
    fn skip_interpolation(&self, start: usize) -> SegmentResult<usize> {
        let bytes = self.src.as_bytes();
        let mut depth = 1usize;
        let mut i = start;
        while i < self.src.len() {
            if let Some(end) = self.skip_token(i)? {
                i = end;
                continue;
            }
            match bytes[i] {
                b'{' => depth += 1,
                b'}' => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(i + 1);
                    }
                }
                _ => {}
            }
            i += self.char_len(i);
        }
        Ok(self.src.len())
    }

    /// Skip a heredoc opening at `start`; unterminated ones run to end of input
    fn skip_heredoc(&self, start: usize) -> Option<usize> {
        let rest = &self.src[start..];
        self.heredocs
            .iter()
            .filter(|(heredoc, _)| rest.starts_with(&heredoc.start_prefix))
            .find_map(|(heredoc, opener)| {
                let captures = opener.captures(rest)?;
                let body = start + captures.get(0)?.end();
                let terminator = heredoc.terminator(captures.get(1).map_or("", |m| m.as_str()));
                Some(
                    self.src[body..]
                        .find(&terminator)
                        .map_or(self.src.len(), |k| body + k + terminator.len()),
                )
            })
    }

    // ## Helpers

    fn skip_blanks(&self, mut pos: usize) -> usize {
        let bytes = self.src.as_bytes();
        while pos < bytes.len() && matches!(bytes[pos], b' ' | b'\t') {
            pos += 1;
        }
        pos
    }

    fn skip_trailing_blanks(&self, mut pos: usize) -> usize {
        let bytes = self.src.as_bytes();
        while pos < bytes.len() && matches!(bytes[pos], b' ' | b'\t' | b'\r') {
            pos += 1;
        }
        pos
    }

    fn newline_at_or_after(&self, pos: usize) -> usize {
        self.src[pos..]
            .find('\n')
            .map(|i| pos + i)
            .unwrap_or(self.src.len())
    }

    /// Position just past the newline ending the line containing `pos`
    fn line_end(&self, pos: usize) -> usize {
        let newline = self.newline_at_or_after(pos);
        (newline + 1).min(self.src.len())
    }

    fn char_len(&self, pos: usize) -> usize {
        self.src[pos..].chars().next().map(char::len_utf8).unwrap_or(1)
    }
}
