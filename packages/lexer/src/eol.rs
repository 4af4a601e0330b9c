//! Line-ending detection and conversion.
//!
//! Files keep whatever line endings they were written with. Text coming back
//! from the rendered view always uses `\n`, so it is converted to the file's
//! style before it is merged.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Captures the first line ending in a string
static EOL_FINDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("[^\r\n]*(\r?\n)").expect("EOL regex is valid"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EolType {
    Lf,
    Crlf,
}

impl EolType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EolType::Lf => "\n",
            EolType::Crlf => "\r\n",
        }
    }
}

/// Line-ending style of `text`, decided by its first line ending.
/// Text without any line ending is treated as LF.
pub fn find_eol_type(text: &str) -> EolType {
    match EOL_FINDER.captures(text).and_then(|c| c.get(1)) {
        Some(m) if m.as_str() == "\r\n" => EolType::Crlf,
        _ => EolType::Lf,
    }
}

/// Normalize all line endings in `text` to `eol`
pub fn eol_convert(text: &str, eol: EolType) -> String {
    let lf = text.replace("\r\n", "\n");
    match eol {
        EolType::Lf => lf,
        EolType::Crlf => lf.replace('\n', "\r\n"),
    }
}
