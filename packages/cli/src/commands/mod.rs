pub mod check;
pub mod segment;
pub mod serve;

pub use check::{check, CheckArgs};
pub use segment::{segment, SegmentArgs};
pub use serve::{serve, ServeArgs};

use crate::config::Config;
use anyhow::{Context, Result};
use codeweave_lexer::{LanguageProfile, ProfileRegistry};
use std::path::Path;

/// A file read from disk together with its detected language
pub struct SourceFile {
    pub text: String,
    pub profile: LanguageProfile,
}

impl SourceFile {
    pub fn load(path: &Path, profiles: &ProfileRegistry) -> Result<Self> {
        let text = std::fs::read_to_string(path).with_context(|| format!("Cannot read {}", path.display()))?;
        let profile = profiles.detect(Some(path), &text)?.clone();
        Ok(Self { text, profile })
    }
}

pub fn profiles(cwd: &Path) -> Result<ProfileRegistry> {
    let config = Config::load(cwd)?;
    Ok(config.profiles()?)
}

/// First line of `text`, cut to `width` characters
pub fn preview(text: &str, width: usize) -> String {
    let line = text.lines().next().unwrap_or("").trim_end();
    if line.chars().count() > width {
        let cut: String = line.chars().take(width.saturating_sub(1)).collect();
        format!("{}…", cut)
    } else {
        line.to_string()
    }
}
