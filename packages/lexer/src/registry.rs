//! Lookup of language profiles by id, extension or in-file directive.

use crate::error::{SegmentError, SegmentResult};
use crate::profile::LanguageProfile;
use crate::supported_languages::builtin_profiles;
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

/// Matches `codeweave lexer: <id>` anywhere in a file
static LEXER_DIRECTIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"codeweave lexer: (\w+)").expect("lexer directive regex is valid")
});

/// Registered language profiles, keyed by id
#[derive(Debug, Clone, Default)]
pub struct ProfileRegistry {
    profiles: Vec<LanguageProfile>,
}

impl ProfileRegistry {
    /// Registry with no languages at all
    pub fn empty() -> Self {
        Self::default()
    }

    /// Registry preloaded with every built-in language
    pub fn builtin() -> Self {
        Self {
            profiles: builtin_profiles(),
        }
    }

    /// Add a profile, replacing any profile with the same id.
    ///
    /// Returns the replaced profile.
    pub fn register(&mut self, profile: LanguageProfile) -> Option<LanguageProfile> {
        match self.profiles.iter_mut().find(|p| p.id == profile.id) {
            Some(existing) => Some(std::mem::replace(existing, profile)),
            None => {
                self.profiles.push(profile);
                None
            }
        }
    }

    pub fn get(&self, id: &str) -> SegmentResult<&LanguageProfile> {
        self.profiles
            .iter()
            .find(|p| p.id == id)
            .ok_or_else(|| SegmentError::unsupported(id))
    }

    /// First profile claiming this extension (with or without the dot).
    ///
    /// Later registrations take priority so user profiles can shadow built-ins.
    pub fn for_extension(&self, ext: &str) -> SegmentResult<&LanguageProfile> {
        self.profiles
            .iter()
            .rev()
            .find(|p| p.matches_extension(ext))
            .ok_or_else(|| SegmentError::unsupported(format!(".{}", ext.trim_start_matches('.'))))
    }

    /// Pick the profile for a file: an in-file `codeweave lexer:` directive
    /// wins, otherwise the path's extension decides.
    pub fn detect(&self, path: Option<&Path>, text: &str) -> SegmentResult<&LanguageProfile> {
        if let Some(captures) = LEXER_DIRECTIVE.captures(text) {
            return self.get(&captures[1]);
        }

        let ext = path
            .and_then(|p| p.extension())
            .and_then(|e| e.to_str())
            .ok_or_else(|| {
                SegmentError::unsupported(
                    path.map(|p| p.display().to_string())
                        .unwrap_or_else(|| "<unnamed>".to_string()),
                )
            })?;
        self.for_extension(ext)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.profiles.iter().map(|p| p.id.as_str())
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::StringDelim;
    use std::path::PathBuf;

    #[test]
    fn test_lookup_by_id() {
        let registry = ProfileRegistry::builtin();
        assert_eq!(registry.get("python").unwrap().id, "python");
        assert!(matches!(
            registry.get("cobol"),
            Err(SegmentError::UnsupportedLanguage(_))
        ));
    }

    #[test]
    fn test_detect_by_extension() {
        let registry = ProfileRegistry::builtin();
        let path = PathBuf::from("/src/main.rs");
        assert_eq!(registry.detect(Some(&path), "fn main() {}").unwrap().id, "rust");
    }

    #[test]
    fn test_directive_overrides_extension() {
        let registry = ProfileRegistry::builtin();
        let path = PathBuf::from("build.txt");
        let text = "# codeweave lexer: python\nprint(1)\n";
        assert_eq!(registry.detect(Some(&path), text).unwrap().id, "python");
    }

    #[test]
    fn test_unknown_extension_is_unsupported() {
        let registry = ProfileRegistry::builtin();
        let path = PathBuf::from("notes.xyz");
        let err = registry.detect(Some(&path), "hello").unwrap_err();
        assert_eq!(err, SegmentError::UnsupportedLanguage(".xyz".to_string()));
        assert!(registry.detect(None, "hello").is_err());
    }

    #[test]
    fn test_register_shadows_builtin() {
        let mut registry = ProfileRegistry::builtin();
        let before = registry.len();
        let custom = LanguageProfile::new("nim")
            .with_extensions(&[".nim"])
            .with_line_comments(&["#"])
            .with_string(StringDelim::escaped("\""));
        assert!(registry.register(custom).is_none());
        assert_eq!(registry.len(), before + 1);
        assert_eq!(registry.for_extension("nim").unwrap().id, "nim");

        let replacement = LanguageProfile::new("nim")
            .with_extensions(&[".nims"])
            .with_line_comments(&["#"])
            .with_string(StringDelim::escaped("\""));
        assert!(registry.register(replacement).is_some());
        assert_eq!(registry.len(), before + 1);
        assert!(registry.for_extension("nim").is_err());
    }
}
