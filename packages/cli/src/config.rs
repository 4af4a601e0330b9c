use codeweave_editor::SyncConfig;
use codeweave_lexer::{LanguageProfile, ProfileRegistry, SegmentError};
use codeweave_workspace::WatchConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_CONFIG_NAME: &str = "codeweave.config.json";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid language profile: {0}")]
    Language(#[from] SegmentError),
}

/// CodeWeave configuration file format
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Session tuning (ack timeout, retries, conflict policy)
    #[serde(default)]
    pub sync: SyncConfig,

    /// File watcher tuning
    #[serde(default)]
    pub watch: WatchConfig,

    /// Extra languages; an entry with a built-in id replaces the built-in
    #[serde(default)]
    pub languages: Vec<LanguageProfile>,
}

impl Config {
    /// Load config from a directory
    pub fn load(cwd: &Path) -> Result<Self, ConfigError> {
        let config_path = cwd.join(DEFAULT_CONFIG_NAME);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path).map_err(|source| ConfigError::Read {
                path: config_path.clone(),
                source,
            })?;
            serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
                path: config_path,
                source,
            })
        } else {
            // Return default config if none exists
            Ok(Config::default())
        }
    }

    /// Built-in profiles plus the configured ones
    pub fn profiles(&self) -> Result<ProfileRegistry, ConfigError> {
        let mut registry = ProfileRegistry::builtin();
        for profile in &self.languages {
            profile.validate()?;
            registry.register(profile.clone());
        }
        Ok(registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codeweave_editor::ConflictPolicy;

    #[test]
    fn test_parse_config() {
        let json = r#"{
            "sync": { "ackTimeoutMs": 500, "conflictPolicy": "earlierWins" },
            "watch": { "debounceMs": 20 },
            "languages": [
                {
                    "id": "lua",
                    "extensions": [".lua"],
                    "lineComments": ["--"],
                    "strings": [{ "delimiter": "\"", "escape": "\\" }]
                }
            ]
        }"#;

        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.sync.ack_timeout_ms, 500);
        assert_eq!(config.sync.max_retries, 3);
        assert_eq!(config.sync.conflict_policy, ConflictPolicy::EarlierWins);
        assert_eq!(config.watch.debounce_ms, 20);
        assert_eq!(config.languages[0].id, "lua");

        let profiles = config.profiles().unwrap();
        assert_eq!(profiles.for_extension(".lua").unwrap().id, "lua");
        assert!(profiles.get("python").is_ok());
    }

    #[test]
    fn test_default_config() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config, Config::default());
        assert!(config.languages.is_empty());
    }

    #[test]
    fn test_invalid_language_rejected() {
        let config = Config {
            languages: vec![LanguageProfile::new("bare").with_line_comments(&["#"])],
            ..Config::default()
        };
        assert!(matches!(config.profiles(), Err(ConfigError::Language(_))));
    }

    #[test]
    fn test_malformed_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(DEFAULT_CONFIG_NAME), "{ not json").unwrap();
        match Config::load(dir.path()) {
            Err(ConfigError::Parse { path, .. }) => assert!(path.ends_with(DEFAULT_CONFIG_NAME)),
            other => panic!("expected a parse error, got {:?}", other),
        }
    }
}
