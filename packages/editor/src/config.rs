//! Session tuning knobs.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Which side keeps its edit when two concurrent patches touch the same block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConflictPolicy {
    /// The patch that arrived later overwrites the earlier one
    #[default]
    LaterWins,
    /// The first applied patch stands; conflicting later ops are dropped
    EarlierWins,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SyncConfig {
    /// How long to wait for an acknowledgement before force-resolving
    pub ack_timeout_ms: u64,

    /// Rejections of one peer before it is sent a full document instead
    pub max_retries: u32,

    pub conflict_policy: ConflictPolicy,

    /// Applied patches kept for rebasing stale submissions
    pub history_depth: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            ack_timeout_ms: 15_000,
            max_retries: 3,
            conflict_policy: ConflictPolicy::LaterWins,
            history_depth: 32,
        }
    }
}

impl SyncConfig {
    pub fn ack_timeout(&self) -> Duration {
        Duration::from_millis(self.ack_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: SyncConfig =
            serde_json::from_str(r#"{ "ackTimeoutMs": 500, "conflictPolicy": "earlierWins" }"#).unwrap();

        assert_eq!(config.ack_timeout(), Duration::from_millis(500));
        assert_eq!(config.conflict_policy, ConflictPolicy::EarlierWins);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.history_depth, 32);
    }
}
