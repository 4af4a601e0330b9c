use crc32fast::Hasher;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Generate document ID from file path using CRC32
pub fn get_document_id(path: &str) -> String {
    let mut buff = String::from(path);
    if !path.starts_with("file://") {
        buff = format!("file://{}", buff);
    }

    let mut hasher = Hasher::new();
    hasher.update(buff.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Stable, opaque identity of a block within one session
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockId(String);

impl BlockId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BlockId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Sequential ID generator for blocks within a document
///
/// Ids look like `b1, b2, …`, or `<seed>-b1, …` when seeded from a file path.
/// The counter only moves forward, so an id is never handed out twice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IDGenerator {
    seed: Option<String>,
    count: u64,
}

impl IDGenerator {
    /// Unseeded generator (`b1`, `b2`, …)
    pub fn new() -> Self {
        Self {
            seed: None,
            count: 0,
        }
    }

    /// Generator seeded by the CRC32 of a file path
    pub fn for_path(path: &str) -> Self {
        Self::from_seed(get_document_id(path))
    }

    pub fn from_seed(seed: impl Into<String>) -> Self {
        Self {
            seed: Some(seed.into()),
            count: 0,
        }
    }

    /// Generate next sequential ID
    pub fn new_id(&mut self) -> BlockId {
        self.count += 1;
        BlockId(self.format(self.count))
    }

    /// Move the counter past an id minted elsewhere from the same sequence
    pub fn observe(&mut self, id: &BlockId) {
        if let Some(n) = self.sequence_number(id) {
            self.count = self.count.max(n);
        }
    }

    /// Get document ID seed
    pub fn seed(&self) -> Option<&str> {
        self.seed.as_deref()
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    fn format(&self, n: u64) -> String {
        match &self.seed {
            Some(seed) => format!("{}-b{}", seed, n),
            None => format!("b{}", n),
        }
    }

    fn sequence_number(&self, id: &BlockId) -> Option<u64> {
        let rest = match &self.seed {
            Some(seed) => id.as_str().strip_prefix(seed.as_str())?.strip_prefix("-b")?,
            None => id.as_str().strip_prefix('b')?,
        };
        rest.parse().ok()
    }
}

impl Default for IDGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_id_generation() {
        let id1 = get_document_id("/entry.py");
        let id2 = get_document_id("/entry.py");

        // Same path always generates same ID
        assert_eq!(id1, id2);

        // Different paths generate different IDs
        let id3 = get_document_id("/styles.css");
        assert_ne!(id1, id3);
    }

    #[test]
    fn test_sequential_ids() {
        let mut gen = IDGenerator::new();

        assert_eq!(gen.new_id().as_str(), "b1");
        assert_eq!(gen.new_id().as_str(), "b2");
        assert_eq!(gen.new_id().as_str(), "b3");
    }

    #[test]
    fn test_seeded_ids_share_prefix() {
        let mut gen = IDGenerator::for_path("/test.py");
        let seed = gen.seed().unwrap().to_string();

        let id1 = gen.new_id();
        let id2 = gen.new_id();
        assert_eq!(id1.as_str(), format!("{}-b1", seed));
        assert_eq!(id2.as_str(), format!("{}-b2", seed));
    }

    #[test]
    fn test_observe_skips_foreign_ids() {
        let mut gen = IDGenerator::new();
        gen.new_id();

        gen.observe(&BlockId::new("b7"));
        assert_eq!(gen.new_id().as_str(), "b8");

        // Ids from another sequence don't move the counter
        gen.observe(&BlockId::new("view-b40"));
        gen.observe(&BlockId::new("b3"));
        assert_eq!(gen.new_id().as_str(), "b9");
    }
}
