/// Block identifier utilities.
///
/// Block ids are opaque strings. Ids already present on a block are kept as-is;
/// fresh ids follow the `b_{uuid-v7}` convention:
/// - Generated: `b_0192f1c2a3b47c8d9e0f1a2b3c4d5e6f`
/// - Imported: any non-blank string (legacy documents, hand-written JSON)
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

const GENERATED_PREFIX: &str = "b_";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockId(String);

impl BlockId {
    /// Generate a fresh id.
    ///
    /// UUIDv7 carries a millisecond timestamp plus a per-process counter and
    /// random bits, so ids minted within one normalization pass never collide
    /// in practice.
    pub fn generate() -> Self {
        Self(format!("{GENERATED_PREFIX}{}", Uuid::now_v7().simple()))
    }

    /// Accept an existing id. Blank strings are rejected.
    pub fn parse(raw: &str) -> Option<Self> {
        if raw.trim().is_empty() {
            None
        } else {
            Some(Self(raw.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this id was minted by [`BlockId::generate`].
    pub fn is_generated(&self) -> bool {
        self.0
            .strip_prefix(GENERATED_PREFIX)
            .is_some_and(|rest| Uuid::try_parse(rest).is_ok())
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn generate_has_prefix() {
        let id = BlockId::generate();
        assert!(id.as_str().starts_with("b_"));
        assert!(id.is_generated());
    }

    #[test]
    fn generate_is_unique_within_a_burst() {
        let ids: HashSet<BlockId> = (0..10_000).map(|_| BlockId::generate()).collect();
        assert_eq!(ids.len(), 10_000);
    }

    #[test]
    fn parse_keeps_legacy_ids() {
        let id = BlockId::parse("b_18c9f0a1_3f2e").unwrap();
        assert_eq!(id.as_str(), "b_18c9f0a1_3f2e");
        assert!(!id.is_generated());
    }

    #[test]
    fn parse_rejects_blank() {
        assert!(BlockId::parse("").is_none());
        assert!(BlockId::parse("   ").is_none());
    }

    #[test]
    fn serializes_as_plain_string() {
        let id = BlockId::parse("hero").unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"hero\"");
    }
}
