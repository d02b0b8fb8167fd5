//! The persisted bundle record.

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Namespace of bundle records in the persistent store.
pub const BUNDLE_PREFIX: &str = "bundle/";

/// One fetched bundle, as persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteBundleCacheEntry {
    /// `formula_id:version`.
    pub id: String,
    pub formula_id: String,
    pub version: String,
    pub source_url: String,
    pub source_text: String,
    pub function_name: String,
    pub fetched_at: DateTime<Utc>,
    pub integrity_hash: String,
}

impl RemoteBundleCacheEntry {
    pub fn new(
        formula_id: &str,
        version: &str,
        source_url: &str,
        source_text: String,
        function_name: &str,
    ) -> Self {
        Self {
            id: format!("{}:{}", formula_id, version),
            formula_id: formula_id.to_string(),
            version: version.to_string(),
            source_url: source_url.to_string(),
            integrity_hash: integrity_hash(&source_text),
            source_text,
            function_name: function_name.to_string(),
            fetched_at: Utc::now(),
        }
    }

    /// Store key of the record for `formula_id` at `version`.
    pub fn store_key(formula_id: &str, version: &str) -> String {
        format!("{}{}:{}", BUNDLE_PREFIX, formula_id, version)
    }

    /// Recompute the hash of `source_text` and compare it with the stored one.
    pub fn verify(&self) -> Result<()> {
        let actual = integrity_hash(&self.source_text);
        if actual == self.integrity_hash {
            Ok(())
        } else {
            Err(Error::Integrity {
                key: Self::store_key(&self.formula_id, &self.version),
                expected: self.integrity_hash.clone(),
                actual,
            })
        }
    }
}

/// 32-bit polynomial rolling hash (`h = h * 31 + c`) as 8 hex digits.
///
/// Detects accidental corruption only. It offers no protection against
/// deliberate tampering.
pub fn integrity_hash(text: &str) -> String {
    let hash = text
        .chars()
        .fold(0u32, |h, c| h.wrapping_mul(31).wrapping_add(c as u32));
    format!("{:08x}", hash)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn hash_is_stable_and_padded() {
        assert_eq!(integrity_hash(""), "00000000");
        assert_eq!(integrity_hash("a"), "00000061");
        // 97 * 31 + 98
        assert_eq!(integrity_hash("ab"), format!("{:08x}", 97 * 31 + 98));
        assert_eq!(integrity_hash("fn f() { 1 }"), integrity_hash("fn f() { 1 }"));
        assert_ne!(integrity_hash("fn f() { 1 }"), integrity_hash("fn f() { 2 }"));
    }

    #[test]
    fn verify_detects_mutation() {
        let mut entry =
            RemoteBundleCacheEntry::new("npv", "1.0.0", "mem://npv", "fn f() { 1 }".into(), "f");
        assert_eq!(entry.id, "npv:1.0.0");
        assert!(entry.verify().is_ok());

        entry.source_text.replace_range(9..10, "2");
        let Err(Error::Integrity { key, expected, .. }) = entry.verify() else {
            panic!("expected an integrity error");
        };
        assert_eq!(key, "bundle/npv:1.0.0");
        assert_eq!(expected, entry.integrity_hash);
    }
}
