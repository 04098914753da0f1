//! The shadow table: per-id fingerprints as of the last successful sync.

use crate::{Fingerprint, QuoteId, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Fingerprint of a quote as it stood at the end of the last sync.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShadowEntry {
    pub fingerprint: Fingerprint,
    pub updated_at: Timestamp,
}

/// Shadow entries keyed by quote id.
///
/// Uses a BTreeMap so the persisted form is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShadowTable {
    entries: BTreeMap<QuoteId, ShadowEntry>,
}

impl ShadowTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<&ShadowEntry> {
        self.entries.get(id)
    }

    /// The remembered fingerprint for an id, if any.
    pub fn fingerprint(&self, id: &str) -> Option<&Fingerprint> {
        self.entries.get(id).map(|e| &e.fingerprint)
    }

    /// Remember `fingerprint` as the agreed state of `id`.
    pub fn record(&mut self, id: impl Into<QuoteId>, fingerprint: Fingerprint, timestamp: Timestamp) {
        self.entries.insert(
            id.into(),
            ShadowEntry {
                fingerprint,
                updated_at: timestamp,
            },
        );
    }

    pub fn iter(&self) -> impl Iterator<Item = (&QuoteId, &ShadowEntry)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::QuoteContent;

    #[test]
    fn record_overwrites() {
        let mut shadow = ShadowTable::new();
        let a = QuoteContent::new("A", "X").fingerprint();
        let b = QuoteContent::new("B", "X").fingerprint();

        shadow.record("5", a, 1000);
        shadow.record("5", b.clone(), 2000);

        assert_eq!(shadow.len(), 1);
        assert_eq!(shadow.fingerprint("5"), Some(&b));
        assert_eq!(shadow.get("5").unwrap().updated_at, 2000);
    }

    #[test]
    fn serializes_as_plain_map() {
        let mut shadow = ShadowTable::new();
        shadow.record("5", QuoteContent::new("A", "X").fingerprint(), 1000);

        let json = serde_json::to_value(&shadow).unwrap();
        assert!(json["5"]["fingerprint"].as_str().unwrap().starts_with("blake3:"));
        assert_eq!(json["5"]["updatedAt"], 1000);
    }
}
