//! Snapshot types for persisting and restoring store state.
//!
//! Local state is persisted as three independent tables (quotes, shadow,
//! conflicts). Each table has its own JSON form so a corrupt one can be
//! replaced by its default without discarding the others.

use crate::{error::Result, ConflictLog, Error, Fingerprint, Quote, ShadowTable};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::HashSet;

/// A point-in-time copy of the three local tables.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreSnapshot {
    pub quotes: Vec<Quote>,
    pub shadow: ShadowTable,
    pub conflicts: ConflictLog,
}

impl StoreSnapshot {
    /// Parse and validate a persisted quote list.
    pub fn quotes_from_json(json: &str) -> Result<Vec<Quote>> {
        let quotes: Vec<Quote> = parse(json)?;
        validate_quotes(&quotes)?;
        Ok(quotes)
    }

    /// Parse and validate a persisted shadow table.
    pub fn shadow_from_json(json: &str) -> Result<ShadowTable> {
        let shadow: ShadowTable = parse(json)?;
        validate_shadow(&shadow)?;
        Ok(shadow)
    }

    /// Parse and validate a persisted conflict log.
    pub fn conflicts_from_json(json: &str) -> Result<ConflictLog> {
        let conflicts: ConflictLog = parse(json)?;
        validate_conflicts(&conflicts)?;
        Ok(conflicts)
    }

    pub fn quotes_to_json(&self) -> Result<String> {
        to_json(&self.quotes)
    }

    pub fn shadow_to_json(&self) -> Result<String> {
        to_json(&self.shadow)
    }

    pub fn conflicts_to_json(&self) -> Result<String> {
        to_json(&self.conflicts)
    }

    /// Validate all three tables.
    pub fn validate(&self) -> Result<()> {
        validate_quotes(&self.quotes)?;
        validate_shadow(&self.shadow)?;
        validate_conflicts(&self.conflicts)
    }
}

fn parse<T: DeserializeOwned>(json: &str) -> Result<T> {
    serde_json::from_str(json).map_err(|e| Error::InvalidSnapshot(e.to_string()))
}

fn to_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).map_err(|e| Error::InvalidSnapshot(e.to_string()))
}

fn validate_quotes(quotes: &[Quote]) -> Result<()> {
    let mut seen = HashSet::new();
    for quote in quotes {
        if !seen.insert(quote.id.as_str()) {
            return Err(Error::InvalidSnapshot(format!(
                "duplicate quote id: {}",
                quote.id
            )));
        }
    }
    Ok(())
}

fn validate_shadow(shadow: &ShadowTable) -> Result<()> {
    for (_, entry) in shadow.iter() {
        Fingerprint::parse(entry.fingerprint.as_str())?;
    }
    Ok(())
}

fn validate_conflicts(conflicts: &ConflictLog) -> Result<()> {
    let mut open = HashSet::new();
    for conflict in conflicts.pending() {
        if !open.insert(conflict.id.as_str()) {
            return Err(Error::InvalidSnapshot(format!(
                "more than one unresolved conflict for quote: {}",
                conflict.id
            )));
        }
    }
    Ok(())
}
