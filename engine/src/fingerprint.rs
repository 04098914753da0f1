//! Content fingerprints.
//!
//! A fingerprint covers only the meaningful content of a quote (`text` and
//! `category`). Ids, timestamps and the pending flag are bookkeeping and never
//! contribute, so two records with the same content always share a
//! fingerprint.

use crate::{error::Result, Error, QuoteContent};
use serde::{Deserialize, Serialize};
use std::fmt;

const PREFIX: &str = "blake3:";

/// Deterministic digest of a quote's content.
///
/// Rendered as `blake3:` followed by 64 lowercase hex digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Fingerprint the given content.
    ///
    /// The digest is taken over canonical JSON (`{"category":..,"text":..}`,
    /// keys sorted), which keeps field boundaries unambiguous.
    pub fn of(content: &QuoteContent) -> Self {
        let canonical = serde_json::json!({
            "text": content.text,
            "category": content.category,
        })
        .to_string();
        Self(format!("{PREFIX}{}", blake3::hash(canonical.as_bytes()).to_hex()))
    }

    /// Parse a stored fingerprint, rejecting anything not produced by [`Fingerprint::of`].
    pub fn parse(s: &str) -> Result<Self> {
        let hex = s
            .strip_prefix(PREFIX)
            .ok_or_else(|| Error::InvalidSnapshot(format!("fingerprint must start with {PREFIX}")))?;
        if hex.len() != 64 || !hex.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase())
        {
            return Err(Error::InvalidSnapshot(format!(
                "invalid fingerprint digest: {s}"
            )));
        }
        Ok(Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
