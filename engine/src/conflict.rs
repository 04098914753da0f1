//! Conflicts surfaced by reconciliation and their manual resolutions.

use crate::{error::Result, Error, QuoteContent, QuoteId, Timestamp};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A divergence between local and remote content awaiting a user decision.
///
/// The remote value has already been applied when a conflict is recorded;
/// `local` keeps what was overwritten so the user can restore it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conflict {
    pub id: QuoteId,
    pub local: QuoteContent,
    pub server: QuoteContent,
    pub resolved: bool,
    pub created_at: Timestamp,
}

/// What the user decided for a conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Resolution {
    /// Keep the remote value that was provisionally applied (default)
    KeepServer,
    /// Restore the local snapshot and push it to the remote
    KeepLocal,
    /// Close the conflict without touching the record or the shadow
    Dismiss,
}

impl Resolution {
    pub fn as_str(&self) -> &'static str {
        match self {
            Resolution::KeepServer => "keep-server",
            Resolution::KeepLocal => "keep-local",
            Resolution::Dismiss => "dismiss",
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Resolution {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "keep-server" => Ok(Resolution::KeepServer),
            "keep-local" => Ok(Resolution::KeepLocal),
            "dismiss" => Ok(Resolution::Dismiss),
            other => Err(format!(
                "unknown resolution '{other}' (expected keep-server, keep-local or dismiss)"
            )),
        }
    }
}

/// Every conflict ever recorded, resolved ones included, in creation order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConflictLog {
    entries: Vec<Conflict>,
}

impl ConflictLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// The open conflict for an id, if there is one.
    pub fn unresolved(&self, id: &str) -> Option<&Conflict> {
        self.entries.iter().find(|c| c.id == id && !c.resolved)
    }

    pub fn has_unresolved(&self, id: &str) -> bool {
        self.unresolved(id).is_some()
    }

    /// Record a conflict unless one is already open for the same id.
    ///
    /// Returns `true` if a new entry was appended.
    pub fn record(
        &mut self,
        id: impl Into<QuoteId>,
        local: QuoteContent,
        server: QuoteContent,
        timestamp: Timestamp,
    ) -> bool {
        let id = id.into();
        if self.has_unresolved(&id) {
            return false;
        }
        self.entries.push(Conflict {
            id,
            local,
            server,
            resolved: false,
            created_at: timestamp,
        });
        true
    }

    /// Close the open conflict for an id and return it.
    pub fn mark_resolved(&mut self, id: &str) -> Result<Conflict> {
        let conflict = self
            .entries
            .iter_mut()
            .find(|c| c.id == id && !c.resolved)
            .ok_or_else(|| Error::NoUnresolvedConflict(id.to_string()))?;
        conflict.resolved = true;
        Ok(conflict.clone())
    }

    /// Open conflicts in creation order.
    pub fn pending(&self) -> impl Iterator<Item = &Conflict> {
        self.entries.iter().filter(|c| !c.resolved)
    }

    pub fn pending_count(&self) -> usize {
        self.pending().count()
    }

    pub fn all(&self) -> &[Conflict] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
