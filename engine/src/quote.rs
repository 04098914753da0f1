//! Quote records.

use crate::{error::Result, Error, Fingerprint, QuoteId, Timestamp};
use serde::{Deserialize, Serialize};

/// Prefix of client-generated ids for quotes the remote has not assigned yet.
pub const TEMP_ID_PREFIX: &str = "tmp-";

/// Category used when the remote sends a post without a title.
pub const FALLBACK_CATEGORY: &str = "Server";

/// Where the current content of a quote came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    /// Created or edited on this device
    Local,
    /// Taken from the remote
    Server,
}

/// The meaningful content of a quote.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QuoteContent {
    pub text: String,
    pub category: String,
}

impl QuoteContent {
    pub fn new(text: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            category: category.into(),
        }
    }

    /// Trim user input and require both fields to be non-empty.
    pub fn from_input(text: &str, category: &str) -> Result<Self> {
        let text = text.trim();
        let category = category.trim();
        if text.is_empty() {
            return Err(Error::MissingField("text"));
        }
        if category.is_empty() {
            return Err(Error::MissingField("category"));
        }
        Ok(Self::new(text, category))
    }

    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::of(self)
    }
}

/// A quote as held in the local store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    /// Remote-assigned id, or a `tmp-` id while creation is pending
    pub id: QuoteId,
    pub text: String,
    pub category: String,
    /// Last content change (milliseconds since epoch)
    pub updated_at: Timestamp,
    pub source: Source,
    /// Set until the remote has assigned an id
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub pending_create: bool,
}

impl Quote {
    /// A quote created on this device that still has to be pushed.
    pub fn new_local(id: impl Into<QuoteId>, content: QuoteContent, timestamp: Timestamp) -> Self {
        Self {
            id: id.into(),
            text: content.text,
            category: content.category,
            updated_at: timestamp,
            source: Source::Local,
            pending_create: true,
        }
    }

    /// A quote received from the remote.
    pub fn from_server(id: impl Into<QuoteId>, content: QuoteContent, timestamp: Timestamp) -> Self {
        Self {
            id: id.into(),
            text: content.text,
            category: content.category,
            updated_at: timestamp,
            source: Source::Server,
            pending_create: false,
        }
    }

    pub fn content(&self) -> QuoteContent {
        QuoteContent::new(self.text.clone(), self.category.clone())
    }

    pub fn fingerprint(&self) -> Fingerprint {
        self.content().fingerprint()
    }

    /// Replace the content, stamping the change.
    pub fn set_content(&mut self, content: QuoteContent, timestamp: Timestamp, source: Source) {
        self.text = content.text;
        self.category = content.category;
        self.updated_at = timestamp;
        self.source = source;
    }

    pub fn has_temporary_id(&self) -> bool {
        self.id.starts_with(TEMP_ID_PREFIX)
    }
}

/// Built-in quotes used when no persisted list is available.
pub fn seed_quotes(timestamp: Timestamp) -> Vec<Quote> {
    [
        (
            "1",
            "The best way to get started is to quit talking and begin doing.",
            "Motivation",
        ),
        (
            "2",
            "Don't watch the clock; do what it does. Keep going.",
            "Persistence",
        ),
        (
            "3",
            "Success is not in what you have, but who you are.",
            "Inspiration",
        ),
    ]
    .into_iter()
    .map(|(id, text, category)| {
        let mut quote = Quote::new_local(id, QuoteContent::new(text, category), timestamp);
        quote.pending_create = false;
        quote
    })
    .collect()
}
