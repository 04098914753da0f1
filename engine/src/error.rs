//! Error types for the quotesync engine.

use crate::QuoteId;
use thiserror::Error;

/// All possible errors from the quotesync engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    // Validation errors
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    // Lookup errors
    #[error("quote not found: {0}")]
    QuoteNotFound(QuoteId),

    #[error("no unresolved conflict for quote: {0}")]
    NoUnresolvedConflict(QuoteId),

    // State errors
    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(String),
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;
