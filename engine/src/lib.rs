//! # quotesync engine
//!
//! The reconciliation core of an offline-first quote collection.
//!
//! This crate holds the local state (quotes, shadow fingerprints and
//! conflicts) and decides, record by record, how a fetched remote page is
//! merged into it.
//!
//! ## Design Principles
//!
//! - **No IO**: the engine knows nothing about files, network or clocks;
//!   callers pass timestamps in
//! - **Deterministic**: the same inputs always produce the same state
//! - **Server wins, user decides**: divergent content is replaced by the
//!   remote value and a conflict is opened so the user can restore theirs
//!
//! ## Core Concepts
//!
//! ### Quotes
//!
//! A [`Quote`] has an id, content ([`QuoteContent`]: text and category),
//! an update timestamp, a [`Source`] and a pending-create flag. Quotes added
//! locally carry a temporary `tmp-` id until the remote assigns one.
//!
//! ### Fingerprints and the shadow
//!
//! A [`Fingerprint`] digests content only. The [`ShadowTable`] remembers,
//! per id, the fingerprint both sides agreed on at the last sync; it is the
//! base of the three-way comparison.
//!
//! ### Reconciliation
//!
//! The [`Reconciler`] applies a remote page. New ids are added, matching
//! content refreshes the shadow, and divergent content is overwritten by the
//! remote value while a [`Conflict`] is recorded (at most one open per id).
//!
//! ### Resolution
//!
//! [`QuoteStore::resolve`] closes a conflict with a [`Resolution`]:
//! keep the server value, restore the local one, or dismiss.
//!
//! ## Quick Start
//!
//! ```rust
//! use quotesync_engine::{Quote, QuoteContent, QuoteStore, Resolution};
//!
//! let mut store = QuoteStore::new();
//! store.reconcile(vec![Quote::from_server("5", QuoteContent::new("A", "X"), 1000)], 1000);
//!
//! // Local edit, then the remote changes too
//! store.edit_quote("5", QuoteContent::new("Mine", "X"), 2000).unwrap();
//! let result = store.reconcile(
//!     vec![Quote::from_server("5", QuoteContent::new("B", "X"), 3000)],
//!     3000,
//! );
//! assert_eq!(result.conflicts_opened(), 1);
//! assert_eq!(store.get("5").unwrap().text, "B");
//!
//! // The user restores their version
//! store.resolve("5", Resolution::KeepLocal, 4000).unwrap();
//! assert_eq!(store.get("5").unwrap().text, "Mine");
//! ```
//!
//! ## Persistence
//!
//! Use [`QuoteStore::export_state`] and [`QuoteStore::import_state`] with
//! [`StoreSnapshot`], whose tables serialize to JSON independently.

pub mod conflict;
pub mod error;
pub mod filter;
pub mod fingerprint;
pub mod quote;
pub mod reconcile;
pub mod shadow;
pub mod snapshot;
pub mod store;

// Re-export main types at crate root
pub use conflict::{Conflict, ConflictLog, Resolution};
pub use error::Error;
pub use filter::CategoryFilter;
pub use fingerprint::Fingerprint;
pub use quote::{seed_quotes, Quote, QuoteContent, Source, FALLBACK_CATEGORY, TEMP_ID_PREFIX};
pub use reconcile::{DivergedQuote, Divergence, ReconcileResult, Reconciler};
pub use shadow::{ShadowEntry, ShadowTable};
pub use snapshot::StoreSnapshot;
pub use store::{CreateOutcome, QuoteStore, Resolved};

/// Type aliases for clarity
pub type QuoteId = String;
pub type Timestamp = u64;
