//! Store - the in-memory state container.
//!
//! The store owns the three tables that make up local state: the quote
//! list, the shadow table and the conflict log. All mutation goes through
//! its methods, so whoever holds the store exclusively is the single writer.

use crate::{
    conflict::Resolution,
    error::Result,
    reconcile::{ReconcileResult, Reconciler},
    snapshot::StoreSnapshot,
    CategoryFilter, Conflict, ConflictLog, Error, Quote, QuoteContent, QuoteId, ShadowTable,
    Source, Timestamp,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// What happened when the remote acknowledged a create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "outcome")]
pub enum CreateOutcome {
    /// The quote now carries the remote-assigned id
    Assigned { id: QuoteId },
    /// The assigned id already belongs to another quote; the temporary id is kept
    Collided { kept_id: QuoteId, assigned_id: QuoteId },
}

impl CreateOutcome {
    /// The id the quote ended up with.
    pub fn id(&self) -> &QuoteId {
        match self {
            CreateOutcome::Assigned { id } => id,
            CreateOutcome::Collided { kept_id, .. } => kept_id,
        }
    }
}

/// A conflict closed by a user decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub conflict: Conflict,
    pub resolution: Resolution,
}

impl Resolved {
    /// Content that should be propagated to the remote, if any.
    pub fn to_push(&self) -> Option<(&str, &QuoteContent)> {
        match self.resolution {
            Resolution::KeepLocal => Some((&self.conflict.id, &self.conflict.local)),
            Resolution::KeepServer | Resolution::Dismiss => None,
        }
    }
}

/// The main store holding all state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuoteStore {
    /// Quotes in insertion order
    quotes: Vec<Quote>,
    shadow: ShadowTable,
    conflicts: ConflictLog,
}

impl QuoteStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding only the built-in seed quotes.
    pub fn with_seed(timestamp: Timestamp) -> Self {
        Self {
            quotes: crate::quote::seed_quotes(timestamp),
            ..Self::default()
        }
    }

    pub fn quotes(&self) -> &[Quote] {
        &self.quotes
    }

    pub fn shadow(&self) -> &ShadowTable {
        &self.shadow
    }

    pub fn conflicts(&self) -> &ConflictLog {
        &self.conflicts
    }

    /// Get a quote by ID.
    pub fn get(&self, id: &str) -> Option<&Quote> {
        self.quotes.iter().find(|q| q.id == id)
    }

    fn get_mut(&mut self, id: &str) -> Option<&mut Quote> {
        self.quotes.iter_mut().find(|q| q.id == id)
    }

    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }

    /// Add a quote entered by the user.
    ///
    /// The quote gets `temp_id` and stays pending until the remote assigns an id.
    pub fn add_quote(
        &mut self,
        temp_id: impl Into<QuoteId>,
        text: &str,
        category: &str,
        timestamp: Timestamp,
    ) -> Result<&Quote> {
        let content = QuoteContent::from_input(text, category)?;
        self.quotes.push(Quote::new_local(temp_id, content, timestamp));
        let index = self.quotes.len() - 1;
        Ok(&self.quotes[index])
    }

    /// Change a quote's content locally. The shadow is left alone, so the
    /// next sync sees a local change.
    pub fn edit_quote(
        &mut self,
        id: &str,
        content: QuoteContent,
        timestamp: Timestamp,
    ) -> Result<&Quote> {
        let quote = self
            .get_mut(id)
            .ok_or_else(|| Error::QuoteNotFound(id.to_string()))?;
        quote.set_content(content, timestamp, Source::Local);
        Ok(quote)
    }

    /// Distinct categories, sorted.
    pub fn categories(&self) -> Vec<String> {
        self.quotes
            .iter()
            .map(|q| q.category.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Quotes matching the filter, in insertion order.
    pub fn filter(&self, filter: &CategoryFilter) -> Vec<&Quote> {
        self.quotes
            .iter()
            .filter(|q| filter.matches(&q.category))
            .collect()
    }

    /// Quotes still waiting for their create round-trip.
    pub fn pending_creates(&self) -> Vec<Quote> {
        self.quotes
            .iter()
            .filter(|q| q.pending_create)
            .cloned()
            .collect()
    }

    /// Record a successful create: swap in the assigned id, clear the
    /// pending flag and seed the shadow.
    pub fn confirm_create(
        &mut self,
        temp_id: &str,
        assigned_id: &str,
        timestamp: Timestamp,
    ) -> Result<CreateOutcome> {
        let collides = assigned_id != temp_id && self.get(assigned_id).is_some();
        let quote = self
            .quotes
            .iter_mut()
            .find(|q| q.id == temp_id && q.pending_create)
            .ok_or_else(|| Error::QuoteNotFound(temp_id.to_string()))?;

        let outcome = if collides {
            CreateOutcome::Collided {
                kept_id: temp_id.to_string(),
                assigned_id: assigned_id.to_string(),
            }
        } else {
            quote.id = assigned_id.to_string();
            CreateOutcome::Assigned {
                id: assigned_id.to_string(),
            }
        };
        quote.pending_create = false;

        let fingerprint = quote.fingerprint();
        self.shadow
            .record(outcome.id().clone(), fingerprint, timestamp);
        Ok(outcome)
    }

    /// Reconcile a fetched remote page into local state.
    pub fn reconcile(&mut self, remote: Vec<Quote>, timestamp: Timestamp) -> ReconcileResult {
        Reconciler::new(
            &mut self.quotes,
            &mut self.shadow,
            &mut self.conflicts,
            timestamp,
        )
        .reconcile(remote)
    }

    /// Open conflicts in creation order.
    pub fn open_conflicts(&self) -> Vec<&Conflict> {
        self.conflicts.pending().collect()
    }

    /// Apply a user decision to the open conflict for `id`.
    pub fn resolve(
        &mut self,
        id: &str,
        resolution: Resolution,
        timestamp: Timestamp,
    ) -> Result<Resolved> {
        let conflict = self
            .conflicts
            .unresolved(id)
            .cloned()
            .ok_or_else(|| Error::NoUnresolvedConflict(id.to_string()))?;

        match resolution {
            Resolution::KeepServer => {
                // The remote value was applied during reconciliation.
                self.shadow
                    .record(id, conflict.server.fingerprint(), timestamp);
            }
            Resolution::KeepLocal => {
                if let Some(quote) = self.get_mut(id) {
                    quote.set_content(conflict.local.clone(), timestamp, Source::Local);
                }
                self.shadow
                    .record(id, conflict.local.fingerprint(), timestamp);
            }
            Resolution::Dismiss => {}
        }

        let conflict = self.conflicts.mark_resolved(id)?;
        Ok(Resolved {
            conflict,
            resolution,
        })
    }

    /// Export the current store state as a snapshot.
    pub fn export_state(&self) -> StoreSnapshot {
        StoreSnapshot {
            quotes: self.quotes.clone(),
            shadow: self.shadow.clone(),
            conflicts: self.conflicts.clone(),
        }
    }

    /// Build a store from a snapshot after validating it.
    pub fn import_state(snapshot: StoreSnapshot) -> Result<Self> {
        snapshot.validate()?;
        Ok(Self {
            quotes: snapshot.quotes,
            shadow: snapshot.shadow,
            conflicts: snapshot.conflicts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fp(text: &str, category: &str) -> crate::Fingerprint {
        QuoteContent::new(text, category).fingerprint()
    }

    fn server(id: &str, text: &str, category: &str) -> Quote {
        Quote::from_server(id, QuoteContent::new(text, category), 5000)
    }

    /// Store with quote "5" = {A, X} agreed with the remote.
    fn synced_store() -> QuoteStore {
        let mut store = QuoteStore::new();
        store.reconcile(vec![server("5", "A", "X")], 1000);
        store
    }

    #[test]
    fn seed_store() {
        let store = QuoteStore::with_seed(1000);
        assert_eq!(store.len(), 3);
        assert!(store.shadow().is_empty());
        assert!(store.conflicts().is_empty());
    }

    #[test]
    fn add_quote_pending() {
        let mut store = QuoteStore::new();
        let quote = store.add_quote("tmp-1", " Be kind ", " Life ", 1000).unwrap();

        assert_eq!(quote.id, "tmp-1");
        assert_eq!(quote.text, "Be kind");
        assert!(quote.pending_create);
        assert_eq!(store.pending_creates().len(), 1);
    }

    #[test]
    fn add_quote_missing_field() {
        let mut store = QuoteStore::new();
        assert_eq!(
            store.add_quote("tmp-1", "Be kind", "  ", 1000).unwrap_err(),
            Error::MissingField("category")
        );
        assert!(store.is_empty());
    }

    #[test]
    fn categories_sorted_unique() {
        let store = QuoteStore::with_seed(1000);
        assert_eq!(
            store.categories(),
            vec!["Inspiration", "Motivation", "Persistence"]
        );
    }

    #[test]
    fn filter_by_category() {
        let mut store = QuoteStore::with_seed(1000);
        store.add_quote("tmp-1", "Keep at it.", "Persistence", 2000).unwrap();

        let all = store.filter(&CategoryFilter::All);
        assert_eq!(all.len(), 4);

        let persistence = store.filter(&CategoryFilter::Category("Persistence".into()));
        let ids: Vec<_> = persistence.iter().map(|q| q.id.as_str()).collect();
        assert_eq!(ids, vec!["2", "tmp-1"]);

        assert!(store
            .filter(&CategoryFilter::Category("Humor".into()))
            .is_empty());
    }

    #[test]
    fn confirm_create_assigns_id_and_shadow() {
        let mut store = QuoteStore::new();
        store.add_quote("tmp-1", "New", "Y", 1000).unwrap();

        let outcome = store.confirm_create("tmp-1", "101", 2000).unwrap();

        assert_eq!(outcome, CreateOutcome::Assigned { id: "101".into() });
        let quote = store.get("101").unwrap();
        assert!(!quote.pending_create);
        assert!(store.get("tmp-1").is_none());
        assert_eq!(store.shadow().fingerprint("101"), Some(&fp("New", "Y")));
    }

    #[test]
    fn confirm_create_collision_keeps_temp_id() {
        let mut store = QuoteStore::new();
        store.add_quote("tmp-1", "First", "Y", 1000).unwrap();
        store.add_quote("tmp-2", "Second", "Y", 1000).unwrap();
        store.confirm_create("tmp-1", "101", 2000).unwrap();

        let outcome = store.confirm_create("tmp-2", "101", 2000).unwrap();

        assert_eq!(outcome.id(), "tmp-2");
        assert!(matches!(outcome, CreateOutcome::Collided { .. }));
        assert_eq!(store.get("101").unwrap().text, "First");
        assert!(!store.get("tmp-2").unwrap().pending_create);
        assert_eq!(store.shadow().fingerprint("tmp-2"), Some(&fp("Second", "Y")));
    }

    #[test]
    fn confirm_create_unknown() {
        let mut store = QuoteStore::with_seed(1000);
        // Seed quotes are not pending
        assert_eq!(
            store.confirm_create("1", "101", 2000),
            Err(Error::QuoteNotFound("1".into()))
        );
    }

    #[test]
    fn resolve_keep_local_restores_snapshot() {
        let mut store = synced_store();
        store.edit_quote("5", QuoteContent::new("Mine", "X"), 2000).unwrap();
        store.reconcile(vec![server("5", "B", "X")], 3000);
        assert_eq!(store.get("5").unwrap().text, "B");

        let resolved = store.resolve("5", Resolution::KeepLocal, 4000).unwrap();

        let quote = store.get("5").unwrap();
        assert_eq!(quote.text, "Mine");
        assert_eq!(quote.source, Source::Local);
        assert_eq!(quote.updated_at, 4000);
        assert!(resolved.conflict.resolved);
        assert_eq!(
            resolved.to_push(),
            Some(("5", &QuoteContent::new("Mine", "X")))
        );
        assert_eq!(store.shadow().fingerprint("5"), Some(&fp("Mine", "X")));
        assert!(store.open_conflicts().is_empty());
    }

    #[test]
    fn resolve_keep_server_only_touches_shadow() {
        let mut store = synced_store();
        store.edit_quote("5", QuoteContent::new("Mine", "X"), 2000).unwrap();
        store.reconcile(vec![server("5", "B", "X")], 3000);
        let before = store.get("5").cloned();

        let resolved = store.resolve("5", Resolution::KeepServer, 4000).unwrap();

        assert_eq!(store.get("5").cloned(), before);
        assert_eq!(resolved.to_push(), None);
        assert_eq!(store.shadow().fingerprint("5"), Some(&fp("B", "X")));
        assert_eq!(store.shadow().get("5").unwrap().updated_at, 4000);
    }

    #[test]
    fn resolve_dismiss_changes_nothing_else() {
        let mut store = synced_store();
        store.edit_quote("5", QuoteContent::new("Mine", "X"), 2000).unwrap();
        store.reconcile(vec![server("5", "B", "X")], 3000);
        let quotes = store.quotes().to_vec();
        let shadow = store.shadow().clone();

        store.resolve("5", Resolution::Dismiss, 4000).unwrap();

        assert_eq!(store.quotes(), quotes.as_slice());
        assert_eq!(store.shadow(), &shadow);
        assert_eq!(store.conflicts().pending_count(), 0);
        assert_eq!(store.conflicts().len(), 1);
    }

    #[test]
    fn resolve_without_conflict_is_rejected() {
        let mut store = synced_store();
        let before = store.clone();

        assert_eq!(
            store.resolve("5", Resolution::KeepLocal, 4000),
            Err(Error::NoUnresolvedConflict("5".into()))
        );
        assert_eq!(store, before);
    }

    #[test]
    fn edit_unknown_quote() {
        let mut store = QuoteStore::new();
        assert_eq!(
            store
                .edit_quote("9", QuoteContent::new("A", "X"), 1000)
                .unwrap_err(),
            Error::QuoteNotFound("9".into())
        );
    }

    #[test]
    fn export_import_roundtrip() {
        let mut store = synced_store();
        store.add_quote("tmp-1", "New", "Y", 2000).unwrap();
        store.edit_quote("5", QuoteContent::new("Mine", "X"), 2000).unwrap();
        store.reconcile(vec![server("5", "B", "X")], 3000);

        let restored = QuoteStore::import_state(store.export_state()).unwrap();

        assert_eq!(restored, store);
    }
}
