//! Reconciliation of a fetched remote page against the local store.
//!
//! This is a three-way comparison: the local record, the remote record and
//! the shadow fingerprint remembered from the last successful sync.
//!
//! # Algorithm
//!
//! For every remote record (last occurrence wins if an id repeats):
//!
//! 1. Unknown locally: insert it and remember its fingerprint.
//! 2. Same content on both sides: remember the fingerprint.
//! 3. Different content: apply the remote value (server wins by default),
//!    open a conflict unless one is already open for the id, and remember
//!    the remote fingerprint.
//!
//! Local records the remote does not mention are left alone, and records
//! still waiting for their create round-trip are never compared.

use crate::{ConflictLog, Fingerprint, Quote, QuoteId, ShadowTable, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// How local and remote content relate to the shadow when they differ.
///
/// Every kind is handled the same way (remote applied, conflict opened);
/// the classification is reported so callers can tell a true conflict from
/// a one-sided change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Divergence {
    /// Both sides changed since the last sync
    BothChanged,
    /// Only the local record changed since the last sync
    LocalChanged,
    /// Only the remote record changed since the last sync
    RemoteChanged,
    /// No shadow entry to compare against
    NoBase,
}

impl Divergence {
    fn classify(local: &Fingerprint, remote: &Fingerprint, shadow: Option<&Fingerprint>) -> Self {
        match shadow {
            None => Divergence::NoBase,
            Some(base) if remote == base => Divergence::LocalChanged,
            Some(base) if local == base => Divergence::RemoteChanged,
            Some(_) => Divergence::BothChanged,
        }
    }

    /// Whether both sides moved away from the common base.
    pub fn is_true_conflict(&self) -> bool {
        matches!(self, Divergence::BothChanged)
    }
}

/// A local record overwritten by its remote counterpart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DivergedQuote {
    pub id: QuoteId,
    pub divergence: Divergence,
    /// False when a conflict for the id was already open
    pub conflict_opened: bool,
}

/// Result of reconciliation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileResult {
    /// Remote records that were new locally
    pub added: Vec<QuoteId>,
    /// Records whose content already matched
    pub in_sync: Vec<QuoteId>,
    /// Records where the remote value replaced differing local content
    pub diverged: Vec<DivergedQuote>,
    /// Remote ids that matched a local record still pending creation
    pub skipped_pending: Vec<QuoteId>,
}

impl ReconcileResult {
    fn new() -> Self {
        Self::default()
    }

    /// Number of conflicts opened by this pass.
    pub fn conflicts_opened(&self) -> usize {
        self.diverged.iter().filter(|d| d.conflict_opened).count()
    }

    /// Whether the pass changed any local content.
    pub fn changed_local(&self) -> bool {
        !self.added.is_empty() || !self.diverged.is_empty()
    }
}

/// Applies one remote page to the local tables.
///
/// Borrows the store's three tables for the duration of the pass so it has
/// exclusive write access to all of them at once.
pub struct Reconciler<'a> {
    quotes: &'a mut Vec<Quote>,
    shadow: &'a mut ShadowTable,
    conflicts: &'a mut ConflictLog,
    /// Position of each local id in `quotes`
    index: HashMap<QuoteId, usize>,
    now: Timestamp,
    /// Result being built
    result: ReconcileResult,
}

impl<'a> Reconciler<'a> {
    /// Create a new reconciler over the given tables.
    pub fn new(
        quotes: &'a mut Vec<Quote>,
        shadow: &'a mut ShadowTable,
        conflicts: &'a mut ConflictLog,
        now: Timestamp,
    ) -> Self {
        let index = quotes
            .iter()
            .enumerate()
            .map(|(i, q)| (q.id.clone(), i))
            .collect();
        Self {
            quotes,
            shadow,
            conflicts,
            index,
            now,
            result: ReconcileResult::new(),
        }
    }

    /// Reconcile the remote records into the local tables.
    pub fn reconcile(mut self, remote: Vec<Quote>) -> ReconcileResult {
        for remote_quote in dedup_last_wins(remote) {
            self.apply_remote(remote_quote);
        }
        self.result
    }

    fn apply_remote(&mut self, remote: Quote) {
        let remote_fp = remote.fingerprint();

        let Some(&position) = self.index.get(&remote.id) else {
            self.shadow.record(remote.id.clone(), remote_fp, self.now);
            self.index.insert(remote.id.clone(), self.quotes.len());
            self.result.added.push(remote.id.clone());
            self.quotes.push(remote);
            return;
        };

        let local = &mut self.quotes[position];
        if local.pending_create {
            self.result.skipped_pending.push(remote.id);
            return;
        }

        let local_fp = local.fingerprint();
        if local_fp == remote_fp {
            self.shadow.record(remote.id.clone(), remote_fp, self.now);
            self.result.in_sync.push(remote.id);
            return;
        }

        let divergence =
            Divergence::classify(&local_fp, &remote_fp, self.shadow.fingerprint(&remote.id));
        let local_content = local.content();
        let remote_content = remote.content();
        let id = remote.id.clone();

        // Server wins until the user says otherwise.
        *local = remote;
        let conflict_opened = self
            .conflicts
            .record(id.clone(), local_content, remote_content, self.now);
        self.shadow.record(id.clone(), remote_fp, self.now);

        self.result.diverged.push(DivergedQuote {
            id,
            divergence,
            conflict_opened,
        });
    }
}

/// Drop earlier duplicates of an id, keeping each id at its first position
/// with the content of its last occurrence.
fn dedup_last_wins(remote: Vec<Quote>) -> Vec<Quote> {
    let mut positions: HashMap<QuoteId, usize> = HashMap::new();
    let mut unique: Vec<Quote> = Vec::with_capacity(remote.len());
    for quote in remote {
        match positions.get(&quote.id) {
            Some(&i) => unique[i] = quote,
            None => {
                positions.insert(quote.id.clone(), unique.len());
                unique.push(quote);
            }
        }
    }
    unique
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{QuoteContent, Source};

    fn server(id: &str, text: &str, category: &str) -> Quote {
        Quote::from_server(id, QuoteContent::new(text, category), 5000)
    }

    fn settled(id: &str, text: &str, category: &str) -> Quote {
        let mut quote = Quote::new_local(id, QuoteContent::new(text, category), 1000);
        quote.pending_create = false;
        quote
    }

    fn fp(text: &str, category: &str) -> Fingerprint {
        QuoteContent::new(text, category).fingerprint()
    }

    struct Tables {
        quotes: Vec<Quote>,
        shadow: ShadowTable,
        conflicts: ConflictLog,
    }

    impl Tables {
        fn new(quotes: Vec<Quote>) -> Self {
            Self {
                quotes,
                shadow: ShadowTable::new(),
                conflicts: ConflictLog::new(),
            }
        }

        fn reconcile(&mut self, remote: Vec<Quote>) -> ReconcileResult {
            Reconciler::new(&mut self.quotes, &mut self.shadow, &mut self.conflicts, 9000)
                .reconcile(remote)
        }

        fn quote(&self, id: &str) -> &Quote {
            self.quotes.iter().find(|q| q.id == id).unwrap()
        }
    }

    #[test]
    fn reconcile_adds_unknown_remote() {
        let mut tables = Tables::new(vec![settled("1", "A", "X")]);

        let result = tables.reconcile(vec![server("7", "Z", "Y")]);

        assert_eq!(result.added, vec!["7".to_string()]);
        assert_eq!(tables.quotes.len(), 2);
        assert_eq!(tables.quote("7").source, Source::Server);
        assert_eq!(tables.shadow.fingerprint("7"), Some(&fp("Z", "Y")));
        assert!(tables.conflicts.is_empty());
    }

    #[test]
    fn reconcile_in_sync_updates_shadow_only() {
        let mut tables = Tables::new(vec![settled("1", "A", "X")]);

        let result = tables.reconcile(vec![server("1", "A", "X")]);

        assert_eq!(result.in_sync, vec!["1".to_string()]);
        assert_eq!(tables.shadow.fingerprint("1"), Some(&fp("A", "X")));
        assert!(tables.conflicts.is_empty());
        // Local record is kept as is
        assert_eq!(tables.quote("1").source, Source::Local);
    }

    #[test]
    fn reconcile_both_changed_opens_conflict() {
        let mut tables = Tables::new(vec![settled("5", "A", "X")]);
        tables.shadow.record("5", fp("Base", "X"), 500);

        let result = tables.reconcile(vec![server("5", "B", "X")]);

        assert_eq!(result.diverged[0].divergence, Divergence::BothChanged);
        assert!(result.diverged[0].divergence.is_true_conflict());
        assert_eq!(tables.quote("5").text, "B");
        let conflict = tables.conflicts.unresolved("5").unwrap();
        assert_eq!(conflict.local, QuoteContent::new("A", "X"));
        assert_eq!(conflict.server, QuoteContent::new("B", "X"));
        assert_eq!(tables.shadow.fingerprint("5"), Some(&fp("B", "X")));
    }

    #[test]
    fn reconcile_remote_changed_still_opens_conflict() {
        let mut tables = Tables::new(vec![settled("5", "A", "X")]);
        tables.shadow.record("5", fp("A", "X"), 500);

        let result = tables.reconcile(vec![server("5", "B", "X")]);

        assert_eq!(result.diverged[0].divergence, Divergence::RemoteChanged);
        assert_eq!(result.conflicts_opened(), 1);
        assert_eq!(tables.quote("5").text, "B");
        assert_eq!(tables.shadow.fingerprint("5"), Some(&fp("B", "X")));
    }

    #[test]
    fn reconcile_local_changed_server_wins() {
        let mut tables = Tables::new(vec![settled("5", "A (edited locally)", "X")]);
        tables.shadow.record("5", fp("A", "X"), 500);

        let result = tables.reconcile(vec![server("5", "A", "X")]);

        assert_eq!(result.diverged[0].divergence, Divergence::LocalChanged);
        assert_eq!(tables.quote("5").text, "A");
        assert_eq!(
            tables.conflicts.unresolved("5").unwrap().local.text,
            "A (edited locally)"
        );
    }

    #[test]
    fn reconcile_without_shadow() {
        let mut tables = Tables::new(vec![settled("5", "A", "X")]);

        let result = tables.reconcile(vec![server("5", "B", "X")]);

        assert_eq!(result.diverged[0].divergence, Divergence::NoBase);
        assert!(tables.conflicts.has_unresolved("5"));
        assert_eq!(tables.shadow.fingerprint("5"), Some(&fp("B", "X")));
    }

    #[test]
    fn reconcile_twice_keeps_single_open_conflict() {
        let mut tables = Tables::new(vec![settled("5", "A", "X")]);
        tables.shadow.record("5", fp("A", "X"), 500);

        tables.reconcile(vec![server("5", "B", "X")]);
        // Local edit after the first pass diverges again
        tables.quotes[0].text = "C".into();
        let result = tables.reconcile(vec![server("5", "B", "X")]);

        assert!(!result.diverged[0].conflict_opened);
        assert_eq!(tables.conflicts.pending_count(), 1);
        assert_eq!(tables.conflicts.len(), 1);
    }

    #[test]
    fn reconcile_leaves_local_only_records() {
        let pending = Quote::new_local("tmp-1", QuoteContent::new("New", "Y"), 1000);
        let mut tables = Tables::new(vec![settled("1", "A", "X"), pending.clone()]);

        tables.reconcile(vec![server("2", "B", "X")]);

        assert_eq!(tables.quote("1").text, "A");
        assert_eq!(tables.quote("tmp-1"), &pending);
        assert!(tables.shadow.get("1").is_none());
        assert!(tables.shadow.get("tmp-1").is_none());
    }

    #[test]
    fn reconcile_skips_pending_create() {
        let pending = Quote::new_local("tmp-1", QuoteContent::new("New", "Y"), 1000);
        let mut tables = Tables::new(vec![pending.clone()]);

        let result = tables.reconcile(vec![server("tmp-1", "Other", "Y")]);

        assert_eq!(result.skipped_pending, vec!["tmp-1".to_string()]);
        assert_eq!(tables.quotes, vec![pending]);
        assert!(tables.conflicts.is_empty());
        assert!(tables.shadow.is_empty());
    }

    #[test]
    fn reconcile_duplicate_remote_ids_last_wins() {
        let mut tables = Tables::new(vec![]);

        let result = tables.reconcile(vec![
            server("1", "First", "X"),
            server("2", "Other", "X"),
            server("1", "Second", "X"),
        ]);

        assert_eq!(result.added, vec!["1".to_string(), "2".to_string()]);
        assert_eq!(tables.quotes.len(), 2);
        assert_eq!(tables.quote("1").text, "Second");
    }

    #[test]
    fn reconcile_multiple_records_mixed() {
        let mut tables = Tables::new(vec![
            settled("1", "Same", "X"),
            settled("2", "Mine", "X"),
            settled("3", "Untouched", "X"),
        ]);

        let result = tables.reconcile(vec![
            server("1", "Same", "X"),
            server("2", "Theirs", "X"),
            server("4", "New", "Y"),
        ]);

        assert_eq!(result.in_sync, vec!["1".to_string()]);
        assert_eq!(result.diverged.len(), 1);
        assert_eq!(result.added, vec!["4".to_string()]);
        assert!(result.changed_local());
        assert_eq!(tables.quotes.len(), 4);
        assert_eq!(tables.quote("3").text, "Untouched");
        assert_eq!(tables.shadow.len(), 3);
    }

    // Property-based tests using proptest
    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        fn arb_text() -> impl Strategy<Value = String> {
            prop_oneof![Just("A".to_string()), Just("B".to_string()), Just("C".to_string())]
        }

        proptest! {
            #[test]
            fn prop_shadow_matches_retained_content(
                local in arb_text(),
                remote in arb_text(),
                base in proptest::option::of(arb_text()),
            ) {
                let mut tables = Tables::new(vec![settled("5", &local, "X")]);
                if let Some(base) = &base {
                    tables.shadow.record("5", fp(base, "X"), 500);
                }

                tables.reconcile(vec![server("5", &remote, "X")]);

                let retained = tables.quote("5").fingerprint();
                prop_assert_eq!(tables.shadow.fingerprint("5"), Some(&retained));
                prop_assert_eq!(&tables.quote("5").text, &remote);
            }

            #[test]
            fn prop_conflict_iff_divergence(
                local in arb_text(),
                remote in arb_text(),
            ) {
                let mut tables = Tables::new(vec![settled("5", &local, "X")]);

                tables.reconcile(vec![server("5", &remote, "X")]);

                prop_assert_eq!(tables.conflicts.has_unresolved("5"), local != remote);
            }

            #[test]
            fn prop_reconcile_idempotent(
                local in arb_text(),
                remote in arb_text(),
                base in proptest::option::of(arb_text()),
            ) {
                let mut tables = Tables::new(vec![settled("5", &local, "X")]);
                if let Some(base) = &base {
                    tables.shadow.record("5", fp(base, "X"), 500);
                }

                tables.reconcile(vec![server("5", &remote, "X")]);
                let quotes_once = tables.quotes.clone();
                let conflicts_once = tables.conflicts.clone();
                tables.reconcile(vec![server("5", &remote, "X")]);

                prop_assert_eq!(&tables.quotes, &quotes_once);
                prop_assert_eq!(&tables.conflicts, &conflicts_once);
                prop_assert!(tables.conflicts.pending_count() <= 1);
            }
        }
    }
}
