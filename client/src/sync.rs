//! Sync cycle orchestration.
//!
//! [`SyncEngine`] owns the store and is the only writer to it. A cycle runs
//! in order:
//!
//! 1. Push quotes pending creation, swapping in the remote-assigned ids
//! 2. Fetch a bounded page of remote quotes
//! 3. Reconcile the page into the store
//! 4. Persist quotes, shadow and conflicts
//!
//! Any failure aborts the rest of the cycle. Creates that already succeeded
//! stay committed because each one is persisted as soon as it lands.
//!
//! The store mutex is never held across a network call, so reads, adds and
//! resolutions proceed while a cycle waits on the remote.

use crate::error::{AppError, Result};
use crate::remote::RemoteStore;
use crate::status::Status;
use crate::storage::LocalStorage;
use chrono::{DateTime, Local, Utc};
use quotesync_engine::{
    CreateOutcome, Quote, QuoteContent, QuoteId, QuoteStore, ReconcileResult, Resolution,
    Resolved, Timestamp, TEMP_ID_PREFIX,
};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;

/// Suffix appended by [`SyncEngine::simulate_local_edit`].
const SIMULATED_EDIT_SUFFIX: &str = " (edited locally)";

/// Current wall-clock time in milliseconds since epoch.
pub fn now_millis() -> Timestamp {
    Utc::now().timestamp_millis().max(0) as Timestamp
}

/// A fresh temporary id for a quote the remote has not seen yet.
pub fn temp_id() -> QuoteId {
    format!("{TEMP_ID_PREFIX}{}", uuid::Uuid::new_v4().simple())
}

/// Summary of a completed sync cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncReport {
    /// Outcome of each pending create that was pushed
    pub created: Vec<CreateOutcome>,
    /// Number of remote quotes fetched
    pub fetched: usize,
    pub reconcile: ReconcileResult,
    /// Unresolved conflicts after the cycle
    pub open_conflicts: usize,
    pub finished_at: DateTime<Utc>,
}

impl SyncReport {
    pub fn status(&self) -> Status {
        Status::success(format!(
            "Synced at {}",
            self.finished_at.with_timezone(&Local).format("%H:%M:%S")
        ))
    }
}

/// Status shown when a cycle fails.
pub fn failure_status(err: &AppError) -> Status {
    Status::error(format!("Sync failed: {err}"))
}

/// Clears the busy flag when a cycle ends, however it ends.
struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Owns the local store and runs sync cycles and conflict resolutions
/// against a remote.
pub struct SyncEngine<R> {
    remote: R,
    storage: LocalStorage,
    store: Mutex<QuoteStore>,
    /// Set while a cycle is in flight
    busy: AtomicBool,
    fetch_limit: usize,
}

impl<R: RemoteStore> SyncEngine<R> {
    pub fn new(remote: R, storage: LocalStorage, store: QuoteStore, fetch_limit: usize) -> Self {
        Self {
            remote,
            storage,
            store: Mutex::new(store),
            busy: AtomicBool::new(false),
            fetch_limit,
        }
    }

    /// Create an engine over the state persisted in `storage`.
    pub fn open(remote: R, storage: LocalStorage, fetch_limit: usize) -> Self {
        let store = storage.load(now_millis());
        tracing::info!(
            dir = %storage.dir().display(),
            quotes = store.len(),
            open_conflicts = store.conflicts().pending_count(),
            "Loaded local state"
        );
        Self::new(remote, storage, store, fetch_limit)
    }

    pub fn storage(&self) -> &LocalStorage {
        &self.storage
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }

    pub fn is_syncing(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Run `f` against the current store.
    pub async fn read<T>(&self, f: impl FnOnce(&QuoteStore) -> T) -> T {
        let store = self.store.lock().await;
        f(&store)
    }

    /// Run one full sync cycle.
    ///
    /// The store is locked only while it is read or mutated, never across a
    /// network call. Fails with [`AppError::SyncInProgress`] if another cycle
    /// is running.
    pub async fn sync_now(&self) -> Result<SyncReport> {
        if self.busy.swap(true, Ordering::AcqRel) {
            return Err(AppError::SyncInProgress);
        }
        let _guard = BusyGuard(&self.busy);
        tracing::debug!("Sync cycle started");

        let created = self.push_pending_creates().await?;

        let remote = self
            .remote
            .fetch_quotes(self.fetch_limit, now_millis())
            .await?;
        let fetched = remote.len();

        let mut store = self.store.lock().await;
        let reconcile = store.reconcile(remote, now_millis());
        for diverged in &reconcile.diverged {
            tracing::info!(
                id = %diverged.id,
                divergence = ?diverged.divergence,
                conflict_opened = diverged.conflict_opened,
                "Remote value applied over local content"
            );
        }
        self.storage.save(&store)?;
        let open_conflicts = store.conflicts().pending_count();
        drop(store);

        let report = SyncReport {
            created,
            fetched,
            open_conflicts,
            reconcile,
            finished_at: Utc::now(),
        };
        tracing::info!(
            created = report.created.len(),
            fetched = report.fetched,
            added = report.reconcile.added.len(),
            diverged = report.reconcile.diverged.len(),
            open_conflicts = report.open_conflicts,
            "Sync cycle finished"
        );
        Ok(report)
    }

    /// Push the quotes pending creation when the cycle started. Quotes added
    /// meanwhile wait for the next cycle.
    async fn push_pending_creates(&self) -> Result<Vec<CreateOutcome>> {
        let pending = self.store.lock().await.pending_creates();
        let mut outcomes = Vec::new();
        for quote in pending {
            let assigned = self.remote.create_quote(&quote).await?;

            let mut store = self.store.lock().await;
            let outcome = store.confirm_create(&quote.id, &assigned, now_millis())?;
            self.storage.save(&store)?;
            drop(store);

            match &outcome {
                CreateOutcome::Assigned { id } => {
                    tracing::info!(temp_id = %quote.id, id = %id, "Created on server");
                }
                CreateOutcome::Collided {
                    kept_id,
                    assigned_id,
                } => {
                    tracing::warn!(
                        id = %kept_id,
                        assigned_id = %assigned_id,
                        "Assigned id already in use, keeping temporary id"
                    );
                }
            }
            outcomes.push(outcome);
        }
        Ok(outcomes)
    }

    /// Add a quote locally; it is pushed on the next cycle.
    pub async fn add_quote(&self, text: &str, category: &str) -> Result<Quote> {
        let mut store = self.store.lock().await;
        let quote = store
            .add_quote(temp_id(), text, category, now_millis())?
            .clone();
        self.storage.save(&store)?;
        tracing::info!(id = %quote.id, category = %quote.category, "Quote added locally");
        Ok(quote)
    }

    /// Close the open conflict for `id`.
    ///
    /// For [`Resolution::KeepLocal`] the restored content is also pushed to
    /// the remote; that push is best effort and its failure is ignored.
    pub async fn resolve(&self, id: &str, resolution: Resolution) -> Result<Resolved> {
        let resolved = {
            let mut store = self.store.lock().await;
            let resolved = store.resolve(id, resolution, now_millis())?;
            self.storage.save(&store)?;
            resolved
        };
        tracing::info!(id = %id, resolution = %resolution, "Conflict resolved");

        if let Some((id, content)) = resolved.to_push() {
            if let Err(e) = self.remote.update_quote(id, content).await {
                tracing::debug!(id = %id, error = %e, "Ignoring failed update of kept local value");
            }
        }
        Ok(resolved)
    }

    /// Edit the first quote locally without touching the shadow, so the
    /// next cycle sees a divergence. Returns `None` when there are no quotes.
    pub async fn simulate_local_edit(&self) -> Result<Option<Quote>> {
        let mut store = self.store.lock().await;
        let Some(first) = store.quotes().first() else {
            return Ok(None);
        };
        let id = first.id.clone();
        let content = QuoteContent::new(
            format!("{}{SIMULATED_EDIT_SUFFIX}", first.text),
            first.category.clone(),
        );
        let quote = store.edit_quote(&id, content, now_millis())?.clone();
        self.storage.save(&store)?;
        Ok(Some(quote))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temp_ids_are_prefixed_and_unique() {
        let a = temp_id();
        let b = temp_id();
        assert!(a.starts_with("tmp-"));
        assert_ne!(a, b);
    }

    #[test]
    fn failure_status_wraps_error() {
        let status = failure_status(&AppError::Status {
            action: "Fetch",
            status: 500,
        });
        assert!(status.is_error());
        assert_eq!(status.message, "Sync failed: Fetch failed: 500");
    }

    #[test]
    fn busy_guard_clears_flag() {
        let flag = AtomicBool::new(true);
        {
            let _guard = BusyGuard(&flag);
        }
        assert!(!flag.load(Ordering::Acquire));
    }
}
