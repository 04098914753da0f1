//! Local persistence of the store.
//!
//! Each table lives in its own JSON file inside the data directory and is
//! read independently at startup. A missing or corrupt table is replaced by
//! its default (seed quotes, empty shadow, empty conflict log) so the client
//! always starts in a usable state.

use crate::error::Result;
use quotesync_engine::{CategoryFilter, QuoteStore, StoreSnapshot, Timestamp};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

const QUOTES_FILE: &str = "quotes.json";
const SHADOW_FILE: &str = "sync_shadow.json";
const CONFLICTS_FILE: &str = "conflicts.json";
const SELECTED_CATEGORY_FILE: &str = "selected_category";

/// File-backed storage for the three local tables.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    dir: PathBuf,
}

impl LocalStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Load the store, falling back to defaults table by table.
    pub fn load(&self, now: Timestamp) -> QuoteStore {
        let quotes = self
            .read_table(QUOTES_FILE, StoreSnapshot::quotes_from_json)
            .unwrap_or_else(|| quotesync_engine::seed_quotes(now));
        let shadow = self
            .read_table(SHADOW_FILE, StoreSnapshot::shadow_from_json)
            .unwrap_or_default();
        let conflicts = self
            .read_table(CONFLICTS_FILE, StoreSnapshot::conflicts_from_json)
            .unwrap_or_default();

        let snapshot = StoreSnapshot {
            quotes,
            shadow,
            conflicts,
        };
        match QuoteStore::import_state(snapshot) {
            Ok(store) => store,
            Err(e) => {
                tracing::warn!(error = %e, "Persisted state rejected, starting from seed");
                QuoteStore::with_seed(now)
            }
        }
    }

    /// Rewrite all three tables.
    pub fn save(&self, store: &QuoteStore) -> Result<()> {
        let snapshot = store.export_state();
        fs::create_dir_all(&self.dir)?;
        self.write_atomic(QUOTES_FILE, &snapshot.quotes_to_json()?)?;
        self.write_atomic(SHADOW_FILE, &snapshot.shadow_to_json()?)?;
        self.write_atomic(CONFLICTS_FILE, &snapshot.conflicts_to_json()?)?;
        tracing::debug!(dir = %self.dir.display(), quotes = store.len(), "State saved");
        Ok(())
    }

    /// The category filter chosen last time, `all` if none.
    pub fn load_selected_category(&self) -> CategoryFilter {
        match fs::read_to_string(self.dir.join(SELECTED_CATEGORY_FILE)) {
            Ok(s) => s.parse::<CategoryFilter>().unwrap_or_default(),
            Err(_) => CategoryFilter::All,
        }
    }

    pub fn save_selected_category(&self, filter: &CategoryFilter) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        self.write_atomic(SELECTED_CATEGORY_FILE, &filter.to_string())?;
        Ok(())
    }

    fn read_table<T>(
        &self,
        file: &str,
        parse: fn(&str) -> quotesync_engine::error::Result<T>,
    ) -> Option<T> {
        let path = self.dir.join(file);
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No persisted table, using default");
                return None;
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Unreadable table, using default");
                return None;
            }
        };

        match parse(&contents) {
            Ok(table) => Some(table),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Corrupt table, using default");
                None
            }
        }
    }

    fn write_atomic(&self, file: &str, contents: &str) -> io::Result<()> {
        let path = self.dir.join(file);
        let tmp = self.dir.join(format!(".{file}.tmp"));
        fs::write(&tmp, contents)?;
        fs::rename(&tmp, &path)
    }
}
