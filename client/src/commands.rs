//! Command execution.
//!
//! Each command returns the lines to show the user. Failures the user should
//! simply be told about (a failed sync after an add, for instance) become
//! error status lines; anything else is returned as an error.

use crate::cli::Command;
use crate::error::Result;
use crate::remote::RemoteStore;
use crate::status::Status;
use crate::sync::{failure_status, SyncEngine, SyncReport};
use quotesync_engine::{CategoryFilter, Conflict, Quote, Resolution};
use rand::seq::IndexedRandom;

/// Execute a one-shot command. `Watch` is handled by the caller.
pub async fn execute<R: RemoteStore>(engine: &SyncEngine<R>, command: Command) -> Result<Vec<String>> {
    match command {
        Command::List { category } => list(engine, category).await,
        Command::Categories => Ok(categories(engine).await),
        Command::Random => Ok(random(engine).await),
        Command::Add {
            text,
            category,
            offline,
        } => add(engine, &text, &category, offline).await,
        Command::Sync => {
            let report = engine.sync_now().await?;
            Ok(sync_lines(&report))
        }
        Command::Conflicts => Ok(conflicts(engine).await),
        Command::Resolve { id, action } => resolve(engine, &id, action.into()).await,
        Command::SimulateConflict => simulate_conflict(engine).await,
        Command::Watch { .. } => Ok(vec![Status::info("Already watching.").to_string()]),
    }
}

pub fn format_quote(quote: &Quote) -> String {
    let pending = if quote.pending_create { " (pending)" } else { "" };
    format!("\"{}\" - {}{pending}", quote.text, quote.category)
}

pub fn format_conflict(conflict: &Conflict) -> String {
    format!(
        "Quote ID: {}\n  Server: \"{}\" - {}\n  Local:  \"{}\" - {}",
        conflict.id,
        conflict.server.text,
        conflict.server.category,
        conflict.local.text,
        conflict.local.category
    )
}

/// Lines describing a finished cycle.
pub fn sync_lines(report: &SyncReport) -> Vec<String> {
    let mut lines = Vec::new();
    for outcome in &report.created {
        lines.push(Status::success(format!("Created on server as {}.", outcome.id())).to_string());
    }
    lines.push(report.status().to_string());
    lines.push(format!(
        "Fetched {}, added {}, in sync {}, overwritten {}.",
        report.fetched,
        report.reconcile.added.len(),
        report.reconcile.in_sync.len(),
        report.reconcile.diverged.len()
    ));
    if report.open_conflicts > 0 {
        lines.push(format!(
            "{} unresolved conflict(s). Run `quotesync conflicts` to review.",
            report.open_conflicts
        ));
    }
    lines
}

async fn list<R: RemoteStore>(engine: &SyncEngine<R>, category: Option<String>) -> Result<Vec<String>> {
    let filter = match category {
        Some(c) => {
            let filter: CategoryFilter = c.parse().unwrap_or_default();
            engine.storage().save_selected_category(&filter)?;
            filter
        }
        None => engine.storage().load_selected_category(),
    };

    Ok(engine
        .read(|store| {
            let filter = filter.or_all_if_missing(&store.categories());
            let rows = store.filter(&filter);
            if rows.is_empty() {
                return vec!["No quotes available for this category.".to_string()];
            }
            rows.into_iter().map(format_quote).collect()
        })
        .await)
}

async fn categories<R: RemoteStore>(engine: &SyncEngine<R>) -> Vec<String> {
    let mut lines = vec![CategoryFilter::All.to_string()];
    lines.extend(engine.read(|store| store.categories()).await);
    lines
}

async fn random<R: RemoteStore>(engine: &SyncEngine<R>) -> Vec<String> {
    engine
        .read(|store| match store.quotes().choose(&mut rand::rng()) {
            Some(quote) => vec![format!("\"{}\"", quote.text), format!("  - {}", quote.category)],
            None => vec!["No quotes available. Please add one!".to_string()],
        })
        .await
}

async fn add<R: RemoteStore>(
    engine: &SyncEngine<R>,
    text: &str,
    category: &str,
    offline: bool,
) -> Result<Vec<String>> {
    engine.add_quote(text, category).await?;
    let mut lines = vec![Status::info("Quote added locally. Will sync to server.").to_string()];
    if !offline {
        lines.extend(sync_or_status(engine).await);
    }
    Ok(lines)
}

async fn conflicts<R: RemoteStore>(engine: &SyncEngine<R>) -> Vec<String> {
    engine
        .read(|store| {
            let open = store.open_conflicts();
            if open.is_empty() {
                return vec!["No unresolved conflicts.".to_string()];
            }
            open.into_iter().map(format_conflict).collect()
        })
        .await
}

async fn resolve<R: RemoteStore>(
    engine: &SyncEngine<R>,
    id: &str,
    resolution: Resolution,
) -> Result<Vec<String>> {
    engine.resolve(id, resolution).await?;
    let message = match resolution {
        Resolution::KeepServer => "Conflict resolved: kept server.",
        Resolution::KeepLocal => "Conflict resolved: kept local.",
        Resolution::Dismiss => "Conflict dismissed.",
    };
    Ok(vec![Status::success(message).to_string()])
}

async fn simulate_conflict<R: RemoteStore>(engine: &SyncEngine<R>) -> Result<Vec<String>> {
    let Some(quote) = engine.simulate_local_edit().await? else {
        return Ok(vec!["No quotes available. Please add one!".to_string()]);
    };
    let mut lines = vec![Status::info(format!(
        "Simulated a local edit of quote {}. Syncing to trigger conflict handling.",
        quote.id
    ))
    .to_string()];
    lines.extend(sync_or_status(engine).await);
    Ok(lines)
}

/// Run a cycle, turning failure into a status line.
async fn sync_or_status<R: RemoteStore>(engine: &SyncEngine<R>) -> Vec<String> {
    match engine.sync_now().await {
        Ok(report) => sync_lines(&report),
        Err(e) => vec![failure_status(&e).to_string()],
    }
}
