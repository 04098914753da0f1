//! Command line definitions shared by the binary and the watch console.

use clap::{Parser, Subcommand, ValueEnum};
use quotesync_engine::Resolution;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "quotesync")]
#[command(about = "Offline-first quote collection with server sync", version)]
pub struct Cli {
    /// Directory holding the persisted tables (overrides QUOTESYNC_DATA_DIR)
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Base URL of the remote API (overrides QUOTESYNC_API_BASE)
    #[arg(long, global = true)]
    pub api_base: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

/// A command typed at the `watch` console.
#[derive(Parser, Debug)]
#[command(name = "quotesync", no_binary_name = true, disable_version_flag = true)]
pub struct ConsoleLine {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Show quotes, optionally restricted to one category (remembered)
    List {
        /// Category name, or "all"
        #[arg(long)]
        category: Option<String>,
    },
    /// Show the known categories
    Categories,
    /// Show one quote at random
    Random,
    /// Add a quote locally and push it
    Add {
        text: String,
        category: String,
        /// Do not sync after adding
        #[arg(long)]
        offline: bool,
    },
    /// Run a sync cycle now
    Sync,
    /// Show unresolved conflicts
    Conflicts,
    /// Resolve the open conflict for a quote
    Resolve {
        id: String,
        #[arg(value_enum)]
        action: ResolveAction,
    },
    /// Edit the first quote locally and sync, to exercise conflict handling
    SimulateConflict,
    /// Sync periodically and accept commands on stdin
    Watch {
        /// Seconds between automatic syncs (overrides QUOTESYNC_SYNC_INTERVAL_SECS)
        #[arg(long)]
        interval: Option<u64>,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveAction {
    /// Keep the server value (already applied)
    KeepServer,
    /// Restore the local value and push it
    KeepLocal,
    /// Close the conflict without changes
    Dismiss,
}

impl From<ResolveAction> for Resolution {
    fn from(action: ResolveAction) -> Self {
        match action {
            ResolveAction::KeepServer => Resolution::KeepServer,
            ResolveAction::KeepLocal => Resolution::KeepLocal,
            ResolveAction::Dismiss => Resolution::Dismiss,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_resolve() {
        let cli = Cli::try_parse_from(["quotesync", "resolve", "5", "keep-local"]).unwrap();
        assert_eq!(
            cli.command,
            Command::Resolve {
                id: "5".into(),
                action: ResolveAction::KeepLocal
            }
        );
    }

    #[test]
    fn parse_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["quotesync", "sync", "--data-dir", "/tmp/q"]).unwrap();
        assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/q")));
        assert_eq!(cli.command, Command::Sync);
    }

    #[test]
    fn parse_add() {
        let cli =
            Cli::try_parse_from(["quotesync", "add", "Stay curious.", "Life", "--offline"]).unwrap();
        assert_eq!(
            cli.command,
            Command::Add {
                text: "Stay curious.".into(),
                category: "Life".into(),
                offline: true
            }
        );
    }

    #[test]
    fn console_line_has_no_binary_name() {
        let line = ConsoleLine::try_parse_from(["list", "--category", "Motivation"]).unwrap();
        assert_eq!(
            line.command,
            Command::List {
                category: Some("Motivation".into())
            }
        );
    }

    #[test]
    fn resolution_mapping() {
        assert_eq!(
            Resolution::from(ResolveAction::KeepServer),
            Resolution::KeepServer
        );
        assert!(Cli::try_parse_from(["quotesync", "resolve", "5", "keep-both"]).is_err());
    }
}
