//! quotesync - an offline-first quote collection kept in sync with a
//! placeholder HTTP API.
//!
//! The reconciliation logic lives in `quotesync-engine`; this crate adds the
//! remote client, file persistence, the sync cycle and the command line.

pub mod cli;
pub mod commands;
pub mod config;
pub mod console;
pub mod error;
pub mod remote;
pub mod status;
pub mod storage;
pub mod sync;
pub mod watch;

pub use config::Config;
pub use error::{AppError, Result};
pub use remote::{HttpRemote, RemoteStore};
pub use storage::LocalStorage;
pub use sync::{SyncEngine, SyncReport};
