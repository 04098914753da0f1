//! Configuration management for the client.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Default remote: the public JSONPlaceholder API.
pub const DEFAULT_API_BASE: &str = "https://jsonplaceholder.typicode.com";

/// Client configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Base URL of the remote API
    pub api_base: String,
    /// Directory holding the persisted tables
    pub data_dir: PathBuf,
    /// Period of automatic sync in watch mode
    pub sync_interval: Duration,
    /// Number of remote records fetched per sync
    pub fetch_limit: usize,
    /// Per-request HTTP timeout
    pub http_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            data_dir: PathBuf::from(".quotesync"),
            sync_interval: Duration::from_secs(15),
            fetch_limit: 10,
            http_timeout: Duration::from_secs(30),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let api_base = lookup("QUOTESYNC_API_BASE")
            .map(|s| s.trim_end_matches('/').to_string())
            .unwrap_or(defaults.api_base);

        let data_dir = lookup("QUOTESYNC_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.data_dir);

        let sync_interval = match lookup("QUOTESYNC_SYNC_INTERVAL_SECS") {
            Some(v) => Duration::from_secs(parse_positive("QUOTESYNC_SYNC_INTERVAL_SECS", &v)?),
            None => defaults.sync_interval,
        };

        let fetch_limit = match lookup("QUOTESYNC_FETCH_LIMIT") {
            Some(v) => parse_positive("QUOTESYNC_FETCH_LIMIT", &v)? as usize,
            None => defaults.fetch_limit,
        };

        let http_timeout = match lookup("QUOTESYNC_HTTP_TIMEOUT_SECS") {
            Some(v) => Duration::from_secs(parse_positive("QUOTESYNC_HTTP_TIMEOUT_SECS", &v)?),
            None => defaults.http_timeout,
        };

        Ok(Self {
            api_base,
            data_dir,
            sync_interval,
            fetch_limit,
            http_timeout,
        })
    }
}

fn parse_positive(var: &'static str, value: &str) -> Result<u64, ConfigError> {
    match value.trim().parse::<u64>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ConfigError::InvalidNumber {
            var,
            value: value.to_string(),
        }),
    }
}

/// Configuration errors.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} must be a positive integer, got '{value}'")]
    InvalidNumber { var: &'static str, value: String },
}
