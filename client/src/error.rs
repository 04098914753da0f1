//! Unified error handling for the client.

use crate::config::ConfigError;

/// Application error type.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Network error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{action} failed: {status}")]
    Status { action: &'static str, status: u16 },

    #[error("Storage error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Engine(#[from] quotesync_engine::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("A sync is already in progress")]
    SyncInProgress,
}

impl AppError {
    /// Whether the error came from talking to the remote.
    pub fn is_network(&self) -> bool {
        matches!(self, AppError::Http(_) | AppError::Status { .. })
    }
}

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_display() {
        let err = AppError::Status {
            action: "Fetch",
            status: 503,
        };
        assert_eq!(err.to_string(), "Fetch failed: 503");
        assert!(err.is_network());
    }

    #[test]
    fn engine_errors_pass_through() {
        let err: AppError = quotesync_engine::Error::MissingField("text").into();
        assert_eq!(err.to_string(), "missing required field: text");
        assert!(!err.is_network());
    }
}
