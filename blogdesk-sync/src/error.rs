//! Error types for the sync layer.

use blogdesk_types::EntryId;
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur while loading, saving, or syncing entries.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The web service refused the request (validation, permissions, ...).
    /// Retrying or staging offline cannot fix it.
    #[error("web service rejected the request: {}", message.as_deref().unwrap_or(errorcode))]
    Rejected {
        errorcode: String,
        message: Option<String>,
    },

    /// Network error.
    #[error("network error: {0}")]
    Network(String),

    /// Timeout.
    #[error("operation timed out")]
    Timeout,

    /// Local storage error (database or file system).
    #[error("storage error: {0}")]
    Storage(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The requested entry does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The fetched entry is older than the caller expected.
    #[error("entry {entry_id} is outdated (last modified {last_modified}, expected {expected})")]
    Stale {
        entry_id: EntryId,
        last_modified: i64,
        expected: i64,
    },

    /// The operation is blocked by another edit session.
    #[error("operation locked: {0}")]
    Locked(String),
}

impl SyncError {
    /// Builds a rejection carrying a user-facing message.
    pub fn rejected(errorcode: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Rejected {
            errorcode: errorcode.into(),
            message: Some(message.into()),
        }
    }

    /// True when the service itself refused the request.
    pub fn is_service_rejection(&self) -> bool {
        matches!(self, Self::Rejected { .. })
    }

    /// True when the failure was reaching the network or the local disk.
    pub fn is_transport_failure(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Timeout | Self::Storage(_))
    }

    /// Message to show the user, if the failure carried one.
    pub fn user_message(&self) -> Option<&str> {
        match self {
            Self::Rejected { message, .. } => message.as_deref(),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for SyncError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Storage(e.to_string())
    }
}

impl From<std::io::Error> for SyncError {
    fn from(e: std::io::Error) -> Self {
        Self::Storage(e.to_string())
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else {
            Self::Network(e.to_string())
        }
    }
}
