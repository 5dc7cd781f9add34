//! Error types for the storage layer.

use thiserror::Error;

/// Storage operation result type.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors raised by URI parsing, path resolution and object-store access.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Rejected open mode; raised before any I/O is attempted.
    #[error("Unsupported open mode '{0}'")]
    InvalidMode(String),

    /// URI missing its scheme delimiter, bucket or key.
    #[error("Invalid store URI '{uri}': {reason}")]
    InvalidUri { uri: String, reason: String },

    /// Object missing from the store.
    #[error("Not found: {0}")]
    NotFound(String),

    /// IO error (local filesystem operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Failure reported by the remote object-store client.
    #[error("{message}")]
    Remote {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

impl StoreError {
    /// Create an invalid-URI error.
    pub fn invalid_uri(uri: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidUri {
            uri: uri.into(),
            reason: reason.into(),
        }
    }

    /// Create a not found error.
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a remote-client error.
    pub fn remote(message: impl Into<String>, source: anyhow::Error) -> Self {
        Self::Remote {
            message: message.into(),
            source,
        }
    }
}
