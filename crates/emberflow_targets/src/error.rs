//! Error types for CSV targets and the typed codec layer.

use thiserror::Error;

use crate::codec::{CodecError, WireType};

/// Target operation result type.
pub type Result<T> = std::result::Result<T, TargetError>;

/// Errors raised by CSV targets.
#[derive(Debug, Error)]
pub enum TargetError {
    /// Path resolution / object-store failure.
    #[error("Storage error: {0}")]
    Store(#[from] emberflow_store::StoreError),

    /// CSV (de)serialization failure, including ragged rows.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// IO error (gzip framing, handle flush)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A cell did not parse as the column's declared wire type.
    #[error("Column '{column}': cannot parse '{value}' as {wire_type}")]
    Parse {
        column: String,
        value: String,
        wire_type: WireType,
    },

    /// A column codec rejected a value.
    #[error("Column '{column}': {source}")]
    Codec {
        column: String,
        #[source]
        source: CodecError,
    },

    /// Structurally invalid frame (ragged columns, duplicate names).
    #[error("Frame error: {0}")]
    Frame(String),
}

impl TargetError {
    /// Create a frame-shape error.
    pub fn frame(msg: impl Into<String>) -> Self {
        Self::Frame(msg.into())
    }

    pub(crate) fn codec(column: &str, source: CodecError) -> Self {
        Self::Codec {
            column: column.to_string(),
            source,
        }
    }
}
