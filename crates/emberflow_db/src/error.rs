//! Error types for the task-output store.

use thiserror::Error;

/// Task-output operation result type.
pub type Result<T> = std::result::Result<T, DbError>;

/// Task-output store errors.
#[derive(Error, Debug)]
pub enum DbError {
    /// Relational engine error (connection, query, constraint).
    #[error("Database error: {0}")]
    Duckdb(#[from] duckdb::Error),

    /// IO error (file system operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Keyed read found no row.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Row-cardinality or locking invariant violated.
    #[error("Constraint violation: {0}")]
    Constraint(String),

    /// Opaque-value (de)serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DbError {
    /// Create a not found error.
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a constraint error.
    pub fn constraint(msg: impl Into<String>) -> Self {
        Self::Constraint(msg.into())
    }
}
