//! Task-output record store for Emberflow.
//!
//! One relational row per task identifier, written by the workflow
//! engine's output targets. This crate owns the schema and the
//! transaction discipline; everything above it goes through
//! [`TaskOutputTarget`].
//!
//! # Usage
//!
//! ```rust,ignore
//! use emberflow_db::{TaskOutputDb, TaskOutputTarget};
//!
//! let db = std::sync::Arc::new(TaskOutputDb::open("~/.emberflow/emberflow.duckdb")?);
//! let target = TaskOutputTarget::create(db, &task)?;
//!
//! target.upsert(Some(serde_json::json!({"rows": 42})))?;
//! assert!(target.exists()?);
//! ```

mod error;
mod task_output;

pub use error::{DbError, Result};
pub use task_output::{Task, TaskOutputTarget};

use std::path::Path;
use std::sync::Mutex;

use duckdb::Transaction;
use tracing::{info, warn};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS task_outputs (
    task_id     VARCHAR NOT NULL,
    task_family VARCHAR NOT NULL,
    params      VARCHAR NOT NULL,
    value       VARCHAR
);
CREATE INDEX IF NOT EXISTS idx_task_outputs_task_id ON task_outputs (task_id);
";

/// Shared handle to the task-output table.
///
/// Wraps a single DuckDB connection; callers share it via `Arc`. The
/// relational engine owns cross-process isolation.
pub struct TaskOutputDb {
    conn: Mutex<duckdb::Connection>,
}

impl TaskOutputDb {
    /// Open or create a database at the given path, creating parent
    /// directories and the schema as needed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = duckdb::Connection::open(path)?;
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.ensure_schema()?;

        info!(path = %path.display(), "Task-output database opened");

        Ok(db)
    }

    /// In-memory database, used by tests.
    pub fn open_in_memory() -> Result<Self> {
        let db = Self {
            conn: Mutex::new(duckdb::Connection::open_in_memory()?),
        };
        db.ensure_schema()?;
        Ok(db)
    }

    fn ensure_schema(&self) -> Result<()> {
        let conn = self.lock()?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, duckdb::Connection>> {
        self.conn
            .lock()
            .map_err(|_| DbError::constraint("connection lock poisoned"))
    }

    /// Run `f` inside a transaction: commit on success, roll back and
    /// re-raise on any error.
    pub(crate) fn with_txn<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T>,
    {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        match f(&tx) {
            Ok(value) => {
                tx.commit()?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback() {
                    warn!(error = %rollback_err, "Task-output rollback failed");
                }
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_open_creates_database() {
        let tmp = TempDir::new().unwrap();
        let db_path = tmp.path().join("nested/outputs.duckdb");

        let _db = TaskOutputDb::open(&db_path).unwrap();
        assert!(db_path.exists());
    }

    #[test]
    fn test_reopen_keeps_schema() {
        let tmp = TempDir::new().unwrap();
        let db_path = tmp.path().join("outputs.duckdb");

        drop(TaskOutputDb::open(&db_path).unwrap());
        // Second open must not fail on the existing schema.
        let _db = TaskOutputDb::open(&db_path).unwrap();
    }
}
