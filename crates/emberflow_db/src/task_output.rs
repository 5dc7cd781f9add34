//! CRUD target over the task-output table.

use std::collections::BTreeMap;
use std::sync::Arc;

use duckdb::{params, Transaction};
use serde_json::Value as JsonValue;
use tracing::debug;

use crate::error::{DbError, Result};
use crate::TaskOutputDb;

/// Narrow seam to the workflow engine's task abstraction. The engine's
/// task type implements this; everything the record needs is the
/// identifier, the family name and the stringified parameters.
pub trait Task {
    fn task_id(&self) -> &str;

    fn task_family(&self) -> &str;

    /// Stringified task parameters, keyed by parameter name.
    fn str_params(&self) -> BTreeMap<String, String>;
}

/// Target that records one opaque output value per task identifier.
///
/// Every operation runs in its own transaction: committed on success,
/// rolled back (and the error re-raised) on failure.
pub struct TaskOutputTarget {
    db: Arc<TaskOutputDb>,
    task_id: String,
    task_family: String,
    params: String,
}

impl TaskOutputTarget {
    /// Build the record key from a task: identifier, family and the
    /// sorted-key JSON serialization of its parameters.
    pub fn create(db: Arc<TaskOutputDb>, task: &dyn Task) -> Result<Self> {
        let params = serde_json::to_string(&task.str_params())?;
        Ok(Self::new(db, task.task_id(), task.task_family(), params))
    }

    pub fn new(
        db: Arc<TaskOutputDb>,
        task_id: impl Into<String>,
        task_family: impl Into<String>,
        params: impl Into<String>,
    ) -> Self {
        Self {
            db,
            task_id: task_id.into(),
            task_family: task_family.into(),
            params: params.into(),
        }
    }

    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    pub fn task_family(&self) -> &str {
        &self.task_family
    }

    pub fn params(&self) -> &str {
        &self.params
    }

    /// Insert a new row unconditionally. Duplicate handling is left to
    /// the keyed read.
    pub fn write(&self, value: Option<JsonValue>) -> Result<()> {
        let encoded = encode_value(value.as_ref())?;
        self.db.with_txn(|tx| {
            self.insert(tx, encoded.as_deref())?;
            debug!(task_id = %self.task_id, "Recorded task output");
            Ok(())
        })
    }

    /// Mark the task done without a value.
    pub fn touch(&self) -> Result<()> {
        self.write(None)
    }

    /// Read the single row for this task. Zero rows is a not-found
    /// error; more than one is a constraint violation.
    pub fn read(&self) -> Result<Option<JsonValue>> {
        self.db.with_txn(|tx| {
            let mut stmt = tx.prepare("SELECT value FROM task_outputs WHERE task_id = ?")?;
            let values = stmt
                .query_map(params![self.task_id], |row| row.get::<_, Option<String>>(0))?
                .collect::<std::result::Result<Vec<_>, duckdb::Error>>()?;

            match values.as_slice() {
                [] => Err(DbError::not_found(format!(
                    "No task output for '{}'",
                    self.task_id
                ))),
                [value] => decode_value(value.as_deref()),
                many => Err(DbError::constraint(format!(
                    "{} task output rows for '{}'",
                    many.len(),
                    self.task_id
                ))),
            }
        })
    }

    pub fn exists(&self) -> Result<bool> {
        self.db.with_txn(|tx| Ok(self.count(tx)? > 0))
    }

    /// Delete every row for this task (at most one is expected).
    pub fn remove(&self) -> Result<()> {
        self.db.with_txn(|tx| {
            let deleted = tx.execute(
                "DELETE FROM task_outputs WHERE task_id = ?",
                params![self.task_id],
            )?;
            debug!(task_id = %self.task_id, rows = deleted, "Removed task output");
            Ok(())
        })
    }

    /// Insert if absent, otherwise update the value in place. Runs as a
    /// single transaction.
    pub fn upsert(&self, value: Option<JsonValue>) -> Result<()> {
        let encoded = encode_value(value.as_ref())?;
        self.db.with_txn(|tx| {
            match self.count(tx)? {
                0 => {
                    self.insert(tx, encoded.as_deref())?;
                    debug!(task_id = %self.task_id, "Upsert inserted task output");
                }
                1 => {
                    tx.execute(
                        "UPDATE task_outputs SET value = ? WHERE task_id = ?",
                        params![encoded, self.task_id],
                    )?;
                    debug!(task_id = %self.task_id, "Upsert updated task output");
                }
                many => {
                    return Err(DbError::constraint(format!(
                        "{} task output rows for '{}'",
                        many, self.task_id
                    )))
                }
            }
            Ok(())
        })
    }

    fn insert(&self, tx: &Transaction<'_>, value: Option<&str>) -> Result<()> {
        tx.execute(
            "INSERT INTO task_outputs (task_id, task_family, params, value) VALUES (?, ?, ?, ?)",
            params![self.task_id, self.task_family, self.params, value],
        )?;
        Ok(())
    }

    fn count(&self, tx: &Transaction<'_>) -> Result<i64> {
        let count = tx.query_row(
            "SELECT COUNT(*) FROM task_outputs WHERE task_id = ?",
            params![self.task_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

fn encode_value(value: Option<&JsonValue>) -> Result<Option<String>> {
    value.map(serde_json::to_string).transpose().map_err(Into::into)
}

fn decode_value(raw: Option<&str>) -> Result<Option<JsonValue>> {
    raw.map(serde_json::from_str).transpose().map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeTask;

    impl Task for FakeTask {
        fn task_id(&self) -> &str {
            "report_2024_06"
        }

        fn task_family(&self) -> &str {
            "DailyReport"
        }

        fn str_params(&self) -> BTreeMap<String, String> {
            BTreeMap::from([
                ("date".to_string(), "2024-06-01".to_string()),
                ("region".to_string(), "emea".to_string()),
            ])
        }
    }

    #[test]
    fn test_create_serializes_params_with_sorted_keys() {
        let db = Arc::new(TaskOutputDb::open_in_memory().unwrap());
        let target = TaskOutputTarget::create(db, &FakeTask).unwrap();

        assert_eq!(target.task_id(), "report_2024_06");
        assert_eq!(target.task_family(), "DailyReport");
        assert_eq!(
            target.params(),
            r#"{"date":"2024-06-01","region":"emea"}"#
        );
    }
}
