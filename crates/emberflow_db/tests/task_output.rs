//! Task-output CRUD behavior against a real DuckDB file.

use std::collections::BTreeMap;
use std::sync::Arc;

use emberflow_db::{DbError, Task, TaskOutputDb, TaskOutputTarget};
use serde_json::json;
use tempfile::TempDir;

struct ReportTask {
    id: String,
}

impl Task for ReportTask {
    fn task_id(&self) -> &str {
        &self.id
    }

    fn task_family(&self) -> &str {
        "WeeklyReport"
    }

    fn str_params(&self) -> BTreeMap<String, String> {
        BTreeMap::from([("week".to_string(), "23".to_string())])
    }
}

fn open_db(tmp: &TempDir) -> Arc<TaskOutputDb> {
    Arc::new(TaskOutputDb::open(tmp.path().join("outputs.duckdb")).unwrap())
}

fn target(db: &Arc<TaskOutputDb>, id: &str) -> TaskOutputTarget {
    TaskOutputTarget::create(
        Arc::clone(db),
        &ReportTask { id: id.to_string() },
    )
    .unwrap()
}

#[test]
fn test_write_then_read() {
    let tmp = TempDir::new().unwrap();
    let db = open_db(&tmp);
    let t = target(&db, "task-1");

    t.write(Some(json!({"rows": 42}))).unwrap();
    assert_eq!(t.read().unwrap(), Some(json!({"rows": 42})));
}

#[test]
fn test_touch_stores_null_value() {
    let tmp = TempDir::new().unwrap();
    let db = open_db(&tmp);
    let t = target(&db, "task-touch");

    t.touch().unwrap();
    assert!(t.exists().unwrap());
    assert_eq!(t.read().unwrap(), None);
}

#[test]
fn test_read_missing_is_not_found() {
    let tmp = TempDir::new().unwrap();
    let db = open_db(&tmp);
    let t = target(&db, "task-missing");

    let err = t.read().unwrap_err();
    assert!(matches!(err, DbError::NotFound(_)));
}

#[test]
fn test_duplicate_rows_fail_keyed_read() {
    let tmp = TempDir::new().unwrap();
    let db = open_db(&tmp);
    let t = target(&db, "task-dup");

    // write() inserts unconditionally, so two writes produce two rows.
    t.write(Some(json!(1))).unwrap();
    t.write(Some(json!(2))).unwrap();

    let err = t.read().unwrap_err();
    assert!(matches!(err, DbError::Constraint(_)));

    let err = t.upsert(Some(json!(3))).unwrap_err();
    assert!(matches!(err, DbError::Constraint(_)));
}

#[test]
fn test_exists_tracks_presence() {
    let tmp = TempDir::new().unwrap();
    let db = open_db(&tmp);
    let t = target(&db, "task-exists");

    assert!(!t.exists().unwrap());
    t.write(None).unwrap();
    assert!(t.exists().unwrap());
    t.remove().unwrap();
    assert!(!t.exists().unwrap());
}

#[test]
fn test_remove_deletes_all_rows_for_task() {
    let tmp = TempDir::new().unwrap();
    let db = open_db(&tmp);
    let t = target(&db, "task-remove");

    t.write(Some(json!(1))).unwrap();
    t.write(Some(json!(2))).unwrap();
    t.remove().unwrap();
    assert!(!t.exists().unwrap());

    // Other tasks are untouched.
    let other = target(&db, "task-keep");
    other.write(Some(json!("kept"))).unwrap();
    t.remove().unwrap();
    assert_eq!(other.read().unwrap(), Some(json!("kept")));
}

#[test]
fn test_upsert_inserts_then_updates_in_place() {
    let tmp = TempDir::new().unwrap();
    let db = open_db(&tmp);
    let t = target(&db, "task-upsert");

    assert!(!t.exists().unwrap());
    t.upsert(Some(json!({"attempt": 1}))).unwrap();
    assert!(t.exists().unwrap());
    assert_eq!(t.read().unwrap(), Some(json!({"attempt": 1})));

    t.upsert(Some(json!({"attempt": 2}))).unwrap();
    // Still a single row, value replaced in place.
    assert_eq!(t.read().unwrap(), Some(json!({"attempt": 2})));
}

#[test]
fn test_upsert_can_clear_value() {
    let tmp = TempDir::new().unwrap();
    let db = open_db(&tmp);
    let t = target(&db, "task-clear");

    t.upsert(Some(json!([1, 2, 3]))).unwrap();
    t.upsert(None).unwrap();
    assert_eq!(t.read().unwrap(), None);
}

#[test]
fn test_targets_share_one_database() {
    let tmp = TempDir::new().unwrap();
    let db = open_db(&tmp);

    let a = target(&db, "task-a");
    let b = target(&db, "task-b");

    a.write(Some(json!("a"))).unwrap();
    b.write(Some(json!("b"))).unwrap();

    assert_eq!(a.read().unwrap(), Some(json!("a")));
    assert_eq!(b.read().unwrap(), Some(json!("b")));
}
