use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use relschema_exec::{
    ExecuteOptions, Executor, NullLogger, SqliteHandle, SqliteRevisionStore,
};
use relschema_migrate::MigrationDir;
use relschema_sqlite::SqliteLocker;
use rusqlite::Connection;
use tempfile::tempdir;

fn write_file(dir: &Path, name: &str, sql: &str) {
    std::fs::write(dir.join(name), sql).unwrap();
}

#[tokio::test]
async fn applies_pending_files_in_order_and_records_revisions() {
    let tmp = tempdir().unwrap();
    write_file(tmp.path(), "20260101000000_init.sql", "CREATE TABLE widgets (id INTEGER PRIMARY KEY, name TEXT NOT NULL);");
    write_file(tmp.path(), "20260102000000_add_price.sql", "ALTER TABLE widgets ADD COLUMN price REAL;");

    let md = MigrationDir::new(tmp.path());
    md.write_sum().unwrap();

    let db_path = tmp.path().join("target.db");
    let conn = Arc::new(Mutex::new(Connection::open(&db_path).unwrap()));
    let handle = Arc::new(SqliteHandle::new(Arc::clone(&conn)));
    let locker = Arc::new(SqliteLocker::new(Arc::clone(&conn)));
    let revisions = Arc::new(SqliteRevisionStore::new(Arc::clone(&conn)).unwrap());

    let executor = Executor::new(md, locker, handle, revisions.clone(), Arc::new(NullLogger));
    let applied = executor.execute_n(0, &ExecuteOptions::default()).await.unwrap();

    assert_eq!(applied.len(), 2);
    assert_eq!(applied[0].version, "20260101000000");
    assert_eq!(applied[1].version, "20260102000000");

    let conn = conn.lock();
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM pragma_table_info('widgets') WHERE name = 'price'", [], |r| r.get(0))
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn second_run_only_applies_new_files() {
    let tmp = tempdir().unwrap();
    write_file(tmp.path(), "20260101000000_init.sql", "CREATE TABLE widgets (id INTEGER PRIMARY KEY);");

    let md = MigrationDir::new(tmp.path());
    md.write_sum().unwrap();

    let db_path = tmp.path().join("target.db");
    let conn = Arc::new(Mutex::new(Connection::open(&db_path).unwrap()));

    {
        let handle = Arc::new(SqliteHandle::new(Arc::clone(&conn)));
        let locker = Arc::new(SqliteLocker::new(Arc::clone(&conn)));
        let revisions = Arc::new(SqliteRevisionStore::new(Arc::clone(&conn)).unwrap());
        let executor = Executor::new(MigrationDir::new(tmp.path()), locker, handle, revisions, Arc::new(NullLogger));
        let applied = executor.execute_n(0, &ExecuteOptions::default()).await.unwrap();
        assert_eq!(applied.len(), 1);
    }

    write_file(tmp.path(), "20260102000000_add_flag.sql", "ALTER TABLE widgets ADD COLUMN flag INTEGER;");
    md.write_sum().unwrap();

    let handle = Arc::new(SqliteHandle::new(Arc::clone(&conn)));
    let locker = Arc::new(SqliteLocker::new(Arc::clone(&conn)));
    let revisions = Arc::new(SqliteRevisionStore::new(Arc::clone(&conn)).unwrap());
    let executor = Executor::new(MigrationDir::new(tmp.path()), locker, handle, revisions, Arc::new(NullLogger));
    let applied = executor.execute_n(0, &ExecuteOptions::default()).await.unwrap();

    assert_eq!(applied.len(), 1);
    assert_eq!(applied[0].version, "20260102000000");
}

#[tokio::test]
async fn failing_statement_rolls_back_and_stops() {
    let tmp = tempdir().unwrap();
    write_file(
        tmp.path(),
        "20260101000000_bad.sql",
        "CREATE TABLE widgets (id INTEGER PRIMARY KEY); CREATE TABLE widgets (id INTEGER PRIMARY KEY);",
    );
    let md = MigrationDir::new(tmp.path());
    md.write_sum().unwrap();

    let db_path = tmp.path().join("target.db");
    let conn = Arc::new(Mutex::new(Connection::open(&db_path).unwrap()));
    let handle = Arc::new(SqliteHandle::new(Arc::clone(&conn)));
    let locker = Arc::new(SqliteLocker::new(Arc::clone(&conn)));
    let revisions = Arc::new(SqliteRevisionStore::new(Arc::clone(&conn)).unwrap());

    let executor = Executor::new(md, locker, handle, revisions, Arc::new(NullLogger));
    let err = executor.execute_n(0, &ExecuteOptions::default()).await.unwrap_err();
    assert!(err.to_string().contains("widgets"));
}

#[tokio::test]
async fn tampered_manifest_is_rejected_unless_forced() {
    let tmp = tempdir().unwrap();
    write_file(tmp.path(), "20260101000000_init.sql", "CREATE TABLE widgets (id INTEGER PRIMARY KEY);");
    let md = MigrationDir::new(tmp.path());
    md.write_sum().unwrap();

    // Mutate the file after hashing.
    write_file(tmp.path(), "20260101000000_init.sql", "CREATE TABLE widgets (id INTEGER PRIMARY KEY, evil TEXT);");

    let db_path = tmp.path().join("target.db");
    let conn = Arc::new(Mutex::new(Connection::open(&db_path).unwrap()));
    let handle = Arc::new(SqliteHandle::new(Arc::clone(&conn)));
    let locker = Arc::new(SqliteLocker::new(Arc::clone(&conn)));
    let revisions = Arc::new(SqliteRevisionStore::new(Arc::clone(&conn)).unwrap());

    let executor = Executor::new(MigrationDir::new(tmp.path()), locker, handle, revisions, Arc::new(NullLogger));
    let err = executor.execute_n(0, &ExecuteOptions::default()).await.unwrap_err();
    assert!(err.to_string().contains("migration directory error"));
}
