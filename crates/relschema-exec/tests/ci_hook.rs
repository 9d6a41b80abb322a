use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use relschema_core::Changeset;
use relschema_exec::{run_ci_hook, Analyzer, Diagnostic, Severity, SqliteHandle};
use relschema_migrate::MigrationDir;
use relschema_sqlite::{SqliteDiffDriver, SqliteInspector};
use rusqlite::Connection;
use tempfile::tempdir;

/// Flags any statement whose diff drops a table, the way a real CI
/// analyzer would warn about a destructive change in a feature branch.
struct NoDropTableAnalyzer;

impl Analyzer for NoDropTableAnalyzer {
    fn analyze(&self, _file: &str, position: usize, _stmt: &str, changes: &Changeset) -> Vec<Diagnostic> {
        changes
            .iter()
            .filter_map(|change| match change {
                relschema_core::SchemaChange::DropTable(name) => Some(Diagnostic {
                    severity: Severity::Warning,
                    message: format!("statement {position} drops table {name}"),
                }),
                _ => None,
            })
            .collect()
    }
}

fn write_file(dir: &Path, name: &str, sql: &str) {
    std::fs::write(dir.join(name), sql).unwrap();
}

#[tokio::test]
async fn reports_schema_change_and_flags_destructive_statement() {
    let tmp = tempdir().unwrap();
    let md = MigrationDir::new(tmp.path());
    md.write_sum().unwrap();

    let feature_dir = tempdir().unwrap();
    let feature_file = feature_dir.path().join("0001_feature.sql");
    std::fs::write(
        &feature_file,
        "CREATE TABLE widgets (id INTEGER PRIMARY KEY, name TEXT NOT NULL);\nDROP TABLE widgets;",
    )
    .unwrap();

    let conn = Arc::new(Mutex::new(Connection::open_in_memory().unwrap()));
    let dev_db = Arc::new(SqliteHandle::new(Arc::clone(&conn)));
    let inspector = Arc::new(SqliteInspector::new(Arc::clone(&conn)));
    let diff_driver = Arc::new(SqliteDiffDriver);
    let analyzers: Vec<Arc<dyn Analyzer>> = vec![Arc::new(NoDropTableAnalyzer)];

    let report = run_ci_hook(&md, &[feature_file.as_path()], dev_db, inspector, diff_driver, &analyzers)
        .await
        .unwrap();

    assert!(report.steps.iter().any(|s| s.name == "Integrity Check" && s.ok));
    assert_eq!(report.files.len(), 1);
    assert_eq!(report.files[0].reports.len(), 2);

    let create_report = &report.files[0].reports[0];
    assert!(create_report.diagnostics.is_empty());

    let drop_report = &report.files[0].reports[1];
    assert_eq!(drop_report.diagnostics.len(), 1);
    assert!(drop_report.diagnostics[0].message.contains("widgets"));

    assert!(report.schema_desired.schemas.iter().all(|s| s.tables.is_empty()));
}
