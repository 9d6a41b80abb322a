//! Tolerant regex pass over `CREATE TABLE`/`CREATE INDEX` text for the
//! details `PRAGMA table_info`/`index_list`/`foreign_key_list` don't carry:
//! the `STRICT`/`WITHOUT ROWID` table suffixes, named `CHECK` constraints,
//! `GENERATED ALWAYS AS` column expressions, and named `CONSTRAINT` symbols
//! on inline `PRIMARY KEY`/`FOREIGN KEY` clauses.
//!
//! This is deliberately not a full SQL parser: SQLite's own grammar is
//! permissive enough that a hand-rolled recursive-descent parser would be
//! a bigger liability than a handful of well-scoped patterns. Anything the
//! patterns can't place is left for the PRAGMA-derived data to cover.

use once_cell::sync::Lazy;
use regex::Regex;

static STRICT_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)\)\s*(?:STRICT\s*,?\s*|WITHOUT\s+ROWID\s*,?\s*)+\s*;?\s*$").unwrap());
static STRICT_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bSTRICT\b").unwrap());
static WITHOUT_ROWID_WORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bWITHOUT\s+ROWID\b").unwrap());

static NAMED_CHECK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)CONSTRAINT\s+["'`\[]?([A-Za-z_][\w]*)["'\]`]?\s+CHECK\s*\(([^()]*(?:\([^()]*\)[^()]*)*)\)"#).unwrap()
});
static UNNAMED_CHECK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?is)\bCHECK\s*\(([^()]*(?:\([^()]*\)[^()]*)*)\)"#).unwrap());

static GENERATED_COLUMN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?is)["'`\[]?([A-Za-z_][\w]*)["'\]`]?\s+[\w()]+\s+(?:GENERATED\s+ALWAYS\s+)?AS\s*\(([^()]*(?:\([^()]*\)[^()]*)*)\)\s*(STORED|VIRTUAL)?"#,
    )
    .unwrap()
});

static NAMED_PK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)CONSTRAINT\s+["'`\[]?([A-Za-z_][\w]*)["'\]`]?\s+PRIMARY\s+KEY"#).unwrap()
});

static NAMED_FK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)CONSTRAINT\s+["'`\[]?([A-Za-z_][\w]*)["'\]`]?\s+FOREIGN\s+KEY"#).unwrap()
});

/// Returns `true` if the table's stored DDL carries the `STRICT` suffix.
pub fn is_strict(create_sql: &str) -> bool {
    table_suffix(create_sql)
        .map(|suffix| STRICT_WORD.is_match(suffix))
        .unwrap_or(false)
}

/// Returns `true` if the table's stored DDL carries `WITHOUT ROWID`.
pub fn is_without_rowid(create_sql: &str) -> bool {
    table_suffix(create_sql)
        .map(|suffix| WITHOUT_ROWID_WORD.is_match(suffix))
        .unwrap_or(false)
}

fn table_suffix(create_sql: &str) -> Option<&str> {
    STRICT_SUFFIX.find(create_sql).map(|m| m.as_str())
}

/// A CHECK constraint found in a `CREATE TABLE` body. `name` is `None`
/// when the constraint has no explicit `CONSTRAINT <name>` clause; the
/// caller preserves that and never invents one.
#[derive(Debug, Clone)]
pub struct ParsedCheck {
    pub name: Option<String>,
    pub expression: String,
}

pub fn parse_checks(create_sql: &str) -> Vec<ParsedCheck> {
    let mut seen_spans = Vec::new();
    let mut out = Vec::new();

    for cap in NAMED_CHECK.captures_iter(create_sql) {
        let m = cap.get(0).unwrap();
        seen_spans.push((m.start(), m.end()));
        out.push(ParsedCheck {
            name: Some(cap[1].to_string()),
            expression: cap[2].trim().to_string(),
        });
    }

    for cap in UNNAMED_CHECK.captures_iter(create_sql) {
        let m = cap.get(0).unwrap();
        if seen_spans
            .iter()
            .any(|(s, e)| m.start() >= *s && m.end() <= *e)
        {
            continue;
        }
        out.push(ParsedCheck {
            name: None,
            expression: cap[1].trim().to_string(),
        });
    }

    out
}

/// A generated column's expression and storage mode, parsed from the
/// column definition text (PRAGMA `table_info` reports these columns but
/// not the generating expression).
#[derive(Debug, Clone)]
pub struct ParsedGeneratedColumn {
    pub column: String,
    pub expression: String,
    pub stored: bool,
}

pub fn parse_generated_columns(create_sql: &str) -> Vec<ParsedGeneratedColumn> {
    GENERATED_COLUMN
        .captures_iter(create_sql)
        .map(|cap| ParsedGeneratedColumn {
            column: cap[1].to_string(),
            expression: cap[2].trim().to_string(),
            stored: cap
                .get(3)
                .map(|m| m.as_str().eq_ignore_ascii_case("STORED"))
                .unwrap_or(false),
        })
        .collect()
}

/// The name of an explicit `CONSTRAINT <name> PRIMARY KEY (...)` clause,
/// if the table declares one. Column-level `col INTEGER PRIMARY KEY` and
/// unnamed table-level `PRIMARY KEY (...)` clauses return `None`.
pub fn parse_named_primary_key(create_sql: &str) -> Option<String> {
    NAMED_PK
        .captures(create_sql)
        .map(|cap| cap[1].to_string())
}

/// Names of explicit `CONSTRAINT <name> FOREIGN KEY (...)` clauses, in
/// declaration order, paired positionally with `PRAGMA foreign_key_list`
/// rows (SQLite numbers that pragma's output in reverse declaration order
/// per its own documented quirk, which the caller accounts for).
pub fn parse_named_foreign_keys(create_sql: &str) -> Vec<String> {
    NAMED_FK
        .captures_iter(create_sql)
        .map(|cap| cap[1].to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_strict_and_without_rowid() {
        let sql = "CREATE TABLE t (a INTEGER) STRICT, WITHOUT ROWID";
        assert!(is_strict(sql));
        assert!(is_without_rowid(sql));
    }

    #[test]
    fn plain_table_is_neither() {
        let sql = "CREATE TABLE t (a INTEGER)";
        assert!(!is_strict(sql));
        assert!(!is_without_rowid(sql));
    }

    #[test]
    fn finds_named_and_unnamed_checks() {
        let sql = "CREATE TABLE t (a INTEGER, CONSTRAINT age_check CHECK (a > 0), CHECK (a < 100))";
        let checks = parse_checks(sql);
        assert_eq!(checks.len(), 2);
        assert_eq!(checks[0].name.as_deref(), Some("age_check"));
        assert_eq!(checks[0].expression, "a > 0");
        assert_eq!(checks[1].name, None);
    }

    #[test]
    fn finds_generated_column() {
        let sql = "CREATE TABLE t (a INTEGER, b INTEGER GENERATED ALWAYS AS (a * 2) STORED)";
        let cols = parse_generated_columns(sql);
        assert_eq!(cols.len(), 1);
        assert_eq!(cols[0].column, "b");
        assert_eq!(cols[0].expression, "a * 2");
        assert!(cols[0].stored);
    }

    #[test]
    fn finds_named_primary_key_and_foreign_keys() {
        let sql = "CREATE TABLE t (a INTEGER, b INTEGER, \
            CONSTRAINT pk_t PRIMARY KEY (a), \
            CONSTRAINT fk_b FOREIGN KEY (b) REFERENCES other(id))";
        assert_eq!(parse_named_primary_key(sql).as_deref(), Some("pk_t"));
        assert_eq!(parse_named_foreign_keys(sql), vec!["fk_b".to_string()]);
    }
}
