//! Maps SQLite's declared type affinity onto the dialect-neutral
//! [`ColumnType`] union, following the five storage classes SQLite itself
//! recognizes (INTEGER, REAL, TEXT, BLOB, NUMERIC).

use relschema_core::{ColumnDefault, ColumnType, LiteralValue, OrderedFloat};

/// Classifies a declared column type string (as it appears verbatim in
/// `CREATE TABLE`, e.g. `"VARCHAR(255)"`) using SQLite's type-affinity
/// rules: the decision is driven by substring matches against the
/// uppercased declaration, not an exact keyword match.
pub fn classify(declared: &str) -> ColumnType {
    let upper = declared.to_uppercase();

    if upper.contains("INT") {
        let width = if upper.contains("BIGINT") || upper.contains("INT8") {
            Some(64)
        } else if upper.contains("MEDIUMINT") {
            Some(24)
        } else if upper.contains("SMALLINT") || upper.contains("INT2") {
            Some(16)
        } else if upper.contains("TINYINT") {
            Some(8)
        } else if upper == "INT" {
            Some(32)
        } else {
            // Bare `INTEGER` (or an unrecognized `*INT*` declaration):
            // SQLite doesn't give this a fixed storage width.
            None
        };
        return ColumnType::Integer {
            width,
            unsigned: false,
        };
    }
    if upper.contains("CHAR") || upper.contains("CLOB") || upper.contains("TEXT") {
        return ColumnType::String {
            max_length: extract_length(&upper),
            fixed: upper.starts_with("CHAR"),
        };
    }
    if upper.contains("BLOB") || upper.is_empty() {
        return ColumnType::Binary { max_length: None };
    }
    if upper.contains("REAL") || upper.contains("FLOA") || upper.contains("DOUB") {
        return ColumnType::Float { width: Some(64) };
    }
    if upper.contains("BOOL") {
        return ColumnType::Boolean;
    }
    if upper.contains("DATETIME") || upper.contains("TIMESTAMP") {
        return ColumnType::Time {
            with_time_zone: false,
            precision: None,
        };
    }
    if upper.contains("DATE") || upper.contains("TIME") {
        return ColumnType::Time {
            with_time_zone: false,
            precision: None,
        };
    }
    if upper.contains("JSON") {
        return ColumnType::Json { binary: false };
    }
    if upper.contains("DECIMAL") || upper.contains("NUMERIC") {
        let (precision, scale) = extract_precision_scale(&upper);
        return ColumnType::Decimal { precision, scale };
    }
    if upper.contains("UUID") {
        return ColumnType::Uuid;
    }

    // SQLite's NUMERIC affinity is the default for anything unrecognized.
    ColumnType::Decimal {
        precision: None,
        scale: None,
    }
}

/// Renders a [`ColumnType`] back to the declared type string SQLite's
/// `CREATE TABLE` grammar expects. Round-trips with [`classify`] for every
/// variant the inspector itself can produce.
pub fn render(ty: &ColumnType) -> String {
    match ty {
        ColumnType::Integer { width: Some(8), .. } => "tinyint".to_string(),
        ColumnType::Integer { width: Some(16), .. } => "smallint".to_string(),
        ColumnType::Integer { width: Some(24), .. } => "mediumint".to_string(),
        ColumnType::Integer { width: Some(32), .. } => "int".to_string(),
        ColumnType::Integer { width: Some(64), .. } => "bigint".to_string(),
        ColumnType::Integer { .. } => "integer".to_string(),
        ColumnType::Float { width: Some(32) } => "float".to_string(),
        ColumnType::Float { .. } => "real".to_string(),
        ColumnType::Decimal { precision: Some(p), scale: Some(s) } => format!("numeric({p},{s})"),
        ColumnType::Decimal { .. } => "numeric".to_string(),
        ColumnType::String { max_length: Some(n), fixed: true } => format!("char({n})"),
        ColumnType::String { max_length: Some(n), fixed: false } => format!("varchar({n})"),
        ColumnType::String { .. } => "text".to_string(),
        ColumnType::Binary { .. } => "blob".to_string(),
        ColumnType::Boolean => "boolean".to_string(),
        ColumnType::Time { .. } => "datetime".to_string(),
        ColumnType::Json { .. } => "text".to_string(),
        ColumnType::Enum { .. } => "text".to_string(),
        ColumnType::Spatial { .. } => "blob".to_string(),
        ColumnType::Uuid => "text".to_string(),
        ColumnType::Unsupported(raw) => raw.clone(),
    }
}

/// Parses the raw text `PRAGMA table_info` reports for a column's default
/// (exactly as it appears in the stored `CREATE TABLE`, including any
/// literal quoting) into a [`ColumnDefault`]. Anything that doesn't parse
/// as a recognized literal is kept as a raw expression rather than
/// dropped, since SQLite defaults can be arbitrary expressions.
pub fn parse_default_literal(raw: &str) -> ColumnDefault {
    let trimmed = raw.trim();

    if trimmed.eq_ignore_ascii_case("null") {
        return ColumnDefault::Literal(LiteralValue::Null);
    }
    if trimmed.len() >= 2 && trimmed.starts_with('\'') && trimmed.ends_with('\'') {
        let inner = &trimmed[1..trimmed.len() - 1];
        return ColumnDefault::Literal(LiteralValue::String(inner.replace("''", "'")));
    }
    if let Ok(i) = trimmed.parse::<i64>() {
        return ColumnDefault::Literal(LiteralValue::Int(i));
    }
    if let Ok(f) = trimmed.parse::<f64>() {
        return ColumnDefault::Literal(LiteralValue::Float(OrderedFloat(f)));
    }

    ColumnDefault::RawExpr(trimmed.to_string())
}

fn extract_length(upper: &str) -> Option<u32> {
    let start = upper.find('(')?;
    let end = upper[start..].find(')')? + start;
    upper[start + 1..end].trim().parse().ok()
}

fn extract_precision_scale(upper: &str) -> (Option<u16>, Option<u16>) {
    let Some(start) = upper.find('(') else {
        return (None, None);
    };
    let Some(end) = upper[start..].find(')').map(|e| e + start) else {
        return (None, None);
    };
    let inner = &upper[start + 1..end];
    let mut parts = inner.split(',');
    let precision = parts.next().and_then(|p| p.trim().parse().ok());
    let scale = parts.next().and_then(|s| s.trim().parse().ok());
    (precision, scale)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_common_affinities() {
        assert!(matches!(classify("INTEGER"), ColumnType::Integer { .. }));
        assert!(matches!(classify("VARCHAR(255)"), ColumnType::String { max_length: Some(255), fixed: false }));
        assert!(matches!(classify("BLOB"), ColumnType::Binary { .. }));
        assert!(matches!(classify("REAL"), ColumnType::Float { .. }));
        assert!(matches!(classify(""), ColumnType::Binary { .. }));
    }

    #[test]
    fn classify_distinguishes_declared_integer_widths() {
        assert!(matches!(classify("bigint"), ColumnType::Integer { width: Some(64), .. }));
        assert!(matches!(classify("int"), ColumnType::Integer { width: Some(32), .. }));
        assert!(matches!(classify("smallint"), ColumnType::Integer { width: Some(16), .. }));
        assert!(matches!(classify("tinyint"), ColumnType::Integer { width: Some(8), .. }));
        assert!(matches!(classify("integer"), ColumnType::Integer { width: None, .. }));
    }

    #[test]
    fn render_round_trips_declared_integer_keyword() {
        assert_eq!(render(&classify("bigint")), "bigint");
        assert_eq!(render(&classify("int")), "int");
        assert_eq!(render(&classify("smallint")), "smallint");
        assert_eq!(render(&classify("integer")), "integer");
    }

    #[test]
    fn render_lowercases_string_and_text_keywords() {
        assert_eq!(render(&classify("varchar(255)")), "varchar(255)");
        assert_eq!(render(&classify("text")), "text");
    }

    #[test]
    fn classifies_numeric_with_precision() {
        match classify("DECIMAL(10,2)") {
            ColumnType::Decimal { precision, scale } => {
                assert_eq!(precision, Some(10));
                assert_eq!(scale, Some(2));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }
}
