//! Identifier-safe SQL statement builder shared by every dialect's
//! [`crate::Planner`]. Enforces quoting discipline and comma/space
//! formatting so planners compose statements instead of hand-formatting
//! strings ad hoc.

use relschema_core::{ColumnDefault, IndexPart, IndexPartKind, LiteralValue};

/// Per-dialect quoting configuration. `open`/`close` differ for dialects
/// like MSSQL (`[` / `]`); most dialects use the same character for both.
#[derive(Debug, Clone, Copy)]
pub struct QuoteStyle {
    pub open: char,
    pub close: char,
}

impl QuoteStyle {
    pub const fn same(ch: char) -> Self {
        Self { open: ch, close: ch }
    }
}

/// Composes SQL fragments using a dialect's quoting rules.
#[derive(Debug, Clone, Copy)]
pub struct StatementBuilder {
    pub quote: QuoteStyle,
}

impl StatementBuilder {
    pub fn new(quote: QuoteStyle) -> Self {
        Self { quote }
    }

    /// Quotes an identifier. Does not attempt to escape an embedded close
    /// quote beyond doubling it, matching the conservative behavior of
    /// dialects that forbid it outright in DDL identifiers.
    pub fn quote_ident(&self, name: &str) -> String {
        let escaped = name.replace(self.quote.close, &format!("{0}{0}", self.quote.close));
        format!("{}{}{}", self.quote.open, escaped, self.quote.close)
    }

    /// Joins already-quoted/formatted fragments with `, `.
    pub fn join_fields(&self, fields: &[String]) -> String {
        fields.join(", ")
    }

    /// Renders one index part (column reference or raw expression) with
    /// its sort direction.
    pub fn render_index_part(&self, part: &IndexPart) -> String {
        let base = match &part.kind {
            IndexPartKind::Column(col) => self.quote_ident(col),
            IndexPartKind::Expression(expr) => format!("({})", expr),
        };
        if part.descending {
            format!("{base} DESC")
        } else {
            base
        }
    }

    pub fn render_index_parts(&self, parts: &[IndexPart]) -> String {
        let mut sorted: Vec<&IndexPart> = parts.iter().collect();
        sorted.sort_by_key(|p| p.position);
        self.join_fields(
            &sorted
                .into_iter()
                .map(|p| self.render_index_part(p))
                .collect::<Vec<_>>(),
        )
    }

    /// Renders a column default expression as it should appear after
    /// `DEFAULT` in a `CREATE TABLE`/`ALTER TABLE` statement. Literal
    /// string quoting is single-quote with doubling, the SQL-standard
    /// escaping every dialect in this pack's reach shares.
    pub fn render_default(&self, default: &ColumnDefault) -> String {
        match default {
            ColumnDefault::RawExpr(expr) => expr.clone(),
            ColumnDefault::Literal(lit) => Self::render_literal(lit),
        }
    }

    fn render_literal(lit: &LiteralValue) -> String {
        match lit {
            LiteralValue::Null => "NULL".to_string(),
            LiteralValue::Bool(b) => {
                if *b {
                    "1".to_string()
                } else {
                    "0".to_string()
                }
            }
            LiteralValue::Int(i) => i.to_string(),
            LiteralValue::Float(f) => f.0.to_string(),
            LiteralValue::String(s) => format!("'{}'", s.replace('\'', "''")),
            LiteralValue::Bytes(b) => {
                format!("X'{}'", b.iter().map(|byte| format!("{byte:02x}")).collect::<String>())
            }
        }
    }

    /// Renders a parenthesized, comma-joined column list, e.g. for
    /// `FOREIGN KEY (a, b)`.
    pub fn render_column_list(&self, columns: &[String]) -> String {
        format!(
            "({})",
            self.join_fields(&columns.iter().map(|c| self.quote_ident(c)).collect::<Vec<_>>())
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sqlite_builder() -> StatementBuilder {
        StatementBuilder::new(QuoteStyle::same('"'))
    }

    #[test]
    fn quotes_identifiers_with_doubling() {
        let b = sqlite_builder();
        assert_eq!(b.quote_ident("users"), "\"users\"");
        assert_eq!(b.quote_ident("weird\"name"), "\"weird\"\"name\"");
    }

    #[test]
    fn renders_string_literal_with_escaped_quote() {
        let b = sqlite_builder();
        assert_eq!(
            b.render_default(&ColumnDefault::Literal(LiteralValue::String("o'brien".into()))),
            "'o''brien'"
        );
    }

    #[test]
    fn renders_index_parts_in_position_order() {
        let b = sqlite_builder();
        let parts = vec![
            IndexPart {
                position: 1,
                descending: false,
                kind: IndexPartKind::Column("b".into()),
            },
            IndexPart {
                position: 0,
                descending: true,
                kind: IndexPartKind::Column("a".into()),
            },
        ];
        assert_eq!(b.render_index_parts(&parts), "\"a\" DESC, \"b\"");
    }
}
