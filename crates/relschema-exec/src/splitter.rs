//! Splits a migration file's text into top-level statements on `;`,
//! tracking enough lexical state to not split inside a quoted string,
//! bracketed identifier, comment, or dollar-quoted (heredoc) block.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Default,
    SingleQuote,
    DoubleQuote,
    LineComment,
    BlockComment,
    Heredoc,
}

/// Splits `sql` into trimmed, non-empty statement strings. The trailing
/// `;` is not included in the returned statements.
pub fn split_statements(sql: &str) -> Vec<String> {
    let chars: Vec<char> = sql.chars().collect();
    let mut state = State::Default;
    let mut heredoc_tag: String = String::new();
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();

        match state {
            State::Default => {
                if c == '\'' {
                    state = State::SingleQuote;
                    current.push(c);
                } else if c == '"' {
                    state = State::DoubleQuote;
                    current.push(c);
                } else if c == '-' && next == Some('-') {
                    state = State::LineComment;
                    current.push(c);
                    current.push('-');
                    i += 1;
                } else if c == '/' && next == Some('*') {
                    state = State::BlockComment;
                    current.push(c);
                    current.push('*');
                    i += 1;
                } else if c == '$' {
                    if let Some(tag) = match_heredoc_open(&chars, i) {
                        state = State::Heredoc;
                        current.push_str(&tag);
                        i += tag.chars().count() - 1;
                        heredoc_tag = tag;
                    } else {
                        current.push(c);
                    }
                } else if c == ';' {
                    let trimmed = current.trim();
                    if !trimmed.is_empty() {
                        statements.push(trimmed.to_string());
                    }
                    current.clear();
                } else {
                    current.push(c);
                }
            }
            State::SingleQuote => {
                current.push(c);
                if c == '\'' {
                    if next == Some('\'') {
                        current.push('\'');
                        i += 1;
                    } else {
                        state = State::Default;
                    }
                }
            }
            State::DoubleQuote => {
                current.push(c);
                if c == '"' {
                    if next == Some('"') {
                        current.push('"');
                        i += 1;
                    } else {
                        state = State::Default;
                    }
                }
            }
            State::LineComment => {
                current.push(c);
                if c == '\n' {
                    state = State::Default;
                }
            }
            State::BlockComment => {
                current.push(c);
                if c == '*' && next == Some('/') {
                    current.push('/');
                    i += 1;
                    state = State::Default;
                }
            }
            State::Heredoc => {
                current.push(c);
                if c == '$' {
                    if let Some(tag) = match_heredoc_open(&chars, i) {
                        if tag == heredoc_tag {
                            current.push_str(&tag[1..]);
                            i += tag.chars().count() - 1;
                            state = State::Default;
                        }
                    }
                }
            }
        }
        i += 1;
    }

    let trimmed = current.trim();
    if !trimmed.is_empty() {
        statements.push(trimmed.to_string());
    }
    statements
}

/// Matches a `$tag$` opener starting at `chars[i]` (which must be `$`),
/// returning the full `$tag$` text if one closes before the next `$`.
fn match_heredoc_open(chars: &[char], i: usize) -> Option<String> {
    let mut j = i + 1;
    while j < chars.len() && (chars[j].is_alphanumeric() || chars[j] == '_') {
        j += 1;
    }
    if j < chars.len() && chars[j] == '$' {
        Some(chars[i..=j].iter().collect())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_simple_statements() {
        let sql = "CREATE TABLE t (id INTEGER); INSERT INTO t VALUES (1);";
        let stmts = split_statements(sql);
        assert_eq!(stmts.len(), 2);
        assert_eq!(stmts[0], "CREATE TABLE t (id INTEGER)");
    }

    #[test]
    fn does_not_split_inside_string_literal() {
        let sql = "INSERT INTO t (note) VALUES ('a; b; c');";
        let stmts = split_statements(sql);
        assert_eq!(stmts.len(), 1);
        assert!(stmts[0].contains("a; b; c"));
    }

    #[test]
    fn does_not_split_inside_line_comment() {
        let sql = "-- drop everything; just kidding\nSELECT 1;";
        let stmts = split_statements(sql);
        assert_eq!(stmts.len(), 1);
        assert!(stmts[0].trim_start().starts_with("-- drop"));
    }

    #[test]
    fn does_not_split_inside_block_comment() {
        let sql = "/* a; b; */ SELECT 1;";
        let stmts = split_statements(sql);
        assert_eq!(stmts.len(), 1);
    }

    #[test]
    fn does_not_split_inside_heredoc() {
        let sql = "CREATE TRIGGER t AS $$ BEGIN a; b; END; $$;";
        let stmts = split_statements(sql);
        assert_eq!(stmts.len(), 1);
    }

    #[test]
    fn ignores_trailing_whitespace_only_fragment() {
        let sql = "SELECT 1;\n\n";
        let stmts = split_statements(sql);
        assert_eq!(stmts.len(), 1);
    }
}
