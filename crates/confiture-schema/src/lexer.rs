//! Statement splitter for DDL files.
//!
//! Lexes a `.sql` file's text into statements at `;` boundaries while
//! respecting dollar-quoted function bodies and single/double-quoted
//! strings, including nested `$tag$ ... $tag$` delimiters (spec §4.1). This
//! is a hand-rolled state machine rather than a `nom` grammar: the only
//! structure that matters here is "am I inside a string/dollar-quote right
//! now", which a single pass with a small amount of state tracks more
//! plainly than a combinator grammar would.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawStatement {
    pub text: String,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LexError {
    #[error("unterminated single-quoted string starting at line {0}")]
    UnterminatedSingleQuote(usize),
    #[error("unterminated double-quoted identifier starting at line {0}")]
    UnterminatedDoubleQuote(usize),
    #[error("unterminated dollar-quoted block ${0}$ starting at line {1}")]
    UnterminatedDollarQuote(String, usize),
}

enum State {
    Normal,
    SingleQuote { start_line: usize },
    DoubleQuote { start_line: usize },
    LineComment,
    BlockComment,
    DollarQuote { tag: String, start_line: usize },
}

/// Split `source` into top-level statements, dropping empty statements
/// (trailing whitespace, trailing semicolons) and line/block comments
/// outside of string and dollar-quote literals.
pub fn split_statements(source: &str) -> Result<Vec<RawStatement>, LexError> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut current_start_line = 1usize;
    let mut line = 1usize;
    let mut state = State::Normal;

    let chars: Vec<char> = source.chars().collect();
    let mut i = 0usize;

    macro_rules! push_and_advance {
        ($n:expr) => {{
            for _ in 0..$n {
                if chars[i] == '\n' {
                    line += 1;
                }
                current.push(chars[i]);
                i += 1;
            }
        }};
    }

    while i < chars.len() {
        match &state {
            State::Normal => {
                if chars[i] == '\n' {
                    line += 1;
                    current.push(chars[i]);
                    i += 1;
                } else if chars[i] == '-' && chars.get(i + 1) == Some(&'-') {
                    state = State::LineComment;
                    i += 2;
                } else if chars[i] == '/' && chars.get(i + 1) == Some(&'*') {
                    state = State::BlockComment;
                    i += 2;
                } else if chars[i] == '\'' {
                    state = State::SingleQuote { start_line: line };
                    current.push(chars[i]);
                    i += 1;
                } else if chars[i] == '"' {
                    state = State::DoubleQuote { start_line: line };
                    current.push(chars[i]);
                    i += 1;
                } else if chars[i] == '$' {
                    if let Some((tag, len)) = try_dollar_tag(&chars, i) {
                        state = State::DollarQuote {
                            tag: tag.clone(),
                            start_line: line,
                        };
                        push_and_advance!(len);
                    } else {
                        current.push(chars[i]);
                        i += 1;
                    }
                } else if chars[i] == ';' {
                    let trimmed = current.trim();
                    if !trimmed.is_empty() {
                        statements.push(RawStatement {
                            text: trimmed.to_string(),
                            line: current_start_line,
                        });
                    }
                    current.clear();
                    i += 1;
                    current_start_line = line;
                } else {
                    if current.trim().is_empty() {
                        current_start_line = line;
                    }
                    current.push(chars[i]);
                    i += 1;
                }
            }
            State::LineComment => {
                if chars[i] == '\n' {
                    state = State::Normal;
                    line += 1;
                    current.push('\n');
                }
                i += 1;
            }
            State::BlockComment => {
                if chars[i] == '*' && chars.get(i + 1) == Some(&'/') {
                    state = State::Normal;
                    i += 2;
                } else {
                    if chars[i] == '\n' {
                        line += 1;
                    }
                    i += 1;
                }
            }
            State::SingleQuote { .. } => {
                if chars[i] == '\'' && chars.get(i + 1) == Some(&'\'') {
                    // Escaped quote inside a string literal.
                    current.push('\'');
                    current.push('\'');
                    i += 2;
                } else if chars[i] == '\'' {
                    current.push('\'');
                    i += 1;
                    state = State::Normal;
                } else {
                    if chars[i] == '\n' {
                        line += 1;
                    }
                    current.push(chars[i]);
                    i += 1;
                }
            }
            State::DoubleQuote { .. } => {
                if chars[i] == '"' {
                    current.push('"');
                    i += 1;
                    state = State::Normal;
                } else {
                    current.push(chars[i]);
                    i += 1;
                }
            }
            State::DollarQuote { tag, start_line } => {
                let tag = tag.clone();
                let start_line = *start_line;
                let closing = format!("${}$", tag);
                if matches_at(&chars, i, &closing) {
                    push_and_advance!(closing.chars().count());
                    state = State::Normal;
                } else if i >= chars.len() {
                    return Err(LexError::UnterminatedDollarQuote(tag, start_line));
                } else {
                    push_and_advance!(1);
                }
            }
        }
    }

    match state {
        State::SingleQuote { start_line } => return Err(LexError::UnterminatedSingleQuote(start_line)),
        State::DoubleQuote { start_line } => return Err(LexError::UnterminatedDoubleQuote(start_line)),
        State::DollarQuote { tag, start_line } => {
            return Err(LexError::UnterminatedDollarQuote(tag, start_line));
        }
        _ => {}
    }

    let trimmed = current.trim();
    if !trimmed.is_empty() {
        statements.push(RawStatement {
            text: trimmed.to_string(),
            line: current_start_line,
        });
    }

    Ok(statements)
}

/// Attempts to recognise a `$tag$` opening delimiter at position `i`.
/// Returns the tag (empty string for the bare `$$` delimiter) and the
/// number of characters consumed.
fn try_dollar_tag(chars: &[char], i: usize) -> Option<(String, usize)> {
    let mut j = i + 1;
    let mut tag = String::new();
    while j < chars.len() && (chars[j].is_alphanumeric() || chars[j] == '_') {
        tag.push(chars[j]);
        j += 1;
    }
    if j < chars.len() && chars[j] == '$' {
        Some((tag, j - i + 1))
    } else {
        None
    }
}

fn matches_at(chars: &[char], i: usize, needle: &str) -> bool {
    let needle_chars: Vec<char> = needle.chars().collect();
    if i + needle_chars.len() > chars.len() {
        return false;
    }
    chars[i..i + needle_chars.len()] == needle_chars[..]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_simple_statements() {
        let stmts = split_statements("create table a (id int); create table b (id int);").unwrap();
        assert_eq!(stmts.len(), 2);
    }

    #[test]
    fn respects_semicolon_inside_single_quotes() {
        let stmts = split_statements("insert into a values ('a;b');").unwrap();
        assert_eq!(stmts.len(), 1);
        assert!(stmts[0].text.contains("a;b"));
    }

    #[test]
    fn respects_dollar_quoted_function_body() {
        let sql = r#"
create function f() returns int as $$
begin
  return 1; -- semicolon inside body, and inside a comment too
end;
$$ language plpgsql;
"#;
        let stmts = split_statements(sql).unwrap();
        assert_eq!(stmts.len(), 1);
        assert!(stmts[0].text.contains("return 1"));
    }

    #[test]
    fn respects_tagged_dollar_quotes() {
        let sql = "create function f() returns text as $body$ select ';'; $body$ language sql;";
        let stmts = split_statements(sql).unwrap();
        assert_eq!(stmts.len(), 1);
    }

    #[test]
    fn nested_distinct_tags_do_not_close_each_other() {
        let sql = "create function f() as $outer$ select $inner$ a;b $inner$; $outer$ language sql;";
        let stmts = split_statements(sql).unwrap();
        assert_eq!(stmts.len(), 1);
    }

    #[test]
    fn strips_line_and_block_comments() {
        let sql = "-- a comment\ncreate table a (id int); /* block\ncomment */ create table b(id int);";
        let stmts = split_statements(sql).unwrap();
        assert_eq!(stmts.len(), 2);
    }

    #[test]
    fn unterminated_single_quote_is_an_error() {
        let err = split_statements("insert into a values ('oops);").unwrap_err();
        assert!(matches!(err, LexError::UnterminatedSingleQuote(_)));
    }
}
