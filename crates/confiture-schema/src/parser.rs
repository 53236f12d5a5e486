//! Ingests a directory of `.sql` files in a declared load order and
//! produces a `SchemaState` (spec §4.1 `parse_tree`).

use crate::classify::{classify, ClassifyError};
use crate::lexer::{split_statements, LexError};
use crate::normalize::normalize_body;
use confiture_core::{ObjectKey, SchemaObject, SchemaState, SourceLocation};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{location}: {source}")]
    Lex {
        location: SourceLocation,
        #[source]
        source: LexError,
    },
    #[error("{location}: {source}")]
    Classify {
        location: SourceLocation,
        #[source]
        source: ClassifyError,
    },
    #[error(
        "duplicate object definition: {key} first defined in {first}, redefined in {second} with a different body"
    )]
    Duplicate {
        key: String,
        first: String,
        second: String,
    },
    #[error("load_order pattern matched no files: {0}")]
    EmptyPattern(String),
    #[error("glob pattern error: {0}")]
    Glob(#[from] glob::PatternError),
}

/// Reads files in the declared load order (glob patterns interpreted
/// left-to-right; earlier patterns are visible to later ones as prior
/// definitions for duplicate detection) and produces one `SchemaState`.
///
/// A `CREATE OR REPLACE` whose normalised body is identical to an
/// already-present object collapses into that one object; a later
/// definition with a *different* body is a `ParseError::Duplicate` (spec
/// §4.1 edge-case policy and failure model: no partial `SchemaState` is
/// ever returned).
pub fn parse_tree(root: &Path, load_order: &[String]) -> Result<SchemaState, ParseError> {
    let mut seen: HashMap<ObjectKey, (SchemaObject, String)> = HashMap::new();

    for pattern in load_order {
        let full_pattern = root.join(pattern);
        let full_pattern_str = full_pattern.to_string_lossy().to_string();
        let mut matched_any = false;

        let mut paths: Vec<PathBuf> = glob::glob(&full_pattern_str)?
            .filter_map(|entry| entry.ok())
            .collect();
        paths.sort();

        for path in paths {
            matched_any = true;
            parse_file(&path, &mut seen)?;
        }

        if !matched_any {
            return Err(ParseError::EmptyPattern(pattern.clone()));
        }
    }

    let objects = seen.into_values().map(|(obj, _)| obj).collect();
    Ok(SchemaState::new(objects))
}

fn parse_file(
    path: &Path,
    seen: &mut HashMap<ObjectKey, (SchemaObject, String)>,
) -> Result<(), ParseError> {
    let content = std::fs::read_to_string(path).map_err(|source| ParseError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let file_display = path.display().to_string();

    let statements = split_statements(&content).map_err(|source| ParseError::Lex {
        location: SourceLocation {
            file: file_display.clone(),
            line: 1,
        },
        source,
    })?;

    for statement in statements {
        let normalized = normalize_body(&statement.text);
        let location = SourceLocation {
            file: file_display.clone(),
            line: statement.line,
        };

        let objects = classify(&normalized, "public").map_err(|source| ParseError::Classify {
            location: location.clone(),
            source,
        })?;

        for object in objects {
            match seen.get(&object.key) {
                None => {
                    seen.insert(object.key.clone(), (object, file_display.clone()));
                }
                Some((existing, first_file)) => {
                    if existing.ddl != object.ddl {
                        return Err(ParseError::Duplicate {
                            key: object.key.qualified_name(),
                            first: first_file.clone(),
                            second: file_display.clone(),
                        });
                    }
                    // Identical CREATE OR REPLACE (or exact re-declaration):
                    // collapse into the one already recorded.
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(dir: &Path, name: &str, contents: &str) {
        let path = dir.join(name);
        let mut f = std::fs::File::create(path).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
    }

    #[test]
    fn parses_multiple_files_in_load_order() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "001_schema.sql", "create schema app;");
        write_file(
            dir.path(),
            "002_tables.sql",
            "create table app.users (id int);",
        );

        let state = parse_tree(
            dir.path(),
            &["001_schema.sql".to_string(), "002_tables.sql".to_string()],
        )
        .unwrap();

        // schema + table + one column
        assert_eq!(state.len(), 3);
    }

    #[test]
    fn identical_redefinition_collapses() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "a.sql", "create table users (id int);");
        write_file(dir.path(), "b.sql", "create table users (id int);");

        let state = parse_tree(dir.path(), &["*.sql".to_string()]).unwrap();
        // table + one column
        assert_eq!(state.len(), 2);
    }

    #[test]
    fn conflicting_redefinition_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "a.sql", "create table users (id int);");
        write_file(dir.path(), "b.sql", "create table users (id bigint);");

        let err = parse_tree(dir.path(), &["*.sql".to_string()]).unwrap_err();
        assert!(matches!(err, ParseError::Duplicate { .. }));
    }

    #[test]
    fn empty_pattern_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let err = parse_tree(dir.path(), &["nope/*.sql".to_string()]).unwrap_err();
        assert!(matches!(err, ParseError::EmptyPattern(_)));
    }
}
