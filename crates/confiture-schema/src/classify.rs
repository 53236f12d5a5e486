//! Classifies a normalised DDL statement by its leading keyword into typed
//! `SchemaObject`s (spec §4.1). A `CREATE TABLE` decomposes into one bare
//! `Table` object plus one `Column` object per column and one `Constraint`
//! object per inline or table-level constraint, so the differ can compare
//! column- and constraint-level changes the same way it does against a
//! live-introspected `SchemaState` (spec §4.2 scenario 4).

use crate::normalize::{fold_identifier, normalize_body};
use confiture_core::{ColumnAttrs, ConstraintAttrs, ConstraintKind, IndexAttrs, ObjectKey, ObjectKind, SchemaObject};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClassifyError {
    #[error("unknown DDL statement: {0}")]
    UnknownStatement(String),
}

/// A minimally parsed identity, enough to build an `ObjectKey` without a
/// full SQL grammar: leading DDL verb, target kind, schema-qualified name,
/// and parent (for columns/indexes/constraints owned by a table).
struct Identity {
    kind: ObjectKind,
    schema: String,
    name: String,
    parent: Option<String>,
}

/// Classify one normalised statement into zero or more objects. Returns an
/// empty vec for statements this parser deliberately ignores at the top
/// level (e.g. `GRANT`, `SET`), and more than one object for a `CREATE
/// TABLE` whose column list decomposes into `Column`/`Constraint` objects.
pub fn classify(normalized: &str, default_schema: &str) -> Result<Vec<SchemaObject>, ClassifyError> {
    let lower = normalized.to_ascii_lowercase();
    let words: Vec<&str> = lower.split_whitespace().collect();
    if words.is_empty() {
        return Ok(Vec::new());
    }

    match words[0] {
        "create" => classify_create(normalized, &words, default_schema),
        "alter" => Ok(classify_alter(normalized, &words, default_schema)?
            .map(|identity| build_object(identity, normalized, &lower))
            .into_iter()
            .collect()),
        "drop" => Ok(Vec::new()), // drops are not objects themselves; they remove one
        "comment" => Ok(classify_comment(normalized, &words, default_schema)?
            .map(|identity| build_object(identity, normalized, &lower))
            .into_iter()
            .collect()),
        "grant" | "revoke" | "set" | "insert" | "update" | "delete" | "select" => Ok(Vec::new()),
        _ => Err(ClassifyError::UnknownStatement(normalized.to_string())),
    }
}

/// Builds the single `SchemaObject` for an `Identity` that isn't a
/// decomposed table (index, view, sequence, schema, an `ALTER`'s touched
/// object, a `COMMENT ON` target, ...). Attribute payloads here are only as
/// detailed as a single-statement `Identity` can carry; a `CREATE TABLE`'s
/// column/constraint attributes are built by `decompose_table` instead.
fn build_object(identity: Identity, normalized: &str, lower: &str) -> SchemaObject {
    let key = ObjectKey::new(identity.kind, identity.schema, identity.name, identity.parent);
    let mut obj = SchemaObject::new(key, normalized);

    if identity.kind == ObjectKind::Index {
        obj = obj.with_index(IndexAttrs {
            columns: Vec::new(),
            method: "btree".to_string(),
            unique: lower.contains("unique index"),
            concurrent: lower.contains("concurrently"),
        });
    }
    if identity.kind == ObjectKind::Constraint {
        let kind = if lower.contains("primary key") {
            ConstraintKind::PrimaryKey
        } else if lower.contains("foreign key") || lower.contains("references") {
            ConstraintKind::ForeignKey
        } else if lower.contains("unique") {
            ConstraintKind::Unique
        } else {
            ConstraintKind::Check
        };
        obj = obj.with_constraint(ConstraintAttrs {
            kind,
            columns: Vec::new(),
            references: None,
            not_valid: lower.contains("not valid"),
        });
    }
    if identity.kind == ObjectKind::Column {
        obj = obj.with_column(ColumnAttrs {
            data_type: String::new(),
            nullable: !lower.contains("not null"),
            default: None,
            referenced_type: None,
        });
    }

    obj
}

fn qualify(default_schema: &str, raw_name: &str) -> (String, String) {
    let raw_name = raw_name.trim_matches(|c| c == '(' || c == ',');
    if let Some((schema, name)) = raw_name.split_once('.') {
        (fold_identifier(schema), fold_identifier(name))
    } else {
        (default_schema.to_string(), fold_identifier(raw_name))
    }
}

fn classify_create(
    normalized: &str,
    words: &[&str],
    default_schema: &str,
) -> Result<Vec<SchemaObject>, ClassifyError> {
    let mut i = 1;
    // Skip modifiers: OR REPLACE, TEMP/TEMPORARY, UNIQUE, UNLOGGED.
    while i < words.len() && matches!(words[i], "or" | "replace" | "temp" | "temporary" | "unlogged")
    {
        i += 1;
    }
    let unique_prefixed = i < words.len() && words[i] == "unique";
    if unique_prefixed {
        i += 1;
    }

    if i >= words.len() {
        return Err(ClassifyError::UnknownStatement(normalized.to_string()));
    }

    let noun = words[i];
    let kind = match noun {
        "table" => ObjectKind::Table,
        "index" => ObjectKind::Index,
        "view" => ObjectKind::View,
        "sequence" => ObjectKind::Sequence,
        "function" | "procedure" => ObjectKind::Function,
        "trigger" => ObjectKind::Trigger,
        "extension" => ObjectKind::Extension,
        "schema" => ObjectKind::Schema,
        "type" | "domain" => ObjectKind::Type,
        "materialized" => ObjectKind::MaterializedView, // "materialized view"
        "concurrently" => {
            // "create index concurrently" has already consumed "index"; unreachable.
            return Err(ClassifyError::UnknownStatement(normalized.to_string()));
        }
        _ => return Err(ClassifyError::UnknownStatement(normalized.to_string())),
    };
    i += 1;
    if kind == ObjectKind::MaterializedView {
        if words.get(i) != Some(&"view") {
            return Err(ClassifyError::UnknownStatement(normalized.to_string()));
        }
        i += 1;
    }

    if kind == ObjectKind::Index {
        if words.get(i) == Some(&"concurrently") {
            i += 1;
        }
        // `CREATE [UNIQUE] INDEX [CONCURRENTLY] [name] ON table ...`
        let name = if words.get(i) == Some(&"if") {
            // IF NOT EXISTS name
            i += 3;
            words.get(i).copied().unwrap_or("unnamed_idx")
        } else if words.get(i) == Some(&"on") {
            "unnamed_idx"
        } else {
            words.get(i).copied().unwrap_or("unnamed_idx")
        };
        let (schema, name) = qualify(default_schema, name);
        return Ok(vec![build_object(
            Identity { kind, schema, name, parent: None },
            normalized,
            &words.join(" "),
        )]);
    }

    if words.get(i) == Some(&"if") {
        i += 3; // IF NOT EXISTS
    }

    let raw_name = words.get(i).copied().unwrap_or("unnamed");
    let (schema, name) = qualify(default_schema, raw_name);

    if kind == ObjectKind::Schema {
        return Ok(vec![build_object(
            Identity { kind, schema: name.clone(), name, parent: None },
            normalized,
            &words.join(" "),
        )]);
    }

    if kind == ObjectKind::Table {
        return Ok(decompose_table(normalized, &schema, &name, default_schema));
    }

    Ok(vec![build_object(
        Identity { kind, schema, name, parent: None },
        normalized,
        &words.join(" "),
    )])
}

/// Decomposes a `CREATE TABLE name (column-list)` statement: a bare `Table`
/// object (`create table <name>`, matching the introspector's reconstructed
/// body so the two sources can agree on the table object itself), then one
/// `Column` object per column definition and one `Constraint` object per
/// inline or table-level constraint found in the column list.
fn decompose_table(normalized: &str, schema: &str, name: &str, default_schema: &str) -> Vec<SchemaObject> {
    let table_key = ObjectKey::new(ObjectKind::Table, schema, name, None);
    let mut objects = vec![SchemaObject::new(table_key, normalize_body(&format!("create table {name}")))];

    let Some(body) = extract_parenthesized_body(normalized) else {
        return objects;
    };

    let mut counters = ConstraintCounters::default();
    for item in split_top_level(&body, ',') {
        let item = item.trim();
        if item.is_empty() {
            continue;
        }
        let lower_item = item.to_ascii_lowercase();
        if let Some(constraint) = classify_table_constraint(&lower_item, schema, name, default_schema, &mut counters) {
            objects.push(constraint);
        } else if let Some((column, inline)) = classify_column(&lower_item, schema, name, default_schema, &mut counters) {
            objects.push(column);
            objects.extend(inline);
        }
    }

    objects
}

/// Locates the first top-level `(...)` span in `text` (the column list of
/// a `CREATE TABLE`) and returns its interior, respecting nested
/// parentheses and single-quoted strings.
pub(crate) fn extract_parenthesized_body(text: &str) -> Option<String> {
    let start = text.char_indices().find(|&(_, c)| c == '(')?.0;
    let mut depth = 0i32;
    let mut in_single = false;
    let mut end = None;
    for (idx, c) in text.char_indices().skip_while(|&(i, _)| i < start) {
        match c {
            '\'' => in_single = !in_single,
            '(' if !in_single => depth += 1,
            ')' if !in_single => {
                depth -= 1;
                if depth == 0 {
                    end = Some(idx);
                    break;
                }
            }
            _ => {}
        }
    }
    Some(text[start + 1..end?].to_string())
}

/// Splits `input` on `sep` at nesting depth zero, so a column's own
/// `numeric(10,2)` or a constraint's `references table(a,b)` parenthesised
/// list never gets split as if it were a column-list separator.
pub(crate) fn split_top_level(input: &str, sep: char) -> Vec<String> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut in_single = false;
    let mut current = String::new();
    for c in input.chars() {
        match c {
            '\'' => {
                in_single = !in_single;
                current.push(c);
            }
            '(' if !in_single => {
                depth += 1;
                current.push(c);
            }
            ')' if !in_single => {
                depth -= 1;
                current.push(c);
            }
            c if c == sep && depth == 0 && !in_single => {
                parts.push(std::mem::take(&mut current));
            }
            c => current.push(c),
        }
    }
    if !current.trim().is_empty() {
        parts.push(current);
    }
    parts
}

/// Postgres' own default constraint-naming convention: the first unnamed
/// constraint of a given kind on a table gets the bare suffix
/// (`_pkey`/`_key`/`_fkey`/`_check`); the Nth (N>1) gets that suffix with
/// `N-1` appended (`_key1`, `_key2`, ...), mirroring `ChooseConstraintName`
/// trying the bare name first and then probing `base`, `base1`, `base2`...
/// `count` is the 1-based occurrence of this kind on this table, so an
/// unnamed inline constraint parsed from DDL keys identically to the same
/// table introspected live from a database that never named it either.
fn default_constraint_name(table: &str, kind: ConstraintKind, count: usize) -> String {
    let suffix = if count <= 1 { String::new() } else { (count - 1).to_string() };
    match kind {
        ConstraintKind::PrimaryKey => format!("{table}_pkey"),
        ConstraintKind::Unique => format!("{table}_key{suffix}"),
        ConstraintKind::ForeignKey => format!("{table}_fkey{suffix}"),
        ConstraintKind::Check => format!("{table}_check{suffix}"),
        ConstraintKind::NotNull => format!("{table}_not_null{suffix}"),
    }
}

/// Per-kind occurrence counters for a single table's unnamed constraints
/// (spec §4.1): Postgres numbers each constraint kind independently, so a
/// table's first `UNIQUE` is `_key` even if a `PRIMARY KEY` or `CHECK` was
/// already seen.
#[derive(Default)]
struct ConstraintCounters {
    primary_key: usize,
    unique: usize,
    foreign_key: usize,
    check: usize,
    not_null: usize,
}

impl ConstraintCounters {
    fn bump(&mut self, kind: ConstraintKind) -> usize {
        let slot = match kind {
            ConstraintKind::PrimaryKey => &mut self.primary_key,
            ConstraintKind::Unique => &mut self.unique,
            ConstraintKind::ForeignKey => &mut self.foreign_key,
            ConstraintKind::Check => &mut self.check,
            ConstraintKind::NotNull => &mut self.not_null,
        };
        *slot += 1;
        *slot
    }
}

fn constraint_ddl(
    name: &str,
    kind: ConstraintKind,
    columns: &[String],
    references: &Option<(String, String, Vec<String>)>,
) -> String {
    let kind_str = match kind {
        ConstraintKind::PrimaryKey => "primary key",
        ConstraintKind::Unique => "unique",
        ConstraintKind::ForeignKey => "foreign key",
        ConstraintKind::Check => "check",
        ConstraintKind::NotNull => "not null",
    };
    let cols = columns.join(", ");
    match references {
        Some((ref_schema, ref_table, ref_cols)) => normalize_body(&format!(
            "constraint {name} {kind_str} ({cols}) references {ref_schema}.{ref_table} ({})",
            ref_cols.join(", ")
        )),
        None => normalize_body(&format!("constraint {name} {kind_str} ({cols})")),
    }
}

fn build_constraint_object(
    schema: &str,
    table: &str,
    kind: ConstraintKind,
    explicit_name: Option<String>,
    columns: Vec<String>,
    references: Option<(String, String, Vec<String>)>,
    not_valid: bool,
    counters: &mut ConstraintCounters,
) -> SchemaObject {
    let name = match explicit_name {
        Some(name) => name,
        None => {
            let count = counters.bump(kind);
            default_constraint_name(table, kind, count)
        }
    };
    let key = ObjectKey::new(ObjectKind::Constraint, schema, name.clone(), Some(table.to_string()));
    SchemaObject::new(key, constraint_ddl(&name, kind, &columns, &references)).with_constraint(ConstraintAttrs {
        kind,
        columns,
        references,
        not_valid,
    })
}

/// Recognises a table-level constraint item: `[CONSTRAINT name] PRIMARY
/// KEY (...)` / `UNIQUE (...)` / `FOREIGN KEY (...) REFERENCES ...` /
/// `CHECK (...)`. Returns `None` for anything else (a plain column
/// definition).
fn classify_table_constraint(
    lower_item: &str,
    schema: &str,
    table: &str,
    default_schema: &str,
    counters: &mut ConstraintCounters,
) -> Option<SchemaObject> {
    let words: Vec<&str> = lower_item.split_whitespace().collect();
    let is_named = words.first() == Some(&"constraint");
    let rest_start = if is_named { 2 } else { 0 };
    let explicit_name = if is_named {
        Some(fold_identifier(words.get(1)?))
    } else {
        None
    };

    let kind = match words.get(rest_start)? {
        &"primary" if words.get(rest_start + 1) == Some(&"key") => ConstraintKind::PrimaryKey,
        &"unique" => ConstraintKind::Unique,
        &"foreign" if words.get(rest_start + 1) == Some(&"key") => ConstraintKind::ForeignKey,
        &"check" => ConstraintKind::Check,
        _ => return None,
    };

    let columns = extract_parenthesized_body(lower_item)
        .map(|g| split_top_level(&g, ',').iter().map(|s| s.trim().to_string()).collect())
        .unwrap_or_default();
    let references = if kind == ConstraintKind::ForeignKey {
        parse_references(lower_item, default_schema)
    } else {
        None
    };
    let not_valid = lower_item.contains("not valid");

    Some(build_constraint_object(
        schema,
        table,
        kind,
        explicit_name,
        columns,
        references,
        not_valid,
        counters,
    ))
}

/// Finds `REFERENCES <table>(<columns>)` anywhere in `text` and returns the
/// referenced `(schema, table, columns)`, independent of whether the
/// author wrote a space before the column list's opening paren.
pub(crate) fn parse_references(text: &str, default_schema: &str) -> Option<(String, String, Vec<String>)> {
    let idx = text.find("references")?;
    let after = text[idx + "references".len()..].trim_start();
    let table_end = after.find('(').unwrap_or(after.len());
    let (ref_schema, ref_table) = qualify(default_schema, after[..table_end].trim());
    let columns = extract_parenthesized_body(&after[table_end..])
        .map(|g| split_top_level(&g, ',').iter().map(|s| s.trim().to_string()).collect())
        .unwrap_or_default();
    Some((ref_schema, ref_table, columns))
}

/// Finds `DEFAULT <expr>` in a column's trailing clause and returns `<expr>`
/// up to the next recognised constraint keyword.
fn extract_default(clause: &str) -> Option<String> {
    let idx = clause.find("default")?;
    let after = clause[idx + "default".len()..].trim_start();
    let mut end = after.len();
    for stop in ["not null", "primary key", "unique", "references", "check"] {
        if let Some(pos) = after.find(stop) {
            end = end.min(pos);
        }
    }
    let value = after[..end].trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

const COLUMN_CLAUSE_STARTERS: &[&str] =
    &["not", "null", "default", "primary", "unique", "references", "check", "collate", "generated"];

/// Parses one column-list item as a column definition: `name type
/// [inline-constraints...]`. Returns the `Column` object plus any
/// constraint objects its inline clauses imply (`PRIMARY KEY`, `UNIQUE`,
/// `REFERENCES`). Returns `None` if `lower_item` doesn't look like a
/// column (no recognisable type token before a constraint keyword).
fn classify_column(
    lower_item: &str,
    schema: &str,
    table: &str,
    default_schema: &str,
    counters: &mut ConstraintCounters,
) -> Option<(SchemaObject, Vec<SchemaObject>)> {
    let mut words = lower_item.split_whitespace();
    let name = fold_identifier(words.next()?);
    let rest: Vec<&str> = words.collect();

    let mut split = rest.len();
    for (idx, word) in rest.iter().enumerate() {
        if COLUMN_CLAUSE_STARTERS.contains(word) {
            split = idx;
            break;
        }
    }
    if split == 0 {
        return None; // no type token before a constraint keyword: not a column
    }
    let data_type = rest[..split].join(" ");
    let clause = rest[split..].join(" ");

    let is_primary_key = clause.contains("primary key");
    let nullable = !(clause.contains("not null") || is_primary_key);
    let default = extract_default(&clause);

    let mut inline = Vec::new();
    if is_primary_key {
        inline.push(build_constraint_object(
            schema,
            table,
            ConstraintKind::PrimaryKey,
            None,
            vec![name.clone()],
            None,
            false,
            counters,
        ));
    }
    if clause.contains("unique") && !is_primary_key {
        inline.push(build_constraint_object(
            schema,
            table,
            ConstraintKind::Unique,
            None,
            vec![name.clone()],
            None,
            false,
            counters,
        ));
    }
    if let Some(references) = parse_references(&clause, default_schema) {
        inline.push(build_constraint_object(
            schema,
            table,
            ConstraintKind::ForeignKey,
            None,
            vec![name.clone()],
            Some(references),
            clause.contains("not valid"),
            counters,
        ));
    }

    let column_ddl = normalize_body(&format!(
        "{name} {data_type}{}{}",
        if nullable { "" } else { " not null" },
        default.as_deref().map(|d| format!(" default {d}")).unwrap_or_default(),
    ));

    let column_key = ObjectKey::new(ObjectKind::Column, schema, name, Some(table.to_string()));
    let column = SchemaObject::new(column_key, column_ddl).with_column(ColumnAttrs {
        data_type,
        nullable,
        default,
        referenced_type: None,
    });

    Some((column, inline))
}

fn classify_alter(
    normalized: &str,
    words: &[&str],
    default_schema: &str,
) -> Result<Option<Identity>, ClassifyError> {
    // ALTER <noun> [IF EXISTS] <name> ... ; we model the alter as touching
    // the parent object itself (the differ compares bodies, so an ALTER
    // statement read from a DDL tree folds into the owning object's body
    // via the caller's duplicate-merge pass, not here).
    let noun = words.get(1).copied().unwrap_or("");
    let kind = match noun {
        "table" => ObjectKind::Table,
        "view" => ObjectKind::View,
        "sequence" => ObjectKind::Sequence,
        "type" => ObjectKind::Type,
        "function" | "procedure" => ObjectKind::Function,
        _ => return Ok(None),
    };
    let mut i = 2;
    if words.get(i) == Some(&"if") {
        i += 3;
    }
    let raw_name = words.get(i).copied().unwrap_or("unnamed");
    let (schema, name) = qualify(default_schema, raw_name);
    let _ = normalized;
    Ok(Some(Identity {
        kind,
        schema,
        name,
        parent: None,
    }))
}

fn classify_comment(
    normalized: &str,
    words: &[&str],
    default_schema: &str,
) -> Result<Option<Identity>, ClassifyError> {
    // COMMENT ON <kind> <name> IS '...'
    if words.get(1) != Some(&"on") {
        return Err(ClassifyError::UnknownStatement(normalized.to_string()));
    }
    let noun = words.get(2).copied().unwrap_or("");
    let kind = match noun {
        "table" => ObjectKind::Table,
        "column" => ObjectKind::Column,
        _ => ObjectKind::Comment,
    };
    let raw_name = words.get(3).copied().unwrap_or("unnamed");
    let (schema, name) = qualify(default_schema, raw_name);
    let _ = normalized;
    Ok(Some(Identity {
        kind: if kind == ObjectKind::Column || kind == ObjectKind::Table {
            ObjectKind::Comment
        } else {
            kind
        },
        schema,
        name,
        parent: None,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::normalize_body;

    fn run(sql: &str) -> Vec<SchemaObject> {
        let normalized = normalize_body(sql);
        classify(&normalized, "public").unwrap()
    }

    fn run_one(sql: &str) -> SchemaObject {
        let mut objects = run(sql);
        assert_eq!(objects.len(), 1);
        objects.remove(0)
    }

    #[test]
    fn classifies_create_table_with_plain_columns() {
        let objects = run("CREATE TABLE users (id int)");
        assert_eq!(objects.len(), 2); // table + one column
        let table = objects.iter().find(|o| o.key.kind == ObjectKind::Table).unwrap();
        assert_eq!(table.key.name, "users");
        assert_eq!(table.key.schema, "public");
        assert_eq!(table.ddl, "create table users");
        let column = objects.iter().find(|o| o.key.kind == ObjectKind::Column).unwrap();
        assert_eq!(column.key.name, "id");
        assert_eq!(column.key.parent.as_deref(), Some("users"));
        assert_eq!(column.column.as_ref().unwrap().data_type, "int");
    }

    #[test]
    fn classifies_schema_qualified_table() {
        let objects = run("CREATE TABLE catalog.tb_machine (id int)");
        let table = objects.iter().find(|o| o.key.kind == ObjectKind::Table).unwrap();
        assert_eq!(table.key.schema, "catalog");
        assert_eq!(table.key.name, "tb_machine");
    }

    #[test]
    fn inline_primary_key_produces_a_constraint_object() {
        let objects = run("CREATE TABLE users (id uuid PRIMARY KEY, email text)");
        let pk = objects
            .iter()
            .find(|o| o.key.kind == ObjectKind::Constraint)
            .expect("expected a primary key constraint object");
        assert_eq!(pk.key.name, "users_pkey");
        let attrs = pk.constraint.as_ref().unwrap();
        assert_eq!(attrs.kind, ConstraintKind::PrimaryKey);
        assert_eq!(attrs.columns, vec!["id".to_string()]);

        let id_column = objects
            .iter()
            .find(|o| o.key.kind == ObjectKind::Column && o.key.name == "id")
            .unwrap();
        assert!(!id_column.column.as_ref().unwrap().nullable);
    }

    #[test]
    fn inline_foreign_key_captures_the_referenced_table() {
        let objects = run("CREATE TABLE orders (customer_id uuid REFERENCES users(id))");
        let fk = objects
            .iter()
            .find(|o| o.key.kind == ObjectKind::Constraint)
            .expect("expected a foreign key constraint object");
        let attrs = fk.constraint.as_ref().unwrap();
        assert_eq!(attrs.kind, ConstraintKind::ForeignKey);
        assert_eq!(
            attrs.references,
            Some(("public".to_string(), "users".to_string(), vec!["id".to_string()]))
        );
    }

    #[test]
    fn table_level_constraint_is_its_own_object() {
        let objects = run("CREATE TABLE memberships (user_id uuid, group_id uuid, CONSTRAINT uq_membership UNIQUE (user_id, group_id))");
        let uq = objects.iter().find(|o| o.key.name == "uq_membership").unwrap();
        assert_eq!(uq.key.kind, ObjectKind::Constraint);
        let attrs = uq.constraint.as_ref().unwrap();
        assert_eq!(attrs.kind, ConstraintKind::Unique);
        assert_eq!(attrs.columns, vec!["user_id".to_string(), "group_id".to_string()]);
    }

    #[test]
    fn classifies_create_index() {
        let obj = run_one("CREATE UNIQUE INDEX idx_users_email ON users (email)");
        assert_eq!(obj.key.kind, ObjectKind::Index);
        assert_eq!(obj.key.name, "idx_users_email");
        assert!(obj.index.unwrap().unique);
    }

    #[test]
    fn classifies_materialized_view() {
        let obj = run_one("CREATE MATERIALIZED VIEW mv_totals AS SELECT 1");
        assert_eq!(obj.key.kind, ObjectKind::MaterializedView);
    }

    #[test]
    fn drop_and_dml_are_ignored_at_top_level() {
        let normalized = normalize_body("DROP TABLE users");
        assert!(classify(&normalized, "public").unwrap().is_empty());
        let normalized = normalize_body("INSERT INTO users VALUES (1)");
        assert!(classify(&normalized, "public").unwrap().is_empty());
    }
}
