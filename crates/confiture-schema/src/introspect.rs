//! Live database introspection: runs a fixed set of catalog queries and
//! reconstructs a `SchemaState` equivalent to one parsed from DDL (spec
//! §4.1 `introspect`). The catalog query shapes follow PostgreSQL's
//! `information_schema` and `pg_catalog` views; reconstruction must be
//! fingerprint-stable regardless of platform-specific catalog formatting,
//! so every value is normalised the same way the parser normalises a DDL
//! body before it reaches `SchemaObject`.

use crate::classify::{extract_parenthesized_body, parse_references, split_top_level};
use crate::normalize::normalize_body;
use confiture_core::{
    ColumnAttrs, ConstraintAttrs, ConstraintKind, IndexAttrs, ObjectKey, ObjectKind, SchemaObject, SchemaState,
};
use tokio_postgres::Client;

pub mod queries {
    pub const SCHEMAS_QUERY: &str = r#"
        SELECT nspname AS name
        FROM pg_namespace
        WHERE nspname NOT LIKE 'pg_%'
          AND nspname != 'information_schema'
        ORDER BY nspname
    "#;

    pub const TABLES_QUERY: &str = r#"
        SELECT schemaname AS schema, tablename AS name
        FROM pg_tables
        WHERE schemaname NOT LIKE 'pg_%'
          AND schemaname != 'information_schema'
        ORDER BY schemaname, tablename
    "#;

    pub const COLUMNS_QUERY: &str = r#"
        SELECT
            c.table_schema AS schema,
            c.table_name AS "table",
            c.column_name AS name,
            c.udt_name AS column_type,
            c.is_nullable = 'NO' AS not_null,
            c.column_default AS default_value,
            c.ordinal_position
        FROM information_schema.columns c
        WHERE c.table_schema NOT LIKE 'pg_%'
          AND c.table_schema != 'information_schema'
        ORDER BY c.table_schema, c.table_name, c.ordinal_position
    "#;

    pub const INDEXES_QUERY: &str = r#"
        SELECT
            ns.nspname AS schema,
            ic.relname AS name,
            t.relname AS "table",
            ix.indisunique AS is_unique,
            am.amname AS method,
            array_to_string(array_agg(a.attname ORDER BY a.attnum), ',') AS columns
        FROM pg_index ix
        JOIN pg_class ic ON ic.oid = ix.indexrelid
        JOIN pg_class t ON t.oid = ix.indrelid
        JOIN pg_namespace ns ON ns.oid = ic.relnamespace
        JOIN pg_am am ON am.oid = ic.relam
        JOIN pg_attribute a ON a.attrelid = t.oid AND a.attnum = ANY(ix.indkey)
        WHERE ns.nspname NOT LIKE 'pg_%'
          AND ns.nspname != 'information_schema'
        GROUP BY ns.nspname, ic.relname, t.relname, ix.indisunique, am.amname
        ORDER BY ns.nspname, ic.relname
    "#;

    pub const CONSTRAINTS_QUERY: &str = r#"
        SELECT
            n.nspname AS schema,
            con.conname AS name,
            t.relname AS "table",
            con.contype AS kind,
            pg_get_constraintdef(con.oid) AS definition
        FROM pg_constraint con
        JOIN pg_class t ON t.oid = con.conrelid
        JOIN pg_namespace n ON n.oid = con.connamespace
        WHERE n.nspname NOT LIKE 'pg_%'
          AND n.nspname != 'information_schema'
        ORDER BY n.nspname, t.relname, con.conname
    "#;

    pub const VIEWS_QUERY: &str = r#"
        SELECT schemaname AS schema, viewname AS name, definition
        FROM pg_views
        WHERE schemaname NOT LIKE 'pg_%'
          AND schemaname != 'information_schema'
        ORDER BY schemaname, viewname
    "#;

    pub const SEQUENCES_QUERY: &str = r#"
        SELECT n.nspname AS schema, c.relname AS name
        FROM pg_sequence s
        JOIN pg_class c ON c.oid = s.seqrelid
        JOIN pg_namespace n ON n.oid = c.relnamespace
        WHERE n.nspname NOT LIKE 'pg_%'
          AND n.nspname != 'information_schema'
        ORDER BY n.nspname, c.relname
    "#;
}

#[derive(Debug, thiserror::Error)]
pub enum IntrospectError {
    #[error("catalog query failed: {0}")]
    Query(#[from] tokio_postgres::Error),
}

/// Runs the fixed set of catalog queries against `client` and reconstructs
/// an equivalent `SchemaState` (spec §4.1 `introspect`).
pub async fn introspect(client: &Client) -> Result<SchemaState, IntrospectError> {
    let mut objects = Vec::new();

    for row in client.query(queries::SCHEMAS_QUERY, &[]).await? {
        let name: String = row.get("name");
        objects.push(SchemaObject::new(
            ObjectKey::new(ObjectKind::Schema, name.clone(), name.clone(), None),
            normalize_body(&format!("create schema {}", name)),
        ));
    }

    for row in client.query(queries::TABLES_QUERY, &[]).await? {
        let schema: String = row.get("schema");
        let name: String = row.get("name");
        objects.push(SchemaObject::new(
            ObjectKey::new(ObjectKind::Table, schema, name.clone(), None),
            normalize_body(&format!("create table {}", name)),
        ));
    }

    for row in client.query(queries::COLUMNS_QUERY, &[]).await? {
        let schema: String = row.get("schema");
        let table: String = row.get("table");
        let name: String = row.get("name");
        let column_type: String = row.get("column_type");
        let not_null: bool = row.get("not_null");
        let default_value: Option<String> = row.get("default_value");

        let ddl = normalize_body(&format!(
            "{} {}{}{}",
            name,
            column_type,
            if not_null { " not null" } else { "" },
            default_value
                .as_deref()
                .map(|d| format!(" default {}", d))
                .unwrap_or_default()
        ));

        objects.push(
            SchemaObject::new(
                ObjectKey::new(ObjectKind::Column, schema, name, Some(table)),
                ddl,
            )
            .with_column(ColumnAttrs {
                data_type: column_type,
                nullable: !not_null,
                default: default_value,
                referenced_type: None,
            }),
        );
    }

    for row in client.query(queries::INDEXES_QUERY, &[]).await? {
        let schema: String = row.get("schema");
        let table: String = row.get("table");
        let name: String = row.get("name");
        let is_unique: bool = row.get("is_unique");
        let method: String = row.get("method");
        let columns: String = row.get("columns");
        let column_list: Vec<String> = columns.split(',').map(|s| s.to_string()).collect();

        let ddl = normalize_body(&format!(
            "create {}index {} on {} using {} ({})",
            if is_unique { "unique " } else { "" },
            name,
            table,
            method,
            columns
        ));

        objects.push(
            SchemaObject::new(
                ObjectKey::new(ObjectKind::Index, schema, name, Some(table)),
                ddl,
            )
            .with_index(IndexAttrs {
                columns: column_list,
                method,
                unique: is_unique,
                concurrent: false,
            }),
        );
    }

    for row in client.query(queries::CONSTRAINTS_QUERY, &[]).await? {
        let schema: String = row.get("schema");
        let table: String = row.get("table");
        let name: String = row.get("name");
        let kind_char: i8 = row.get::<_, i8>("kind");
        let definition: String = row.get("definition");

        let kind = match kind_char as u8 {
            b'p' => ConstraintKind::PrimaryKey,
            b'f' => ConstraintKind::ForeignKey,
            b'u' => ConstraintKind::Unique,
            _ => ConstraintKind::Check,
        };
        let lower_definition = definition.to_ascii_lowercase();
        let columns = extract_parenthesized_body(&lower_definition)
            .map(|g| split_top_level(&g, ',').iter().map(|s| s.trim().to_string()).collect())
            .unwrap_or_default();
        let references = if kind == ConstraintKind::ForeignKey {
            parse_references(&lower_definition, &schema)
        } else {
            None
        };

        objects.push(
            SchemaObject::new(
                ObjectKey::new(ObjectKind::Constraint, schema, name.clone(), Some(table)),
                normalize_body(&format!("constraint {} {}", name, definition)),
            )
            .with_constraint(ConstraintAttrs {
                kind,
                columns,
                references,
                not_valid: lower_definition.contains("not valid"),
            }),
        );
    }

    for row in client.query(queries::VIEWS_QUERY, &[]).await? {
        let schema: String = row.get("schema");
        let name: String = row.get("name");
        let definition: String = row.get("definition");

        objects.push(SchemaObject::new(
            ObjectKey::new(ObjectKind::View, schema, name.clone(), None),
            normalize_body(&format!("create view {} as {}", name, definition)),
        ));
    }

    for row in client.query(queries::SEQUENCES_QUERY, &[]).await? {
        let schema: String = row.get("schema");
        let name: String = row.get("name");
        objects.push(SchemaObject::new(
            ObjectKey::new(ObjectKind::Sequence, schema, name.clone(), None),
            normalize_body(&format!("create sequence {}", name)),
        ));
    }

    Ok(SchemaState::new(objects))
}
