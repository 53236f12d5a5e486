//! Forward/inverse DDL generation for each `Change`, grounded on the
//! teacher's tagged-statement codegen but targeting Postgres DDL instead of
//! a query builder's wire protocol.

use crate::name::{default_constraint_name, default_index_name, qualify, quote_ident};
use confiture_core::{ColumnAttrs, ConstraintAttrs, ConstraintKind, IndexAttrs, ObjectKey};

pub fn create_table(key: &ObjectKey, ddl: &str) -> (String, Option<String>) {
    let forward = format!("{};", ddl.trim_end_matches(';'));
    let inverse = format!("DROP TABLE {};", qualify(&key.schema, &key.name));
    (forward, Some(inverse))
}

pub fn drop_table(key: &ObjectKey, original_ddl: &str) -> (String, Option<String>) {
    let forward = format!("DROP TABLE {};", qualify(&key.schema, &key.name));
    // Recreating a dropped table is reversible only up to structure, not data.
    let inverse = format!("{};", original_ddl.trim_end_matches(';'));
    (forward, Some(inverse))
}

pub fn add_column(table: &ObjectKey, column: &str, attrs: &ColumnAttrs) -> (String, Option<String>) {
    let mut forward = format!(
        "ALTER TABLE {} ADD COLUMN {} {}",
        qualify(&table.schema, &table.name),
        quote_ident(column),
        attrs.data_type
    );
    if !attrs.nullable {
        forward.push_str(" NOT NULL");
    }
    if let Some(default) = &attrs.default {
        forward.push_str(&format!(" DEFAULT {default}"));
    }
    forward.push(';');

    let inverse = format!(
        "ALTER TABLE {} DROP COLUMN {};",
        qualify(&table.schema, &table.name),
        quote_ident(column)
    );
    (forward, Some(inverse))
}

pub fn drop_column(
    table: &ObjectKey,
    column: &str,
    original: &ColumnAttrs,
) -> (String, Option<String>) {
    let forward = format!(
        "ALTER TABLE {} DROP COLUMN {};",
        qualify(&table.schema, &table.name),
        quote_ident(column)
    );
    let (readd, _) = add_column(table, column, original);
    (forward, Some(readd))
}

pub fn alter_column_type(
    table: &ObjectKey,
    column: &str,
    old: &ColumnAttrs,
    new: &ColumnAttrs,
) -> (String, Option<String>) {
    let forward = format!(
        "ALTER TABLE {} ALTER COLUMN {} TYPE {} USING {}::{};",
        qualify(&table.schema, &table.name),
        quote_ident(column),
        new.data_type,
        quote_ident(column),
        new.data_type
    );
    let inverse = format!(
        "ALTER TABLE {} ALTER COLUMN {} TYPE {} USING {}::{};",
        qualify(&table.schema, &table.name),
        quote_ident(column),
        old.data_type,
        quote_ident(column),
        old.data_type
    );
    (forward, Some(inverse))
}

pub fn alter_column_nullability(
    table: &ObjectKey,
    column: &str,
    old: &ColumnAttrs,
    new: &ColumnAttrs,
) -> (String, Option<String>) {
    let verb = if new.nullable { "DROP NOT NULL" } else { "SET NOT NULL" };
    let forward = format!(
        "ALTER TABLE {} ALTER COLUMN {} {};",
        qualify(&table.schema, &table.name),
        quote_ident(column),
        verb
    );
    let inverse_verb = if old.nullable { "DROP NOT NULL" } else { "SET NOT NULL" };
    let inverse = format!(
        "ALTER TABLE {} ALTER COLUMN {} {};",
        qualify(&table.schema, &table.name),
        quote_ident(column),
        inverse_verb
    );
    (forward, Some(inverse))
}

pub fn add_constraint(
    table: &ObjectKey,
    name: &str,
    attrs: &ConstraintAttrs,
) -> (String, Option<String>) {
    let resolved_name = if name.is_empty() {
        let suffix = match attrs.kind {
            ConstraintKind::PrimaryKey => "pkey",
            ConstraintKind::ForeignKey => "fkey",
            ConstraintKind::Unique => "key",
            ConstraintKind::Check => "check",
            ConstraintKind::NotNull => "not_null",
        };
        default_constraint_name(&table.name, &attrs.columns, suffix)
    } else {
        name.to_string()
    };

    let cols = attrs
        .columns
        .iter()
        .map(|c| quote_ident(c))
        .collect::<Vec<_>>()
        .join(", ");

    let body = match attrs.kind {
        ConstraintKind::PrimaryKey => format!("PRIMARY KEY ({cols})"),
        ConstraintKind::Unique => format!("UNIQUE ({cols})"),
        ConstraintKind::ForeignKey => {
            let (ref_schema, ref_table, ref_cols) = attrs
                .references
                .as_ref()
                .expect("foreign key constraint must carry a references target");
            let ref_cols_sql = ref_cols
                .iter()
                .map(|c| quote_ident(c))
                .collect::<Vec<_>>()
                .join(", ");
            format!(
                "FOREIGN KEY ({cols}) REFERENCES {} ({ref_cols_sql})",
                qualify(ref_schema, ref_table)
            )
        }
        ConstraintKind::Check => format!("CHECK ({cols})"),
        ConstraintKind::NotNull => format!("CHECK ({cols} IS NOT NULL)"),
    };

    let mut forward = format!(
        "ALTER TABLE {} ADD CONSTRAINT {} {}",
        qualify(&table.schema, &table.name),
        quote_ident(&resolved_name),
        body
    );
    if attrs.not_valid {
        forward.push_str(" NOT VALID");
    }
    forward.push(';');

    let inverse = format!(
        "ALTER TABLE {} DROP CONSTRAINT {};",
        qualify(&table.schema, &table.name),
        quote_ident(&resolved_name)
    );
    (forward, Some(inverse))
}

pub fn drop_constraint(table: &ObjectKey, name: &str) -> (String, Option<String>) {
    let forward = format!(
        "ALTER TABLE {} DROP CONSTRAINT {};",
        qualify(&table.schema, &table.name),
        quote_ident(name)
    );
    // Recreating the exact original constraint DDL is the caller's job;
    // without the original attrs we cannot round-trip it here.
    (forward, None)
}

pub fn create_index(table: &ObjectKey, name: &str, attrs: &IndexAttrs) -> (String, Option<String>) {
    let resolved_name = if name.is_empty() {
        default_index_name(&table.name, &attrs.columns)
    } else {
        name.to_string()
    };
    let cols = attrs
        .columns
        .iter()
        .map(|c| quote_ident(c))
        .collect::<Vec<_>>()
        .join(", ");
    let unique = if attrs.unique { "UNIQUE " } else { "" };
    let concurrently = if attrs.concurrent { "CONCURRENTLY " } else { "" };

    let forward = format!(
        "CREATE {unique}INDEX {concurrently}{} ON {} USING {} ({cols});",
        quote_ident(&resolved_name),
        qualify(&table.schema, &table.name),
        attrs.method
    );
    let inverse = format!(
        "DROP INDEX {concurrently}{};",
        qualify(&table.schema, &resolved_name)
    );
    (forward, Some(inverse))
}

pub fn drop_index(key: &ObjectKey) -> (String, Option<String>) {
    let forward = format!("DROP INDEX {};", qualify(&key.schema, &key.name));
    (forward, None)
}

pub fn create_view(key: &ObjectKey, ddl: &str) -> (String, Option<String>) {
    let forward = format!("{};", ddl.trim_end_matches(';'));
    let inverse = format!("DROP VIEW {};", qualify(&key.schema, &key.name));
    (forward, Some(inverse))
}

pub fn drop_view(key: &ObjectKey, original_ddl: &str) -> (String, Option<String>) {
    let forward = format!("DROP VIEW {};", qualify(&key.schema, &key.name));
    let inverse = format!("{};", original_ddl.trim_end_matches(';'));
    (forward, Some(inverse))
}

pub fn create_schema(key: &ObjectKey) -> (String, Option<String>) {
    let forward = format!("CREATE SCHEMA {};", quote_ident(&key.name));
    let inverse = format!("DROP SCHEMA {};", quote_ident(&key.name));
    (forward, Some(inverse))
}

pub fn drop_schema(key: &ObjectKey) -> (String, Option<String>) {
    let forward = format!("DROP SCHEMA {};", quote_ident(&key.name));
    (forward, None)
}

pub fn create_sequence(key: &ObjectKey, ddl: &str) -> (String, Option<String>) {
    let forward = format!("{};", ddl.trim_end_matches(';'));
    let inverse = format!("DROP SEQUENCE {};", qualify(&key.schema, &key.name));
    (forward, Some(inverse))
}

pub fn drop_sequence(key: &ObjectKey) -> (String, Option<String>) {
    let forward = format!("DROP SEQUENCE {};", qualify(&key.schema, &key.name));
    (forward, None)
}

pub fn alter_object_body(key: &ObjectKey, new_ddl: &str, old_ddl: &str) -> (String, Option<String>) {
    (
        format!("{};", new_ddl.trim_end_matches(';')),
        Some(format!("{};", old_ddl.trim_end_matches(';'))),
    )
}
