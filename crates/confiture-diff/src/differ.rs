//! The differ: compares two `SchemaState`s and produces an ordered,
//! risk-classified `ChangeSet` (spec §4.2).

use crate::change::{Change, ChangeKind, ChangeSet};
use crate::risk;
use crate::sql;
use confiture_core::{ObjectKey, ObjectKind, SchemaObject, SchemaState};
use std::collections::BTreeMap;

/// Compares `source` (the current state) against `target` (the desired
/// state) and returns the ordered set of changes that carries one into the
/// other (spec §4.2 steps 1-4).
///
/// Step 1: both states are indexed by `ObjectKey`. Step 2: object bodies
/// (and, for columns, attribute-level fields) are compared. Step 3: a
/// `Change` is emitted for every addition, removal, or modification. Step 4:
/// the resulting list is topologically sorted so that drops which free up a
/// name precede creates reusing it, and within each phase, creates run in
/// dependency order (schema, then table, then column/index/constraint) while
/// drops run in the reverse.
pub fn diff(source: &SchemaState, target: &SchemaState) -> ChangeSet {
    let source_index: BTreeMap<&ObjectKey, &SchemaObject> =
        source.objects().iter().map(|o| (&o.key, o)).collect();
    let target_index: BTreeMap<&ObjectKey, &SchemaObject> =
        target.objects().iter().map(|o| (&o.key, o)).collect();

    let mut changes = Vec::new();

    for (key, obj) in &target_index {
        if !source_index.contains_key(key) {
            changes.push(create_change(key, obj));
        }
    }

    for (key, obj) in &source_index {
        if !target_index.contains_key(key) {
            changes.push(drop_change(key, obj));
        }
    }

    for (key, target_obj) in &target_index {
        let Some(source_obj) = source_index.get(key) else { continue };
        if let Some(change) = alter_change(key, source_obj, target_obj) {
            changes.push(change);
        }
    }

    changes.sort_by_key(order_key);

    tracing::debug!(
        changes = changes.len(),
        max_risk = ?changes.iter().map(|c| c.risk).max(),
        "diffed schema states"
    );

    ChangeSet { changes }
}

/// `(phase, rank)`: phase 0 (drops) runs before phase 1 (creates and
/// alters), so a dropped name is free before anything recreates it. Within
/// phase 0, drops run in reverse dependency order (indexes/constraints
/// before the tables they sit on); within phase 1, creates run in forward
/// dependency order (schemas before tables before columns/indexes).
fn order_key(change: &Change) -> (u8, i32) {
    let kind_rank = object_kind_rank(&change.object.kind);
    match change.kind {
        ChangeKind::DropColumn
        | ChangeKind::DropConstraint
        | ChangeKind::DropIndex
        | ChangeKind::DropView
        | ChangeKind::DropTable
        | ChangeKind::DropSequence
        | ChangeKind::DropSchema => (0, -kind_rank),
        _ => (1, kind_rank),
    }
}

fn object_kind_rank(kind: &ObjectKind) -> i32 {
    match kind {
        ObjectKind::Schema => 0,
        ObjectKind::Extension => 1,
        ObjectKind::Type => 2,
        ObjectKind::Sequence => 3,
        ObjectKind::Function => 4,
        ObjectKind::Table => 5,
        ObjectKind::Column => 6,
        ObjectKind::Index => 7,
        ObjectKind::Constraint => 8,
        ObjectKind::Trigger => 9,
        ObjectKind::View => 10,
        ObjectKind::MaterializedView => 11,
        ObjectKind::Comment => 12,
    }
}

fn parent_key(key: &ObjectKey) -> ObjectKey {
    ObjectKey::new(
        ObjectKind::Table,
        key.schema.clone(),
        key.parent.clone().unwrap_or_default(),
        None,
    )
}

fn create_change(key: &ObjectKey, obj: &SchemaObject) -> Change {
    let (kind, forward, inverse, risk) = match key.kind {
        ObjectKind::Schema => {
            let (f, i) = sql::create_schema(key);
            (ChangeKind::CreateSchema, f, i, crate::change::RiskClass::Safe)
        }
        ObjectKind::Table => {
            let (f, i) = sql::create_table(key, &obj.ddl);
            (ChangeKind::CreateTable, f, i, crate::change::RiskClass::Safe)
        }
        ObjectKind::Column => {
            let attrs = obj
                .column
                .as_ref()
                .expect("Column object must carry ColumnAttrs");
            let table = parent_key(key);
            let (f, i) = sql::add_column(&table, &key.name, attrs);
            (ChangeKind::AddColumn, f, i, risk::classify_add_column(attrs))
        }
        ObjectKind::Constraint => {
            let attrs = obj
                .constraint
                .as_ref()
                .expect("Constraint object must carry ConstraintAttrs");
            let table = parent_key(key);
            let (f, i) = sql::add_constraint(&table, &key.name, attrs);
            (ChangeKind::AddConstraint, f, i, risk::classify_add_constraint(attrs))
        }
        ObjectKind::Index => {
            let attrs = obj
                .index
                .as_ref()
                .expect("Index object must carry IndexAttrs");
            let table = parent_key(key);
            let (f, i) = sql::create_index(&table, &key.name, attrs);
            (ChangeKind::CreateIndex, f, i, risk::classify_create_index(attrs))
        }
        ObjectKind::View | ObjectKind::MaterializedView => {
            let (f, i) = sql::create_view(key, &obj.ddl);
            (ChangeKind::CreateView, f, i, crate::change::RiskClass::Online)
        }
        ObjectKind::Sequence => {
            let (f, i) = sql::create_sequence(key, &obj.ddl);
            (ChangeKind::CreateSequence, f, i, crate::change::RiskClass::Safe)
        }
        _ => {
            let (f, i) = sql::alter_object_body(key, &obj.ddl, "");
            (ChangeKind::AlterObjectBody, f, i, crate::change::RiskClass::Online)
        }
    };

    Change {
        kind,
        object: key.clone(),
        forward_sql: forward,
        inverse_sql: inverse,
        risk,
        depends_on: Vec::new(),
        estimated_duration_ms: None,
    }
}

fn drop_change(key: &ObjectKey, obj: &SchemaObject) -> Change {
    let (kind, forward, inverse) = match key.kind {
        ObjectKind::Schema => {
            let (f, i) = sql::drop_schema(key);
            (ChangeKind::DropSchema, f, i)
        }
        ObjectKind::Table => {
            let (f, i) = sql::drop_table(key, &obj.ddl);
            (ChangeKind::DropTable, f, i)
        }
        ObjectKind::Column => {
            let table = parent_key(key);
            let attrs = obj
                .column
                .as_ref()
                .expect("Column object must carry ColumnAttrs");
            let (f, i) = sql::drop_column(&table, &key.name, attrs);
            (ChangeKind::DropColumn, f, i)
        }
        ObjectKind::Constraint => {
            let table = parent_key(key);
            let (f, i) = sql::drop_constraint(&table, &key.name);
            (ChangeKind::DropConstraint, f, i)
        }
        ObjectKind::Index => {
            let (f, i) = sql::drop_index(key);
            (ChangeKind::DropIndex, f, i)
        }
        ObjectKind::View | ObjectKind::MaterializedView => {
            let (f, i) = sql::drop_view(key, &obj.ddl);
            (ChangeKind::DropView, f, i)
        }
        ObjectKind::Sequence => {
            let (f, i) = sql::drop_sequence(key);
            (ChangeKind::DropSequence, f, i)
        }
        _ => (ChangeKind::AlterObjectBody, format!("-- no drop codegen for {}", key.kind), None),
    };

    Change {
        risk: risk::classify_drop(&kind),
        kind,
        object: key.clone(),
        forward_sql: forward,
        inverse_sql: inverse,
        depends_on: Vec::new(),
        estimated_duration_ms: None,
    }
}

fn alter_change(key: &ObjectKey, source_obj: &SchemaObject, target_obj: &SchemaObject) -> Option<Change> {
    match key.kind {
        ObjectKind::Column => {
            let old = source_obj.column.as_ref()?;
            let new = target_obj.column.as_ref()?;
            let table = parent_key(key);
            if old.data_type != new.data_type {
                let (f, i) = sql::alter_column_type(&table, &key.name, old, new);
                return Some(Change {
                    kind: ChangeKind::AlterColumnType,
                    object: key.clone(),
                    forward_sql: f,
                    inverse_sql: i,
                    risk: risk::classify_alter_column_type(old, new),
                    depends_on: Vec::new(),
                    estimated_duration_ms: None,
                });
            }
            if old.nullable != new.nullable {
                let (f, i) = sql::alter_column_nullability(&table, &key.name, old, new);
                return Some(Change {
                    kind: ChangeKind::AlterColumnNullability,
                    object: key.clone(),
                    forward_sql: f,
                    inverse_sql: i,
                    risk: risk::classify_alter_column_nullability(old, new),
                    depends_on: Vec::new(),
                    estimated_duration_ms: None,
                });
            }
            None
        }
        ObjectKind::Function | ObjectKind::Trigger | ObjectKind::View | ObjectKind::MaterializedView => {
            if source_obj.ddl == target_obj.ddl {
                return None;
            }
            let (f, i) = sql::alter_object_body(key, &target_obj.ddl, &source_obj.ddl);
            Some(Change {
                kind: ChangeKind::AlterObjectBody,
                object: key.clone(),
                forward_sql: f,
                inverse_sql: i,
                risk: crate::change::RiskClass::Online,
                depends_on: Vec::new(),
                estimated_duration_ms: None,
            })
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use confiture_core::{ColumnAttrs, ObjectKind};

    fn table(name: &str, ddl: &str) -> SchemaObject {
        SchemaObject::new(ObjectKey::new(ObjectKind::Table, "public", name, None), ddl)
    }

    fn column(table: &str, name: &str, ty: &str, nullable: bool) -> SchemaObject {
        SchemaObject::new(
            ObjectKey::new(ObjectKind::Column, "public", name, Some(table.to_string())),
            format!("{name} {ty}"),
        )
        .with_column(ColumnAttrs {
            data_type: ty.to_string(),
            nullable,
            default: None,
            referenced_type: None,
        })
    }

    #[test]
    fn new_table_produces_create_change() {
        let source = SchemaState::new(vec![]);
        let target = SchemaState::new(vec![table("users", "create table users (id int)")]);

        let set = diff(&source, &target);
        assert_eq!(set.changes.len(), 1);
        assert_eq!(set.changes[0].kind, ChangeKind::CreateTable);
        assert!(set.changes[0].forward_sql.contains("CREATE TABLE"));
    }

    #[test]
    fn removed_table_produces_drop_change() {
        let source = SchemaState::new(vec![table("users", "create table users (id int)")]);
        let target = SchemaState::new(vec![]);

        let set = diff(&source, &target);
        assert_eq!(set.changes.len(), 1);
        assert_eq!(set.changes[0].kind, ChangeKind::DropTable);
    }

    #[test]
    fn unchanged_objects_produce_no_changes() {
        let a = table("users", "create table users (id int)");
        let source = SchemaState::new(vec![a.clone()]);
        let target = SchemaState::new(vec![a]);

        assert!(diff(&source, &target).is_empty());
    }

    #[test]
    fn column_type_widening_is_an_alter() {
        let source = SchemaState::new(vec![column("orders", "amount", "integer", false)]);
        let target = SchemaState::new(vec![column("orders", "amount", "bigint", false)]);

        let set = diff(&source, &target);
        assert_eq!(set.changes.len(), 1);
        assert_eq!(set.changes[0].kind, ChangeKind::AlterColumnType);
        assert_eq!(set.changes[0].risk, crate::change::RiskClass::DataLoss);
    }

    #[test]
    fn added_not_null_column_without_default_is_data_loss_risk() {
        let source = SchemaState::new(vec![]);
        let target = SchemaState::new(vec![column("orders", "total", "integer", false)]);

        let set = diff(&source, &target);
        assert_eq!(set.changes[0].risk, crate::change::RiskClass::DataLoss);
    }

    #[test]
    fn drops_are_ordered_before_creates() {
        let source = SchemaState::new(vec![table("old_name", "create table old_name (id int)")]);
        let target = SchemaState::new(vec![table("new_name", "create table new_name (id int)")]);

        let set = diff(&source, &target);
        assert_eq!(set.changes.len(), 2);
        assert_eq!(set.changes[0].kind, ChangeKind::DropTable);
        assert_eq!(set.changes[1].kind, ChangeKind::CreateTable);
    }
}
