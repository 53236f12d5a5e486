//! Commutation table and pairwise conflict detection (spec §4.8).

use crate::model::{Intent, ObjectRef, OperationClass};

/// Whether operation classes `a` and `b` commute when applied to the same
/// object — i.e. the order they run in cannot change the outcome. The
/// table is deliberately asymmetric for `add_column`/`add_constraint`
/// versus `read`/`drop_column`, matching spec §4.8's table exactly.
pub fn commutes(a: OperationClass, b: OperationClass) -> bool {
    use OperationClass::*;
    match (a, b) {
        (AddColumn, AddConstraint) | (AddConstraint, AddColumn) => true,
        (AddColumn, Read) | (Read, AddColumn) => true,
        (AddConstraint, Read) | (Read, AddConstraint) => true,
        (AlterColumn, Read) | (Read, AlterColumn) => true,
        (AddConstraint, AddConstraint) => true,
        (Read, Read) => true,
        // add_column vs add_column only commutes when the column names
        // differ; that check needs the actual `ObjectRef`s, not just the
        // operation classes, so it is handled by `conflicts_on` below.
        (AddColumn, AddColumn) => true,
        _ => false,
    }
}

/// Whether intent `candidate` conflicts with live intent `other` on the
/// shared object `shared` (spec §4.8 conflict rule, `add_column` vs
/// `add_column` special-cased to same-column-name only).
pub fn conflicts_on(candidate: &Intent, other: &Intent, shared: &ObjectRef) -> bool {
    if candidate.operation_class == OperationClass::AddColumn
        && other.operation_class == OperationClass::AddColumn
    {
        return shared.column.is_some();
    }
    !commutes(candidate.operation_class, other.operation_class)
}

/// All `(other_intent, shared_object)` pairs in `live` that conflict with
/// `candidate` (spec §4.8 `check`).
pub fn find_conflicts<'a>(
    candidate: &Intent,
    live: &'a [Intent],
) -> Vec<(&'a Intent, ObjectRef)> {
    let mut found = Vec::new();
    for other in live {
        if other.intent_id == candidate.intent_id {
            continue;
        }
        for mine in &candidate.objects {
            for theirs in &other.objects {
                if mine.intersects(theirs) && conflicts_on(candidate, other, mine) {
                    found.push((other, mine.clone()));
                }
            }
        }
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::IntentState;
    use chrono::Utc;
    use uuid::Uuid;

    fn intent(objects: Vec<ObjectRef>, class: OperationClass) -> Intent {
        let now = Utc::now();
        Intent {
            intent_id: Uuid::new_v4(),
            agent_id: "agent".into(),
            workspace_tag: "branch".into(),
            objects,
            operation_class: class,
            state: IntentState::Registered,
            created_at: now,
            last_touched_at: now,
        }
    }

    #[test]
    fn add_column_same_name_conflicts() {
        let a = intent(vec![ObjectRef::column("public", "users", "status")], OperationClass::AddColumn);
        let b = intent(vec![ObjectRef::column("public", "users", "status")], OperationClass::AddColumn);
        assert_eq!(find_conflicts(&a, &[b]).len(), 1);
    }

    #[test]
    fn add_column_different_name_does_not_conflict() {
        let a = intent(vec![ObjectRef::column("public", "users", "status")], OperationClass::AddColumn);
        let b = intent(vec![ObjectRef::column("public", "users", "age")], OperationClass::AddColumn);
        assert!(find_conflicts(&a, &[b]).is_empty());
    }

    #[test]
    fn drop_column_conflicts_with_read() {
        let a = intent(vec![ObjectRef::column("public", "users", "email")], OperationClass::DropColumn);
        let b = intent(vec![ObjectRef::column("public", "users", "email")], OperationClass::Read);
        assert_eq!(find_conflicts(&a, &[b]).len(), 1);
    }

    #[test]
    fn add_constraint_does_not_conflict_with_read() {
        let a = intent(vec![ObjectRef::column("public", "users", "email")], OperationClass::AddConstraint);
        let b = intent(vec![ObjectRef::column("public", "users", "email")], OperationClass::Read);
        assert!(find_conflicts(&a, &[b]).is_empty());
    }

    #[test]
    fn alter_column_does_not_conflict_with_read() {
        let a = intent(vec![ObjectRef::column("public", "users", "email")], OperationClass::AlterColumn);
        let b = intent(vec![ObjectRef::column("public", "users", "email")], OperationClass::Read);
        assert!(find_conflicts(&a, &[b]).is_empty());
    }

    #[test]
    fn disjoint_objects_never_conflict() {
        let a = intent(vec![ObjectRef::column("public", "users", "email")], OperationClass::DropColumn);
        let b = intent(vec![ObjectRef::column("public", "orders", "email")], OperationClass::DropColumn);
        assert!(find_conflicts(&a, &[b]).is_empty());
    }
}
