//! Idempotency Validator: confirms every forward statement in a `ChangeSet`
//! is safe to re-run against a database that has already applied it, so a
//! crashed migration can be retried without manual cleanup.

use confiture_diff::{Change, ChangeKind};
use serde::Serialize;

#[derive(Clone, Debug, Serialize)]
pub struct IdempotencyFinding {
    pub object: String,
    pub change_kind: String,
    pub message: String,
}

/// Statements that only touch an object by its own identity and guard
/// themselves (`IF [NOT] EXISTS`, `OR REPLACE`) are idempotent by
/// construction; everything else is flagged so the caller can decide
/// whether to add a guard or accept the risk.
pub fn check(changes: &[Change]) -> Vec<IdempotencyFinding> {
    changes
        .iter()
        .filter_map(|change| check_one(change))
        .collect()
}

fn check_one(change: &Change) -> Option<IdempotencyFinding> {
    let guarded = change.forward_sql.to_ascii_uppercase();
    let is_guarded = match change.kind {
        ChangeKind::CreateTable
        | ChangeKind::CreateSchema
        | ChangeKind::CreateSequence
        | ChangeKind::CreateView => {
            guarded.contains("IF NOT EXISTS") || guarded.contains("OR REPLACE")
        }
        ChangeKind::DropTable
        | ChangeKind::DropSchema
        | ChangeKind::DropSequence
        | ChangeKind::DropView
        | ChangeKind::DropIndex => guarded.contains("IF EXISTS"),
        ChangeKind::CreateIndex => guarded.contains("IF NOT EXISTS"),
        // Column/constraint adds and alters are never naturally re-runnable:
        // Postgres has no `ADD COLUMN IF NOT EXISTS ... TYPE` guard that
        // also re-validates attribute changes, so these are always flagged.
        ChangeKind::AddColumn
        | ChangeKind::AddConstraint
        | ChangeKind::AlterColumnType
        | ChangeKind::AlterColumnNullability
        | ChangeKind::AlterObjectBody => false,
        ChangeKind::DropColumn | ChangeKind::DropConstraint => guarded.contains("IF EXISTS"),
    };

    if is_guarded {
        return None;
    }

    Some(IdempotencyFinding {
        object: change.object.qualified_name(),
        change_kind: format!("{:?}", change.kind),
        message: format!(
            "{} is not safely re-runnable; a retry after partial failure will error \
             rather than converge",
            change.object.qualified_name()
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use confiture_core::{ObjectKey, ObjectKind};
    use confiture_diff::RiskClass;

    fn change(kind: ChangeKind, forward: &str) -> Change {
        Change {
            kind,
            object: ObjectKey::new(ObjectKind::Table, "public", "t", None),
            forward_sql: forward.to_string(),
            inverse_sql: None,
            risk: RiskClass::Safe,
            depends_on: Vec::new(),
            estimated_duration_ms: None,
        }
    }

    #[test]
    fn guarded_create_table_passes() {
        let c = change(ChangeKind::CreateTable, "CREATE TABLE IF NOT EXISTS t (id int);");
        assert!(check(&[c]).is_empty());
    }

    #[test]
    fn unguarded_create_table_is_flagged() {
        let c = change(ChangeKind::CreateTable, "CREATE TABLE t (id int);");
        assert_eq!(check(&[c]).len(), 1);
    }

    #[test]
    fn add_column_is_always_flagged() {
        let c = change(ChangeKind::AddColumn, "ALTER TABLE t ADD COLUMN x int;");
        assert_eq!(check(&[c]).len(), 1);
    }
}
