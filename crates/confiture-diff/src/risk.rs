//! Risk classification (spec §4.2 step 5): a conservative, structural
//! estimate. The safety pipeline's Impact Analyser refines this with live
//! statistics; the differ never has a connection to consult.

use crate::change::{ChangeKind, RiskClass};
use confiture_core::{ColumnAttrs, ConstraintAttrs, ConstraintKind, IndexAttrs};

pub fn classify_create_index(attrs: &IndexAttrs) -> RiskClass {
    if attrs.concurrent {
        RiskClass::Online
    } else {
        RiskClass::Locking
    }
}

pub fn classify_add_column(attrs: &ColumnAttrs) -> RiskClass {
    if !attrs.nullable && attrs.default.is_none() {
        // Backfill required with no default to populate existing rows.
        RiskClass::DataLoss
    } else if !attrs.nullable {
        // NOT NULL + DEFAULT still rewrites the table on older Postgres.
        RiskClass::Locking
    } else {
        RiskClass::Safe
    }
}

pub fn classify_alter_column_type(old: &ColumnAttrs, new: &ColumnAttrs) -> RiskClass {
    if old.data_type == new.data_type {
        RiskClass::Safe
    } else {
        // A type change can truncate or reject existing values and always
        // rewrites the table.
        RiskClass::DataLoss
    }
}

pub fn classify_alter_column_nullability(old: &ColumnAttrs, new: &ColumnAttrs) -> RiskClass {
    if old.nullable && !new.nullable {
        RiskClass::Locking
    } else {
        RiskClass::Safe
    }
}

pub fn classify_add_constraint(attrs: &ConstraintAttrs) -> RiskClass {
    match attrs.kind {
        ConstraintKind::Check | ConstraintKind::ForeignKey if attrs.not_valid => RiskClass::Online,
        ConstraintKind::Check | ConstraintKind::ForeignKey => RiskClass::Locking,
        ConstraintKind::Unique | ConstraintKind::PrimaryKey => RiskClass::Locking,
        ConstraintKind::NotNull => RiskClass::Locking,
    }
}

pub fn classify_drop(kind: &ChangeKind) -> RiskClass {
    match kind {
        ChangeKind::DropTable | ChangeKind::DropColumn | ChangeKind::DropSequence => {
            RiskClass::DataLoss
        }
        ChangeKind::DropSchema => RiskClass::DataLoss,
        ChangeKind::DropConstraint | ChangeKind::DropIndex | ChangeKind::DropView => {
            RiskClass::Online
        }
        _ => RiskClass::Safe,
    }
}
