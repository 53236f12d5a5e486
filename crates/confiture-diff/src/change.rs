//! `Change` and `ChangeSet` (spec §3): the ordered, risk-classified result
//! of diffing two `SchemaState`s.

use confiture_core::ObjectKey;
use serde::Serialize;

/// Risk classification of a single `Change` (spec §4.2 step 5).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RiskClass {
    Safe,
    Online,
    Locking,
    DataLoss,
}

impl std::fmt::Display for RiskClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RiskClass::Safe => "safe",
            RiskClass::Online => "online",
            RiskClass::Locking => "locking",
            RiskClass::DataLoss => "data-loss",
        };
        f.write_str(s)
    }
}

/// The kind of atomic schema-level transformation a `Change` represents
/// (spec §3 `Change` variants).
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChangeKind {
    CreateSchema,
    DropSchema,
    CreateTable,
    DropTable,
    AddColumn,
    DropColumn,
    AlterColumnType,
    AlterColumnNullability,
    AddConstraint,
    DropConstraint,
    CreateIndex,
    DropIndex,
    CreateView,
    DropView,
    CreateSequence,
    DropSequence,
    AlterObjectBody,
}

/// One atomic schema-level transformation between source and target state.
#[derive(Clone, Debug, Serialize)]
pub struct Change {
    pub kind: ChangeKind,
    pub object: ObjectKey,
    pub forward_sql: String,
    /// `None` for irreversible changes (spec §3 invariant).
    pub inverse_sql: Option<String>,
    pub risk: RiskClass,
    /// Indices into the owning `ChangeSet.changes` this change depends on;
    /// a `Change` never precedes one it depends on in the ordering (spec §3
    /// invariant: dependency graph is a DAG).
    pub depends_on: Vec<usize>,
    pub estimated_duration_ms: Option<u64>,
}

impl Change {
    pub fn is_reversible(&self) -> bool {
        self.inverse_sql.is_some()
    }
}

/// The ordered result of diffing two `SchemaState`s (spec §3 `ChangeSet`).
#[derive(Clone, Debug, Default, Serialize)]
pub struct ChangeSet {
    pub changes: Vec<Change>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn estimated_cost_ms(&self) -> u64 {
        self.changes
            .iter()
            .filter_map(|c| c.estimated_duration_ms)
            .sum()
    }

    pub fn max_risk(&self) -> Option<RiskClass> {
        self.changes.iter().map(|c| c.risk).max()
    }

    pub fn forward_sql_statements(&self) -> Vec<&str> {
        self.changes.iter().map(|c| c.forward_sql.as_str()).collect()
    }

    /// Inverse statements in reverse application order, for `down`. Fails
    /// (returns `None`) if any change lacks an inverse.
    pub fn inverse_sql_statements(&self) -> Option<Vec<&str>> {
        self.changes
            .iter()
            .rev()
            .map(|c| c.inverse_sql.as_deref())
            .collect()
    }
}
