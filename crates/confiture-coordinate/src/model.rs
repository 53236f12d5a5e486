//! `Intent`: a declared upcoming schema change (spec §3 `Intent`, §4.8).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A schema/table/column triple an intent touches. `column = None` means
/// the intent affects the whole table (e.g. `drop_table`).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectRef {
    pub schema: String,
    pub table: String,
    pub column: Option<String>,
}

impl ObjectRef {
    pub fn table(schema: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            table: table.into(),
            column: None,
        }
    }

    pub fn column(schema: impl Into<String>, table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            table: table.into(),
            column: Some(column.into()),
        }
    }

    /// Two refs intersect when they name the same table and either one
    /// covers the whole table or they name the same column.
    pub fn intersects(&self, other: &ObjectRef) -> bool {
        if self.schema != other.schema || self.table != other.table {
            return false;
        }
        match (&self.column, &other.column) {
            (None, _) | (_, None) => true,
            (Some(a), Some(b)) => a == b,
        }
    }
}

/// The kind of operation an intent declares, used to look up the
/// commutation rule in [`crate::conflict::commutes`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationClass {
    AddColumn,
    DropColumn,
    AlterColumn,
    AddConstraint,
    Read,
}

/// Lifecycle state of an intent (spec §3 invariant: only `Registered` and
/// `InProgress` participate in conflict detection).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentState {
    Registered,
    InProgress,
    Completed,
    Abandoned,
}

impl IntentState {
    pub fn is_live(self) -> bool {
        matches!(self, IntentState::Registered | IntentState::InProgress)
    }

    /// Legal transitions (spec §4.8): `Registered -> InProgress -> Completed`
    /// or `Registered|InProgress -> Abandoned`.
    pub fn can_transition_to(self, next: IntentState) -> bool {
        matches!(
            (self, next),
            (IntentState::Registered, IntentState::InProgress)
                | (IntentState::InProgress, IntentState::Completed)
                | (IntentState::Registered, IntentState::Abandoned)
                | (IntentState::InProgress, IntentState::Abandoned)
        )
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Intent {
    pub intent_id: Uuid,
    pub agent_id: String,
    pub workspace_tag: String,
    pub objects: Vec<ObjectRef>,
    pub operation_class: OperationClass,
    pub state: IntentState,
    pub created_at: DateTime<Utc>,
    pub last_touched_at: DateTime<Utc>,
}

/// A derived (never stored) relation between two live, intersecting,
/// non-commuting intents (spec §3 `Conflict`).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Conflict {
    pub a: Uuid,
    pub b: Uuid,
    pub object: ObjectRef,
}
