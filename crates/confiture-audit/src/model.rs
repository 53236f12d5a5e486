//! `AuditEntry`: one row in the append-only, hash-chained audit log (spec
//! §3 `AuditEntry`, §4.7).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What kind of operation an entry records.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    MigrationApplied,
    MigrationRolledBack,
    AnonymisationSync,
    CoordinationIntentRegistered,
    CoordinationIntentCompleted,
    CoordinationIntentAbandoned,
}

/// The caller-supplied fields of a new audit entry, before the log assigns
/// a sequence number and signs it (spec §4.7 write contract).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuditEntryDraft {
    pub actor: String,
    pub operation_kind: OperationKind,
    pub target: String,
    pub policy_hash: Option<String>,
    pub body: serde_json::Value,
}

/// A committed row in the audit log.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuditEntry {
    pub sequence: i64,
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub actor: String,
    pub operation_kind: OperationKind,
    pub target: String,
    pub policy_hash: Option<String>,
    pub body: serde_json::Value,
    /// Hex-encoded hash of the previous entry (`"genesis"` for sequence 0).
    pub previous_entry_hash: String,
    /// Hex-encoded HMAC-SHA-256 over `serialised_body ∥ previous_entry_hash`.
    pub signature: String,
}

impl AuditEntry {
    /// The canonical byte representation signed by [`crate::signing::sign`]
    /// and re-derived by [`crate::verify::verify_range`] — every field that
    /// participates in the signature, in a fixed order, independent of JSON
    /// key ordering.
    pub fn signed_payload(&self) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(self.sequence.to_be_bytes().as_slice());
        bytes.extend_from_slice(self.id.as_bytes());
        bytes.extend_from_slice(self.timestamp.to_rfc3339().as_bytes());
        bytes.extend_from_slice(self.actor.as_bytes());
        bytes.extend_from_slice(format!("{:?}", self.operation_kind).as_bytes());
        bytes.extend_from_slice(self.target.as_bytes());
        if let Some(hash) = &self.policy_hash {
            bytes.extend_from_slice(hash.as_bytes());
        }
        bytes.extend_from_slice(
            serde_json::to_vec(&self.body).expect("audit body is always serialisable").as_slice(),
        );
        bytes.extend_from_slice(self.previous_entry_hash.as_bytes());
        bytes
    }
}
