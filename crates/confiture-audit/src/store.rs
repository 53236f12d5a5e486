//! Append-only audit log backed by `tb_confiture_audit`. The only write
//! path is [`AuditStore::append`], which goes through the stored procedure
//! `confiture_audit_append` — the table itself grants no `UPDATE`/`DELETE`
//! privilege to the application role, so tampering requires superuser
//! access outside this crate's reach (spec §4.7 "only permitted write is
//! INSERT through a single stored procedure").

use crate::error::{AuditError, Result};
use crate::model::{AuditEntry, AuditEntryDraft, OperationKind};
use crate::signing::{hash_entry, sign, AuditSigningKey};
use chrono::Utc;
use tokio_postgres::Client;
use uuid::Uuid;

/// Fixed advisory lock key serialising audit appends against a given
/// database, so sequence assignment and previous-hash lookup never race
/// (mirrors `confiture-migrate`'s ledger lock).
const AUDIT_ADVISORY_LOCK_KEY: i64 = 0x436f_6e66_6975_7265u64 as i64 ^ 1;

pub const CREATE_AUDIT_TABLE_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS tb_confiture_audit (
    sequence BIGINT PRIMARY KEY,
    id UUID NOT NULL,
    ts TIMESTAMPTZ NOT NULL,
    actor TEXT NOT NULL,
    operation_kind TEXT NOT NULL,
    target TEXT NOT NULL,
    policy_hash TEXT,
    body JSONB NOT NULL,
    previous_entry_hash TEXT NOT NULL,
    signature TEXT NOT NULL
)
"#;

pub const CREATE_AUDIT_APPEND_PROCEDURE_SQL: &str = r#"
CREATE OR REPLACE PROCEDURE confiture_audit_append(
    p_sequence BIGINT,
    p_id UUID,
    p_ts TIMESTAMPTZ,
    p_actor TEXT,
    p_operation_kind TEXT,
    p_target TEXT,
    p_policy_hash TEXT,
    p_body JSONB,
    p_previous_entry_hash TEXT,
    p_signature TEXT
)
LANGUAGE plpgsql
AS $$
BEGIN
    INSERT INTO tb_confiture_audit (
        sequence, id, ts, actor, operation_kind, target, policy_hash, body,
        previous_entry_hash, signature
    ) VALUES (
        p_sequence, p_id, p_ts, p_actor, p_operation_kind, p_target, p_policy_hash, p_body,
        p_previous_entry_hash, p_signature
    );
END;
$$
"#;

pub struct AuditStore<'a> {
    client: &'a Client,
    key: &'a AuditSigningKey,
}

impl<'a> AuditStore<'a> {
    pub fn new(client: &'a Client, key: &'a AuditSigningKey) -> Self {
        Self { client, key }
    }

    pub async fn ensure_schema(&self) -> Result<()> {
        self.client.batch_execute(CREATE_AUDIT_TABLE_SQL).await?;
        self.client
            .batch_execute(CREATE_AUDIT_APPEND_PROCEDURE_SQL)
            .await?;
        Ok(())
    }

    async fn acquire_lock(&self) -> Result<()> {
        self.client
            .execute("SELECT pg_advisory_lock($1)", &[&AUDIT_ADVISORY_LOCK_KEY])
            .await?;
        Ok(())
    }

    async fn release_lock(&self) -> Result<()> {
        self.client
            .execute("SELECT pg_advisory_unlock($1)", &[&AUDIT_ADVISORY_LOCK_KEY])
            .await?;
        Ok(())
    }

    /// Assigns the next sequence number, signs the entry, and appends it
    /// (spec §4.7 write contract). Serialised by an advisory lock so
    /// concurrent writers never assign the same sequence or sign against a
    /// stale previous-hash.
    pub async fn append(&self, draft: AuditEntryDraft) -> Result<AuditEntry> {
        self.acquire_lock().await?;
        let outcome = self.append_locked(draft).await;
        self.release_lock().await?;
        outcome
    }

    async fn append_locked(&self, draft: AuditEntryDraft) -> Result<AuditEntry> {
        let last = self.last_entry().await?;
        let (sequence, previous_entry_hash) = match &last {
            Some(entry) => (entry.sequence + 1, hash_entry(&entry.signed_payload())),
            None => (0, "genesis".to_string()),
        };

        let mut entry = AuditEntry {
            sequence,
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            actor: draft.actor,
            operation_kind: draft.operation_kind,
            target: draft.target,
            policy_hash: draft.policy_hash,
            body: draft.body,
            previous_entry_hash,
            signature: String::new(),
        };
        entry.signature = sign(self.key, &entry.signed_payload());

        self.client
            .execute(
                "CALL confiture_audit_append($1,$2,$3,$4,$5,$6,$7,$8,$9,$10)",
                &[
                    &entry.sequence,
                    &entry.id,
                    &entry.timestamp,
                    &entry.actor,
                    &operation_kind_str(entry.operation_kind),
                    &entry.target,
                    &entry.policy_hash,
                    &entry.body,
                    &entry.previous_entry_hash,
                    &entry.signature,
                ],
            )
            .await?;

        Ok(entry)
    }

    async fn last_entry(&self) -> Result<Option<AuditEntry>> {
        let row = self
            .client
            .query_opt(
                "SELECT sequence, id, ts, actor, operation_kind, target, policy_hash, body, \
                 previous_entry_hash, signature FROM tb_confiture_audit \
                 ORDER BY sequence DESC LIMIT 1",
                &[],
            )
            .await?;
        Ok(row.map(|r| row_to_entry(&r)))
    }

    /// Returns every entry in `[from, to]`, ordered by sequence.
    pub async fn range(&self, from: i64, to: i64) -> Result<Vec<AuditEntry>> {
        let rows = self
            .client
            .query(
                "SELECT sequence, id, ts, actor, operation_kind, target, policy_hash, body, \
                 previous_entry_hash, signature FROM tb_confiture_audit \
                 WHERE sequence BETWEEN $1 AND $2 ORDER BY sequence ASC",
                &[&from, &to],
            )
            .await?;
        Ok(rows.iter().map(row_to_entry).collect())
    }
}

fn operation_kind_str(kind: OperationKind) -> &'static str {
    match kind {
        OperationKind::MigrationApplied => "migration_applied",
        OperationKind::MigrationRolledBack => "migration_rolled_back",
        OperationKind::AnonymisationSync => "anonymisation_sync",
        OperationKind::CoordinationIntentRegistered => "coordination_intent_registered",
        OperationKind::CoordinationIntentCompleted => "coordination_intent_completed",
        OperationKind::CoordinationIntentAbandoned => "coordination_intent_abandoned",
    }
}

fn parse_operation_kind(s: &str) -> OperationKind {
    match s {
        "migration_applied" => OperationKind::MigrationApplied,
        "migration_rolled_back" => OperationKind::MigrationRolledBack,
        "anonymisation_sync" => OperationKind::AnonymisationSync,
        "coordination_intent_registered" => OperationKind::CoordinationIntentRegistered,
        "coordination_intent_completed" => OperationKind::CoordinationIntentCompleted,
        _ => OperationKind::CoordinationIntentAbandoned,
    }
}

fn row_to_entry(row: &tokio_postgres::Row) -> AuditEntry {
    AuditEntry {
        sequence: row.get("sequence"),
        id: row.get("id"),
        timestamp: row.get("ts"),
        actor: row.get("actor"),
        operation_kind: parse_operation_kind(row.get::<_, String>("operation_kind").as_str()),
        target: row.get("target"),
        policy_hash: row.get("policy_hash"),
        body: row.get("body"),
        previous_entry_hash: row.get("previous_entry_hash"),
        signature: row.get("signature"),
    }
}

/// Re-derives every signature across `entries` in order, failing at the
/// first mismatch (spec §4.7 read contract `verify(range)`).
pub fn verify_chain(entries: &[AuditEntry], key: &AuditSigningKey) -> Result<()> {
    let mut previous_hash = "genesis".to_string();
    for entry in entries {
        if entry.previous_entry_hash != previous_hash {
            return Err(AuditError::PreviousHashMismatch {
                sequence: entry.sequence,
                sequence_minus_one: entry.sequence - 1,
            });
        }
        let expected = sign(key, &entry.signed_payload());
        if expected != entry.signature {
            return Err(AuditError::ChainBroken {
                sequence: entry.sequence,
            });
        }
        previous_hash = hash_entry(&entry.signed_payload());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(sequence: i64, previous_entry_hash: &str, key: &AuditSigningKey) -> AuditEntry {
        let mut e = AuditEntry {
            sequence,
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            actor: "tester".into(),
            operation_kind: OperationKind::MigrationApplied,
            target: "001_init".into(),
            policy_hash: None,
            body: serde_json::json!({}),
            previous_entry_hash: previous_entry_hash.to_string(),
            signature: String::new(),
        };
        e.signature = sign(key, &e.signed_payload());
        e
    }

    #[test]
    fn verifies_a_valid_chain() {
        let key = AuditSigningKey::new(b"k".to_vec()).unwrap();
        let e0 = entry(0, "genesis", &key);
        let h0 = hash_entry(&e0.signed_payload());
        let e1 = entry(1, &h0, &key);
        assert!(verify_chain(&[e0, e1], &key).is_ok());
    }

    #[test]
    fn detects_tampered_signature() {
        let key = AuditSigningKey::new(b"k".to_vec()).unwrap();
        let mut e0 = entry(0, "genesis", &key);
        e0.signature = "tampered".to_string();
        assert!(matches!(verify_chain(&[e0], &key), Err(AuditError::ChainBroken { sequence: 0 })));
    }

    #[test]
    fn detects_broken_previous_hash_link() {
        let key = AuditSigningKey::new(b"k".to_vec()).unwrap();
        let e0 = entry(0, "genesis", &key);
        let e1 = entry(1, "not-the-real-hash", &key);
        assert!(matches!(
            verify_chain(&[e0, e1], &key),
            Err(AuditError::PreviousHashMismatch { sequence: 1, .. })
        ));
    }
}
