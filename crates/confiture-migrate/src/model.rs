//! `Migration` (an on-disk, applied-or-pending unit of change) and
//! `MigrationRecord` (its `tb_confiture` ledger row), per spec §3.

use confiture_core::HookDescriptor;
use confiture_diff::ChangeSet;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A 32-byte SHA-256 checksum of a migration's forward SQL, used by the
/// ledger to detect on-disk drift after application.
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checksum(pub [u8; 32]);

impl Checksum {
    pub fn of(forward_sql: &str) -> Self {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(forward_sql.as_bytes());
        let digest = hasher.finalize();
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&digest);
        Self(bytes)
    }
}

impl std::fmt::Display for Checksum {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl std::fmt::Debug for Checksum {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Checksum({self})")
    }
}

/// A migration loaded from disk: a slug-named directory containing `up.sql`
/// and, optionally, `down.sql`.
#[derive(Clone, Debug)]
pub struct Migration {
    pub slug: String,
    pub forward_sql: String,
    pub inverse_sql: Option<String>,
    pub hooks: Vec<HookDescriptor>,
    pub checksum: Checksum,
    /// The `ChangeSet` this migration was generated from, when it came out
    /// of `confiture build` rather than being hand-authored. The Safety
    /// Pipeline's static checks (idempotency, lint) need per-change
    /// structure, so they run only when this is present; a hand-authored
    /// migration logs a warning instead of a silent skip.
    pub change_set: Option<ChangeSet>,
}

impl Migration {
    pub fn new(slug: impl Into<String>, forward_sql: impl Into<String>, inverse_sql: Option<String>) -> Self {
        let forward_sql = forward_sql.into();
        let checksum = Checksum::of(&forward_sql);
        Self {
            slug: slug.into(),
            forward_sql,
            inverse_sql,
            hooks: Vec::new(),
            checksum,
            change_set: None,
        }
    }

    pub fn with_hooks(mut self, hooks: Vec<HookDescriptor>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn with_change_set(mut self, change_set: ChangeSet) -> Self {
        self.change_set = Some(change_set);
        self
    }

    /// Splits the forward SQL into individually executable statements on
    /// `;` boundaries. Migration files are expected not to contain
    /// dollar-quoted bodies with embedded semicolons; `confiture-schema`'s
    /// lexer is reused by the DDL parser for that harder case, but
    /// migration files are hand-written SQL scripts, not extracted DDL.
    pub fn statements(&self) -> Vec<&str> {
        self.forward_sql
            .split(';')
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .collect()
    }
}

/// A row of the `tb_confiture` ledger (spec §6 exact schema).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MigrationRecord {
    pub id: Uuid,
    pub pk_confiture: i64,
    pub slug: String,
    #[serde(with = "checksum_hex")]
    pub checksum: Vec<u8>,
    pub applied_at: chrono::DateTime<chrono::Utc>,
    pub applied_by: Option<String>,
    pub forward_sql: Option<String>,
    pub inverse_sql: Option<String>,
}

mod checksum_hex {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(d)?;
        hex::decode(s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checksum_is_stable_for_identical_sql() {
        let a = Checksum::of("CREATE TABLE t (id int);");
        let b = Checksum::of("CREATE TABLE t (id int);");
        assert_eq!(a.0, b.0);
    }

    #[test]
    fn checksum_differs_for_different_sql() {
        let a = Checksum::of("CREATE TABLE t (id int);");
        let b = Checksum::of("CREATE TABLE t (id bigint);");
        assert_ne!(a.0, b.0);
    }

    #[test]
    fn statements_splits_on_semicolons() {
        let m = Migration::new("0001_init", "CREATE TABLE a (id int); CREATE TABLE b (id int);", None);
        assert_eq!(m.statements().len(), 2);
    }
}
