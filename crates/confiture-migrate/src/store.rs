//! Migration Store: the `tb_confiture` ledger (spec §4.3).

use crate::model::{Checksum, Migration, MigrationRecord};
use tokio_postgres::{Client, Transaction};
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] tokio_postgres::Error),
    #[error(
        "checksum mismatch for {slug}: on-disk forward SQL has changed since it was applied"
    )]
    ChecksumMismatch { slug: String },
    #[error("migration {slug} has no inverse SQL; cannot roll back")]
    NoInverse { slug: String },
    #[error("no applied migration to roll back")]
    NothingToRollBack,
}

pub type Result<T> = std::result::Result<T, StoreError>;

const CREATE_LEDGER_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS tb_confiture (
    id UUID PRIMARY KEY,
    pk_confiture BIGINT GENERATED ALWAYS AS IDENTITY UNIQUE,
    slug TEXT UNIQUE NOT NULL,
    checksum BYTEA NOT NULL,
    applied_at TIMESTAMPTZ NOT NULL,
    applied_by TEXT,
    forward_sql TEXT,
    inverse_sql TEXT
)
"#;

pub struct MigrationStore<'a> {
    client: &'a Client,
    advisory_lock_key: i64,
}

impl<'a> MigrationStore<'a> {
    pub fn new(client: &'a Client, advisory_lock_key: i64) -> Self {
        Self {
            client,
            advisory_lock_key,
        }
    }

    pub async fn acquire_lock(&self) -> Result<()> {
        self.client
            .execute("SELECT pg_advisory_lock($1)", &[&self.advisory_lock_key])
            .await?;
        Ok(())
    }

    pub async fn release_lock(&self) -> Result<()> {
        self.client
            .execute("SELECT pg_advisory_unlock($1)", &[&self.advisory_lock_key])
            .await?;
        Ok(())
    }

    /// Idempotently creates the ledger table; never alters it thereafter.
    pub async fn ensure_schema(&self) -> Result<()> {
        self.client.batch_execute(CREATE_LEDGER_SQL).await?;
        Ok(())
    }

    pub async fn applied_slugs(&self) -> Result<Vec<String>> {
        let rows = self
            .client
            .query("SELECT slug FROM tb_confiture ORDER BY pk_confiture", &[])
            .await?;
        Ok(rows.iter().map(|r| r.get("slug")).collect())
    }

    pub async fn applied_records(&self) -> Result<Vec<MigrationRecord>> {
        let rows = self
            .client
            .query(
                "SELECT id, pk_confiture, slug, checksum, applied_at, applied_by, \
                 forward_sql, inverse_sql FROM tb_confiture ORDER BY pk_confiture",
                &[],
            )
            .await?;
        Ok(rows
            .iter()
            .map(|row| MigrationRecord {
                id: row.get("id"),
                pk_confiture: row.get("pk_confiture"),
                slug: row.get("slug"),
                checksum: row.get::<_, Vec<u8>>("checksum"),
                applied_at: row.get("applied_at"),
                applied_by: row.get("applied_by"),
                forward_sql: row.get("forward_sql"),
                inverse_sql: row.get("inverse_sql"),
            })
            .collect())
    }

    /// Migrations on disk whose slug is not yet in the ledger, preserving
    /// the loader's (slug-lexicographic) order.
    pub async fn pending<'m>(&self, on_disk: &'m [Migration]) -> Result<Vec<&'m Migration>> {
        let applied = self.applied_slugs().await?;
        Ok(on_disk
            .iter()
            .filter(|m| !applied.contains(&m.slug))
            .collect())
    }

    /// Fails if `migration`'s on-disk checksum no longer matches what was
    /// recorded at application time.
    pub async fn verify_checksum(&self, migration: &Migration) -> Result<()> {
        let row = self
            .client
            .query_opt(
                "SELECT checksum FROM tb_confiture WHERE slug = $1",
                &[&migration.slug],
            )
            .await?;
        let Some(row) = row else { return Ok(()) };
        let recorded: Vec<u8> = row.get("checksum");
        if !migration.checksum.matches(&recorded) {
            return Err(StoreError::ChecksumMismatch {
                slug: migration.slug.clone(),
            });
        }
        Ok(())
    }

}

/// Inserts a ledger row in the same transaction as the migration's DDL.
pub async fn record_applied(
    tx: &Transaction<'_>,
    migration: &Migration,
    agent: Option<&str>,
) -> Result<()> {
    tx.execute(
        "INSERT INTO tb_confiture \
         (id, slug, checksum, applied_at, applied_by, forward_sql, inverse_sql) \
         VALUES ($1, $2, $3, now(), $4, $5, $6)",
        &[
            &Uuid::new_v4(),
            &migration.slug,
            &migration.checksum.0.as_slice(),
            &agent,
            &migration.forward_sql,
            &migration.inverse_sql,
        ],
    )
    .await?;
    Ok(())
}

/// Executes `migration`'s inverse SQL and deletes its ledger row, both
/// in the same transaction.
pub async fn rollback(tx: &Transaction<'_>, migration: &Migration) -> Result<()> {
    let inverse = migration
        .inverse_sql
        .as_deref()
        .ok_or_else(|| StoreError::NoInverse {
            slug: migration.slug.clone(),
        })?;
    tx.batch_execute(inverse).await?;
    let affected = tx
        .execute("DELETE FROM tb_confiture WHERE slug = $1", &[&migration.slug])
        .await?;
    if affected == 0 {
        return Err(StoreError::NothingToRollBack);
    }
    Ok(())
}

impl Checksum {
    pub fn matches(&self, recorded: &[u8]) -> bool {
        self.0 == recorded
    }
}
