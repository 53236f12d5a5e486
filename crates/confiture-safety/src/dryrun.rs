//! Dry-Run Executor: applies a `ChangeSet`'s forward statements inside a
//! transaction that is always rolled back, so the caller learns whether the
//! statements would succeed without ever committing them.
//!
//! Never uses a `READ ONLY` transaction: DDL against a real target needs
//! read-write access to plan correctly, and a `READ ONLY` transaction would
//! simply reject every statement rather than exercise it. Each statement
//! runs under its own `SAVEPOINT` so one failure doesn't abort probing the
//! rest, and the whole outer transaction rolls back unconditionally at the
//! end regardless of outcome.

use crate::error::Result;
use confiture_diff::Change;
use serde::Serialize;
use tokio_postgres::Client;

#[derive(Clone, Debug, Serialize)]
pub struct DryRunOutcome {
    pub object: String,
    pub statement: String,
    pub status: DryRunStatus,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DryRunStatus {
    Applied,
    Failed { message: String },
    Skipped { reason: String },
}

/// Statement shapes that cannot be meaningfully rolled back or that would
/// have a side effect outside the transaction; dry-run skips them with an
/// explicit warning rather than either executing or silently ignoring them.
const NON_ROLLBACKABLE_MARKERS: &[&str] = &[
    "PG_ADVISORY_LOCK",
    "NOTIFY",
    "CREATE EXTENSION",
    "COPY ",
    "PG_SLEEP",
];

pub async fn dry_run(client: &mut Client, changes: &[Change]) -> Result<Vec<DryRunOutcome>> {
    let tx = client.transaction().await?;
    let mut outcomes = Vec::with_capacity(changes.len());

    for (idx, change) in changes.iter().enumerate() {
        let upper = change.forward_sql.to_ascii_uppercase();
        if let Some(marker) = NON_ROLLBACKABLE_MARKERS.iter().find(|m| upper.contains(*m)) {
            tracing::warn!(
                object = %change.object.qualified_name(),
                marker,
                "skipping non-rollbackable statement in dry run"
            );
            outcomes.push(DryRunOutcome {
                object: change.object.qualified_name(),
                statement: change.forward_sql.clone(),
                status: DryRunStatus::Skipped {
                    reason: format!("contains non-rollbackable construct: {marker}"),
                },
            });
            continue;
        }

        let savepoint = format!("confiture_dry_run_{idx}");
        tx.batch_execute(&format!("SAVEPOINT {savepoint}")).await?;

        match tx.batch_execute(&change.forward_sql).await {
            Ok(()) => {
                outcomes.push(DryRunOutcome {
                    object: change.object.qualified_name(),
                    statement: change.forward_sql.clone(),
                    status: DryRunStatus::Applied,
                });
                tx.batch_execute(&format!("RELEASE SAVEPOINT {savepoint}"))
                    .await?;
            }
            Err(err) => {
                outcomes.push(DryRunOutcome {
                    object: change.object.qualified_name(),
                    statement: change.forward_sql.clone(),
                    status: DryRunStatus::Failed {
                        message: err.to_string(),
                    },
                });
                tx.batch_execute(&format!("ROLLBACK TO SAVEPOINT {savepoint}"))
                    .await?;
            }
        }
    }

    tx.rollback().await?;
    Ok(outcomes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_rollbackable_markers_are_detected() {
        let upper = "CREATE EXTENSION IF NOT EXISTS pgcrypto;".to_ascii_uppercase();
        assert!(NON_ROLLBACKABLE_MARKERS.iter().any(|m| upper.contains(*m)));
    }
}
