//! Impact Analyser: refines a `Change`'s structural `RiskClass` with live
//! statistics — row counts, existing NULLs — when a database connection is
//! available. Without one, callers get the differ's structural estimate.

use crate::error::Result;
use confiture_diff::{Change, ChangeKind, RiskClass};
use serde::Serialize;
use tokio_postgres::Client;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum LockClass {
    None,
    ShareLock,
    AccessExclusive,
}

#[derive(Clone, Debug, Serialize)]
pub struct ImpactReport {
    pub object: String,
    pub lock_class: LockClass,
    pub estimated_row_count: Option<i64>,
    pub estimated_duration_ms: Option<u64>,
    pub refined_risk: RiskClass,
    pub notes: Vec<String>,
}

const ROWS_PER_MS: f64 = 5_000.0;

pub async fn analyse(client: &Client, change: &Change) -> Result<ImpactReport> {
    let lock_class = lock_class_for(change);
    let mut notes = Vec::new();

    let estimated_row_count = if matches!(
        change.kind,
        ChangeKind::AddColumn
            | ChangeKind::AlterColumnType
            | ChangeKind::AlterColumnNullability
            | ChangeKind::DropColumn
            | ChangeKind::AddConstraint
            | ChangeKind::CreateIndex
    ) {
        estimate_row_count(client, &change.object.schema, parent_table(change)).await?
    } else {
        None
    };

    let mut refined_risk = change.risk;
    if change.kind == ChangeKind::AddColumn {
        if let Some(rows) = estimated_row_count {
            if rows > 0 && refined_risk == RiskClass::DataLoss {
                notes.push(format!(
                    "{rows} existing rows will need a backfill value for this column"
                ));
            } else if rows == 0 {
                // Nothing to backfill; the structural worst case doesn't apply.
                refined_risk = RiskClass::Safe;
                notes.push("table is currently empty; no backfill required".to_string());
            }
        }
    }

    let estimated_duration_ms = estimated_row_count.map(|rows| {
        let ms = (rows as f64 / ROWS_PER_MS).ceil() as u64;
        ms.max(1)
    });

    Ok(ImpactReport {
        object: change.object.qualified_name(),
        lock_class,
        estimated_row_count,
        estimated_duration_ms,
        refined_risk,
        notes,
    })
}

fn parent_table(change: &Change) -> &str {
    change
        .object
        .parent
        .as_deref()
        .unwrap_or(change.object.name.as_str())
}

async fn estimate_row_count(
    client: &Client,
    schema: &str,
    table: &str,
) -> Result<Option<i64>> {
    let row = client
        .query_opt(
            "SELECT reltuples::bigint AS estimate \
             FROM pg_class c JOIN pg_namespace n ON n.oid = c.relnamespace \
             WHERE n.nspname = $1 AND c.relname = $2",
            &[&schema, &table],
        )
        .await?;
    Ok(row.map(|r| r.get::<_, i64>("estimate").max(0)))
}

fn lock_class_for(change: &Change) -> LockClass {
    match change.kind {
        ChangeKind::CreateTable
        | ChangeKind::CreateSchema
        | ChangeKind::CreateSequence
        | ChangeKind::CreateView
        | ChangeKind::DropView
        | ChangeKind::DropIndex
        | ChangeKind::DropConstraint => LockClass::None,
        ChangeKind::CreateIndex if change.risk == RiskClass::Online => LockClass::ShareLock,
        ChangeKind::AddConstraint if change.risk == RiskClass::Online => LockClass::ShareLock,
        ChangeKind::AddColumn if change.risk == RiskClass::Safe => LockClass::ShareLock,
        _ => LockClass::AccessExclusive,
    }
}

/// Postgres can confirm a `NOT NULL` addition is satisfiable without a full
/// table rewrite by checking for existing NULLs before applying it.
pub async fn probe_for_existing_nulls(
    client: &Client,
    schema: &str,
    table: &str,
    column: &str,
) -> Result<bool> {
    let query = format!(
        "SELECT EXISTS (SELECT 1 FROM {}.{} WHERE {} IS NULL) AS has_nulls",
        quote(schema),
        quote(table),
        quote(column)
    );
    let row = client.query_one(&query, &[]).await.map_err(|source| {
        crate::error::SafetyError::Probe {
            statement: query.clone(),
            source,
        }
    })?;
    Ok(row.get("has_nulls"))
}

fn quote(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}
