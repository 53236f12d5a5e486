//! Streaming transformer: reads the source table in PK-ordered batches,
//! applies per-column strategies, writes the target in the same order
//! (spec §4.6).

use crate::error::{AnonymisationError, Result};
use crate::policy::AnonymisationPolicy;
use crate::strategy::{PatternMask, RowContext, StrategyRegistry};
use confiture_core::{max_batch_rows, topological_order, TableNode};
use serde_json::Value;
use std::collections::HashMap;
use tokio_postgres::Client;

/// One table's sync plan: its primary-key cursor column, the columns to
/// carry over (in source-select order), and the tables it depends on via
/// foreign key (for topological ordering, spec §4.6 "dependency order").
#[derive(Clone, Debug)]
pub struct TableSyncSpec {
    pub table: String,
    pub primary_key: String,
    pub columns: Vec<String>,
    pub depends_on: Vec<String>,
}

/// Outcome of syncing one table: rows written and batches processed, for
/// the audit log's table-and-count summary (spec §4.6, never row-level
/// data).
#[derive(Clone, Debug)]
pub struct TableSyncReport {
    pub table: String,
    pub rows_synced: usize,
    pub batches: usize,
}

/// Syncs every table in `specs`, in FK-dependency order, applying `policy`
/// through `registry`. Any strategy failure aborts the whole sync; batches
/// already committed to the target stay committed (spec §4.6 "partial
/// writes are rolled back at the batch boundary" — the boundary is the
/// unit of atomicity, not the whole sync).
pub async fn sync_all(
    source: &Client,
    target: &mut Client,
    specs: &[TableSyncSpec],
    policy: &AnonymisationPolicy,
    seeds: &HashMap<(String, String), String>,
    registry: &StrategyRegistry,
) -> Result<Vec<TableSyncReport>> {
    let nodes: Vec<TableNode> = specs
        .iter()
        .map(|s| TableNode {
            name: s.table.clone(),
            depends_on: s.depends_on.clone(),
        })
        .collect();
    let order = topological_order(&nodes).map_err(|e| AnonymisationError::Cycle(e.0))?;

    let by_table: HashMap<&str, &TableSyncSpec> =
        specs.iter().map(|s| (s.table.as_str(), s)).collect();

    let mut reports = Vec::with_capacity(order.len());
    for table in &order {
        let Some(spec) = by_table.get(table.as_str()) else {
            continue;
        };
        reports.push(sync_table(source, &mut *target, spec, policy, seeds, registry).await?);
    }
    Ok(reports)
}

async fn sync_table(
    source: &Client,
    target: &mut Client,
    spec: &TableSyncSpec,
    policy: &AnonymisationPolicy,
    seeds: &HashMap<(String, String), String>,
    registry: &StrategyRegistry,
) -> Result<TableSyncReport> {
    let rules: HashMap<&str, &crate::policy::PolicyRule> = policy
        .rules_for(&spec.table)
        .map(|r| (r.column.as_str(), r))
        .collect();

    let batch_rows = max_batch_rows(spec.columns.len().max(1));
    let select_list = spec.columns.join(", ");

    let mut rows_synced = 0;
    let mut batches = 0;
    let mut cursor: Option<String> = None;

    loop {
        let query = match &cursor {
            Some(_) => format!(
                "SELECT {select_list} FROM {table} WHERE {pk}::text > $1 ORDER BY {pk} LIMIT {limit}",
                table = spec.table,
                pk = spec.primary_key,
                limit = batch_rows,
            ),
            None => format!(
                "SELECT {select_list} FROM {table} ORDER BY {pk} LIMIT {limit}",
                table = spec.table,
                pk = spec.primary_key,
                limit = batch_rows,
            ),
        };

        let rows = match &cursor {
            Some(c) => source.query(&query, &[c]).await?,
            None => source.query(&query, &[]).await?,
        };
        if rows.is_empty() {
            break;
        }

        let mut transformed_rows: Vec<HashMap<String, Value>> = Vec::with_capacity(rows.len());
        for row in &rows {
            let mut record: HashMap<String, Value> = HashMap::new();
            for (i, column) in spec.columns.iter().enumerate() {
                let raw: Option<String> = row.try_get(i).ok().flatten();
                record.insert(column.clone(), raw.map(Value::String).unwrap_or(Value::Null));
            }
            transformed_rows.push(record);
        }

        for (batch_index, record) in transformed_rows.iter_mut().enumerate() {
            for column in &spec.columns {
                let Some(rule) = rules.get(column.as_str()) else {
                    continue;
                };
                let seed = seeds.get(&(spec.table.clone(), column.clone()));
                let snapshot = record.clone();
                let ctx = RowContext { row: &snapshot };
                let current = record.get(column).cloned().unwrap_or(Value::Null);

                let new_value = apply_rule(rule, &current, seed.map(|s| s.as_str()), &ctx, registry)
                    .map_err(|message| AnonymisationError::StrategyFailure {
                        table: spec.table.clone(),
                        column: column.clone(),
                        strategy: rule.strategy.clone(),
                        batch_index: batches * batch_rows + batch_index,
                        message,
                    })?;
                record.insert(column.clone(), new_value);
            }
        }

        write_batch(&mut *target, &spec.table, &spec.columns, &transformed_rows).await?;

        rows_synced += rows.len();
        batches += 1;

        let last = &rows[rows.len() - 1];
        let pk_index = spec
            .columns
            .iter()
            .position(|c| c == &spec.primary_key)
            .unwrap_or(0);
        let last_pk: Option<String> = last.try_get(pk_index).ok().flatten();
        cursor = last_pk;
        if cursor.is_none() {
            break;
        }
        if rows.len() < batch_rows {
            break;
        }
    }

    Ok(TableSyncReport {
        table: spec.table.clone(),
        rows_synced,
        batches,
    })
}

fn apply_rule(
    rule: &crate::policy::PolicyRule,
    value: &Value,
    seed: Option<&str>,
    ctx: &RowContext<'_>,
    registry: &StrategyRegistry,
) -> std::result::Result<Value, String> {
    match rule.strategy.as_str() {
        "pattern_mask" => {
            let pattern = rule.params.get("pattern").and_then(|v| v.as_str()).unwrap_or(".");
            let replacement = rule.params.get("replacement").and_then(|v| v.as_str()).unwrap_or("*");
            Ok(PatternMask::transform_with_params(value, pattern, replacement))
        }
        "conditional" => apply_conditional(rule, value, seed, ctx, registry),
        name => {
            let strategy = registry
                .get(name)
                .ok_or_else(|| format!("strategy {name:?} is not registered"))?;
            Ok(strategy.transform(value, seed, ctx))
        }
    }
}

fn apply_conditional(
    rule: &crate::policy::PolicyRule,
    value: &Value,
    seed: Option<&str>,
    ctx: &RowContext<'_>,
    registry: &StrategyRegistry,
) -> std::result::Result<Value, String> {
    let when_column = rule
        .params
        .get("when_column")
        .and_then(|v| v.as_str())
        .ok_or("conditional strategy missing when_column param")?;
    let when_equals = rule.params.get("when_equals").and_then(|v| v.as_str());
    let matches = ctx
        .row
        .get(when_column)
        .map(|actual| match (actual, when_equals) {
            (Value::String(s), Some(expected)) => s == expected,
            (Value::Null, None) => true,
            _ => false,
        })
        .unwrap_or(false);

    let branch = if matches { "then_strategy" } else { "else_strategy" };
    let branch_strategy = rule
        .params
        .get(branch)
        .and_then(|v| v.as_str())
        .ok_or_else(|| format!("conditional strategy missing {branch} param"))?;

    let strategy = registry
        .get(branch_strategy)
        .ok_or_else(|| format!("conditional branch strategy {branch_strategy:?} is not registered"))?;
    Ok(strategy.transform(value, seed, ctx))
}

async fn write_batch(
    target: &mut Client,
    table: &str,
    columns: &[String],
    rows: &[HashMap<String, Value>],
) -> Result<()> {
    if rows.is_empty() {
        return Ok(());
    }
    let tx = target.transaction().await?;
    for row in rows {
        let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("${i}")).collect();
        let statement = format!(
            "INSERT INTO {table} ({cols}) VALUES ({vals})",
            cols = columns.join(", "),
            vals = placeholders.join(", "),
        );
        let values: Vec<Option<String>> = columns
            .iter()
            .map(|c| match row.get(c) {
                Some(Value::String(s)) => Some(s.clone()),
                _ => None,
            })
            .collect();
        let params: Vec<&(dyn tokio_postgres::types::ToSql + Sync)> = values
            .iter()
            .map(|v| v as &(dyn tokio_postgres::types::ToSql + Sync))
            .collect();
        tx.execute(&statement, &params).await?;
    }
    tx.commit().await?;
    Ok(())
}
