//! `confiture sync` — anonymised production-data sync (spec §6, §4.6).

use crate::config::ConfitureConfig;
use crate::db;
use crate::error::CliError;
use confiture_anonymize::{resolve_seeds, sync_all, AnonymisationPolicy, StrategyRegistry, TableSyncSpec};
use confiture_audit::{AuditEntryDraft, AuditSigningKey, AuditStore, OperationKind};
use confiture_core::{ConstraintKind, ObjectKind, Render, SchemaState};
use serde::Serialize;
use serde_json::json;

#[derive(Serialize)]
pub struct SyncRender {
    pub policy_hash: String,
    pub tables_synced: usize,
    pub rows_synced: usize,
}

impl Render for SyncRender {
    fn schema_name(&self) -> &'static str {
        "confiture.sync.v1"
    }

    fn to_text(&self) -> String {
        format!(
            "{}\n  policy hash:   {}\n  tables synced: {}\n  rows synced:   {}",
            crate::output::heading("anonymisation sync complete"),
            self.policy_hash,
            self.tables_synced,
            self.rows_synced
        )
    }

    fn csv_rows(&self) -> Vec<Vec<String>> {
        vec![
            vec!["policy_hash".into(), "tables_synced".into(), "rows_synced".into()],
            vec![
                self.policy_hash.clone(),
                self.tables_synced.to_string(),
                self.rows_synced.to_string(),
            ],
        ]
    }
}

/// Builds one `TableSyncSpec` per table object in `state`: its primary-key
/// column (first `ConstraintKind::PrimaryKey` constraint found) and the
/// tables it depends on via foreign key, so `sync_all` can order the run
/// by dependency (spec §4.6).
fn specs_from_schema(state: &SchemaState) -> Vec<TableSyncSpec> {
    let mut specs = Vec::new();
    for table_obj in state.objects().iter().filter(|o| o.key.kind == ObjectKind::Table) {
        let table = table_obj.key.name.clone();

        let columns: Vec<String> = state
            .objects()
            .iter()
            .filter(|o| o.key.kind == ObjectKind::Column && o.key.parent.as_deref() == Some(table.as_str()))
            .map(|o| o.key.name.clone())
            .collect();

        let mut primary_key = "id".to_string();
        let mut depends_on = Vec::new();
        for constraint_obj in state.objects().iter().filter(|o| {
            o.key.kind == ObjectKind::Constraint && o.key.parent.as_deref() == Some(table.as_str())
        }) {
            let Some(attrs) = &constraint_obj.constraint else {
                continue;
            };
            match attrs.kind {
                ConstraintKind::PrimaryKey => {
                    if let Some(col) = attrs.columns.first() {
                        primary_key = col.clone();
                    }
                }
                ConstraintKind::ForeignKey => {
                    if let Some((_, referenced_table, _)) = &attrs.references {
                        if referenced_table != &table {
                            depends_on.push(referenced_table.clone());
                        }
                    }
                }
                _ => {}
            }
        }

        specs.push(TableSyncSpec {
            table,
            primary_key,
            columns,
            depends_on,
        });
    }
    specs
}

pub async fn run(
    config: &ConfitureConfig,
    source_env: Option<&str>,
    target_env: Option<&str>,
    policy_path: Option<&str>,
) -> Result<SyncRender, CliError> {
    let source_var = source_env.unwrap_or(&config.anonymisation.source_env_var);
    let target_var = target_env.unwrap_or(&config.anonymisation.target_env_var);

    let policy_file = policy_path.unwrap_or(&config.anonymisation.policy_path);
    let policy_source = std::fs::read_to_string(policy_file)
        .map_err(|e| CliError::Usage(format!("failed to read policy file {policy_file}: {e}")))?;
    let policy = AnonymisationPolicy::parse(&policy_source)?;
    let seeds = resolve_seeds(&policy)?;
    let registry = StrategyRegistry::with_builtins();

    let source = db::connect(source_var).await?;
    let mut target = db::connect(target_var).await?;

    let source_schema = confiture_schema::introspect(&source).await?;
    let specs = specs_from_schema(&source_schema);

    let reports = sync_all(&source, &mut target, &specs, &policy, &seeds, &registry).await?;
    let tables_synced = reports.len();
    let rows_synced = reports.iter().map(|r| r.rows_synced).sum();

    if let Ok(key) = AuditSigningKey::from_env("CONFITURE_AUDIT_KEY") {
        let audit = AuditStore::new(&target, &key);
        audit.ensure_schema().await?;
        audit
            .append(AuditEntryDraft {
                actor: std::env::var("USER").unwrap_or_else(|_| "confiture".to_string()),
                operation_kind: OperationKind::AnonymisationSync,
                target: target_var.to_string(),
                policy_hash: Some(policy.integrity_hash_hex()),
                body: json!({
                    "tables": reports.iter().map(|r| json!({
                        "table": r.table,
                        "rows_synced": r.rows_synced,
                        "batches": r.batches,
                    })).collect::<Vec<_>>(),
                }),
            })
            .await?;
    } else {
        tracing::warn!("CONFITURE_AUDIT_KEY not set; anonymisation sync was not recorded in the audit log");
    }

    Ok(SyncRender {
        policy_hash: policy.integrity_hash_hex(),
        tables_synced,
        rows_synced,
    })
}
