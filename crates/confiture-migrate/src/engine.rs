//! Migration Engine: the orchestrator (spec §4.4).

use crate::model::Migration;
use crate::store::{self, MigrationStore, StoreError};
use confiture_core::{ConfitureError, EngineContext, HookContext, HookOutcome, HookPhase, ObjectKey, ObjectKind};
use confiture_diff::{Change, ChangeKind, RiskClass};
use confiture_safety::{LintRegistry, SafetyReport};
use serde::Serialize;
use std::collections::HashMap;
use tokio_postgres::{Client, Transaction};

/// Wraps a hand-authored migration's whole forward SQL as a single opaque
/// change, so dry-run can still probe it statement-by-statement even
/// without a `ChangeSet` from `confiture build`.
fn synthetic_change(migration: &Migration) -> Change {
    Change {
        kind: ChangeKind::AlterObjectBody,
        object: ObjectKey::new(ObjectKind::Table, "public", migration.slug.clone(), None),
        forward_sql: migration.forward_sql.clone(),
        inverse_sql: migration.inverse_sql.clone(),
        risk: RiskClass::Locking,
        depends_on: Vec::new(),
        estimated_duration_ms: None,
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Core(#[from] ConfitureError),
}

pub type Result<T> = std::result::Result<T, EngineError>;

#[derive(Clone, Debug, Serialize)]
pub struct AppliedMigration {
    pub slug: String,
    pub statements_executed: usize,
}

#[derive(Clone, Debug, Serialize)]
pub struct StatusReport {
    pub applied: Vec<String>,
    pub pending: Vec<String>,
    /// Ledger rows with no matching on-disk migration.
    pub orphaned: Vec<String>,
}

pub struct MigrationEngine<'a> {
    client: &'a mut Client,
    ctx: &'a EngineContext,
    agent: Option<String>,
}

impl<'a> MigrationEngine<'a> {
    pub fn new(client: &'a mut Client, ctx: &'a EngineContext, agent: Option<String>) -> Self {
        Self { client, ctx, agent }
    }

    /// Applies all pending migrations up to and including `target_slug`, or
    /// every pending migration when `target_slug` is `None` (spec §4.4
    /// `up(target_slug | latest, mode)`).
    ///
    /// Re-running with nothing pending is a no-op that returns an empty
    /// list with no error (spec §4.4 idempotency policy).
    pub async fn up(
        &mut self,
        on_disk: &[Migration],
        target_slug: Option<&str>,
    ) -> Result<Vec<AppliedMigration>> {
        MigrationStore::new(self.client, self.ctx.advisory_lock_key)
            .acquire_lock()
            .await?;
        let outcome = self.up_locked(on_disk, target_slug).await;
        MigrationStore::new(self.client, self.ctx.advisory_lock_key)
            .release_lock()
            .await?;
        outcome
    }

    async fn up_locked(
        &mut self,
        on_disk: &[Migration],
        target_slug: Option<&str>,
    ) -> Result<Vec<AppliedMigration>> {
        MigrationStore::new(self.client, self.ctx.advisory_lock_key)
            .ensure_schema()
            .await?;

        let applied_slugs = MigrationStore::new(self.client, self.ctx.advisory_lock_key)
            .applied_slugs()
            .await?;
        for migration in on_disk.iter().filter(|m| applied_slugs.contains(&m.slug)) {
            MigrationStore::new(self.client, self.ctx.advisory_lock_key)
                .verify_checksum(migration)
                .await?;
        }

        let mut pending: Vec<&Migration> = MigrationStore::new(self.client, self.ctx.advisory_lock_key)
            .pending(on_disk)
            .await?;
        if let Some(target) = target_slug {
            if let Some(pos) = pending.iter().position(|m| m.slug == target) {
                pending.truncate(pos + 1);
            }
        }

        let mut applied = Vec::new();
        for migration in pending {
            applied.push(self.apply_one(migration).await?);
        }
        Ok(applied)
    }

    async fn apply_one(&mut self, migration: &Migration) -> Result<AppliedMigration> {
        let scratch = HashMap::new();

        Self::run_hooks(self.ctx, migration, HookPhase::BeforeValidation, &scratch, None).await?;

        match &migration.change_set {
            Some(change_set) => {
                let registry = LintRegistry::with_builtins();
                let report = SafetyReport::evaluate(change_set, &registry);
                report.enforce(&self.ctx.safety)?;
            }
            None => {
                tracing::warn!(
                    slug = %migration.slug,
                    "hand-authored migration has no change set; skipping static safety checks"
                );
            }
        }

        let tx = self.client.transaction().await.map_err(StoreError::from)?;

        Self::run_hooks(self.ctx, migration, HookPhase::BeforeDdl, &scratch, Some(&tx)).await?;

        let statements = migration.statements();
        for statement in &statements {
            if let Err(err) = tx.batch_execute(statement).await {
                Self::run_hooks(self.ctx, migration, HookPhase::OnError, &scratch, Some(&tx)).await?;
                return Err(StoreError::from(err).into());
            }
        }

        Self::run_hooks(self.ctx, migration, HookPhase::AfterDdl, &scratch, Some(&tx)).await?;

        store::record_applied(&tx, migration, self.agent.as_deref()).await?;

        Self::run_hooks(self.ctx, migration, HookPhase::AfterValidation, &scratch, Some(&tx)).await?;

        tx.commit().await.map_err(StoreError::from)?;

        Self::run_hooks(self.ctx, migration, HookPhase::Cleanup, &scratch, None).await?;

        Ok(AppliedMigration {
            slug: migration.slug.clone(),
            statements_executed: statements.len(),
        })
    }

    /// Reverts the last `steps` applied migrations, in reverse order.
    pub async fn down(&mut self, on_disk: &[Migration], steps: usize) -> Result<Vec<String>> {
        MigrationStore::new(self.client, self.ctx.advisory_lock_key)
            .acquire_lock()
            .await?;
        let outcome = self.down_locked(on_disk, steps).await;
        MigrationStore::new(self.client, self.ctx.advisory_lock_key)
            .release_lock()
            .await?;
        outcome
    }

    async fn down_locked(&mut self, on_disk: &[Migration], steps: usize) -> Result<Vec<String>> {
        let mut applied = MigrationStore::new(self.client, self.ctx.advisory_lock_key)
            .applied_slugs()
            .await?;
        applied.reverse();
        applied.truncate(steps);

        let mut reverted = Vec::new();
        for slug in applied {
            let migration = on_disk
                .iter()
                .find(|m| m.slug == slug)
                .ok_or(StoreError::NothingToRollBack)?;
            MigrationStore::new(self.client, self.ctx.advisory_lock_key)
                .verify_checksum(migration)
                .await?;
            let tx = self.client.transaction().await.map_err(StoreError::from)?;
            store::rollback(&tx, migration).await?;
            tx.commit().await.map_err(StoreError::from)?;
            reverted.push(slug);
        }
        Ok(reverted)
    }

    pub async fn status(&self, on_disk: &[Migration]) -> Result<StatusReport> {
        let store = MigrationStore::new(self.client, self.ctx.advisory_lock_key);
        store.ensure_schema().await?;
        let applied = store.applied_slugs().await?;
        let pending: Vec<String> = on_disk
            .iter()
            .filter(|m| !applied.contains(&m.slug))
            .map(|m| m.slug.clone())
            .collect();
        let on_disk_slugs: Vec<&str> = on_disk.iter().map(|m| m.slug.as_str()).collect();
        let orphaned: Vec<String> = applied
            .iter()
            .filter(|slug| !on_disk_slugs.contains(&slug.as_str()))
            .cloned()
            .collect();

        Ok(StatusReport {
            applied,
            pending,
            orphaned,
        })
    }

    /// Executes `migration`'s forward SQL inside a transaction guaranteed to
    /// roll back, capturing per-statement outcomes (spec §4.4 `dry_run`).
    pub async fn dry_run(
        &mut self,
        migration: &Migration,
    ) -> Result<Vec<confiture_safety::DryRunOutcome>> {
        let changes = match &migration.change_set {
            Some(cs) => cs.changes.clone(),
            None => vec![synthetic_change(migration)],
        };
        confiture_safety::dry_run(self.client, &changes)
            .await
            .map_err(|e| EngineError::Core(ConfitureError::DryRun {
                statement_index: 0,
                message: e.to_string(),
            }))
    }

    /// Runs every hook bound to `phase`, each inside its own `SAVEPOINT`
    /// when a transaction is open for this phase (spec §3 `HookDescriptor`:
    /// "each hook runs inside its own savepoint"). `BeforeValidation` and
    /// `Cleanup` run outside the migration's transaction (none is open yet,
    /// or it has already committed), so `tx` is `None` for those phases.
    async fn run_hooks(
        ctx: &EngineContext,
        migration: &Migration,
        phase: HookPhase,
        scratch: &HashMap<String, serde_json::Value>,
        tx: Option<&Transaction<'_>>,
    ) -> Result<()> {
        for descriptor in migration.hooks.iter().filter(|h| h.phase == phase) {
            let Some(hook) = ctx.hooks.get(&descriptor.id) else {
                continue;
            };

            if let Some(tx) = tx {
                tx.batch_execute("SAVEPOINT confiture_hook")
                    .await
                    .map_err(StoreError::from)?;
            }

            let context = HookContext {
                migration_slug: &migration.slug,
                scratch,
            };
            let outcome = hook.execute(descriptor, &context);
            let failed = !matches!(outcome, Ok(HookOutcome::Ok));

            if let Some(tx) = tx {
                let savepoint_sql = if failed {
                    "ROLLBACK TO SAVEPOINT confiture_hook"
                } else {
                    "RELEASE SAVEPOINT confiture_hook"
                };
                tx.batch_execute(savepoint_sql).await.map_err(StoreError::from)?;
            }

            match outcome? {
                HookOutcome::Ok => {}
                HookOutcome::Abort(reason) => {
                    return Err(ConfitureError::Hook {
                        hook: descriptor.id.clone(),
                        phase: phase.to_string(),
                        message: reason,
                    }
                    .into())
                }
            }
        }
        Ok(())
    }
}
