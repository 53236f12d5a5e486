//! `confiture migrate {up,down,status,diff,validate}` (spec §6, §4.4).

use crate::config::ConfitureConfig;
use crate::db;
use crate::error::CliError;
use confiture_core::{EngineContext, Render};
use confiture_migrate::{
    apply_seeds, load_migrations, load_seed_dir, seeding_order, validate_prep_seeds,
    AppliedMigration, MigrationEngine, StatusReport,
};
use serde::Serialize;
use std::path::Path;

#[derive(Serialize)]
#[serde(transparent)]
pub struct AppliedRender(pub Vec<AppliedMigration>);

impl Render for AppliedRender {
    fn schema_name(&self) -> &'static str {
        "confiture.migrate.up.v1"
    }

    fn to_text(&self) -> String {
        if self.0.is_empty() {
            return crate::output::muted("no pending migrations");
        }
        let mut lines = vec![crate::output::heading("applied migrations")];
        for applied in &self.0 {
            lines.push(format!(
                "  {} {} ({} statement(s))",
                crate::output::success("✓"),
                applied.slug,
                applied.statements_executed
            ));
        }
        lines.join("\n")
    }

    fn csv_rows(&self) -> Vec<Vec<String>> {
        let mut rows = vec![vec!["slug".into(), "statements_executed".into()]];
        for applied in &self.0 {
            rows.push(vec![applied.slug.clone(), applied.statements_executed.to_string()]);
        }
        rows
    }
}

#[derive(Serialize)]
#[serde(transparent)]
pub struct RevertedRender(pub Vec<String>);

impl Render for RevertedRender {
    fn schema_name(&self) -> &'static str {
        "confiture.migrate.down.v1"
    }

    fn to_text(&self) -> String {
        if self.0.is_empty() {
            return crate::output::muted("nothing to roll back");
        }
        let mut lines = vec![crate::output::heading("reverted migrations")];
        for slug in &self.0 {
            lines.push(format!("  {} {}", crate::output::warning("↩"), slug));
        }
        lines.join("\n")
    }

    fn csv_rows(&self) -> Vec<Vec<String>> {
        let mut rows = vec![vec!["slug".into()]];
        rows.extend(self.0.iter().map(|slug| vec![slug.clone()]));
        rows
    }
}

#[derive(Serialize)]
#[serde(transparent)]
pub struct StatusRender(pub StatusReport);

impl Render for StatusRender {
    fn schema_name(&self) -> &'static str {
        "confiture.migrate.status.v1"
    }

    fn to_text(&self) -> String {
        let mut lines = vec![crate::output::heading("migration status")];
        lines.push(format!("  applied:  {}", self.0.applied.len()));
        lines.push(format!("  pending:  {}", self.0.pending.len()));
        if !self.0.orphaned.is_empty() {
            lines.push(crate::output::warning(&format!(
                "  orphaned: {} (ledger row with no on-disk migration)",
                self.0.orphaned.len()
            )));
        }
        lines.join("\n")
    }

    fn csv_rows(&self) -> Vec<Vec<String>> {
        let mut rows = vec![vec!["slug".into(), "state".into()]];
        for slug in &self.0.applied {
            rows.push(vec![slug.clone(), "applied".into()]);
        }
        for slug in &self.0.pending {
            rows.push(vec![slug.clone(), "pending".into()]);
        }
        for slug in &self.0.orphaned {
            rows.push(vec![slug.clone(), "orphaned".into()]);
        }
        rows
    }
}

/// Runs any `prep`-tagged seeds (SPEC_FULL §B.2) before the migration
/// engine starts — they must land before the first migration so an
/// `AFTER_DDL` hook can read back reference data. Missing a seeds
/// directory entirely is not an error: not every project seeds data.
async fn apply_prep_seeds(config: &ConfitureConfig, client: &mut tokio_postgres::Client) -> Result<(), CliError> {
    let seeds = match load_seed_dir(Path::new(&config.seed.dir), &config.seed.prep_seeds) {
        Ok(seeds) => seeds,
        Err(confiture_migrate::SeedError::ReadDir(_, _)) => return Ok(()),
        Err(e) => return Err(e.into()),
    };
    let prep_seeds: Vec<confiture_migrate::SeedFile> = seeds.into_iter().filter(|s| s.prep).collect();
    if prep_seeds.is_empty() {
        return Ok(());
    }
    let violations = validate_prep_seeds(client, &prep_seeds).await?;
    if let Some(violation) = violations
        .iter()
        .find(|v| v.severity == confiture_migrate::ViolationSeverity::Error)
    {
        return Err(CliError::Seed(confiture_migrate::SeedError::PrepSeedMissingTable(
            violation.file.clone(),
            violation.table.clone(),
        )));
    }
    let ordered = seeding_order(&prep_seeds)?;
    apply_seeds(client, &ordered).await?;
    Ok(())
}

pub async fn up(
    config: &ConfitureConfig,
    target: Option<&str>,
    force: bool,
) -> Result<AppliedRender, CliError> {
    let migrations = load_migrations(Path::new(&config.migrate.dir))?;
    let mut client = db::connect(&config.connection.env_var).await?;
    apply_prep_seeds(config, &mut client).await?;
    let mut ctx = EngineContext::new();
    ctx.safety.force = force;
    let mut engine = MigrationEngine::new(&mut client, &ctx, std::env::var("USER").ok());
    let applied = engine.up(&migrations, target).await?;
    Ok(AppliedRender(applied))
}

#[derive(Serialize)]
#[serde(transparent)]
pub struct DryRunRender(pub Vec<confiture_safety::DryRunOutcome>);

impl Render for DryRunRender {
    fn schema_name(&self) -> &'static str {
        "confiture.migrate.dryrun.v1"
    }

    fn to_text(&self) -> String {
        if self.0.is_empty() {
            return crate::output::muted("nothing pending to dry-run");
        }
        let mut lines = vec![crate::output::heading("dry-run (rolled back)")];
        for outcome in &self.0 {
            let status = match &outcome.status {
                confiture_safety::DryRunStatus::Applied => crate::output::success("applied"),
                confiture_safety::DryRunStatus::Failed { message } => {
                    crate::output::error(&format!("failed: {message}"))
                }
                confiture_safety::DryRunStatus::Skipped { reason } => {
                    crate::output::warning(&format!("skipped: {reason}"))
                }
            };
            lines.push(format!("  {} — {}", outcome.object, status));
        }
        lines.join("\n")
    }

    fn csv_rows(&self) -> Vec<Vec<String>> {
        let mut rows = vec![vec!["object".into(), "statement".into(), "status".into()]];
        for outcome in &self.0 {
            let status = match &outcome.status {
                confiture_safety::DryRunStatus::Applied => "applied".to_string(),
                confiture_safety::DryRunStatus::Failed { message } => format!("failed: {message}"),
                confiture_safety::DryRunStatus::Skipped { reason } => format!("skipped: {reason}"),
            };
            rows.push(vec![outcome.object.clone(), outcome.statement.clone(), status]);
        }
        rows
    }
}

/// Runs every pending migration's forward SQL inside a transaction
/// guaranteed to roll back, instead of committing (spec §6 `--dry-run` /
/// `--dry-run-execute`, spec §4.4 `dry_run`).
pub async fn dry_run(config: &ConfitureConfig, target: Option<&str>) -> Result<DryRunRender, CliError> {
    let migrations = load_migrations(Path::new(&config.migrate.dir))?;
    let mut client = db::connect(&config.connection.env_var).await?;
    let ctx = EngineContext::new();
    let mut engine = MigrationEngine::new(&mut client, &ctx, None);
    let report = engine.status(&migrations).await?;

    let pending: Vec<&confiture_migrate::Migration> =
        migrations.iter().filter(|m| report.pending.contains(&m.slug)).collect();

    let mut outcomes = Vec::new();
    for migration in pending {
        outcomes.extend(engine.dry_run(migration).await?);
        if target == Some(migration.slug.as_str()) {
            break;
        }
    }
    Ok(DryRunRender(outcomes))
}

pub async fn down(config: &ConfitureConfig, steps: usize) -> Result<RevertedRender, CliError> {
    let migrations = load_migrations(Path::new(&config.migrate.dir))?;
    let mut client = db::connect(&config.connection.env_var).await?;
    let ctx = EngineContext::new();
    let mut engine = MigrationEngine::new(&mut client, &ctx, std::env::var("USER").ok());
    let reverted = engine.down(&migrations, steps).await?;
    Ok(RevertedRender(reverted))
}

pub async fn status(config: &ConfitureConfig) -> Result<StatusRender, CliError> {
    let migrations = load_migrations(Path::new(&config.migrate.dir))?;
    let mut client = db::connect(&config.connection.env_var).await?;
    let ctx = EngineContext::new();
    let engine = MigrationEngine::new(&mut client, &ctx, None);
    let report = engine.status(&migrations).await?;
    Ok(StatusRender(report))
}

#[derive(Serialize)]
pub struct DiffRender {
    pub change_count: usize,
    pub max_risk: Option<String>,
    pub statements: Vec<String>,
}

impl Render for DiffRender {
    fn schema_name(&self) -> &'static str {
        "confiture.migrate.diff.v1"
    }

    fn to_text(&self) -> String {
        if self.statements.is_empty() {
            return crate::output::muted("schemas are already equivalent");
        }
        let mut lines = vec![crate::output::heading(&format!(
            "{} change(s), max risk: {}",
            self.change_count,
            self.max_risk.as_deref().unwrap_or("safe")
        ))];
        lines.extend(self.statements.iter().map(|s| format!("  {s}")));
        lines.join("\n")
    }

    fn csv_rows(&self) -> Vec<Vec<String>> {
        let mut rows = vec![vec!["statement".into()]];
        rows.extend(self.statements.iter().map(|s| vec![s.clone()]));
        rows
    }
}

/// Parses `from`/`to` as DDL-tree roots and diffs the resulting schema
/// states (spec §4.2). Live-database endpoints are reached the same way
/// `build --from db` is (see `commands::build::Source`).
pub async fn diff(
    config: &ConfitureConfig,
    from: &str,
    to: &str,
) -> Result<DiffRender, CliError> {
    let from_state = match from.parse::<crate::commands::build::Source>()? {
        crate::commands::build::Source::Dir(root) => {
            confiture_schema::parse_tree(Path::new(&root), &config.schema.load_order)?
        }
        crate::commands::build::Source::Db => {
            let client = db::connect(&config.connection.env_var).await?;
            confiture_schema::introspect(&client).await?
        }
    };
    let to_state = match to.parse::<crate::commands::build::Source>()? {
        crate::commands::build::Source::Dir(root) => {
            confiture_schema::parse_tree(Path::new(&root), &config.schema.load_order)?
        }
        crate::commands::build::Source::Db => {
            let client = db::connect(&config.connection.env_var).await?;
            confiture_schema::introspect(&client).await?
        }
    };

    let change_set = confiture_diff::diff(&from_state, &to_state);
    Ok(DiffRender {
        change_count: change_set.changes.len(),
        max_risk: change_set.max_risk().map(|r| r.to_string()),
        statements: change_set
            .forward_sql_statements()
            .into_iter()
            .map(str::to_string)
            .collect(),
    })
}

#[derive(Serialize)]
pub struct ValidateRender {
    pub findings: Vec<String>,
}

impl Render for ValidateRender {
    fn schema_name(&self) -> &'static str {
        "confiture.migrate.validate.v1"
    }

    fn to_text(&self) -> String {
        if self.findings.is_empty() {
            return crate::output::success("all migrations are idempotent");
        }
        let mut lines = vec![crate::output::warning("idempotency findings:")];
        lines.extend(self.findings.iter().map(|f| format!("  {f}")));
        lines.join("\n")
    }

    fn csv_rows(&self) -> Vec<Vec<String>> {
        let mut rows = vec![vec!["finding".into()]];
        rows.extend(self.findings.iter().map(|f| vec![f.clone()]));
        rows
    }
}

/// Runs the Idempotency Validator (spec §4.5 analyser 1) over every
/// on-disk migration's forward SQL, whether or not it carries a
/// `ChangeSet` — each statement is wrapped as a synthetic, opaque change so
/// the same whitelist of non-idempotent patterns applies uniformly.
pub fn validate(config: &ConfitureConfig) -> Result<ValidateRender, CliError> {
    let migrations = load_migrations(Path::new(&config.migrate.dir))?;
    let mut findings = Vec::new();
    for migration in &migrations {
        let changes = match &migration.change_set {
            Some(cs) => cs.changes.clone(),
            None => vec![confiture_diff::Change {
                kind: confiture_diff::ChangeKind::AlterObjectBody,
                object: confiture_core::ObjectKey::new(
                    confiture_core::ObjectKind::Table,
                    "public",
                    migration.slug.clone(),
                    None,
                ),
                forward_sql: migration.forward_sql.clone(),
                inverse_sql: migration.inverse_sql.clone(),
                risk: confiture_diff::RiskClass::Locking,
                depends_on: Vec::new(),
                estimated_duration_ms: None,
            }],
        };
        for finding in confiture_safety::check_idempotency(&changes) {
            findings.push(format!("{}: {}", migration.slug, finding.message));
        }
    }
    Ok(ValidateRender { findings })
}
