//! `confiture seed {apply,validate}` (spec §6, §4.9).

use crate::config::ConfitureConfig;
use crate::db;
use crate::error::CliError;
use confiture_core::Render;
use confiture_migrate::{apply_seeds, load_seed_dir, seeding_order, validate_prep_seeds};
use serde::Serialize;
use std::path::Path;

#[derive(Serialize)]
pub struct ApplyRender {
    pub tables_seeded: usize,
}

impl Render for ApplyRender {
    fn schema_name(&self) -> &'static str {
        "confiture.seed.apply.v1"
    }

    fn to_text(&self) -> String {
        format!(
            "{} ({} table(s))",
            crate::output::success("seeds applied"),
            self.tables_seeded
        )
    }
}

pub async fn apply(config: &ConfitureConfig, seeds_dir: Option<&str>) -> Result<ApplyRender, CliError> {
    let dir = seeds_dir.unwrap_or(&config.seed.dir);
    let seeds = load_seed_dir(Path::new(dir), &config.seed.prep_seeds)?;
    let ordered = seeding_order(&seeds)?;
    let mut client = db::connect(&config.connection.env_var).await?;
    let tables_seeded = apply_seeds(&mut client, &ordered).await?;
    Ok(ApplyRender { tables_seeded })
}

#[derive(Serialize)]
pub struct ValidateRender {
    pub violations: Vec<String>,
}

impl Render for ValidateRender {
    fn schema_name(&self) -> &'static str {
        "confiture.seed.validate.v1"
    }

    fn to_text(&self) -> String {
        if self.violations.is_empty() {
            return crate::output::success("no seed violations found");
        }
        let mut lines = vec![crate::output::warning("seed violations:")];
        lines.extend(self.violations.iter().map(|v| format!("  {v}")));
        lines.join("\n")
    }

    fn csv_rows(&self) -> Vec<Vec<String>> {
        let mut rows = vec![vec!["violation".into()]];
        rows.extend(self.violations.iter().map(|v| vec![v.clone()]));
        rows
    }
}

/// Runs the Seed Validator's prep-seed check (SPEC_FULL §B.2); the other
/// four violation kinds (FK closure, uniqueness, NOT NULL, completeness,
/// spec §4.9) require row-level data from a connected target and are left
/// for the full `confiture seed validate --consistency-check` path once a
/// target is configured.
pub async fn validate(config: &ConfitureConfig, seeds_dir: Option<&str>) -> Result<ValidateRender, CliError> {
    let dir = seeds_dir.unwrap_or(&config.seed.dir);
    let seeds = load_seed_dir(Path::new(dir), &config.seed.prep_seeds)?;
    let client = db::connect(&config.connection.env_var).await?;
    let violations = validate_prep_seeds(&client, &seeds)
        .await?
        .into_iter()
        .map(|v| format!("{} ({}): {}", v.file, v.table, v.message))
        .collect();
    Ok(ValidateRender { violations })
}
