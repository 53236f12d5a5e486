//! `confiture lint` — runs the Schema Linter and Idempotency Validator over
//! the diff between the on-disk schema tree and a connected environment
//! (spec §6, §4.5).

use crate::config::ConfitureConfig;
use crate::db;
use crate::error::CliError;
use confiture_core::Render;
use confiture_safety::{LintRegistry, LintSeverity, SafetyReport};
use serde::Serialize;
use std::path::Path;

#[derive(Serialize)]
pub struct LintRender {
    pub idempotency_count: usize,
    pub lint_count: usize,
    pub has_errors: bool,
    pub findings: Vec<String>,
}

impl Render for LintRender {
    fn schema_name(&self) -> &'static str {
        "confiture.lint.v1"
    }

    fn to_text(&self) -> String {
        if self.findings.is_empty() {
            return crate::output::success("no lint findings");
        }
        let mut lines = vec![crate::output::heading(&format!(
            "{} finding(s)",
            self.findings.len()
        ))];
        lines.extend(self.findings.iter().map(|f| format!("  {f}")));
        lines.join("\n")
    }

    fn csv_rows(&self) -> Vec<Vec<String>> {
        let mut rows = vec![vec!["finding".into()]];
        rows.extend(self.findings.iter().map(|f| vec![f.clone()]));
        rows
    }
}

pub async fn run(config: &ConfitureConfig, env: Option<&str>) -> Result<LintRender, CliError> {
    let current = confiture_schema::parse_tree(Path::new(&config.schema.root), &config.schema.load_order)?;
    let target = match env {
        Some(env_var) => {
            let client = db::connect(env_var).await?;
            confiture_schema::introspect(&client).await?
        }
        None => {
            let client = db::connect(&config.connection.env_var).await?;
            confiture_schema::introspect(&client).await?
        }
    };

    let change_set = confiture_diff::diff(&target, &current);
    let registry = LintRegistry::with_builtins();
    let report = SafetyReport::evaluate(&change_set, &registry);

    let mut findings = Vec::new();
    for finding in &report.idempotency {
        findings.push(format!("idempotency: {}", finding.message));
    }
    for finding in &report.lint {
        findings.push(format!(
            "{} [{}] {}: {}",
            finding.rule,
            match finding.severity {
                LintSeverity::Warning => "warning",
                LintSeverity::Error => "error",
            },
            finding.object,
            finding.message
        ));
    }

    let has_errors = report
        .lint
        .iter()
        .any(|f| f.severity == LintSeverity::Error);

    Ok(LintRender {
        idempotency_count: report.idempotency.len(),
        lint_count: report.lint.len(),
        has_errors,
        findings,
    })
}
