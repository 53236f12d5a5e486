//! The safety pipeline (spec §4.3): idempotency validation, linting, impact
//! analysis, and dry-run execution over a diff's `ChangeSet`.

pub mod dryrun;
pub mod error;
pub mod idempotency;
pub mod impact;
pub mod lint;

pub use dryrun::{dry_run, DryRunOutcome, DryRunStatus};
pub use error::{Result, SafetyError};
pub use idempotency::{check as check_idempotency, IdempotencyFinding};
pub use impact::{analyse as analyse_impact, ImpactReport, LockClass};
pub use lint::{LintFinding, LintRegistry, LintRule, LintSeverity};

use confiture_core::{ConfitureError, SafetyPolicy, Severity};
use confiture_diff::ChangeSet;
use serde::Serialize;

/// The combined, static (no-database-required) portion of the safety
/// pipeline: idempotency checks plus lint rules. Impact analysis and
/// dry-run execution need a live connection and are invoked separately.
#[derive(Clone, Debug, Serialize)]
pub struct SafetyReport {
    pub idempotency: Vec<IdempotencyFinding>,
    pub lint: Vec<LintFinding>,
}

impl SafetyReport {
    pub fn evaluate(changes: &ChangeSet, registry: &LintRegistry) -> Self {
        Self {
            idempotency: check_idempotency(&changes.changes),
            lint: registry.run(&changes.changes),
        }
    }

    pub fn has_fatal(&self, policy: &SafetyPolicy) -> bool {
        let lint_fatal = self.lint.iter().any(|f| {
            let severity = match f.severity {
                LintSeverity::Warning => Severity::Warning,
                LintSeverity::Error => Severity::Error,
            };
            policy.is_fatal(severity)
        });
        let idempotency_fatal = !self.idempotency.is_empty() && policy.is_fatal(Severity::Warning);
        lint_fatal || idempotency_fatal
    }

    /// Returns `Err` if the report is fatal under `policy`; `policy.force`
    /// already disables every fatal severity, so `has_fatal` alone decides
    /// (spec §4.3 gate semantics).
    pub fn enforce(&self, policy: &SafetyPolicy) -> std::result::Result<(), ConfitureError> {
        if self.has_fatal(policy) {
            let count = self.lint.iter().filter(|f| f.severity == LintSeverity::Error).count()
                + self.idempotency.len();
            return Err(ConfitureError::Safety(count.max(1)));
        }
        Ok(())
    }
}
