//! Schema Linter: a fixed set of built-in rules plus an extension point for
//! project-specific rules, run over every `Change` in a set.

use confiture_diff::{Change, ChangeKind};
use serde::Serialize;
use std::collections::HashMap;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum LintSeverity {
    Warning,
    Error,
}

#[derive(Clone, Debug, Serialize)]
pub struct LintFinding {
    pub rule: &'static str,
    pub severity: LintSeverity,
    pub object: String,
    pub message: String,
}

/// A single lint rule. Built-in rules and project-supplied rules implement
/// the same trait, so a caller can register additional rules without
/// touching this crate.
pub trait LintRule: Send + Sync {
    fn id(&self) -> &'static str;
    fn check(&self, change: &Change) -> Option<LintFinding>;
}

pub struct LintRegistry {
    rules: HashMap<&'static str, Box<dyn LintRule>>,
}

impl LintRegistry {
    pub fn with_builtins() -> Self {
        let mut registry = Self {
            rules: HashMap::new(),
        };
        registry.register(Box::new(NoDropTableRule));
        registry.register(Box::new(NoDropColumnRule));
        registry.register(Box::new(MissingNotValidRule));
        registry.register(Box::new(NonConcurrentIndexRule));
        registry
    }

    pub fn register(&mut self, rule: Box<dyn LintRule>) {
        self.rules.insert(rule.id(), rule);
    }

    pub fn run(&self, changes: &[Change]) -> Vec<LintFinding> {
        changes
            .iter()
            .flat_map(|change| self.rules.values().filter_map(move |rule| rule.check(change)))
            .collect()
    }
}

struct NoDropTableRule;
impl LintRule for NoDropTableRule {
    fn id(&self) -> &'static str {
        "no-drop-table"
    }
    fn check(&self, change: &Change) -> Option<LintFinding> {
        (change.kind == ChangeKind::DropTable).then(|| LintFinding {
            rule: self.id(),
            severity: LintSeverity::Error,
            object: change.object.qualified_name(),
            message: "dropping a table is irreversible data loss".to_string(),
        })
    }
}

struct NoDropColumnRule;
impl LintRule for NoDropColumnRule {
    fn id(&self) -> &'static str {
        "no-drop-column"
    }
    fn check(&self, change: &Change) -> Option<LintFinding> {
        (change.kind == ChangeKind::DropColumn).then(|| LintFinding {
            rule: self.id(),
            severity: LintSeverity::Warning,
            object: change.object.qualified_name(),
            message: "dropping a column discards its data".to_string(),
        })
    }
}

struct MissingNotValidRule;
impl LintRule for MissingNotValidRule {
    fn id(&self) -> &'static str {
        "constraint-should-be-not-valid"
    }
    fn check(&self, change: &Change) -> Option<LintFinding> {
        if change.kind != ChangeKind::AddConstraint {
            return None;
        }
        let upper = change.forward_sql.to_ascii_uppercase();
        let needs_validation = upper.contains("FOREIGN KEY") || upper.contains("CHECK");
        (needs_validation && !upper.contains("NOT VALID")).then(|| LintFinding {
            rule: self.id(),
            severity: LintSeverity::Warning,
            object: change.object.qualified_name(),
            message: "add as NOT VALID and VALIDATE CONSTRAINT separately to avoid a full \
                      table scan under lock"
                .to_string(),
        })
    }
}

struct NonConcurrentIndexRule;
impl LintRule for NonConcurrentIndexRule {
    fn id(&self) -> &'static str {
        "index-should-be-concurrent"
    }
    fn check(&self, change: &Change) -> Option<LintFinding> {
        if change.kind != ChangeKind::CreateIndex {
            return None;
        }
        let upper = change.forward_sql.to_ascii_uppercase();
        (!upper.contains("CONCURRENTLY")).then(|| LintFinding {
            rule: self.id(),
            severity: LintSeverity::Warning,
            object: change.object.qualified_name(),
            message: "CREATE INDEX without CONCURRENTLY takes a write lock for the build \
                      duration"
                .to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use confiture_core::{ObjectKey, ObjectKind};
    use confiture_diff::RiskClass;

    fn change(kind: ChangeKind, forward: &str) -> Change {
        Change {
            kind,
            object: ObjectKey::new(ObjectKind::Table, "public", "t", None),
            forward_sql: forward.to_string(),
            inverse_sql: None,
            risk: RiskClass::Safe,
            depends_on: Vec::new(),
            estimated_duration_ms: None,
        }
    }

    #[test]
    fn drop_table_is_flagged_as_error() {
        let registry = LintRegistry::with_builtins();
        let findings = registry.run(&[change(ChangeKind::DropTable, "DROP TABLE t;")]);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, LintSeverity::Error);
    }

    #[test]
    fn concurrent_index_passes() {
        let registry = LintRegistry::with_builtins();
        let findings = registry.run(&[change(
            ChangeKind::CreateIndex,
            "CREATE INDEX CONCURRENTLY t_idx ON t (id);",
        )]);
        assert!(findings.is_empty());
    }
}
