//! Seed Applier & Seed Validator (spec §4.9).

use confiture_core::{topological_order, TableNode};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use tokio_postgres::Client;

#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    #[error("failed to read seed directory {0}: {1}")]
    ReadDir(PathBuf, std::io::Error),
    #[error("failed to read seed file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cyclic foreign-key dependency among seeded tables: {0:?}")]
    Cycle(Vec<String>),
    #[error("database error: {0}")]
    Database(#[from] tokio_postgres::Error),
    #[error("prep seed {0} references table {1}, which does not exist before migrations run")]
    PrepSeedMissingTable(String, String),
}

/// A single violation found by the Seed Validator (spec §4.9 report shape).
#[derive(Clone, Debug, Serialize)]
pub struct SeedViolation {
    pub file: String,
    pub line: usize,
    pub table: String,
    pub column: Option<String>,
    pub row_index: Option<usize>,
    pub kind: ViolationKind,
    pub severity: ViolationSeverity,
    pub message: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ViolationKind {
    ForeignKeyClosure,
    Uniqueness,
    NotNull,
    Completeness,
    CrossEnvironmentDivergence,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ViolationSeverity {
    Warning,
    Error,
}

/// A seed file: the table it populates, its declared FK dependencies (for
/// ordering), and whether it is a `prep` seed that must run before any
/// migration (SPEC_FULL §B.2).
#[derive(Clone, Debug)]
pub struct SeedFile {
    pub table: String,
    pub depends_on: Vec<String>,
    pub path: PathBuf,
    pub sql: String,
    pub prep: bool,
}

/// Orders seed files so that referenced tables are populated before the
/// tables that reference them.
pub fn seeding_order(seeds: &[SeedFile]) -> Result<Vec<&SeedFile>, SeedError> {
    let nodes: Vec<TableNode> = seeds
        .iter()
        .map(|s| TableNode {
            name: s.table.clone(),
            depends_on: s.depends_on.clone(),
        })
        .collect();
    let order = topological_order(&nodes).map_err(|e| SeedError::Cycle(e.0))?;

    let by_table: HashMap<&str, &SeedFile> = seeds.iter().map(|s| (s.table.as_str(), s)).collect();
    Ok(order
        .iter()
        .filter_map(|table| by_table.get(table.as_str()).copied())
        .collect())
}

/// Prep seeds must never reference a table that doesn't exist yet, since
/// they run strictly before any migration (SPEC_FULL §B.2).
pub async fn validate_prep_seeds(
    client: &Client,
    seeds: &[SeedFile],
) -> Result<Vec<SeedViolation>, SeedError> {
    let mut existing = HashSet::new();
    for row in client
        .query(
            "SELECT table_name FROM information_schema.tables WHERE table_schema = 'public'",
            &[],
        )
        .await?
    {
        existing.insert(row.get::<_, String>("table_name"));
    }

    let mut violations = Vec::new();
    for seed in seeds.iter().filter(|s| s.prep) {
        if !existing.contains(&seed.table) {
            violations.push(SeedViolation {
                file: seed.path.display().to_string(),
                line: 1,
                table: seed.table.clone(),
                column: None,
                row_index: None,
                kind: ViolationKind::Completeness,
                severity: ViolationSeverity::Error,
                message: format!(
                    "prep seed references table {} which does not exist pre-migration",
                    seed.table
                ),
            });
        }
    }
    Ok(violations)
}

/// Applies seed files in declared order after migrations are up to date.
pub async fn apply_seeds(client: &mut Client, seeds: &[&SeedFile]) -> Result<usize, SeedError> {
    let mut applied = 0;
    for seed in seeds {
        let tx = client.transaction().await?;
        tx.batch_execute(&seed.sql).await?;
        tx.commit().await?;
        applied += 1;
    }
    Ok(applied)
}

/// Reads every `.sql` file directly under `root`, treating the file stem as
/// the table name (e.g. `users.sql` seeds `users`). FK dependencies are not
/// recoverable from a raw SQL seed file, so callers that need an ordering
/// more precise than declaration order should populate `depends_on` from the
/// schema's `SchemaState` instead of this loader.
pub fn load_seed_dir(root: &Path, prep_tags: &[String]) -> Result<Vec<SeedFile>, SeedError> {
    let mut entries: Vec<PathBuf> = std::fs::read_dir(root)
        .map_err(|e| SeedError::ReadDir(root.to_path_buf(), e))?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("sql"))
        .collect();
    entries.sort();

    entries
        .into_iter()
        .map(|path| {
            let table = path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or_default()
                .to_string();
            let sql = std::fs::read_to_string(&path).map_err(|source| SeedError::Io {
                path: path.clone(),
                source,
            })?;
            let prep = prep_tags.iter().any(|t| t == &table);
            Ok(SeedFile {
                table,
                depends_on: Vec::new(),
                path,
                sql,
                prep,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seed(table: &str, deps: &[&str]) -> SeedFile {
        SeedFile {
            table: table.to_string(),
            depends_on: deps.iter().map(|s| s.to_string()).collect(),
            path: PathBuf::from(format!("{table}.sql")),
            sql: format!("INSERT INTO {table} DEFAULT VALUES;"),
            prep: false,
        }
    }

    #[test]
    fn orders_by_fk_dependency() {
        let seeds = vec![seed("orders", &["users"]), seed("users", &[])];
        let ordered = seeding_order(&seeds).unwrap();
        assert_eq!(ordered[0].table, "users");
        assert_eq!(ordered[1].table, "orders");
    }

    #[test]
    fn cycle_is_reported() {
        let seeds = vec![seed("a", &["b"]), seed("b", &["a"])];
        assert!(matches!(seeding_order(&seeds), Err(SeedError::Cycle(_))));
    }
}
