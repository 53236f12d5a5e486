//! Loads `Migration`s from a directory tree: one subdirectory per migration,
//! named `<slug>`, containing `up.sql` and an optional `down.sql`.

use crate::model::Migration;
use confiture_core::{HookDescriptor, HookPhase};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum LoaderError {
    #[error("failed to read migrations directory {0}: {1}")]
    ReadDir(PathBuf, std::io::Error),
    #[error("migration {0} is missing up.sql")]
    MissingForward(String),
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed hooks.toml in {0}: {1}")]
    Hooks(PathBuf, toml::de::Error),
}

#[derive(Deserialize)]
struct HooksFile {
    #[serde(default)]
    hooks: Vec<HookEntry>,
}

#[derive(Deserialize)]
struct HookEntry {
    id: String,
    phase: String,
    #[serde(default)]
    config: serde_json::Value,
    timeout_seconds: Option<u64>,
}

/// Reads every subdirectory of `root`, sorted lexicographically by slug (the
/// standard `NNNN_description` numeric-prefix convention gives chronological
/// order for free).
pub fn load_migrations(root: &Path) -> Result<Vec<Migration>, LoaderError> {
    let mut slugs: Vec<PathBuf> = std::fs::read_dir(root)
        .map_err(|e| LoaderError::ReadDir(root.to_path_buf(), e))?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .collect();
    slugs.sort();

    slugs.into_iter().map(|dir| load_one(&dir)).collect()
}

fn load_one(dir: &Path) -> Result<Migration, LoaderError> {
    let slug = dir
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_string();

    let up_path = dir.join("up.sql");
    if !up_path.exists() {
        return Err(LoaderError::MissingForward(slug));
    }
    let forward_sql = std::fs::read_to_string(&up_path).map_err(|source| LoaderError::Io {
        path: up_path.clone(),
        source,
    })?;

    let down_path = dir.join("down.sql");
    let inverse_sql = if down_path.exists() {
        Some(
            std::fs::read_to_string(&down_path).map_err(|source| LoaderError::Io {
                path: down_path.clone(),
                source,
            })?,
        )
    } else {
        None
    };

    let hooks = load_hooks(dir)?;

    Ok(Migration::new(slug, forward_sql, inverse_sql).with_hooks(hooks))
}

fn load_hooks(dir: &Path) -> Result<Vec<HookDescriptor>, LoaderError> {
    let hooks_path = dir.join("hooks.toml");
    if !hooks_path.exists() {
        return Ok(Vec::new());
    }
    let contents = std::fs::read_to_string(&hooks_path).map_err(|source| LoaderError::Io {
        path: hooks_path.clone(),
        source,
    })?;
    let parsed: HooksFile =
        toml::from_str(&contents).map_err(|e| LoaderError::Hooks(hooks_path.clone(), e))?;

    Ok(parsed
        .hooks
        .into_iter()
        .map(|entry| HookDescriptor {
            id: entry.id,
            phase: parse_phase(&entry.phase),
            config: entry.config,
            timeout_override: entry.timeout_seconds.map(std::time::Duration::from_secs),
        })
        .collect())
}

fn parse_phase(s: &str) -> HookPhase {
    match s {
        "before_validation" => HookPhase::BeforeValidation,
        "before_ddl" => HookPhase::BeforeDdl,
        "after_ddl" => HookPhase::AfterDdl,
        "after_validation" => HookPhase::AfterValidation,
        "cleanup" => HookPhase::Cleanup,
        "on_error" => HookPhase::OnError,
        _ => HookPhase::BeforeDdl,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write(path: &Path, contents: &str) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        let mut f = std::fs::File::create(path).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
    }

    #[test]
    fn loads_migrations_in_slug_order() {
        let dir = tempfile::tempdir().unwrap();
        write(&dir.path().join("0002_add_index/up.sql"), "CREATE INDEX idx ON t (a);");
        write(&dir.path().join("0001_init/up.sql"), "CREATE TABLE t (id int);");
        write(&dir.path().join("0001_init/down.sql"), "DROP TABLE t;");

        let migrations = load_migrations(dir.path()).unwrap();
        assert_eq!(migrations.len(), 2);
        assert_eq!(migrations[0].slug, "0001_init");
        assert!(migrations[0].inverse_sql.is_some());
        assert!(migrations[1].inverse_sql.is_none());
    }

    #[test]
    fn missing_up_sql_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("0001_empty")).unwrap();

        let err = load_migrations(dir.path()).unwrap_err();
        assert!(matches!(err, LoaderError::MissingForward(_)));
    }
}
