//! `confiture.toml` loading (SPEC_FULL §A.3), mirroring the teacher's
//! `drizzle.toml` lookup: the working directory and its parents are probed
//! in order, and a missing file falls back to defaults rather than erroring
//! outright.

use serde::Deserialize;
use std::path::{Path, PathBuf};

const CONFIG_FILE_NAME: &str = "confiture.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {0}: {1}")]
    Io(PathBuf, std::io::Error),
    #[error("failed to parse {0}: {1}")]
    Parse(PathBuf, toml::de::Error),
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct SchemaConfig {
    pub root: String,
    pub load_order: Vec<String>,
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            root: "schema".to_string(),
            load_order: vec!["**/*.sql".to_string()],
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Name of the environment variable holding the connection string.
    /// Never an inline credential (SPEC_FULL §A.3).
    pub env_var: String,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            env_var: "DATABASE_URL".to_string(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct MigrateConfig {
    pub dir: String,
}

impl Default for MigrateConfig {
    fn default() -> Self {
        Self {
            dir: "migrations".to_string(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct SeedConfig {
    pub dir: String,
    pub prep_seeds: Vec<String>,
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            dir: "seeds".to_string(),
            prep_seeds: Vec::new(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct AnonymisationConfig {
    pub policy_path: String,
    pub source_env_var: String,
    pub target_env_var: String,
}

impl Default for AnonymisationConfig {
    fn default() -> Self {
        Self {
            policy_path: "anonymisation.toml".to_string(),
            source_env_var: "CONFITURE_SOURCE_URL".to_string(),
            target_env_var: "CONFITURE_TARGET_URL".to_string(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct CoordinationConfig {
    /// Which granularity conflicts are detected at; fixed once at registry
    /// initialisation (spec §9 open question, decided in DESIGN.md).
    pub granularity: String,
    pub ttl_seconds: u64,
}

impl Default for CoordinationConfig {
    fn default() -> Self {
        Self {
            granularity: "column".to_string(),
            ttl_seconds: 4 * 60 * 60,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Default)]
#[serde(default)]
pub struct ConfitureConfig {
    pub schema: SchemaConfig,
    pub connection: ConnectionConfig,
    pub migrate: MigrateConfig,
    pub seed: SeedConfig,
    pub anonymisation: AnonymisationConfig,
    pub coordination: CoordinationConfig,
}

impl ConfitureConfig {
    pub fn load(explicit_path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit_path {
            return Self::load_from(path);
        }
        match find_config_file(&std::env::current_dir().unwrap_or_default()) {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse(path.to_path_buf(), e))
    }
}

fn find_config_file(start: &Path) -> Option<PathBuf> {
    let mut dir = Some(start);
    while let Some(current) = dir {
        let candidate = current.join(CONFIG_FILE_NAME);
        if candidate.exists() {
            return Some(candidate);
        }
        dir = current.parent();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = ConfitureConfig::load(Some(&dir.path().join("nonexistent.toml")));
        assert!(config.is_err());
    }

    #[test]
    fn no_explicit_path_and_no_file_in_tree_uses_defaults() {
        // find_config_file walking from a fresh tempdir with no ancestors
        // containing confiture.toml returns None, so load() must not error.
        let dir = tempfile::tempdir().unwrap();
        assert!(find_config_file(dir.path()).is_none());
    }

    #[test]
    fn parses_a_minimal_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "[migrate]\ndir = \"db/migrations\"\n").unwrap();
        let config = ConfitureConfig::load(Some(&path)).unwrap();
        assert_eq!(config.migrate.dir, "db/migrations");
        assert_eq!(config.schema.root, "schema");
    }
}
