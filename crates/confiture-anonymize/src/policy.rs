//! Anonymisation policy: the declarative transformation plan (spec §3
//! `AnonymisationPolicy`, §4.6 policy loader).

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;

#[derive(Debug, thiserror::Error)]
pub enum PolicyError {
    #[error("failed to read policy file {0}: {1}")]
    Io(std::path::PathBuf, std::io::Error),
    #[error("failed to parse policy file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("rule for {table}.{column} uses unknown strategy {strategy:?}")]
    UnknownStrategy { table: String, column: String, strategy: String },
    #[error("seed env var {0} is not set for column {1}.{2}")]
    MissingSeed(String, String, String),
    #[error("no seed resolved for {table}.{column}: no column-specific or global seed configured")]
    NoSeed { table: String, column: String },
}

pub type Result<T> = std::result::Result<T, PolicyError>;

/// The whitelist of strategy directive names a policy file may reference
/// (spec §4.6). Anything outside this set is rejected at load time — the
/// registry never executes user-supplied code.
pub const STRATEGY_WHITELIST: &[&str] = &[
    "hash",
    "email_mask",
    "phone_mask",
    "pattern_mask",
    "redact",
    "conditional",
    "none",
];

/// One `table.column -> strategy` binding, with an optional seed override
/// and, for `pattern_mask`/`conditional`, a strategy-specific parameter
/// blob.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PolicyRule {
    pub table: String,
    pub column: String,
    pub strategy: String,
    #[serde(default)]
    pub seed_env: Option<String>,
    #[serde(default)]
    pub params: toml::value::Table,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct RawPolicy {
    global_seed_env: String,
    rule: Vec<PolicyRule>,
}

/// A validated, loaded anonymisation policy.
#[derive(Clone, Debug)]
pub struct AnonymisationPolicy {
    pub global_seed_env: String,
    pub rules: Vec<PolicyRule>,
    /// SHA-256 over the canonical (sorted, re-serialised) policy, recorded
    /// in every audit entry produced under this policy (spec §3 invariant).
    pub integrity_hash: [u8; 32],
}

impl AnonymisationPolicy {
    /// Parses and validates a policy document, rejecting any strategy name
    /// outside [`STRATEGY_WHITELIST`].
    pub fn parse(toml_source: &str) -> Result<Self> {
        let mut raw: RawPolicy = toml::from_str(toml_source)?;
        raw.rule.sort_by(|a, b| (&a.table, &a.column).cmp(&(&b.table, &b.column)));

        for rule in &raw.rule {
            if !STRATEGY_WHITELIST.contains(&rule.strategy.as_str()) {
                return Err(PolicyError::UnknownStrategy {
                    table: rule.table.clone(),
                    column: rule.column.clone(),
                    strategy: rule.strategy.clone(),
                });
            }
        }

        let canonical = toml::to_string(&raw).expect("validated policy always reserialises");
        let mut hasher = Sha256::new();
        hasher.update(canonical.as_bytes());
        let digest = hasher.finalize();
        let mut integrity_hash = [0u8; 32];
        integrity_hash.copy_from_slice(&digest);

        Ok(Self {
            global_seed_env: raw.global_seed_env,
            rules: raw.rule,
            integrity_hash,
        })
    }

    pub fn integrity_hash_hex(&self) -> String {
        hex::encode(self.integrity_hash)
    }

    pub fn rules_for<'a>(&'a self, table: &'a str) -> impl Iterator<Item = &'a PolicyRule> + 'a {
        self.rules.iter().filter(move |r| r.table == table)
    }
}

/// Resolves every seed-dependent rule's plaintext seed from the process
/// environment, precedence `column-specific > global > error` (spec §4.6).
/// The resolved seeds are handed to the strategy registry directly; callers
/// must not log the returned map.
pub fn resolve_seeds(policy: &AnonymisationPolicy) -> Result<HashMap<(String, String), String>> {
    let global = std::env::var(&policy.global_seed_env).ok();

    let mut resolved = HashMap::new();
    for rule in &policy.rules {
        if !strategy_needs_seed(&rule.strategy) {
            continue;
        }
        let seed = if let Some(env_name) = &rule.seed_env {
            std::env::var(env_name).map_err(|_| {
                PolicyError::MissingSeed(env_name.clone(), rule.table.clone(), rule.column.clone())
            })?
        } else if let Some(global) = &global {
            global.clone()
        } else {
            return Err(PolicyError::NoSeed {
                table: rule.table.clone(),
                column: rule.column.clone(),
            });
        };
        resolved.insert((rule.table.clone(), rule.column.clone()), seed);
    }
    Ok(resolved)
}

fn strategy_needs_seed(strategy: &str) -> bool {
    matches!(strategy, "hash")
}

#[cfg(test)]
mod tests {
    use super::*;

    const POLICY: &str = r#"
global_seed_env = "AN_SEED"

[[rule]]
table = "users"
column = "id"
strategy = "hash"

[[rule]]
table = "users"
column = "email"
strategy = "email_mask"
"#;

    #[test]
    fn rejects_unknown_strategy() {
        let bad = r#"
global_seed_env = "AN_SEED"

[[rule]]
table = "users"
column = "ssn"
strategy = "encrypt_with_my_totally_safe_cipher"
"#;
        assert!(matches!(
            AnonymisationPolicy::parse(bad),
            Err(PolicyError::UnknownStrategy { .. })
        ));
    }

    #[test]
    fn integrity_hash_is_stable_across_rule_order() {
        let a = AnonymisationPolicy::parse(POLICY).unwrap();
        let reordered = r#"
global_seed_env = "AN_SEED"

[[rule]]
table = "users"
column = "email"
strategy = "email_mask"

[[rule]]
table = "users"
column = "id"
strategy = "hash"
"#;
        let b = AnonymisationPolicy::parse(reordered).unwrap();
        assert_eq!(a.integrity_hash, b.integrity_hash);
    }

    #[test]
    fn seed_resolution_precedence() {
        std::env::set_var("AN_SEED", "global-seed");
        let policy = AnonymisationPolicy::parse(POLICY).unwrap();
        let seeds = resolve_seeds(&policy).unwrap();
        assert_eq!(
            seeds.get(&("users".to_string(), "id".to_string())),
            Some(&"global-seed".to_string())
        );
        std::env::remove_var("AN_SEED");
    }

    #[test]
    fn missing_seed_is_an_error() {
        std::env::remove_var("AN_SEED");
        let policy = AnonymisationPolicy::parse(POLICY).unwrap();
        assert!(matches!(resolve_seeds(&policy), Err(PolicyError::NoSeed { .. })));
    }
}
