//! `EngineContext` — the explicit, constructed-once value threaded through
//! every operation, replacing the module-level global registries the source
//! material relies on (spec §9 "Global registries").

use crate::hooks::HookRegistry;
use std::time::Duration;

/// Severity a `Finding` may carry; configuration decides which severities
/// are fatal to a run (spec §4.5).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// Which severities abort a run. Constructed from `confiture.toml`.
#[derive(Clone, Debug)]
pub struct SafetyPolicy {
    pub fatal_severities: Vec<Severity>,
    pub force: bool,
}

impl Default for SafetyPolicy {
    fn default() -> Self {
        Self {
            fatal_severities: vec![Severity::Error],
            force: false,
        }
    }
}

impl SafetyPolicy {
    pub fn is_fatal(&self, severity: Severity) -> bool {
        !self.force && self.fatal_severities.contains(&severity)
    }
}

/// Engine-wide configuration and shared, explicit state. One instance is
/// built at program entry and passed by reference into every component
/// operation (schema build, diff, migrate, sync, coordinate).
pub struct EngineContext {
    pub hooks: HookRegistry,
    pub safety: SafetyPolicy,
    pub advisory_lock_key: i64,
    pub hook_default_timeout: Duration,
}

impl EngineContext {
    pub fn new() -> Self {
        Self {
            hooks: HookRegistry::new(),
            safety: SafetyPolicy::default(),
            // Arbitrary but fixed 63-bit constant identifying the Confiture
            // advisory lock namespace; chosen once and never reused for any
            // other purpose so unrelated `pg_advisory_lock` callers never
            // collide with the engine.
            advisory_lock_key: 0x436f_6e66_6974_75i64,
            hook_default_timeout: HookRegistry::default_timeout(),
        }
    }

    pub fn with_safety(mut self, policy: SafetyPolicy) -> Self {
        self.safety = policy;
        self
    }
}

impl Default for EngineContext {
    fn default() -> Self {
        Self::new()
    }
}
