//! Hook lifecycle types (spec §3 `HookDescriptor`, §9 "hook plugins").
//!
//! Hooks are modeled as an explicit trait object, never as implicit
//! filesystem discovery: a hook type is either built in or registered once
//! at program start via [`HookRegistry::register`]. Hook signatures are
//! plain synchronous functions — the spec's source material uses an async
//! illusion that never actually suspends (§9 "Async illusion in the
//! source"); this crate does not repeat that mistake.

use crate::error::Result;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

/// Total order of hook phases within a single migration (spec §3).
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum HookPhase {
    BeforeValidation,
    BeforeDdl,
    AfterDdl,
    AfterValidation,
    Cleanup,
    OnError,
}

impl fmt::Display for HookPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            HookPhase::BeforeValidation => "before_validation",
            HookPhase::BeforeDdl => "before_ddl",
            HookPhase::AfterDdl => "after_ddl",
            HookPhase::AfterValidation => "after_validation",
            HookPhase::Cleanup => "cleanup",
            HookPhase::OnError => "on_error",
        };
        f.write_str(s)
    }
}

/// A named side effect bound to a migration phase (spec §3
/// `HookDescriptor`).
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct HookDescriptor {
    pub id: String,
    pub phase: HookPhase,
    pub config: Value,
    /// Per-hook override of the default 30s budget. The effective timeout
    /// is always `min(default, override)` (spec §9's fixed policy for the
    /// ambiguous timeout behaviour in the source material).
    pub timeout_override: Option<Duration>,
}

/// What a hook invocation reports back to the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookOutcome {
    Ok,
    /// The hook ran but wants the migration aborted even though it didn't
    /// itself error (used rarely; most hooks signal failure via `Err`).
    Abort(String),
}

/// The synchronous side-effect contract every hook implementation satisfies.
///
/// `execute` runs inside its own savepoint (spec §3 invariant); a hook must
/// not attempt to manage its own transaction boundary.
pub trait Hook: Send + Sync {
    fn kind(&self) -> &'static str;
    fn execute(&self, descriptor: &HookDescriptor, context: &HookContext<'_>) -> Result<HookOutcome>;
}

/// Read-only context handed to a hook: the migration slug currently
/// executing and arbitrary key/value scratch data set by earlier hooks in
/// the same run.
pub struct HookContext<'a> {
    pub migration_slug: &'a str,
    pub scratch: &'a HashMap<String, Value>,
}

/// Explicit registry of hook implementations, replacing the module-level
/// global registries of the source material (spec §9 "Global registries").
/// Constructed once at program entry point and threaded through every
/// operation via [`crate::context::EngineContext`].
#[derive(Default)]
pub struct HookRegistry {
    hooks: HashMap<&'static str, Box<dyn Hook>>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, hook: Box<dyn Hook>) {
        self.hooks.insert(hook.kind(), hook);
    }

    pub fn get(&self, kind: &str) -> Option<&dyn Hook> {
        self.hooks.get(kind).map(|b| b.as_ref())
    }

    pub fn default_timeout() -> Duration {
        Duration::from_secs(30)
    }

    /// Effective timeout per spec §9's fixed policy.
    pub fn effective_timeout(descriptor: &HookDescriptor) -> Duration {
        match descriptor.timeout_override {
            Some(override_timeout) => Self::default_timeout().min(override_timeout),
            None => Self::default_timeout(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn effective_timeout_takes_the_minimum() {
        let short = HookDescriptor {
            id: "x".into(),
            phase: HookPhase::BeforeDdl,
            config: Value::Null,
            timeout_override: Some(Duration::from_secs(5)),
        };
        assert_eq!(HookRegistry::effective_timeout(&short), Duration::from_secs(5));

        let long = HookDescriptor {
            id: "y".into(),
            phase: HookPhase::BeforeDdl,
            config: Value::Null,
            timeout_override: Some(Duration::from_secs(60)),
        };
        assert_eq!(HookRegistry::effective_timeout(&long), Duration::from_secs(30));

        let unset = HookDescriptor {
            id: "z".into(),
            phase: HookPhase::BeforeDdl,
            config: Value::Null,
            timeout_override: None,
        };
        assert_eq!(HookRegistry::effective_timeout(&unset), Duration::from_secs(30));
    }
}
