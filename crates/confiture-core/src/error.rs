//! The error taxonomy of spec §7, shared across crates so that the CLI can
//! map any failure to an exit code and a structured record without knowing
//! which component raised it.

use thiserror::Error;

/// A source location inside a DDL or seed file, attached to `ParseError` and
/// `ValidationError` findings.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SourceLocation {
    pub file: String,
    pub line: usize,
}

impl std::fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// The full taxonomy of spec §7's error table. Individual crates define
/// narrower, `#[from]`-convertible error enums for their own concern and
/// convert into this one at the boundary the CLI consumes.
#[derive(Error, Debug)]
pub enum ConfitureError {
    #[error("parse error at {location}: {message}")]
    Parse {
        location: SourceLocation,
        message: String,
    },

    #[error(
        "fingerprint mismatch: expected {expected}, got {actual} after applying forward SQL"
    )]
    FingerprintMismatch { expected: String, actual: String },

    #[error("checksum mismatch for migration {slug}: forward SQL changed since it was applied")]
    ChecksumMismatch { slug: String },

    #[error("safety check failed with {0} fatal finding(s)")]
    Safety(usize),

    #[error("hook {hook} failed in phase {phase}: {message}")]
    Hook {
        hook: String,
        phase: String,
        message: String,
    },

    #[error("dry run failed on statement {statement_index}: {message}")]
    DryRun {
        statement_index: usize,
        message: String,
    },

    #[error("{0} conflicting intent(s) registered against the same objects")]
    Conflict(usize),

    #[error("anonymisation failed: policy {policy_hash}, batch {batch_index}, strategy {strategy}: {message}")]
    Anonymisation {
        policy_hash: String,
        batch_index: usize,
        strategy: String,
        message: String,
    },

    #[error("audit chain broken at sequence {sequence}")]
    AuditVerification { sequence: u64 },

    #[error("validation failed with {0} violation(s)")]
    Validation(usize),

    #[error("database error: {0}")]
    Database(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConfitureError {
    /// Maps an error to the process exit code table of spec §6: `0` success
    /// (never constructed as an error), `1` invariant violation or
    /// operational failure, `2` usage error. Every `ConfitureError` variant
    /// models an operational failure, so this always returns `1`; usage
    /// errors are raised directly by the CLI's argument parser.
    pub fn exit_code(&self) -> i32 {
        1
    }
}

pub type Result<T> = std::result::Result<T, ConfitureError>;
