//! CLI error type: wraps every library error so `main` can map it to the
//! exit-code table of spec §6.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),

    #[error(transparent)]
    Core(#[from] confiture_core::ConfitureError),

    #[error(transparent)]
    Parse(#[from] confiture_schema::ParseError),

    #[error(transparent)]
    Introspect(#[from] confiture_schema::IntrospectError),

    #[error(transparent)]
    Engine(#[from] confiture_migrate::EngineError),

    #[error(transparent)]
    Store(#[from] confiture_migrate::StoreError),

    #[error(transparent)]
    Loader(#[from] confiture_migrate::LoaderError),

    #[error(transparent)]
    Seed(#[from] confiture_migrate::SeedError),

    #[error(transparent)]
    Policy(#[from] confiture_anonymize::PolicyError),

    #[error(transparent)]
    Anonymisation(#[from] confiture_anonymize::AnonymisationError),

    #[error(transparent)]
    Audit(#[from] confiture_audit::AuditError),

    #[error(transparent)]
    Coordinate(#[from] confiture_coordinate::CoordinateError),

    #[error(transparent)]
    Database(#[from] tokio_postgres::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Usage(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CliError {
    /// Exit code table of spec §6: `1` invariant/operational failure, `2`
    /// usage error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Usage(_) => 2,
            _ => 1,
        }
    }
}
