use crate::policy::PolicyError;

#[derive(Debug, thiserror::Error)]
pub enum AnonymisationError {
    #[error(transparent)]
    Policy(#[from] PolicyError),
    #[error("database error: {0}")]
    Database(#[from] tokio_postgres::Error),
    #[error("cyclic foreign-key dependency among synced tables: {0:?}")]
    Cycle(Vec<String>),
    #[error(
        "strategy {strategy} failed on {table}.{column} at batch {batch_index}: {message}"
    )]
    StrategyFailure {
        table: String,
        column: String,
        strategy: String,
        batch_index: usize,
        message: String,
    },
    #[error("rule for {table}.{column} references unknown strategy {strategy:?} at sync time")]
    UnknownStrategyAtSyncTime {
        table: String,
        column: String,
        strategy: String,
    },
}

pub type Result<T> = std::result::Result<T, AnonymisationError>;
