use thiserror::Error;

#[derive(Debug, Error)]
pub enum SafetyError {
    #[error("database error: {0}")]
    Database(#[from] tokio_postgres::Error),
    #[error("dry-run probe query failed for {statement}: {source}")]
    Probe {
        statement: String,
        #[source]
        source: tokio_postgres::Error,
    },
}

pub type Result<T> = std::result::Result<T, SafetyError>;
