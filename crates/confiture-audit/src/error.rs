#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("database error: {0}")]
    Database(#[from] tokio_postgres::Error),
    #[error("audit chain broken at sequence {sequence}: recorded signature does not match recomputed signature")]
    ChainBroken { sequence: i64 },
    #[error("audit chain broken at sequence {sequence}: recorded previous_entry_hash does not match entry {sequence_minus_one}'s hash")]
    PreviousHashMismatch { sequence: i64, sequence_minus_one: i64 },
    #[error("signing key must be non-empty")]
    EmptyKey,
}

pub type Result<T> = std::result::Result<T, AuditError>;
