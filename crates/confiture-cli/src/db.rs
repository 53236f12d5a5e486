//! Database connectivity for CLI commands: resolves a connection string
//! from the environment variable named in `confiture.toml` and opens a
//! `tokio-postgres` client, spawning its connection driver task in the
//! background (the standard `tokio-postgres` pattern, grounded on the
//! teacher's driver adapters in `cli/src/db/mod.rs`).

use crate::error::CliError;
use tokio_postgres::{Client, NoTls};

pub async fn connect(env_var: &str) -> Result<Client, CliError> {
    let url = std::env::var(env_var)
        .map_err(|_| CliError::Usage(format!("environment variable {env_var} is not set")))?;
    let (client, connection) = tokio_postgres::connect(&url, NoTls).await?;
    tokio::spawn(async move {
        if let Err(error) = connection.await {
            tracing::error!(%error, "postgres connection task failed");
        }
    });
    Ok(client)
}
