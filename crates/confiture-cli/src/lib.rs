//! Confiture CLI — command-line interface for the schema-evolution system
//! described across spec §4: build, migrate, seed, lint, sync, and
//! coordinate, driven by a `confiture.toml` configuration file.

pub mod commands;
pub mod config;
pub mod db;
pub mod error;
pub mod output;

pub use config::ConfitureConfig;
pub use error::CliError;
