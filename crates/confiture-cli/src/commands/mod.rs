//! Command implementations, one module per `confiture` subcommand group
//! (spec §6), each exposing plain `async fn`s `main.rs` wires to `clap`.

pub mod build;
pub mod coordinate;
pub mod lint;
pub mod migrate;
pub mod seed;
pub mod sync;
