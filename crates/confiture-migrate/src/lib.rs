//! Migration ledger, engine, and seed application (spec §4.3, §4.4, §4.9).

pub mod engine;
pub mod loader;
pub mod model;
pub mod seed;
pub mod store;

pub use engine::{AppliedMigration, EngineError, MigrationEngine, StatusReport};
pub use loader::{load_migrations, LoaderError};
pub use model::{Checksum, Migration, MigrationRecord};
pub use seed::{
    apply_seeds, load_seed_dir, seeding_order, SeedError, SeedFile, SeedViolation, ViolationKind,
    ViolationSeverity, validate_prep_seeds,
};
pub use store::{MigrationStore, StoreError};
