//! Multi-agent schema-change coordination registry (spec §4.8).

pub mod conflict;
pub mod model;
pub mod store;

pub use conflict::{commutes, conflicts_on, find_conflicts};
pub use model::{Conflict, Intent, IntentState, ObjectRef, OperationClass};
pub use store::{CoordinateError, CoordinationRegistry, Result};
