//! Shared schema model, error taxonomy, hook contract, and engine context
//! used by every Confiture crate.

pub mod batch;
pub mod context;
pub mod error;
pub mod hooks;
pub mod model;
pub mod render;
pub mod rng;
pub mod topology;

pub use batch::max_batch_rows;
pub use context::{EngineContext, SafetyPolicy, Severity};
pub use error::{ConfitureError, Result, SourceLocation};
pub use hooks::{Hook, HookContext, HookDescriptor, HookOutcome, HookPhase, HookRegistry};
pub use model::{
    ColumnAttrs, ConstraintAttrs, ConstraintKind, Fingerprint, IndexAttrs, ObjectKey, ObjectKind,
    SchemaObject, SchemaState,
};
pub use render::{OutputFormat, Render};
pub use rng::{column_rng, column_seed};
pub use topology::{topological_order, CycleError, TableNode};
