//! Schema differ, risk classifier, and forward/inverse SQL codegen (spec
//! §4.2): turns a pair of `SchemaState`s into an ordered, risk-classified
//! `ChangeSet`.

pub mod change;
mod differ;
mod name;
mod risk;
mod sql;

pub use change::{Change, ChangeKind, ChangeSet, RiskClass};
pub use differ::diff;
