//! Canonical DDL parser and fingerprinter (spec §4.1): ingests a directory
//! of `.sql` files or a live database and produces a `SchemaState` whose
//! `fingerprint()` is a pure function of its set of objects.

pub mod classify;
pub mod introspect;
pub mod lexer;
pub mod normalize;
pub mod parser;

pub use confiture_core::{Fingerprint, SchemaState};
pub use introspect::{introspect, IntrospectError};
pub use parser::{parse_tree, ParseError};
