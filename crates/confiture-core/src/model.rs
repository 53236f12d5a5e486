//! The canonical schema model shared by every component: parser, differ,
//! migration engine, and safety pipeline all operate over `SchemaObject` and
//! `SchemaState`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Discriminator for every kind of object Confiture knows how to model.
///
/// Ordering matters: `Ord` on `ObjectKind` is the dependency rank used by the
/// differ's topological sort (schemas before tables before columns before
/// indexes before constraints before views).
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    Schema,
    Extension,
    Type,
    Sequence,
    Function,
    Table,
    Column,
    Index,
    Constraint,
    Trigger,
    View,
    MaterializedView,
    Comment,
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ObjectKind::Schema => "schema",
            ObjectKind::Extension => "extension",
            ObjectKind::Type => "type",
            ObjectKind::Sequence => "sequence",
            ObjectKind::Function => "function",
            ObjectKind::Table => "table",
            ObjectKind::Column => "column",
            ObjectKind::Index => "index",
            ObjectKind::Constraint => "constraint",
            ObjectKind::Trigger => "trigger",
            ObjectKind::View => "view",
            ObjectKind::MaterializedView => "materialized_view",
            ObjectKind::Comment => "comment",
        };
        f.write_str(s)
    }
}

/// Kind of constraint, carried on `SchemaObject::Constraint` payloads.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintKind {
    PrimaryKey,
    ForeignKey,
    Unique,
    Check,
    NotNull,
}

/// A schema-qualified object identity: `(kind, schema, name, parent)`.
///
/// This is the key the differ indexes both schema states by (spec §4.2
/// step 1).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectKey {
    pub kind: ObjectKind,
    pub schema: String,
    pub name: String,
    pub parent: Option<String>,
}

impl ObjectKey {
    pub fn new(
        kind: ObjectKind,
        schema: impl Into<String>,
        name: impl Into<String>,
        parent: Option<String>,
    ) -> Self {
        Self {
            kind,
            schema: schema.into(),
            name: name.into(),
            parent,
        }
    }

    pub fn qualified_name(&self) -> String {
        match &self.parent {
            Some(parent) => format!("{}.{}.{}.{}", self.schema, parent, self.kind, self.name),
            None => format!("{}.{}.{}", self.schema, self.kind, self.name),
        }
    }
}

/// Column-specific attributes, present only on `SchemaObject::Column`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnAttrs {
    pub data_type: String,
    pub nullable: bool,
    pub default: Option<String>,
    /// Referenced user-defined type name, if `data_type` is an enum/domain.
    pub referenced_type: Option<String>,
}

/// Index-specific attributes, present only on `SchemaObject::Index`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexAttrs {
    pub columns: Vec<String>,
    pub method: String,
    pub unique: bool,
    pub concurrent: bool,
}

/// Constraint-specific attributes, present only on `SchemaObject::Constraint`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstraintAttrs {
    pub kind: ConstraintKind,
    pub columns: Vec<String>,
    /// `(schema, table, columns)` this constraint references, for FKs.
    pub references: Option<(String, String, Vec<String>)>,
    pub not_valid: bool,
}

/// A single named database artefact (spec §3 `SchemaObject`).
///
/// Attributes common to every variant (schema-qualified name, owning parent,
/// free-form DDL body) live on `SchemaObject` itself; variant-specific
/// attributes live in the `*Attrs` payload structs above.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaObject {
    pub key: ObjectKey,
    /// The normalised DDL body: whitespace collapsed, keywords folded to a
    /// canonical case, trailing semicolons stripped. Dollar-quoted function
    /// bodies are the exception — opaque, carried verbatim (spec §4.1).
    pub ddl: String,
    pub column: Option<ColumnAttrs>,
    pub index: Option<IndexAttrs>,
    pub constraint: Option<ConstraintAttrs>,
}

impl SchemaObject {
    pub fn new(key: ObjectKey, ddl: impl Into<String>) -> Self {
        Self {
            key,
            ddl: ddl.into(),
            column: None,
            index: None,
            constraint: None,
        }
    }

    pub fn with_column(mut self, attrs: ColumnAttrs) -> Self {
        self.column = Some(attrs);
        self
    }

    pub fn with_index(mut self, attrs: IndexAttrs) -> Self {
        self.index = Some(attrs);
        self
    }

    pub fn with_constraint(mut self, attrs: ConstraintAttrs) -> Self {
        self.constraint = Some(attrs);
        self
    }
}

/// A 32-byte content-addressed fingerprint of a `SchemaState`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint(pub [u8; 32]);

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", self)
    }
}

/// A snapshot of a database's declarative shape (spec §3 `SchemaState`).
///
/// Constructed by the Parser or the Introspector; immutable once built.
/// Objects are kept sorted by `(kind, schema, name, parent)` so that the
/// fingerprint and every downstream consumer see a canonical order
/// regardless of file layout or catalog query order.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SchemaState {
    objects: Vec<SchemaObject>,
}

impl SchemaState {
    pub fn new(mut objects: Vec<SchemaObject>) -> Self {
        objects.sort_by(|a, b| a.key.cmp(&b.key));
        Self { objects }
    }

    pub fn objects(&self) -> &[SchemaObject] {
        &self.objects
    }

    pub fn get(&self, key: &ObjectKey) -> Option<&SchemaObject> {
        self.objects.iter().find(|o| &o.key == key)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// SHA-256 over the canonical serialisation (spec §4.1 `fingerprint`).
    ///
    /// Objects are already sorted by construction; each object's DDL body is
    /// assumed pre-normalised by the producer (Parser or Introspector), so
    /// this function only needs to serialise deterministically.
    pub fn fingerprint(&self) -> Fingerprint {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        for obj in &self.objects {
            hasher.update(obj.key.qualified_name().as_bytes());
            hasher.update([0u8]);
            hasher.update(obj.ddl.as_bytes());
            hasher.update([0u8]);
        }
        let digest = hasher.finalize();
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&digest);
        Fingerprint(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obj(name: &str, ddl: &str) -> SchemaObject {
        SchemaObject::new(
            ObjectKey::new(ObjectKind::Table, "public", name, None),
            ddl,
        )
    }

    #[test]
    fn fingerprint_is_order_independent() {
        let a = SchemaState::new(vec![obj("users", "create table users (id int)")]);
        let b = SchemaState::new(vec![obj("users", "create table users (id int)")]);
        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn fingerprint_changes_with_body() {
        let a = SchemaState::new(vec![obj("users", "create table users (id int)")]);
        let b = SchemaState::new(vec![obj("users", "create table users (id bigint)")]);
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn construction_sorts_objects() {
        let state = SchemaState::new(vec![obj("z_table", "..."), obj("a_table", "...")]);
        let names: Vec<_> = state.objects().iter().map(|o| o.key.name.clone()).collect();
        assert_eq!(names, vec!["a_table", "z_table"]);
    }
}
