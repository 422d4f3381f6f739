use std::fmt;
use std::hash::{Hash, Hasher};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqldiff_helpers::IndexSet;

use crate::error::{Result, SqlDiffError};

/// Kind of a schema object. Drives creation priority, drop priority, DDL
/// shape, and whether `CREATE OR ALTER` substitution applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectKind {
    Table,
    View,
    StoredProcedure,
    Function,
}

impl ObjectKind {
    /// Ascending order in which new objects are created: tables first so
    /// their dependents have something to reference, functions next since
    /// views/procedures commonly call them.
    pub fn create_priority(self) -> u8 {
        match self {
            ObjectKind::Table => 0,
            ObjectKind::Function => 1,
            ObjectKind::View => 2,
            ObjectKind::StoredProcedure => 3,
        }
    }

    /// Ascending order in which stale objects are dropped: the reverse of
    /// creation, so dependents go before the things they depend on.
    pub fn drop_priority(self) -> u8 {
        match self {
            ObjectKind::View => 0,
            ObjectKind::StoredProcedure => 1,
            ObjectKind::Function => 2,
            ObjectKind::Table => 3,
        }
    }

    /// The keyword used in `DROP <KEYWORD> ...` and similar DDL.
    pub fn ddl_keyword(self) -> &'static str {
        match self {
            ObjectKind::Table => "TABLE",
            ObjectKind::View => "VIEW",
            ObjectKind::StoredProcedure => "PROCEDURE",
            ObjectKind::Function => "FUNCTION",
        }
    }

    /// Maps a `sys.objects.type` catalog code to its kind.
    pub fn from_catalog_code(code: &str) -> Result<Self> {
        match code.trim() {
            "U" => Ok(ObjectKind::Table),
            "V" => Ok(ObjectKind::View),
            "P" => Ok(ObjectKind::StoredProcedure),
            "FN" | "IF" | "TF" | "FS" | "FT" => Ok(ObjectKind::Function),
            other => Err(SqlDiffError::Catalog(format!(
                "unrecognized catalog object type code: {other:?}"
            ))),
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ObjectKind::Table => "Table",
            ObjectKind::View => "View",
            ObjectKind::StoredProcedure => "StoredProcedure",
            ObjectKind::Function => "Function",
        };
        f.write_str(name)
    }
}

/// Wraps `[<escaped-name>]` quoting: a `]` in the name is doubled.
pub fn quote_identifier(name: &str) -> String {
    format!("[{}]", name.replace(']', "]]"))
}

/// `Kind:schema.name`, compared and hashed case-insensitively. Used both as
/// `SchemaObject::key` and as the element type of `dependencies` sets, since
/// the two share the same syntactic form (invariant 3 of the data model).
#[derive(Debug, Clone)]
pub struct ObjectKey(String);

impl ObjectKey {
    pub fn new(kind: ObjectKind, schema: &str, name: &str) -> Self {
        ObjectKey(format!("{kind}:{schema}.{name}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn lower(&self) -> String {
        self.0.to_ascii_lowercase()
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq for ObjectKey {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }
}

impl Eq for ObjectKey {}

impl Hash for ObjectKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.lower().hash(state);
    }
}

impl PartialOrd for ObjectKey {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ObjectKey {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.lower().cmp(&other.lower())
    }
}

impl Serialize for ObjectKey {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ObjectKey {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        Ok(ObjectKey(String::deserialize(deserializer)?))
    }
}

/// The atomic unit of a [`Snapshot`]: identity, definition text, and the
/// dependency keys the object references.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaObject {
    #[serde(rename = "Type")]
    pub kind: ObjectKind,
    #[serde(rename = "Schema")]
    pub schema: String,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Definition")]
    pub definition: String,
    #[serde(rename = "Dependencies", default)]
    pub dependencies: IndexSet<ObjectKey>,
}

impl SchemaObject {
    /// `[schema].[name]`.
    pub fn identifier(&self) -> String {
        format!("{}.{}", quote_identifier(&self.schema), quote_identifier(&self.name))
    }

    pub fn key(&self) -> ObjectKey {
        ObjectKey::new(self.kind, &self.schema, &self.name)
    }
}

/// Immutable in-memory projection of a database's user-defined schema
/// objects, as produced by the Catalog Reader + Object Scripter or loaded
/// from a persisted snapshot document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(rename = "DatabaseName")]
    pub database_name: String,
    #[serde(rename = "GeneratedAtUtc")]
    pub generated_at_utc: DateTime<Utc>,
    #[serde(rename = "Objects")]
    pub objects: Vec<SchemaObject>,
}

impl Snapshot {
    pub fn new(
        database_name: impl Into<String>,
        generated_at_utc: DateTime<Utc>,
        objects: Vec<SchemaObject>,
    ) -> Self {
        Snapshot {
            database_name: database_name.into(),
            generated_at_utc,
            objects,
        }
    }
}

/// A scheduled creation statement awaiting topological placement by the
/// Dependency Orderer.
#[derive(Debug, Clone)]
pub struct PendingCreate {
    pub object: SchemaObject,
    pub rendered_statement: String,
}
