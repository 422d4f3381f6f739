//! Pure data transfer objects shaped after the `sys.*` catalog views. A
//! catalog reader populates these; the scripter turns them into DDL text.
//! Nothing in this module touches a connection.

use crate::model::ObjectKind;

#[derive(Debug, Clone)]
pub struct TableRow {
    pub schema: String,
    pub name: String,
    pub object_id: i32,
}

#[derive(Debug, Clone)]
pub struct ColumnRow {
    pub name: String,
    pub column_id: i32,
    pub type_name: String,
    pub max_length: i16,
    pub precision: u8,
    pub scale: u8,
    pub is_nullable: bool,
    pub is_identity: bool,
    pub identity_seed: Option<i64>,
    pub identity_increment: Option<i64>,
    pub is_computed: bool,
    pub computed_definition: Option<String>,
    pub default_constraint_name: Option<String>,
    pub default_definition: Option<String>,
    pub collation_name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyConstraintKind {
    PrimaryKey,
    Unique,
}

#[derive(Debug, Clone)]
pub struct KeyColumnRow {
    pub column_name: String,
    pub key_ordinal: i32,
    pub is_descending: bool,
}

#[derive(Debug, Clone)]
pub struct KeyConstraintRow {
    pub name: String,
    pub kind: KeyConstraintKind,
    /// The backing index's raw `sys.indexes.type_desc` (e.g.
    /// `CLUSTERED`/`NONCLUSTERED`), fed through `clustering_word`.
    pub index_type_desc: String,
    pub columns: Vec<KeyColumnRow>,
}

#[derive(Debug, Clone)]
pub struct ForeignKeyColumnRow {
    pub parent_column: String,
    pub referenced_column: String,
    pub ordinal: i32,
}

#[derive(Debug, Clone)]
pub struct ForeignKeyRow {
    pub name: String,
    pub referenced_schema: String,
    pub referenced_table: String,
    pub delete_referential_action_desc: String,
    pub update_referential_action_desc: String,
    pub is_not_trusted: bool,
    pub is_disabled: bool,
    pub is_not_for_replication: bool,
    pub columns: Vec<ForeignKeyColumnRow>,
}

#[derive(Debug, Clone)]
pub struct CheckConstraintRow {
    pub name: String,
    pub definition: String,
    pub is_not_trusted: bool,
    pub is_disabled: bool,
}

#[derive(Debug, Clone)]
pub struct IndexColumnRow {
    pub column_name: String,
    pub key_ordinal: i32,
    pub is_descending: bool,
    pub is_included_column: bool,
}

#[derive(Debug, Clone)]
pub struct IndexRow {
    pub name: String,
    pub is_unique: bool,
    pub is_clustered: bool,
    pub is_disabled: bool,
    pub has_filter: bool,
    pub filter_definition: Option<String>,
    pub columns: Vec<IndexColumnRow>,
}

/// Everything the scripter needs to emit `CREATE TABLE` plus its
/// constraints and non-key indexes, gathered for a single table.
#[derive(Debug, Clone)]
pub struct TableDefinition {
    pub table: TableRow,
    pub columns: Vec<ColumnRow>,
    pub key_constraints: Vec<KeyConstraintRow>,
    pub foreign_keys: Vec<ForeignKeyRow>,
    pub check_constraints: Vec<CheckConstraintRow>,
    pub indexes: Vec<IndexRow>,
}

/// A view, stored procedure, or function as read straight off
/// `sys.sql_modules.definition`.
#[derive(Debug, Clone)]
pub struct ProgrammableObjectRow {
    pub schema: String,
    pub name: String,
    pub kind: ObjectKind,
    pub definition: String,
}

/// One `referencing -> referenced` edge from `sys.sql_expression_dependencies`.
#[derive(Debug, Clone)]
pub struct DependencyEdge {
    pub referencing_schema: String,
    pub referencing_name: String,
    pub referencing_kind: ObjectKind,
    pub referenced_schema: String,
    pub referenced_name: String,
    pub referenced_kind: ObjectKind,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_constraint_kind_equality() {
        assert_eq!(KeyConstraintKind::PrimaryKey, KeyConstraintKind::PrimaryKey);
        assert_ne!(KeyConstraintKind::PrimaryKey, KeyConstraintKind::Unique);
    }
}
