//! Reconstructs deterministic DDL text from catalog rows. Pure: no I/O, no
//! clock reads.

use itertools::Itertools;
use sqldiff_helpers::IndexSet;

use crate::catalog_model::{
    CheckConstraintRow, ForeignKeyRow, IndexRow, KeyConstraintKind, KeyConstraintRow, TableDefinition,
};
use crate::model::{quote_identifier, ObjectKey, ObjectKind, SchemaObject};

/// The line that delimits executable chunks of an emitted script.
pub const BATCH_SEPARATOR: &str = "GO";

/// Appends a batch-separator line, unless the text already ends with one.
fn ensure_trailing_separator(text: &mut String) {
    let already = text
        .trim_end_matches('\n')
        .lines()
        .next_back()
        .map(|line| line.trim() == BATCH_SEPARATOR)
        .unwrap_or(false);
    if !text.ends_with('\n') {
        text.push('\n');
    }
    if !already {
        text.push_str(BATCH_SEPARATOR);
        text.push('\n');
    }
}

fn push_statement(buf: &mut String, statement: &str) {
    buf.push_str(statement);
    if !statement.ends_with('\n') {
        buf.push('\n');
    }
}

fn clustering_word(index_type_desc: &str) -> &'static str {
    let normalized = index_type_desc.replace('_', " ").to_uppercase();
    if normalized.contains("CLUSTERED") && !normalized.contains("NONCLUSTERED") {
        "CLUSTERED"
    } else {
        "NONCLUSTERED"
    }
}

fn action_clause(action_desc: &str) -> Option<&'static str> {
    match action_desc {
        "NO_ACTION" => None,
        "CASCADE" => Some("CASCADE"),
        "SET_NULL" => Some("SET NULL"),
        "SET_DEFAULT" => Some("SET DEFAULT"),
        _ => None,
    }
}

/// Renders a column's SQL type, following the table in §4.3 of the column
/// rendering rules: UDTs by schema-qualified name, builtins by case-folded
/// name with their own length/precision/scale conventions.
pub fn render_type(
    is_user_defined: bool,
    type_schema: &str,
    type_name: &str,
    max_length: i16,
    precision: u8,
    scale: u8,
) -> String {
    if is_user_defined {
        return format!("{}.{}", type_schema, type_name);
    }
    let lower = type_name.to_ascii_lowercase();
    match lower.as_str() {
        "varchar" | "char" | "varbinary" | "binary" => {
            let len = if max_length == -1 {
                "MAX".to_string()
            } else {
                max_length.to_string()
            };
            format!("{lower}({len})")
        }
        "nvarchar" | "nchar" => {
            let len = if max_length == -1 {
                "MAX".to_string()
            } else {
                (max_length / 2).to_string()
            };
            format!("{lower}({len})")
        }
        "decimal" | "numeric" => format!("{lower}({precision},{scale})"),
        "datetime2" | "datetimeoffset" | "time" => format!("{lower}({scale})"),
        "float" if precision != 53 => format!("float({precision})"),
        _ => lower,
    }
}

/// Renders one column definition, per the computed/ordinary column rules.
pub fn render_column(col: &crate::catalog_model::ColumnRow, is_user_defined: bool, type_schema: &str) -> String {
    let name = quote_identifier(&col.name);
    if col.is_computed {
        let expr = col.computed_definition.as_deref().unwrap_or("");
        let mut rendered = format!("{name} AS {expr}");
        if expr_is_persisted(col) {
            rendered.push_str(" PERSISTED");
        }
        return rendered;
    }

    let ty = render_type(
        is_user_defined,
        type_schema,
        &col.type_name,
        col.max_length,
        col.precision,
        col.scale,
    );

    let mut rendered = format!("{name} {ty}");
    if let Some(collation) = &col.collation_name {
        rendered.push_str(&format!(" COLLATE {collation}"));
    }
    if col.is_identity {
        let seed = col.identity_seed.unwrap_or(1);
        let increment = col.identity_increment.unwrap_or(1);
        rendered.push_str(&format!(" IDENTITY({seed},{increment})"));
    }
    rendered.push_str(if col.is_nullable { " NULL" } else { " NOT NULL" });
    if let (Some(default_name), Some(default_expr)) =
        (&col.default_constraint_name, &col.default_definition)
    {
        rendered.push_str(&format!(
            " CONSTRAINT {} DEFAULT {}",
            quote_identifier(default_name),
            default_expr
        ));
    }
    rendered
}

/// `PERSISTED` is not tracked on the catalog row today; computed columns
/// are always scripted non-persisted. Isolated here so the decision has one
/// call site if persistence tracking is added later.
fn expr_is_persisted(_col: &crate::catalog_model::ColumnRow) -> bool {
    false
}

fn render_key_columns(columns: &[crate::catalog_model::KeyColumnRow], with_direction: bool) -> String {
    columns
        .iter()
        .sorted_by_key(|c| c.key_ordinal)
        .map(|c| {
            let name = quote_identifier(&c.column_name);
            if with_direction {
                format!("{name} {}", if c.is_descending { "DESC" } else { "ASC" })
            } else {
                name
            }
        })
        .join(", ")
}

fn script_key_constraint(table_id: &str, constraint: &KeyConstraintRow) -> String {
    let kind_word = match constraint.kind {
        KeyConstraintKind::PrimaryKey => "PRIMARY KEY",
        KeyConstraintKind::Unique => "UNIQUE",
    };
    let clustering = clustering_word(&constraint.index_type_desc);
    let cols = render_key_columns(&constraint.columns, false);
    format!(
        "ALTER TABLE {table_id} ADD CONSTRAINT {} {kind_word} {clustering} ({cols});",
        quote_identifier(&constraint.name)
    )
}

fn script_foreign_key(table_id: &str, fk: &ForeignKeyRow) -> Vec<String> {
    let check_word = if fk.is_not_trusted { "WITH NOCHECK" } else { "WITH CHECK" };
    let cols = fk
        .columns
        .iter()
        .sorted_by_key(|c| c.ordinal)
        .map(|c| quote_identifier(&c.parent_column))
        .join(", ");
    let ref_cols = fk
        .columns
        .iter()
        .sorted_by_key(|c| c.ordinal)
        .map(|c| quote_identifier(&c.referenced_column))
        .join(", ");
    let ref_id = format!(
        "{}.{}",
        quote_identifier(&fk.referenced_schema),
        quote_identifier(&fk.referenced_table)
    );
    let name = quote_identifier(&fk.name);
    let mut stmt = format!(
        "ALTER TABLE {table_id} {check_word} ADD CONSTRAINT {name} FOREIGN KEY ({cols}) REFERENCES {ref_id} ({ref_cols})"
    );
    if let Some(action) = action_clause(&fk.delete_referential_action_desc) {
        stmt.push_str(&format!(" ON DELETE {action}"));
    }
    if let Some(action) = action_clause(&fk.update_referential_action_desc) {
        stmt.push_str(&format!(" ON UPDATE {action}"));
    }
    if fk.is_not_for_replication {
        stmt.push_str(" NOT FOR REPLICATION");
    }
    stmt.push(';');

    let mut statements = vec![stmt];
    if fk.is_disabled {
        statements.push(format!("ALTER TABLE {table_id} NOCHECK CONSTRAINT {name};"));
    }
    statements
}

fn script_check_constraint(table_id: &str, check: &CheckConstraintRow) -> Vec<String> {
    let check_word = if check.is_not_trusted { "WITH NOCHECK" } else { "WITH CHECK" };
    let name = quote_identifier(&check.name);
    let mut statements = vec![format!(
        "ALTER TABLE {table_id} {check_word} ADD CONSTRAINT {name} CHECK {};",
        check.definition
    )];
    if check.is_disabled {
        statements.push(format!("ALTER TABLE {table_id} NOCHECK CONSTRAINT {name};"));
    }
    statements
}

fn script_index(table_id: &str, index: &IndexRow) -> Vec<String> {
    let unique = if index.is_unique { "UNIQUE " } else { "" };
    let kind = if index.is_clustered { "CLUSTERED" } else { "NONCLUSTERED" };
    let key_cols = index
        .columns
        .iter()
        .filter(|c| !c.is_included_column)
        .sorted_by_key(|c| c.key_ordinal)
        .map(|c| {
            let name = quote_identifier(&c.column_name);
            format!("{name} {}", if c.is_descending { "DESC" } else { "ASC" })
        })
        .join(", ");
    let name = quote_identifier(&index.name);

    let mut stmt = format!("CREATE {unique}{kind} INDEX {name} ON {table_id} ({key_cols})");
    let included = index
        .columns
        .iter()
        .filter(|c| c.is_included_column)
        .sorted_by_key(|c| c.key_ordinal)
        .map(|c| quote_identifier(&c.column_name))
        .join(", ");
    if !included.is_empty() {
        stmt.push_str(&format!(" INCLUDE ({included})"));
    }
    if index.has_filter {
        if let Some(filter) = &index.filter_definition {
            stmt.push_str(&format!(" WHERE {filter}"));
        }
    }
    stmt.push(';');

    let mut statements = vec![stmt];
    if index.is_disabled {
        statements.push(format!("ALTER INDEX {name} ON {table_id} DISABLE;"));
    }
    statements
}

/// Builds the full `CREATE TABLE ...` block plus its constraints and
/// non-constraint indexes, each group sorted alphabetically as required,
/// PK/UQ ordered before FK before CHECK before index, terminated by a
/// batch separator.
pub fn script_table(def: &TableDefinition, type_schema_lookup: impl Fn(&str) -> (bool, String)) -> String {
    let table_id = format!(
        "{}.{}",
        quote_identifier(&def.table.schema),
        quote_identifier(&def.table.name)
    );

    let column_defs = def
        .columns
        .iter()
        .sorted_by_key(|c| c.column_id)
        .map(|col| {
            let (is_udt, type_schema) = type_schema_lookup(&col.type_name);
            render_column(col, is_udt, &type_schema)
        })
        .join(", ");

    let mut script = String::new();
    push_statement(&mut script, &format!("CREATE TABLE {table_id} ( {column_defs} );"));
    ensure_trailing_separator(&mut script);

    let mut keys_sorted: Vec<&KeyConstraintRow> = def.key_constraints.iter().collect();
    keys_sorted.sort_by(|a, b| {
        let kind_rank = |k: KeyConstraintKind| if k == KeyConstraintKind::PrimaryKey { 0 } else { 1 };
        kind_rank(a.kind)
            .cmp(&kind_rank(b.kind))
            .then_with(|| a.name.to_ascii_lowercase().cmp(&b.name.to_ascii_lowercase()))
    });
    for constraint in keys_sorted {
        push_statement(&mut script, &script_key_constraint(&table_id, constraint));
    }

    for fk in def.foreign_keys.iter().sorted_by(|a, b| a.name.to_ascii_lowercase().cmp(&b.name.to_ascii_lowercase())) {
        for stmt in script_foreign_key(&table_id, fk) {
            push_statement(&mut script, &stmt);
        }
    }

    for check in def
        .check_constraints
        .iter()
        .sorted_by(|a, b| a.name.to_ascii_lowercase().cmp(&b.name.to_ascii_lowercase()))
    {
        for stmt in script_check_constraint(&table_id, check) {
            push_statement(&mut script, &stmt);
        }
    }

    for index in def.indexes.iter().sorted_by(|a, b| a.name.to_ascii_lowercase().cmp(&b.name.to_ascii_lowercase())) {
        for stmt in script_index(&table_id, index) {
            push_statement(&mut script, &stmt);
        }
    }

    ensure_trailing_separator(&mut script);
    script
}

/// Produces the `SchemaObject` for a table: definition text plus the
/// dependency keys drawn from its foreign-key targets.
pub fn build_table_object(
    def: &TableDefinition,
    type_schema_lookup: impl Fn(&str) -> (bool, String),
) -> SchemaObject {
    let definition = script_table(def, type_schema_lookup);
    let mut dependencies = IndexSet::default();
    for fk in &def.foreign_keys {
        dependencies.insert(ObjectKey::new(ObjectKind::Table, &fk.referenced_schema, &fk.referenced_table));
    }
    SchemaObject {
        kind: ObjectKind::Table,
        schema: def.table.schema.clone(),
        name: def.table.name.clone(),
        definition,
        dependencies,
    }
}

/// Produces the `SchemaObject` for a view/procedure/function: the raw
/// module body, trimmed, with dependencies supplied by the caller (drawn
/// from the catalog's dependency-edge rows).
pub fn build_programmable_object(
    kind: ObjectKind,
    schema: &str,
    name: &str,
    raw_definition: &str,
    dependencies: IndexSet<ObjectKey>,
) -> SchemaObject {
    SchemaObject {
        kind,
        schema: schema.to_string(),
        name: name.to_string(),
        definition: raw_definition.trim().to_string(),
        dependencies,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog_model::*;

    fn int_column(name: &str, id: i32, nullable: bool) -> ColumnRow {
        ColumnRow {
            name: name.to_string(),
            column_id: id,
            type_name: "int".to_string(),
            max_length: 4,
            precision: 10,
            scale: 0,
            is_nullable: nullable,
            is_identity: false,
            identity_seed: None,
            identity_increment: None,
            is_computed: false,
            computed_definition: None,
            default_constraint_name: None,
            default_definition: None,
            collation_name: None,
        }
    }

    #[test]
    fn renders_simple_table() {
        let def = TableDefinition {
            table: TableRow { schema: "dbo".into(), name: "T".into(), object_id: 1 },
            columns: vec![int_column("Id", 1, false)],
            key_constraints: vec![],
            foreign_keys: vec![],
            check_constraints: vec![],
            indexes: vec![],
        };
        let rendered = script_table(&def, |_| (false, String::new()));
        assert!(rendered.contains("CREATE TABLE [dbo].[T] ( [Id] int NOT NULL );"));
        assert!(rendered.trim_end().ends_with("GO"));
    }

    #[test]
    fn nvarchar_halves_byte_length() {
        let rendered = render_type(false, "", "nvarchar", 100, 0, 0);
        assert_eq!(rendered, "nvarchar(50)");
    }

    #[test]
    fn nvarchar_max_passes_through() {
        let rendered = render_type(false, "", "nvarchar", -1, 0, 0);
        assert_eq!(rendered, "nvarchar(MAX)");
    }

    #[test]
    fn float_omits_precision_at_default() {
        assert_eq!(render_type(false, "", "float", 8, 53, 0), "float");
        assert_eq!(render_type(false, "", "float", 4, 24, 0), "float(24)");
    }

    #[test]
    fn user_defined_type_is_schema_qualified() {
        assert_eq!(render_type(true, "dbo", "Money2", 0, 0, 0), "dbo.Money2");
    }

    #[test]
    fn clustering_word_requires_clustered_without_non() {
        assert_eq!(clustering_word("CLUSTERED"), "CLUSTERED");
        assert_eq!(clustering_word("NONCLUSTERED"), "NONCLUSTERED");
        assert_eq!(clustering_word("HEAP"), "NONCLUSTERED");
    }

    #[test]
    fn action_clause_mapping() {
        assert_eq!(action_clause("NO_ACTION"), None);
        assert_eq!(action_clause("CASCADE"), Some("CASCADE"));
        assert_eq!(action_clause("SET_NULL"), Some("SET NULL"));
        assert_eq!(action_clause("SET_DEFAULT"), Some("SET DEFAULT"));
        assert_eq!(action_clause("WEIRD"), None);
    }

    fn sample_fk(is_not_trusted: bool, is_disabled: bool, is_not_for_replication: bool) -> ForeignKeyRow {
        ForeignKeyRow {
            name: "FK_Child_Parent".into(),
            referenced_schema: "dbo".into(),
            referenced_table: "Parent".into(),
            delete_referential_action_desc: "NO_ACTION".into(),
            update_referential_action_desc: "NO_ACTION".into(),
            is_not_trusted,
            is_disabled,
            is_not_for_replication,
            columns: vec![ForeignKeyColumnRow { parent_column: "ParentId".into(), referenced_column: "Id".into(), ordinal: 1 }],
        }
    }

    #[test]
    fn foreign_key_check_word_tracks_not_trusted_not_disabled() {
        let stmts = script_foreign_key("[dbo].[Child]", &sample_fk(true, false, false));
        assert!(stmts[0].contains("WITH NOCHECK ADD CONSTRAINT"));
        assert_eq!(stmts.len(), 1, "not-trusted alone must not emit a NOCHECK CONSTRAINT follow-up");
    }

    #[test]
    fn foreign_key_disabled_emits_nocheck_constraint_follow_up() {
        let stmts = script_foreign_key("[dbo].[Child]", &sample_fk(false, true, false));
        assert!(stmts[0].contains("WITH CHECK ADD CONSTRAINT"), "trusted FK still scripts WITH CHECK");
        assert_eq!(stmts[1], "ALTER TABLE [dbo].[Child] NOCHECK CONSTRAINT [FK_Child_Parent];");
    }

    #[test]
    fn foreign_key_emits_not_for_replication() {
        let stmts = script_foreign_key("[dbo].[Child]", &sample_fk(false, false, true));
        assert!(stmts[0].trim_end_matches(';').ends_with("NOT FOR REPLICATION"));
    }

    fn sample_check(is_not_trusted: bool, is_disabled: bool) -> CheckConstraintRow {
        CheckConstraintRow {
            name: "CK_T_Positive".into(),
            definition: "([Value]>(0))".into(),
            is_not_trusted,
            is_disabled,
        }
    }

    #[test]
    fn check_constraint_disabled_gates_follow_up_not_not_trusted() {
        let stmts = script_check_constraint("[dbo].[T]", &sample_check(true, false));
        assert!(stmts[0].contains("WITH NOCHECK ADD CONSTRAINT"));
        assert_eq!(stmts.len(), 1);

        let stmts = script_check_constraint("[dbo].[T]", &sample_check(false, true));
        assert!(stmts[0].contains("WITH CHECK ADD CONSTRAINT"));
        assert_eq!(stmts[1], "ALTER TABLE [dbo].[T] NOCHECK CONSTRAINT [CK_T_Positive];");
    }

    fn sample_index(is_disabled: bool) -> IndexRow {
        IndexRow {
            name: "IX_T_Value".into(),
            is_unique: false,
            is_clustered: false,
            is_disabled,
            has_filter: false,
            filter_definition: None,
            columns: vec![IndexColumnRow { column_name: "Value".into(), key_ordinal: 1, is_descending: false, is_included_column: false }],
        }
    }

    #[test]
    fn disabled_index_emits_alter_index_disable() {
        let stmts = script_index("[dbo].[T]", &sample_index(true));
        assert_eq!(stmts[1], "ALTER INDEX [IX_T_Value] ON [dbo].[T] DISABLE;");
    }

    #[test]
    fn enabled_index_has_no_disable_statement() {
        let stmts = script_index("[dbo].[T]", &sample_index(false));
        assert_eq!(stmts.len(), 1);
    }

    #[test]
    fn key_constraint_clustering_derives_from_index_type_desc() {
        let constraint = KeyConstraintRow {
            name: "PK_T".into(),
            kind: KeyConstraintKind::PrimaryKey,
            index_type_desc: "NONCLUSTERED".into(),
            columns: vec![KeyColumnRow { column_name: "Id".into(), key_ordinal: 1, is_descending: false }],
        };
        let rendered = script_key_constraint("[dbo].[T]", &constraint);
        assert!(rendered.contains("PRIMARY KEY NONCLUSTERED"));
    }

    #[test]
    fn ensure_trailing_separator_does_not_duplicate() {
        let mut text = String::from("CREATE TABLE X;\nGO\n");
        ensure_trailing_separator(&mut text);
        assert_eq!(text.matches("GO").count(), 1);
    }
}
