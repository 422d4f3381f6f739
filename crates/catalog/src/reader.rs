//! Pulls rows from `sys.*` catalog views and hands them to
//! [`sqldiff_core::scripter`] to build a [`sqldiff_core::Snapshot`].
//!
//! Per-connection ordering is serial: tables, then each table's
//! sub-queries, then programmable objects, then dependency edges, all on
//! the one connection this reader owns.

use std::collections::HashMap;

use chrono::Utc;
use sqldiff_core::catalog_model::{
    CheckConstraintRow, ColumnRow, ForeignKeyColumnRow, ForeignKeyRow, IndexColumnRow, IndexRow,
    KeyColumnRow, KeyConstraintKind, KeyConstraintRow, ProgrammableObjectRow, TableDefinition, TableRow,
};
use sqldiff_core::scripter::{build_programmable_object, build_table_object};
use sqldiff_core::{ObjectKey, ObjectKind, Snapshot};
use sqldiff_helpers::IndexSet;
use tiberius::Row;
use tokio_util::sync::CancellationToken;

use crate::connection::SqlClient;
use crate::error::{map_tiberius, OptionalColumn};

/// Anything that can produce a [`Snapshot`] for a named database. The real
/// implementation is `SqlClient` (below); tests exercise the catalog-to-
/// snapshot wiring against an in-memory fake instead of a live server.
pub trait CatalogReader {
    async fn read_snapshot(
        &mut self,
        database_name: &str,
        cancel: CancellationToken,
    ) -> sqldiff_core::Result<Snapshot>;
}

impl CatalogReader for SqlClient {
    async fn read_snapshot(
        &mut self,
        database_name: &str,
        cancel: CancellationToken,
    ) -> sqldiff_core::Result<Snapshot> {
        read_snapshot(self, database_name, cancel).await
    }
}

const TABLES_QUERY: &str = "\
SELECT t.object_id, s.name AS schema_name, t.name AS table_name \
FROM sys.tables t INNER JOIN sys.schemas s ON t.schema_id = s.schema_id \
ORDER BY s.name, t.name";

const COLUMNS_QUERY: &str = "\
SELECT c.column_id, c.name AS column_name, ty.name AS type_name, ty.is_user_defined, \
       SCHEMA_NAME(ty.schema_id) AS type_schema, c.max_length, c.precision, c.scale, \
       c.is_nullable, c.is_identity, ic.seed_value, ic.increment_value, \
       c.is_computed, cc.definition AS computed_definition, \
       dc.name AS default_name, dc.definition AS default_definition, c.collation_name \
FROM sys.columns c \
INNER JOIN sys.types ty ON c.user_type_id = ty.user_type_id \
LEFT JOIN sys.identity_columns ic ON c.object_id = ic.object_id AND c.column_id = ic.column_id \
LEFT JOIN sys.computed_columns cc ON c.object_id = cc.object_id AND c.column_id = cc.column_id \
LEFT JOIN sys.default_constraints dc ON c.default_object_id = dc.object_id \
WHERE c.object_id = @P1 \
ORDER BY c.column_id";

const KEY_CONSTRAINTS_QUERY: &str = "\
SELECT kc.name, kc.type, i.type_desc, ic.key_ordinal, ic.is_descending_key, col.name AS column_name \
FROM sys.key_constraints kc \
INNER JOIN sys.indexes i ON kc.parent_object_id = i.object_id AND kc.unique_index_id = i.index_id \
INNER JOIN sys.index_columns ic ON i.object_id = ic.object_id AND i.index_id = ic.index_id \
INNER JOIN sys.columns col ON ic.object_id = col.object_id AND ic.column_id = col.column_id \
WHERE kc.parent_object_id = @P1 \
ORDER BY kc.name, ic.key_ordinal";

const FOREIGN_KEYS_QUERY: &str = "\
SELECT fk.name, rt.name AS referenced_table, rs.name AS referenced_schema, \
       fk.delete_referential_action_desc, fk.update_referential_action_desc, fk.is_not_trusted, \
       fk.is_disabled, fk.is_not_for_replication, \
       fkc.constraint_column_id, pc.name AS parent_column, rc.name AS referenced_column \
FROM sys.foreign_keys fk \
INNER JOIN sys.foreign_key_columns fkc ON fk.object_id = fkc.constraint_object_id \
INNER JOIN sys.tables rt ON fk.referenced_object_id = rt.object_id \
INNER JOIN sys.schemas rs ON rt.schema_id = rs.schema_id \
INNER JOIN sys.columns pc ON fkc.parent_object_id = pc.object_id AND fkc.parent_column_id = pc.column_id \
INNER JOIN sys.columns rc ON fkc.referenced_object_id = rc.object_id AND fkc.referenced_column_id = rc.column_id \
WHERE fk.parent_object_id = @P1 \
ORDER BY fk.name, fkc.constraint_column_id";

const CHECK_CONSTRAINTS_QUERY: &str = "\
SELECT name, definition, is_not_trusted, is_disabled \
FROM sys.check_constraints \
WHERE parent_object_id = @P1 \
ORDER BY name";

const INDEXES_QUERY: &str = "\
SELECT i.index_id, i.name, i.is_unique, i.is_disabled, i.type_desc, i.has_filter, i.filter_definition, \
       ic.key_ordinal, ic.is_descending_key, ic.is_included_column, col.name AS column_name \
FROM sys.indexes i \
INNER JOIN sys.index_columns ic ON i.object_id = ic.object_id AND i.index_id = ic.index_id \
INNER JOIN sys.columns col ON ic.object_id = col.object_id AND ic.column_id = col.column_id \
WHERE i.object_id = @P1 AND i.name IS NOT NULL AND i.is_primary_key = 0 AND i.is_unique_constraint = 0 \
  AND i.type IN (1, 2, 5, 6) \
ORDER BY i.name, ic.key_ordinal";

const PROGRAMMABLE_OBJECTS_QUERY: &str = "\
SELECT o.object_id, o.type, s.name AS schema_name, o.name AS object_name, m.definition \
FROM sys.objects o \
INNER JOIN sys.schemas s ON o.schema_id = s.schema_id \
INNER JOIN sys.sql_modules m ON o.object_id = m.object_id \
WHERE o.type IN ('V', 'P', 'FN', 'IF', 'TF', 'FS', 'FT') \
ORDER BY s.name, o.name";

const DEPENDENCY_EDGES_QUERY: &str = "\
SELECT sed.referencing_id, ro.type AS referenced_type, rs.name AS referenced_schema, ro.name AS referenced_name \
FROM sys.sql_expression_dependencies sed \
INNER JOIN sys.objects ro ON sed.referenced_id = ro.object_id \
INNER JOIN sys.schemas rs ON ro.schema_id = rs.schema_id \
WHERE sed.referenced_id IS NOT NULL";

fn str_col(row: &Row, name: &str) -> sqldiff_core::Result<String> {
    row.get::<&str, _>(name).map(str::to_string).required(name)
}

fn opt_str_col(row: &Row, name: &str) -> Option<String> {
    row.get::<&str, _>(name).map(str::to_string)
}

async fn run_query(
    client: &mut SqlClient,
    sql: &str,
    params: &[&(dyn tiberius::ToSql)],
    cancel: &CancellationToken,
) -> sqldiff_core::Result<Vec<Row>> {
    if cancel.is_cancelled() {
        return Err(sqldiff_core::SqlDiffError::Catalog("extraction cancelled".into()));
    }
    let stream = client
        .query(sql, params)
        .await
        .map_err(|e| map_tiberius("query failed", e))?;
    let result = tokio::select! {
        rows = stream.into_first_result() => rows.map_err(|e| map_tiberius("query failed", e))?,
        _ = cancel.cancelled() => return Err(sqldiff_core::SqlDiffError::Catalog("extraction cancelled".into())),
    };
    Ok(result)
}

async fn read_table_columns(
    client: &mut SqlClient,
    object_id: i32,
    cancel: &CancellationToken,
) -> sqldiff_core::Result<Vec<ColumnRow>> {
    let rows = run_query(client, COLUMNS_QUERY, &[&object_id], cancel).await?;
    rows.iter()
        .map(|row| {
            Ok(ColumnRow {
                name: str_col(row, "column_name")?,
                column_id: row.get("column_id").required("column_id")?,
                type_name: str_col(row, "type_name")?,
                max_length: row.get("max_length").required("max_length")?,
                precision: row.get("precision").required("precision")?,
                scale: row.get("scale").required("scale")?,
                is_nullable: row.get("is_nullable").required("is_nullable")?,
                is_identity: row.get("is_identity").required("is_identity")?,
                identity_seed: row.get("seed_value"),
                identity_increment: row.get("increment_value"),
                is_computed: row.get("is_computed").required("is_computed")?,
                computed_definition: opt_str_col(row, "computed_definition"),
                default_constraint_name: opt_str_col(row, "default_name"),
                default_definition: opt_str_col(row, "default_definition"),
                collation_name: opt_str_col(row, "collation_name"),
            })
        })
        .collect()
}

async fn read_key_constraints(
    client: &mut SqlClient,
    object_id: i32,
    cancel: &CancellationToken,
) -> sqldiff_core::Result<Vec<KeyConstraintRow>> {
    let rows = run_query(client, KEY_CONSTRAINTS_QUERY, &[&object_id], cancel).await?;
    let mut grouped: HashMap<String, KeyConstraintRow> = HashMap::new();
    let mut order: Vec<String> = Vec::new();
    for row in &rows {
        let name = str_col(row, "name")?;
        let type_code: &str = row.get("type").required("type")?;
        let kind = if type_code.trim() == "PK" {
            KeyConstraintKind::PrimaryKey
        } else {
            KeyConstraintKind::Unique
        };
        let entry = grouped.entry(name.clone()).or_insert_with(|| {
            order.push(name.clone());
            KeyConstraintRow {
                name: name.clone(),
                kind,
                index_type_desc: opt_str_col(row, "type_desc").unwrap_or_default(),
                columns: Vec::new(),
            }
        });
        entry.columns.push(KeyColumnRow {
            column_name: str_col(row, "column_name")?,
            key_ordinal: row.get("key_ordinal").required("key_ordinal")?,
            is_descending: row.get("is_descending_key").required("is_descending_key")?,
        });
    }
    Ok(order.into_iter().filter_map(|name| grouped.remove(&name)).collect())
}

async fn read_foreign_keys(
    client: &mut SqlClient,
    object_id: i32,
    cancel: &CancellationToken,
) -> sqldiff_core::Result<Vec<ForeignKeyRow>> {
    let rows = run_query(client, FOREIGN_KEYS_QUERY, &[&object_id], cancel).await?;
    let mut grouped: HashMap<String, ForeignKeyRow> = HashMap::new();
    let mut order: Vec<String> = Vec::new();
    for row in &rows {
        let name = str_col(row, "name")?;
        let entry = grouped.entry(name.clone()).or_insert_with(|| {
            order.push(name.clone());
            ForeignKeyRow {
                name: name.clone(),
                referenced_schema: String::new(),
                referenced_table: String::new(),
                delete_referential_action_desc: String::new(),
                update_referential_action_desc: String::new(),
                is_not_trusted: false,
                is_disabled: false,
                is_not_for_replication: false,
                columns: Vec::new(),
            }
        });
        entry.referenced_schema = str_col(row, "referenced_schema")?;
        entry.referenced_table = str_col(row, "referenced_table")?;
        entry.delete_referential_action_desc = str_col(row, "delete_referential_action_desc")?;
        entry.update_referential_action_desc = str_col(row, "update_referential_action_desc")?;
        entry.is_not_trusted = row.get("is_not_trusted").required("is_not_trusted")?;
        entry.is_disabled = row.get("is_disabled").required("is_disabled")?;
        entry.is_not_for_replication = row.get("is_not_for_replication").required("is_not_for_replication")?;
        entry.columns.push(ForeignKeyColumnRow {
            parent_column: str_col(row, "parent_column")?,
            referenced_column: str_col(row, "referenced_column")?,
            ordinal: row.get("constraint_column_id").required("constraint_column_id")?,
        });
    }
    Ok(order.into_iter().filter_map(|name| grouped.remove(&name)).collect())
}

async fn read_check_constraints(
    client: &mut SqlClient,
    object_id: i32,
    cancel: &CancellationToken,
) -> sqldiff_core::Result<Vec<CheckConstraintRow>> {
    let rows = run_query(client, CHECK_CONSTRAINTS_QUERY, &[&object_id], cancel).await?;
    rows.iter()
        .map(|row| {
            Ok(CheckConstraintRow {
                name: str_col(row, "name")?,
                definition: str_col(row, "definition")?,
                is_not_trusted: row.get("is_not_trusted").required("is_not_trusted")?,
                is_disabled: row.get("is_disabled").required("is_disabled")?,
            })
        })
        .collect()
}

async fn read_indexes(
    client: &mut SqlClient,
    object_id: i32,
    cancel: &CancellationToken,
) -> sqldiff_core::Result<Vec<IndexRow>> {
    let rows = run_query(client, INDEXES_QUERY, &[&object_id], cancel).await?;
    let mut grouped: HashMap<String, IndexRow> = HashMap::new();
    let mut order: Vec<String> = Vec::new();
    for row in &rows {
        let name = str_col(row, "name")?;
        let entry = grouped.entry(name.clone()).or_insert_with(|| {
            order.push(name.clone());
            IndexRow {
                name: name.clone(),
                is_unique: row.get("is_unique").unwrap_or(false),
                is_clustered: row
                    .get::<&str, _>("type_desc")
                    .map(|d| d.eq_ignore_ascii_case("CLUSTERED") || d.eq_ignore_ascii_case("CLUSTERED COLUMNSTORE"))
                    .unwrap_or(false),
                is_disabled: row.get("is_disabled").unwrap_or(false),
                has_filter: row.get("has_filter").unwrap_or(false),
                filter_definition: opt_str_col(row, "filter_definition"),
                columns: Vec::new(),
            }
        });
        entry.columns.push(IndexColumnRow {
            column_name: str_col(row, "column_name")?,
            key_ordinal: row.get("key_ordinal").required("key_ordinal")?,
            is_descending: row.get("is_descending_key").required("is_descending_key")?,
            is_included_column: row.get("is_included_column").required("is_included_column")?,
        });
    }
    Ok(order.into_iter().filter_map(|name| grouped.remove(&name)).collect())
}

/// Reads every table and its sub-rows, then every programmable object, then
/// dependency edges, building a [`Snapshot`] for `database_name`.
pub async fn read_snapshot(
    client: &mut SqlClient,
    database_name: &str,
    cancel: CancellationToken,
) -> sqldiff_core::Result<Snapshot> {
    let tables = run_query(client, TABLES_QUERY, &[], &cancel).await?;
    let mut table_rows = Vec::with_capacity(tables.len());
    for row in &tables {
        table_rows.push(TableRow {
            schema: str_col(row, "schema_name")?,
            name: str_col(row, "table_name")?,
            object_id: row.get("object_id").required("object_id")?,
        });
    }

    let mut objects = Vec::new();
    for table in table_rows {
        let object_id = table.object_id;
        let def = TableDefinition {
            columns: read_table_columns(client, object_id, &cancel).await?,
            key_constraints: read_key_constraints(client, object_id, &cancel).await?,
            foreign_keys: read_foreign_keys(client, object_id, &cancel).await?,
            check_constraints: read_check_constraints(client, object_id, &cancel).await?,
            indexes: read_indexes(client, object_id, &cancel).await?,
            table,
        };
        objects.push(build_table_object(&def, |_| (false, String::new())));
    }

    let programmable_rows = run_query(client, PROGRAMMABLE_OBJECTS_QUERY, &[], &cancel).await?;
    let mut programmable: Vec<(i32, ProgrammableObjectRow)> = Vec::with_capacity(programmable_rows.len());
    for row in &programmable_rows {
        let type_code = str_col(row, "type")?;
        let kind = ObjectKind::from_catalog_code(&type_code)?;
        programmable.push((
            row.get("object_id").required("object_id")?,
            ProgrammableObjectRow {
                schema: str_col(row, "schema_name")?,
                name: str_col(row, "object_name")?,
                kind,
                definition: str_col(row, "definition")?,
            },
        ));
    }

    let edge_rows = run_query(client, DEPENDENCY_EDGES_QUERY, &[], &cancel).await?;
    let mut edges: HashMap<i32, IndexSet<ObjectKey>> = HashMap::new();
    for row in &edge_rows {
        let referencing_id: i32 = row.get("referencing_id").required("referencing_id")?;
        let referenced_type = str_col(row, "referenced_type")?;
        let Ok(referenced_kind) = ObjectKind::from_catalog_code(&referenced_type) else {
            continue;
        };
        let key = ObjectKey::new(
            referenced_kind,
            &str_col(row, "referenced_schema")?,
            &str_col(row, "referenced_name")?,
        );
        edges.entry(referencing_id).or_default().insert(key);
    }

    for (object_id, row) in programmable {
        let dependencies = edges.remove(&object_id).unwrap_or_default();
        objects.push(build_programmable_object(row.kind, &row.schema, &row.name, &row.definition, dependencies));
    }

    Ok(Snapshot::new(database_name, Utc::now(), objects))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqldiff_core::SchemaObject;

    struct FakeReader {
        objects: Vec<SchemaObject>,
    }

    impl CatalogReader for FakeReader {
        async fn read_snapshot(
            &mut self,
            database_name: &str,
            _cancel: CancellationToken,
        ) -> sqldiff_core::Result<Snapshot> {
            Ok(Snapshot::new(database_name, Utc::now(), self.objects.clone()))
        }
    }

    async fn exercise(reader: &mut impl CatalogReader) -> sqldiff_core::Result<Snapshot> {
        reader.read_snapshot("App", CancellationToken::new()).await
    }

    #[tokio::test]
    async fn fake_reader_satisfies_the_catalog_reader_contract() {
        let mut fake = FakeReader { objects: Vec::new() };
        let snapshot = exercise(&mut fake).await.unwrap();
        assert_eq!(snapshot.database_name, "App");
        assert!(snapshot.objects.is_empty());
    }
}
