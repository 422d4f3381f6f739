//! Computes per-object verdicts between two snapshots and assembles the
//! drop and pending-create lists the composer needs. Pure: the caller
//! supplies the generation timestamp so output is a function of its inputs.

use chrono::{DateTime, Utc};
use regex::Regex;
use sqldiff_helpers::IndexMap;
use std::sync::LazyLock;

use crate::model::{ObjectKey, ObjectKind, PendingCreate, SchemaObject, Snapshot};
use crate::normalize::normalize;
use crate::orderer::order_pending_creates;
use crate::scripter::BATCH_SEPARATOR;

#[derive(Debug, Clone, Copy, Default)]
pub struct DiffFlags {
    pub include_drops: bool,
    pub include_table_drops: bool,
    pub allow_table_rebuild: bool,
    pub add_only: bool,
}

#[derive(Debug, Clone)]
pub struct DiffResult {
    pub script_drops: Vec<String>,
    pub script_creates: Vec<String>,
    pub added: u32,
    pub changed: u32,
    pub removed: u32,
    pub skipped: u32,
}

impl DiffResult {
    pub fn is_empty(&self) -> bool {
        self.script_drops.is_empty() && self.script_creates.is_empty()
    }
}

static CREATE_PREFIX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)^(\s*)CREATE\b").unwrap());

/// Rewrites a leading `CREATE` (case-insensitive, leading whitespace
/// tolerated) to `CREATE OR ALTER`. Bodies that don't start with `CREATE`
/// pass through unmodified (open question Q1: left unmodified, not an
/// error).
fn to_create_or_alter(definition: &str) -> String {
    if let Some(m) = CREATE_PREFIX.find(definition) {
        let leading_ws = &definition[..m.end() - "CREATE".len()];
        format!("{leading_ws}CREATE OR ALTER{}", &definition[m.end()..])
    } else {
        definition.to_string()
    }
}

fn render_drop(obj: &SchemaObject) -> String {
    let identifier = obj.identifier();
    format!(
        "IF OBJECT_ID(N'{identifier}') IS NOT NULL\n    DROP {} {identifier};\n{BATCH_SEPARATOR}\n",
        obj.kind.ddl_keyword()
    )
}

fn warning_comment(message: &str) -> String {
    format!("-- WARNING: {message}")
}

fn table_rebuild_comments(obj: &SchemaObject) -> Vec<String> {
    vec![
        warning_comment(&format!("table {} changed but was not rebuilt", obj.identifier())),
        "-- hint: pass --allow-table-rebuild to emit a drop+create for this table".to_string(),
    ]
}

fn table_drop_skip_comments(obj: &SchemaObject) -> Vec<String> {
    vec![
        warning_comment(&format!("table {} exists only on target and was not dropped", obj.identifier())),
        "-- hint: pass --include-table-drops to drop target-only tables".to_string(),
    ]
}

fn keyed_map(snapshot: &Snapshot) -> IndexMap<ObjectKey, &SchemaObject> {
    let mut map = IndexMap::default();
    for obj in &snapshot.objects {
        map.insert(obj.key(), obj);
    }
    map
}

fn stable_sort<'a>(objects: impl Iterator<Item = &'a SchemaObject>, priority: impl Fn(ObjectKind) -> u8) -> Vec<&'a SchemaObject> {
    let mut sorted: Vec<&SchemaObject> = objects.collect();
    sorted.sort_by(|a, b| {
        priority(a.kind)
            .cmp(&priority(b.kind))
            .then_with(|| a.key().cmp(&b.key()))
    });
    sorted
}

/// Compares `source` against `target` and produces the drop/create script
/// fragments plus tallies. `generated_at_utc` is accepted for API symmetry
/// with the composer, which stamps the header from the same value the
/// caller used to build the snapshots.
pub fn diff(source: &Snapshot, target: &Snapshot, flags: DiffFlags, _generated_at_utc: DateTime<Utc>) -> DiffResult {
    let target_map = keyed_map(target);

    let mut added = 0u32;
    let mut changed = 0u32;
    let mut removed = 0u32;
    let mut skipped = 0u32;

    let mut pending: Vec<PendingCreate> = Vec::new();
    let mut creates_comments: Vec<String> = Vec::new();
    let mut drops: Vec<String> = Vec::new();

    for source_obj in stable_sort(source.objects.iter(), ObjectKind::create_priority) {
        match target_map.get(&source_obj.key()) {
            None => {
                added += 1;
                pending.push(PendingCreate {
                    object: source_obj.clone(),
                    rendered_statement: source_obj.definition.clone(),
                });
            }
            Some(target_obj) => {
                if normalize(&source_obj.definition) == normalize(&target_obj.definition) {
                    continue;
                }
                changed += 1;
                if flags.add_only {
                    skipped += 1;
                } else if source_obj.kind == ObjectKind::Table {
                    if flags.allow_table_rebuild {
                        drops.push(render_drop(target_obj));
                        pending.push(PendingCreate {
                            object: source_obj.clone(),
                            rendered_statement: source_obj.definition.clone(),
                        });
                    } else {
                        skipped += 1;
                        creates_comments.extend(table_rebuild_comments(source_obj));
                    }
                } else {
                    let rewritten = to_create_or_alter(&source_obj.definition);
                    pending.push(PendingCreate {
                        object: source_obj.clone(),
                        rendered_statement: rewritten,
                    });
                }
            }
        }
    }

    if flags.include_drops && !flags.add_only {
        let source_map = keyed_map(source);
        for target_obj in stable_sort(target.objects.iter(), ObjectKind::drop_priority) {
            if source_map.contains_key(&target_obj.key()) {
                continue;
            }
            if target_obj.kind == ObjectKind::Table && !flags.include_table_drops {
                skipped += 1;
                drops.extend(table_drop_skip_comments(target_obj));
            } else {
                drops.push(render_drop(target_obj));
                removed += 1;
            }
        }
    } else if flags.include_drops && flags.add_only {
        skipped += 1;
        drops.push(warning_comment("--include-drops was ignored because --add-only is set"));
    }

    let ordered_creates = order_pending_creates(pending);
    let mut script_creates = creates_comments;
    script_creates.extend(ordered_creates);

    DiffResult {
        script_drops: drops,
        script_creates,
        added,
        changed,
        removed,
        skipped,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Snapshot;
    use chrono::TimeZone;
    use sqldiff_helpers::IndexSet;

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()
    }

    fn view(name: &str, body: &str) -> SchemaObject {
        SchemaObject {
            kind: ObjectKind::View,
            schema: "dbo".into(),
            name: name.into(),
            definition: body.into(),
            dependencies: IndexSet::default(),
        }
    }

    fn table(name: &str, body: &str, deps: Vec<ObjectKey>) -> SchemaObject {
        let mut dependencies = IndexSet::default();
        for d in deps {
            dependencies.insert(d);
        }
        SchemaObject {
            kind: ObjectKind::Table,
            schema: "dbo".into(),
            name: name.into(),
            definition: body.into(),
            dependencies,
        }
    }

    #[test]
    fn identical_snapshot_is_empty() {
        let snap = Snapshot::new("db", ts(), vec![view("V", "SELECT 1")]);
        let result = diff(&snap, &snap, DiffFlags::default(), ts());
        assert!(result.is_empty());
        assert_eq!((result.added, result.changed, result.removed), (0, 0, 0));
    }

    #[test]
    fn new_table_is_added() {
        let source = Snapshot::new("db", ts(), vec![table("T", "CREATE TABLE [dbo].[T] ( [Id] int NOT NULL );\nGO\n", vec![])]);
        let target = Snapshot::new("db", ts(), vec![]);
        let result = diff(&source, &target, DiffFlags::default(), ts());
        assert_eq!(result.added, 1);
        assert!(result.script_creates.iter().any(|l| l.contains("CREATE TABLE [dbo].[T]")));
    }

    #[test]
    fn changed_procedure_uses_create_or_alter() {
        let source = Snapshot::new("db", ts(), vec![SchemaObject {
            kind: ObjectKind::StoredProcedure,
            schema: "dbo".into(),
            name: "P".into(),
            definition: "CREATE PROCEDURE dbo.P AS SELECT 1".into(),
            dependencies: IndexSet::default(),
        }]);
        let target = Snapshot::new("db", ts(), vec![SchemaObject {
            kind: ObjectKind::StoredProcedure,
            schema: "dbo".into(),
            name: "P".into(),
            definition: "CREATE PROCEDURE dbo.P AS SELECT 2".into(),
            dependencies: IndexSet::default(),
        }]);
        let result = diff(&source, &target, DiffFlags::default(), ts());
        assert_eq!(result.changed, 1);
        assert!(result.script_creates.iter().any(|l| l == "CREATE OR ALTER PROCEDURE dbo.P AS SELECT 1"));
    }

    #[test]
    fn changed_table_without_rebuild_emits_comments_only() {
        let source = Snapshot::new("db", ts(), vec![table("T", "CREATE TABLE [dbo].[T] ( [Id] int NULL );\nGO\n", vec![])]);
        let target = Snapshot::new("db", ts(), vec![table("T", "CREATE TABLE [dbo].[T] ( [Id] int NOT NULL );\nGO\n", vec![])]);
        let result = diff(&source, &target, DiffFlags::default(), ts());
        assert_eq!((result.changed, result.skipped), (1, 1));
        assert!(result.script_creates.iter().all(|l| l.starts_with("--")));
    }

    #[test]
    fn dependency_order_places_parent_before_child() {
        let parent_key = ObjectKey::new(ObjectKind::Table, "dbo", "Parent");
        let source = Snapshot::new(
            "db",
            ts(),
            vec![
                table("Child", "CREATE TABLE [dbo].[Child] ( [Id] int NOT NULL );\nGO\n", vec![parent_key]),
                table("Parent", "CREATE TABLE [dbo].[Parent] ( [Id] int NOT NULL );\nGO\n", vec![]),
            ],
        );
        let target = Snapshot::new("db", ts(), vec![]);
        let result = diff(&source, &target, DiffFlags::default(), ts());
        let parent_pos = result.script_creates.iter().position(|l| l.contains("[Parent]")).unwrap();
        let child_pos = result.script_creates.iter().position(|l| l.contains("[Child]")).unwrap();
        assert!(parent_pos < child_pos);
    }

    #[test]
    fn add_only_suppresses_drops() {
        let source = Snapshot::new("db", ts(), vec![view("V", "SELECT 1")]);
        let target = Snapshot::new("db", ts(), vec![view("Old", "SELECT 2")]);
        let flags = DiffFlags { add_only: true, include_drops: true, ..Default::default() };
        let result = diff(&source, &target, flags, ts());
        assert!(result.script_drops.iter().all(|l| !l.contains("DROP")));
        assert!(result.script_creates.iter().all(|l| !l.contains("CREATE OR ALTER")));
    }
}
