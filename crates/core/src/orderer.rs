//! Kahn's topological sort over the dependency graph restricted to a
//! pending-create set, with deterministic tie-breaking and a cycle
//! fallback that never blocks the pipeline.

use sqldiff_helpers::{IndexMap, IndexSet};

use crate::model::{ObjectKey, PendingCreate};

fn tie_break_key(pc: &PendingCreate) -> (u8, ObjectKey) {
    (pc.object.kind.create_priority(), pc.object.key())
}

fn insert_sorted(ready: &mut Vec<ObjectKey>, key: ObjectKey, rank: &IndexMap<ObjectKey, (u8, ObjectKey)>) {
    let key_rank = &rank[&key];
    let pos = ready
        .iter()
        .position(|existing| &rank[existing] > key_rank)
        .unwrap_or(ready.len());
    ready.insert(pos, key);
}

/// Deduplicates by key (first occurrence wins), builds edges `d -> n` for
/// every dependency `d` present in the pending set, then runs Kahn's
/// algorithm with `(create_priority, key)` as the deterministic tie-break.
/// Nodes left over after the pop loop (a cycle) are appended after a
/// warning comment, themselves ordered by the same tie-break.
pub fn order_pending_creates(pending: Vec<PendingCreate>) -> Vec<String> {
    let mut nodes: IndexMap<ObjectKey, PendingCreate> = IndexMap::default();
    for pc in pending {
        let key = pc.object.key();
        nodes.entry(key).or_insert(pc);
    }

    let rank: IndexMap<ObjectKey, (u8, ObjectKey)> =
        nodes.iter().map(|(k, pc)| (k.clone(), tie_break_key(pc))).collect();

    let mut in_degree: IndexMap<ObjectKey, u32> = nodes.keys().map(|k| (k.clone(), 0)).collect();
    let mut successors: IndexMap<ObjectKey, Vec<ObjectKey>> = IndexMap::default();

    for (key, pc) in &nodes {
        let mut seen: IndexSet<ObjectKey> = IndexSet::default();
        for dep in &pc.object.dependencies {
            if dep == key || !nodes.contains_key(dep) || !seen.insert(dep.clone()) {
                continue;
            }
            successors.entry(dep.clone()).or_default().push(key.clone());
            *in_degree.get_mut(key).unwrap() += 1;
        }
    }

    let mut ready: Vec<ObjectKey> = in_degree
        .iter()
        .filter(|(_, deg)| **deg == 0)
        .map(|(k, _)| k.clone())
        .collect();
    ready.sort_by(|a, b| rank[a].cmp(&rank[b]));

    let mut output_keys: Vec<ObjectKey> = Vec::with_capacity(nodes.len());
    while !ready.is_empty() {
        let key = ready.remove(0);
        output_keys.push(key.clone());
        if let Some(succ) = successors.get(&key) {
            for s in succ.clone() {
                let deg = in_degree.get_mut(&s).unwrap();
                *deg -= 1;
                if *deg == 0 {
                    insert_sorted(&mut ready, s, &rank);
                }
            }
        }
    }

    let mut rendered: Vec<String> = output_keys
        .iter()
        .map(|k| nodes[k].rendered_statement.clone())
        .collect();

    if output_keys.len() < nodes.len() {
        let emitted: IndexSet<ObjectKey> = output_keys.into_iter().collect();
        let mut remaining: Vec<&ObjectKey> = nodes.keys().filter(|k| !emitted.contains(*k)).collect();
        remaining.sort_by(|a, b| rank[*a].cmp(&rank[*b]));
        rendered.push("-- WARNING: cyclic dependency detected among pending creates; order below is best-effort".to_string());
        for key in remaining {
            rendered.push(nodes[key].rendered_statement.clone());
        }
    }

    rendered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ObjectKind, SchemaObject};
    use sqldiff_helpers::IndexSet as HelperSet;

    fn pc(kind: ObjectKind, name: &str, deps: &[ObjectKey]) -> PendingCreate {
        let mut dependencies = HelperSet::default();
        for d in deps {
            dependencies.insert(d.clone());
        }
        let object = SchemaObject {
            kind,
            schema: "dbo".into(),
            name: name.into(),
            definition: format!("CREATE-{name}"),
            dependencies,
        };
        PendingCreate { rendered_statement: object.definition.clone(), object }
    }

    #[test]
    fn orders_by_dependency() {
        let parent_key = ObjectKey::new(ObjectKind::Table, "dbo", "Parent");
        let nodes = vec![
            pc(ObjectKind::Table, "Child", &[parent_key.clone()]),
            pc(ObjectKind::Table, "Parent", &[]),
        ];
        let out = order_pending_creates(nodes);
        let parent_pos = out.iter().position(|s| s == "CREATE-Parent").unwrap();
        let child_pos = out.iter().position(|s| s == "CREATE-Child").unwrap();
        assert!(parent_pos < child_pos);
    }

    #[test]
    fn ties_break_by_priority_then_key() {
        let nodes = vec![
            pc(ObjectKind::View, "B", &[]),
            pc(ObjectKind::Table, "A", &[]),
            pc(ObjectKind::View, "A", &[]),
        ];
        let out = order_pending_creates(nodes);
        assert_eq!(out, vec!["CREATE-A".to_string(), "CREATE-A".to_string(), "CREATE-B".to_string()]);
    }

    #[test]
    fn cycle_falls_back_with_warning_and_keeps_all_members() {
        let a_key = ObjectKey::new(ObjectKind::View, "dbo", "A");
        let b_key = ObjectKey::new(ObjectKind::View, "dbo", "B");
        let nodes = vec![pc(ObjectKind::View, "A", &[b_key]), pc(ObjectKind::View, "B", &[a_key])];
        let out = order_pending_creates(nodes);
        assert!(out.iter().any(|l| l.contains("WARNING")));
        assert!(out.iter().any(|l| l == "CREATE-A"));
        assert!(out.iter().any(|l| l == "CREATE-B"));
        assert_eq!(out.iter().filter(|l| l.starts_with("CREATE-")).count(), 2);
    }

    #[test]
    fn duplicate_keys_first_occurrence_wins() {
        let mut nodes = vec![pc(ObjectKind::Table, "T", &[])];
        let mut second = pc(ObjectKind::Table, "T", &[]);
        second.rendered_statement = "SHOULD-NOT-WIN".to_string();
        nodes.push(second);
        let out = order_pending_creates(nodes);
        assert_eq!(out, vec!["CREATE-T".to_string()]);
    }
}
