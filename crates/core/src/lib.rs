pub mod catalog_model;
pub mod composer;
pub mod differ;
pub mod error;
pub mod model;
pub mod normalize;
pub mod orderer;
pub mod scripter;

pub use composer::compose_script;
pub use differ::{diff, DiffFlags, DiffResult};
pub use error::{Result, SqlDiffError};
pub use model::{quote_identifier, ObjectKey, ObjectKind, PendingCreate, SchemaObject, Snapshot};
pub use normalize::normalize;

#[cfg(test)]
mod integration_tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use sqldiff_helpers::IndexSet;

    fn ts() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn empty_diff_composes_to_header_only() {
        let snap = Snapshot::new(
            "AppDb",
            ts(),
            vec![SchemaObject {
                kind: ObjectKind::View,
                schema: "dbo".into(),
                name: "V".into(),
                definition: "CREATE VIEW dbo.V AS SELECT 1".into(),
                dependencies: IndexSet::default(),
            }],
        );
        let result = diff(&snap, &snap, DiffFlags::default(), ts());
        assert!(result.is_empty());
        let script = compose_script("AppDb", "AppDb", ts(), &result.script_drops, &result.script_creates);
        assert!(!script.contains("Drops"));
        assert!(!script.contains("Creates"));
    }
}
