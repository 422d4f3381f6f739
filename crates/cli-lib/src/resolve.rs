use sqldiff_catalog::{connect, read_snapshot, ConnectionSpec};
use sqldiff_core::{Snapshot, SqlDiffError};
use tokio_util::sync::CancellationToken;

/// Resolves one side of a comparison from either a live connection or a
/// persisted snapshot document. Exactly one of `conn`/`snapshot_path` must
/// be set.
pub async fn resolve_snapshot(
    label: &str,
    conn: Option<&str>,
    snapshot_path: Option<&str>,
    timeout_seconds: u64,
) -> sqldiff_core::Result<Snapshot> {
    match (conn, snapshot_path) {
        (Some(conn_str), None) => {
            let spec = ConnectionSpec::parse(conn_str)?;
            let mut client = connect(&spec, timeout_seconds).await?;
            read_snapshot(&mut client, &spec.database, CancellationToken::new()).await
        }
        (None, Some(path)) => {
            let text = std::fs::read_to_string(path).map_err(SqlDiffError::Io)?;
            serde_json::from_str(&text).map_err(SqlDiffError::from)
        }
        (Some(_), Some(_)) => Err(SqlDiffError::Invocation(format!(
            "{label}: specify either a connection or a snapshot file, not both"
        ))),
        (None, None) => Err(SqlDiffError::Invocation(format!(
            "{label}: missing both connection and snapshot file"
        ))),
    }
}

/// Resolves source and target concurrently: each side opens its own
/// connection, so extraction can overlap per the catalog reader's
/// concurrency model.
pub async fn resolve_pair(
    source_conn: Option<&str>,
    source_snapshot: Option<&str>,
    target_conn: Option<&str>,
    target_snapshot: Option<&str>,
    timeout_seconds: u64,
) -> sqldiff_core::Result<(Snapshot, Snapshot)> {
    tokio::try_join!(
        resolve_snapshot("source", source_conn, source_snapshot, timeout_seconds),
        resolve_snapshot("target", target_conn, target_snapshot, timeout_seconds),
    )
}
