use chrono::Utc;
use sqldiff_catalog::{apply_script, connect, ConnectionSpec};
use sqldiff_core::{compose_script, diff};

use crate::commands::SyncArgs;
use crate::commands_diff::flags_from_args;
use crate::resolve::resolve_pair;

/// Shared implementation for `sync` and `deploy`/`delta-apply`. `deploy`
/// forces `apply = true` regardless of what the caller passed.
pub async fn run_sync(args: SyncArgs, force_apply: bool) -> i32 {
    match run(args, force_apply).await {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("{e}");
            1
        }
    }
}

async fn run(args: SyncArgs, force_apply: bool) -> sqldiff_core::Result<()> {
    let apply = args.apply || force_apply;

    let (source, target) = resolve_pair(
        args.sources.source_conn.as_deref(),
        args.sources.source_snapshot.as_deref(),
        args.sources.target_conn.as_deref(),
        args.sources.target_snapshot.as_deref(),
        args.timeout_seconds,
    )
    .await?;

    let flags = flags_from_args(&args.flags, false);
    let generated_at = Utc::now();
    let result = diff(&source, &target, flags, generated_at);
    let script = compose_script(
        &source.database_name,
        &target.database_name,
        generated_at,
        &result.script_drops,
        &result.script_creates,
    );
    std::fs::write(&args.out, &script)?;

    log::info!(
        "added={} changed={} removed={} skipped={}",
        result.added,
        result.changed,
        result.removed,
        result.skipped
    );

    if apply {
        let target_conn = args.sources.target_conn.as_deref().ok_or_else(|| {
            sqldiff_core::SqlDiffError::Invocation("applying requires --target-conn".to_string())
        })?;
        let spec = ConnectionSpec::parse(target_conn)?;
        let mut client = connect(&spec, args.timeout_seconds).await?;
        let outcome = apply_script(&mut client, &script, args.dry_run, args.timeout_seconds).await?;
        log::info!("applied {}/{} batch(es)", outcome.batches_executed, outcome.batches_total);
    }

    Ok(())
}
