use chrono::Utc;
use sqldiff_core::{compose_script, diff, DiffFlags};

use crate::commands::{DiffArgs, DiffFlagArgs};
use crate::resolve::resolve_pair;

/// Runs a diff and writes the composed script to `args.out`. `drift` sets
/// `defaults_to_full_drops` so `--include-drops`/`--include-table-drops`
/// default on and the exit code reflects whether anything changed.
pub async fn run_diff(args: DiffArgs, drift_mode: bool) -> i32 {
    match run(args, drift_mode).await {
        Ok(result) => {
            if drift_mode && !result.is_empty() {
                2
            } else {
                0
            }
        }
        Err(e) => {
            eprintln!("{e}");
            1
        }
    }
}

pub(crate) fn flags_from_args(flags: &DiffFlagArgs, drift_mode: bool) -> DiffFlags {
    DiffFlags {
        include_drops: flags.include_drops || drift_mode,
        include_table_drops: flags.include_table_drops || drift_mode,
        allow_table_rebuild: flags.allow_table_rebuild,
        add_only: flags.add_only,
    }
}

async fn run(args: DiffArgs, drift_mode: bool) -> sqldiff_core::Result<sqldiff_core::DiffResult> {
    let (source, target) = resolve_pair(
        args.sources.source_conn.as_deref(),
        args.sources.source_snapshot.as_deref(),
        args.sources.target_conn.as_deref(),
        args.sources.target_snapshot.as_deref(),
        args.timeout_seconds,
    )
    .await?;

    let flags = flags_from_args(&args.flags, drift_mode);
    let generated_at = Utc::now();
    let result = diff(&source, &target, flags, generated_at);
    let script = compose_script(
        &source.database_name,
        &target.database_name,
        generated_at,
        &result.script_drops,
        &result.script_creates,
    );
    std::fs::write(&args.out, script)?;

    log::info!(
        "added={} changed={} removed={} skipped={}",
        result.added,
        result.changed,
        result.removed,
        result.skipped
    );
    Ok(result)
}
