use sqldiff_catalog::{apply_script, connect, ConnectionSpec};

use crate::commands::ApplyArgs;

pub async fn run_apply(args: ApplyArgs) -> i32 {
    match run(args).await {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("{e}");
            1
        }
    }
}

async fn run(args: ApplyArgs) -> sqldiff_core::Result<()> {
    let script = std::fs::read_to_string(&args.script)?;
    let spec = ConnectionSpec::parse(&args.conn)?;
    let mut client = connect(&spec, args.timeout_seconds).await?;
    let outcome = apply_script(&mut client, &script, args.dry_run, args.timeout_seconds).await?;
    log::info!("applied {}/{} batch(es)", outcome.batches_executed, outcome.batches_total);
    Ok(())
}
