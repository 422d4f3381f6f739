use sqldiff_catalog::{connect, read_snapshot, ConnectionSpec};
use sqldiff_core::ObjectKind;
use tokio_util::sync::CancellationToken;

use crate::commands::ExtractArgs;

pub async fn run_extract(args: ExtractArgs) -> i32 {
    match run(args).await {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("{e}");
            1
        }
    }
}

async fn run(args: ExtractArgs) -> sqldiff_core::Result<()> {
    let spec = ConnectionSpec::parse(&args.conn)?;
    let mut client = connect(&spec, args.timeout_seconds).await?;
    let snapshot = read_snapshot(&mut client, &spec.database, CancellationToken::new()).await?;

    let mut script = format!("-- SQLDiff extract: {}\n\n", snapshot.database_name);
    for object in &snapshot.objects {
        if object.kind == ObjectKind::Table {
            script.push_str(&object.definition);
        } else {
            script.push_str(&object.definition);
            script.push_str("\nGO\n");
        }
        script.push('\n');
    }
    std::fs::write(&args.out, &script)?;

    if let Some(json_path) = &args.json {
        let document = serde_json::to_string_pretty(&snapshot)?;
        std::fs::write(json_path, document)?;
    }

    log::info!("extracted {} object(s) from {}", snapshot.objects.len(), snapshot.database_name);
    Ok(())
}
