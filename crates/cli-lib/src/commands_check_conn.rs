use sqldiff_catalog::{connect, probe, ConnectionInfo, ConnectionSpec};

use crate::commands::CheckConnArgs;

pub async fn run_check_conn(args: CheckConnArgs) -> i32 {
    if args.source_conn.is_none() && args.target_conn.is_none() {
        eprintln!("check-conn: at least one of --source-conn or --target-conn is required");
        return 1;
    }

    let mut ok = true;
    if let Some(conn) = &args.source_conn {
        ok &= report("source", conn, args.timeout_seconds).await;
    }
    if let Some(conn) = &args.target_conn {
        ok &= report("target", conn, args.timeout_seconds).await;
    }
    if ok {
        0
    } else {
        1
    }
}

async fn report(label: &str, conn: &str, timeout_seconds: u64) -> bool {
    match probe_one(conn, timeout_seconds).await {
        Ok(info) => {
            println!(
                "{label}: server={} database={} login={} version={} edition={}",
                info.server, info.database, info.login, info.version, info.edition
            );
            true
        }
        Err(e) => {
            eprintln!("{label}: {e}");
            false
        }
    }
}

async fn probe_one(conn: &str, timeout_seconds: u64) -> sqldiff_core::Result<ConnectionInfo> {
    let spec = ConnectionSpec::parse(conn)?;
    let mut client = connect(&spec, timeout_seconds).await?;
    probe(&mut client).await
}
