use clap::Parser as _;

use crate::commands::{Cli, Commands};

pub mod commands;
mod commands_apply;
mod commands_check_conn;
mod commands_diff;
mod commands_extract;
mod commands_sync;
mod logger;
mod resolve;

pub fn run_with_args<I, T>(args: I) -> i32
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let _ = logger::init();
    let cli = Cli::parse_from(args);

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("failed to start async runtime: {e}");
            return 1;
        }
    };

    runtime.block_on(dispatch(cli.command))
}

async fn dispatch(command: Commands) -> i32 {
    match command {
        Commands::Extract(args) => commands_extract::run_extract(args).await,
        Commands::Diff(args) => commands_diff::run_diff(args, false).await,
        Commands::Drift(args) => commands_diff::run_diff(args, true).await,
        Commands::Sync(args) => commands_sync::run_sync(args, false).await,
        Commands::Deploy(args) => commands_sync::run_sync(args, true).await,
        Commands::Apply(args) => commands_apply::run_apply(args).await,
        Commands::CheckConn(args) => commands_check_conn::run_check_conn(args).await,
    }
}
