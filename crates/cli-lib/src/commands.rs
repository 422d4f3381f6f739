use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "sqldiff")]
#[command(about = "Compares SQL-Server-family schemas and emits a migration script", long_about = None, version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    #[command(name = "extract", about = "Write a full schema script (and optional snapshot document) from one database")]
    Extract(ExtractArgs),
    #[command(name = "diff", about = "Write a migration script transforming target into source")]
    Diff(DiffArgs),
    #[command(name = "drift", about = "Like diff, but defaults to reporting all drops and exits 2 on any change")]
    Drift(DiffArgs),
    #[command(name = "sync", about = "Write a diff script and optionally apply it to the target")]
    Sync(SyncArgs),
    #[command(name = "deploy", alias = "delta-apply", about = "Diff and always apply the result to the target")]
    Deploy(SyncArgs),
    #[command(name = "apply", about = "Split a script on batch separators and execute it against a connection")]
    Apply(ApplyArgs),
    #[command(name = "check-conn", about = "Report server/db/login/version/edition for one or two connections")]
    CheckConn(CheckConnArgs),
}

#[derive(Debug, Parser)]
pub struct ExtractArgs {
    /// Connection string: server=<host>[,<port>];database=<db>;user=<u>;password=<p>
    #[arg(long)]
    pub conn: String,
    #[arg(long, default_value = "schema.sql")]
    pub out: String,
    /// Also write a snapshot document (JSON) to this path.
    #[arg(long)]
    pub json: Option<String>,
    #[arg(long, default_value_t = 120)]
    pub timeout_seconds: u64,
}

/// Either side of a comparison is a live connection or a persisted
/// snapshot document; exactly one of each pair is expected.
#[derive(Debug, Parser)]
pub struct SnapshotSource {
    #[arg(long)]
    pub source_conn: Option<String>,
    #[arg(long)]
    pub source_snapshot: Option<String>,
    #[arg(long)]
    pub target_conn: Option<String>,
    #[arg(long)]
    pub target_snapshot: Option<String>,
}

#[derive(Debug, Parser)]
pub struct DiffFlagArgs {
    #[arg(long)]
    pub include_drops: bool,
    #[arg(long)]
    pub include_table_drops: bool,
    #[arg(long)]
    pub allow_table_rebuild: bool,
    #[arg(long)]
    pub add_only: bool,
}

#[derive(Debug, Parser)]
pub struct DiffArgs {
    #[command(flatten)]
    pub sources: SnapshotSource,
    #[command(flatten)]
    pub flags: DiffFlagArgs,
    #[arg(long, default_value = "diff.sql")]
    pub out: String,
    #[arg(long, default_value_t = 120)]
    pub timeout_seconds: u64,
}

#[derive(Debug, Parser)]
pub struct SyncArgs {
    #[command(flatten)]
    pub sources: SnapshotSource,
    #[command(flatten)]
    pub flags: DiffFlagArgs,
    #[arg(long, default_value = "sync.diff.sql")]
    pub out: String,
    #[arg(long)]
    pub apply: bool,
    #[arg(long)]
    pub dry_run: bool,
    #[arg(long, default_value_t = 120)]
    pub timeout_seconds: u64,
}

#[derive(Debug, Parser)]
pub struct ApplyArgs {
    #[arg(long)]
    pub conn: String,
    #[arg(long)]
    pub script: String,
    #[arg(long)]
    pub dry_run: bool,
    #[arg(long, default_value_t = 120)]
    pub timeout_seconds: u64,
}

#[derive(Debug, Parser)]
pub struct CheckConnArgs {
    #[arg(long)]
    pub source_conn: Option<String>,
    #[arg(long)]
    pub target_conn: Option<String>,
    #[arg(long, default_value_t = 15)]
    pub timeout_seconds: u64,
}
