/// The four error kinds named by the diff engine's error taxonomy: invocation
/// (bad flags), I/O (files, connections), catalog (unexpected catalog shape),
/// and composition (asking the scripter/composer to do something it has no
/// rule for). All four surface the same way: a single diagnostic line and a
/// non-zero exit.
#[derive(Debug, thiserror::Error)]
pub enum SqlDiffError {
    #[error("{0}")]
    Invocation(String),
    #[error("{0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Catalog(String),
    #[error("{0}")]
    Composition(String),
    #[error("invalid snapshot document: {0}")]
    Snapshot(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SqlDiffError>;
