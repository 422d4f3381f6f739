pub mod batch;
pub mod connection;
mod error;
pub mod probe;
pub mod reader;

pub use batch::{apply_script, split_batches, ApplyOutcome};
pub use connection::{connect, ConnectionSpec, SqlClient};
pub use error::map_tiberius;
pub use probe::{probe, ConnectionInfo};
pub use reader::{read_snapshot, CatalogReader};
