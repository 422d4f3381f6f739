use sqldiff_core::SqlDiffError;
use tiberius::error::Error as TiberiusError;

pub fn map_tiberius(context: &str, err: TiberiusError) -> SqlDiffError {
    SqlDiffError::Catalog(format!("{context}: {err}"))
}

pub(crate) trait OptionalColumn<T> {
    fn required(self, column: &str) -> sqldiff_core::Result<T>;
}

impl<T> OptionalColumn<T> for Option<T> {
    fn required(self, column: &str) -> sqldiff_core::Result<T> {
        self.ok_or_else(|| SqlDiffError::Catalog(format!("unexpected null in required column {column:?}")))
    }
}
