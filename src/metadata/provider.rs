//! SchemaCatalog trait definition.
//!
//! The catalog is the read-only view of the hosting database that entities
//! may consult while building their columns: which activity modules are
//! installed and which columns a table has. Entities never talk to a catalog
//! directly; they receive a [`CatalogSnapshot`](super::CatalogSnapshot)
//! captured once per composition.

use thiserror::Error;

use crate::sql::UnsafeIdentifier;

/// Result type for catalog operations.
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Errors raised while reading schema metadata.
///
/// All of these are transient from the point of view of report composition:
/// they are propagated to the caller and never retried here.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("catalog unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    UnsafeIdentifier(#[from] UnsafeIdentifier),
}

/// Read-only access to schema metadata.
pub trait SchemaCatalog {
    /// Names of installed activity modules, as stored by the host.
    ///
    /// Names are returned verbatim and may be unsafe; callers validate them
    /// before interpolation.
    fn installed_modules(&self) -> CatalogResult<Vec<String>>;

    /// Columns of a physical table, or `None` when the table does not exist.
    fn table_columns(&self, table: &str) -> CatalogResult<Option<Vec<String>>>;

    /// Whether `table` exists and has `column`.
    fn column_exists(&self, table: &str, column: &str) -> CatalogResult<bool> {
        Ok(self
            .table_columns(table)?
            .is_some_and(|cols| cols.iter().any(|c| c == column)))
    }
}

impl<T: SchemaCatalog + ?Sized> SchemaCatalog for &T {
    fn installed_modules(&self) -> CatalogResult<Vec<String>> {
        (**self).installed_modules()
    }

    fn table_columns(&self, table: &str) -> CatalogResult<Option<Vec<String>>> {
        (**self).table_columns(table)
    }
}
