//! Log storage seam and its SQLite implementation.

use std::path::Path;

use rusqlite::{params, Connection};

use super::{CleanupError, CleanupResult};
use crate::sql::Identifier;

/// Where aged log rows live.
pub trait LogStore {
    /// Smallest timestamp strictly below `cutoff`, if any row qualifies.
    fn oldest_before(&self, cutoff: i64) -> CleanupResult<Option<i64>>;

    /// Delete every row with a timestamp strictly below `ceiling`.
    /// Returns the number of rows deleted.
    fn delete_before(&mut self, ceiling: i64) -> CleanupResult<usize>;
}

/// A log table in a SQLite database.
pub struct SqliteLogStore {
    conn: Connection,
    table: Identifier,
    column: Identifier,
}

impl SqliteLogStore {
    /// Open the database at `path`.
    pub fn open(path: impl AsRef<Path>, table: &str, column: &str) -> CleanupResult<Self> {
        let conn = Connection::open(path)?;
        Self::with_connection(conn, table, column)
    }

    /// Wrap an existing connection (in-memory databases in tests).
    pub fn with_connection(conn: Connection, table: &str, column: &str) -> CleanupResult<Self> {
        let table = Identifier::parse(table).map_err(CleanupError::InvalidTable)?;
        let column = Identifier::parse(column).map_err(CleanupError::InvalidColumn)?;
        Ok(Self {
            conn,
            table,
            column,
        })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Rows currently in the table.
    pub fn count(&self) -> CleanupResult<i64> {
        let sql = format!("SELECT COUNT(1) FROM {}", self.table);
        Ok(self.conn.query_row(&sql, [], |row| row.get(0))?)
    }
}

impl LogStore for SqliteLogStore {
    fn oldest_before(&self, cutoff: i64) -> CleanupResult<Option<i64>> {
        let sql = format!(
            "SELECT MIN({col}) FROM {table} WHERE {col} < ?1",
            col = self.column,
            table = self.table
        );
        let oldest: Option<i64> = self.conn.query_row(&sql, params![cutoff], |row| row.get(0))?;
        Ok(oldest)
    }

    fn delete_before(&mut self, ceiling: i64) -> CleanupResult<usize> {
        let sql = format!(
            "DELETE FROM {table} WHERE {col} < ?1",
            col = self.column,
            table = self.table
        );
        Ok(self.conn.execute(&sql, params![ceiling])?)
    }
}
