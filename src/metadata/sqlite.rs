//! SQLite-backed schema catalog.

use rusqlite::{params, Connection};

use super::provider::{CatalogResult, SchemaCatalog};
use crate::sql::Identifier;

/// Reads the module registry and table layouts from a SQLite database.
///
/// Installed modules are the visible rows of `{prefix}modules`.
pub struct SqliteCatalog<'a> {
    conn: &'a Connection,
    modules_table: Identifier,
}

impl<'a> SqliteCatalog<'a> {
    pub fn new(conn: &'a Connection, table_prefix: &str) -> CatalogResult<Self> {
        let modules_table = Identifier::parse(format!("{table_prefix}modules"))?;
        Ok(Self {
            conn,
            modules_table,
        })
    }
}

impl SchemaCatalog for SqliteCatalog<'_> {
    fn installed_modules(&self) -> CatalogResult<Vec<String>> {
        if self.table_columns(self.modules_table.as_str())?.is_none() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT name FROM {} WHERE visible = 1 ORDER BY name",
            self.modules_table
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(names)
    }

    fn table_columns(&self, table: &str) -> CatalogResult<Option<Vec<String>>> {
        let mut stmt = self
            .conn
            .prepare("SELECT name FROM pragma_table_info(?1) ORDER BY cid")?;
        let columns = stmt
            .query_map(params![table], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(if columns.is_empty() { None } else { Some(columns) })
    }
}
