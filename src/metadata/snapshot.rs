//! Point-in-time catalog data handed to entities.

use std::collections::{BTreeMap, HashMap};

use tracing::{debug, warn};

use super::provider::{CatalogResult, SchemaCatalog};
use crate::sql::is_safe_identifier;

/// Catalog contents captured once at composition time.
///
/// Table keys are logical names (no prefix). Module names are kept verbatim,
/// including unsafe ones, so that entities can decide how to reject them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogSnapshot {
    modules: Vec<String>,
    tables: HashMap<String, Vec<String>>,
}

impl CatalogSnapshot {
    /// Read installed modules and the columns of each module's table.
    ///
    /// Tables in `extra_tables` are captured as well. Unsafe module names
    /// are recorded but their tables are never looked up.
    pub fn capture(
        catalog: &dyn SchemaCatalog,
        table_prefix: &str,
        extra_tables: &[&str],
    ) -> CatalogResult<Self> {
        let modules = catalog.installed_modules()?;
        let mut tables = HashMap::new();

        let lookups = modules
            .iter()
            .map(String::as_str)
            .chain(extra_tables.iter().copied());
        for logical in lookups {
            if !is_safe_identifier(logical) {
                warn!(module = %logical, "skipping catalog lookup for unsafe name");
                continue;
            }
            let physical = format!("{table_prefix}{logical}");
            if let Some(columns) = catalog.table_columns(&physical)? {
                tables.insert(logical.to_string(), columns);
            }
        }

        debug!(
            modules = modules.len(),
            tables = tables.len(),
            "captured catalog snapshot"
        );
        Ok(Self { modules, tables })
    }

    /// Snapshot built directly from known data.
    pub fn from_parts(modules: Vec<String>, tables: HashMap<String, Vec<String>>) -> Self {
        Self { modules, tables }
    }

    pub fn modules(&self) -> &[String] {
        &self.modules
    }

    pub fn has_table(&self, table: &str) -> bool {
        self.tables.contains_key(table)
    }

    pub fn has_column(&self, table: &str, column: &str) -> bool {
        self.tables
            .get(table)
            .is_some_and(|cols| cols.iter().any(|c| c == column))
    }
}

/// In-memory catalog, used by the CLI when no database is given and by tests.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    modules: Vec<String>,
    tables: BTreeMap<String, Vec<String>>,
}

impl StaticCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an installed module whose table has `columns`.
    ///
    /// `table` is the physical table name (prefix included).
    pub fn with_module(mut self, name: &str, table: &str, columns: &[&str]) -> Self {
        self.modules.push(name.to_string());
        self.tables.insert(
            table.to_string(),
            columns.iter().map(|c| c.to_string()).collect(),
        );
        self
    }

    /// Register an installed module name without any table behind it.
    pub fn with_module_name(mut self, name: &str) -> Self {
        self.modules.push(name.to_string());
        self
    }

    pub fn with_table(mut self, table: &str, columns: &[&str]) -> Self {
        self.tables.insert(
            table.to_string(),
            columns.iter().map(|c| c.to_string()).collect(),
        );
        self
    }

    /// Modules that follow the standard activity layout (`id`, `course`, `name`).
    pub fn with_standard_modules(self, prefix: &str, names: &[&str]) -> Self {
        names.iter().fold(self, |catalog, name| {
            let table = format!("{prefix}{name}");
            catalog.with_module(name, &table, &["id", "course", "name"])
        })
    }
}

impl SchemaCatalog for StaticCatalog {
    fn installed_modules(&self) -> CatalogResult<Vec<String>> {
        Ok(self.modules.clone())
    }

    fn table_columns(&self, table: &str) -> CatalogResult<Option<Vec<String>>> {
        Ok(self.tables.get(table).cloned())
    }
}
