//! Entities: reusable bundles of table aliases, columns and filters.
//!
//! Concrete entities implement [`Entity`] and keep their shared state in an
//! [`EntityCore`]. Initialising an entity consumes it and yields an
//! [`InitialisedEntity`], which is the frozen form a datasource works with.

use std::collections::HashSet;

use tracing::debug;

use super::column::ColumnSpec;
use super::error::{ConfigurationError, ReportResult};
use super::filter::FilterSpec;
use crate::metadata::CatalogSnapshot;
use crate::sql::{Identifier, JoinFragment, ParamGenerator};

/// A logical table and the alias an entity uses for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableAlias {
    pub table: String,
    pub alias: String,
}

/// What an entity may look at while building its columns.
pub struct EntityContext<'a> {
    pub catalog: &'a CatalogSnapshot,
    pub params: &'a ParamGenerator,
    pub table_prefix: &'a str,
}

impl EntityContext<'_> {
    /// Physical name of a logical table.
    pub fn table(&self, logical: &str) -> String {
        format!("{}{logical}", self.table_prefix)
    }
}

/// State every entity carries: its name, declared aliases and extra joins.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityCore {
    name: String,
    aliases: Vec<TableAlias>,
    joins: Vec<JoinFragment>,
}

impl EntityCore {
    /// `tables` lists `(logical table, default alias)` pairs.
    pub fn new(name: &str, tables: &[(&str, &str)]) -> Self {
        Self {
            name: name.to_string(),
            aliases: tables
                .iter()
                .map(|(table, alias)| TableAlias {
                    table: table.to_string(),
                    alias: alias.to_string(),
                })
                .collect(),
            joins: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn table_aliases(&self) -> &[TableAlias] {
        &self.aliases
    }

    pub fn table_alias(&self, table: &str) -> ReportResult<&str> {
        self.aliases
            .iter()
            .find(|a| a.table == table)
            .map(|a| a.alias.as_str())
            .ok_or_else(|| {
                ConfigurationError::UnknownTableAlias {
                    entity: self.name.clone(),
                    table: table.to_string(),
                }
                .into()
            })
    }

    pub fn set_table_alias(&mut self, table: &str, alias: &str) -> ReportResult<()> {
        let alias = Identifier::parse(alias)?;
        let entry = self
            .aliases
            .iter_mut()
            .find(|a| a.table == table)
            .ok_or_else(|| ConfigurationError::UnknownTableAlias {
                entity: self.name.clone(),
                table: table.to_string(),
            })?;
        entry.alias = alias.into_string();
        Ok(())
    }

    pub fn add_join(&mut self, join: JoinFragment) {
        self.joins.push(join);
    }

    /// Put `join` ahead of every join added so far.
    pub fn prepend_join(&mut self, join: JoinFragment) {
        self.joins.insert(0, join);
    }

    pub fn joins(&self) -> &[JoinFragment] {
        &self.joins
    }
}

/// A reportable entity.
///
/// Implementors provide the core and the column/filter builders; the
/// alias, join and initialise plumbing is shared.
pub trait Entity {
    fn core(&self) -> &EntityCore;

    fn core_mut(&mut self) -> &mut EntityCore;

    /// Hook run once before columns and filters are built.
    fn prepare(&mut self, _ctx: &EntityContext<'_>) -> ReportResult<()> {
        Ok(())
    }

    fn build_columns(&self, ctx: &EntityContext<'_>) -> ReportResult<Vec<ColumnSpec>>;

    fn build_filters(&self, ctx: &EntityContext<'_>) -> ReportResult<Vec<FilterSpec>>;

    fn name(&self) -> &str {
        self.core().name()
    }

    fn get_table_alias(&self, table: &str) -> ReportResult<&str> {
        self.core().table_alias(table)
    }

    /// Use `alias` instead of the default alias for `table`.
    fn set_table_alias(mut self, table: &str, alias: &str) -> ReportResult<Self>
    where
        Self: Sized,
    {
        self.core_mut().set_table_alias(table, alias)?;
        Ok(self)
    }

    /// Attach a join that every column and filter of this entity requires.
    fn add_join(mut self, join: JoinFragment) -> Self
    where
        Self: Sized,
    {
        self.core_mut().add_join(join);
        self
    }

    fn add_joins(mut self, joins: impl IntoIterator<Item = JoinFragment>) -> Self
    where
        Self: Sized,
    {
        for join in joins {
            self.core_mut().add_join(join);
        }
        self
    }

    /// Build columns and filters and freeze the entity.
    fn initialise(mut self, ctx: &EntityContext<'_>) -> ReportResult<InitialisedEntity>
    where
        Self: Sized,
    {
        self.prepare(ctx)?;
        let columns = self.build_columns(ctx)?;
        let filters = self.build_filters(ctx)?;
        InitialisedEntity::freeze(self.core().clone(), columns, filters)
    }
}

/// An entity after initialise: immutable columns, filters and aliases.
#[derive(Debug, Clone)]
pub struct InitialisedEntity {
    core: EntityCore,
    columns: Vec<ColumnSpec>,
    filters: Vec<FilterSpec>,
}

impl InitialisedEntity {
    fn freeze(
        core: EntityCore,
        columns: Vec<ColumnSpec>,
        filters: Vec<FilterSpec>,
    ) -> ReportResult<Self> {
        let name = core.name().to_string();

        let mut seen = HashSet::new();
        let columns = columns
            .into_iter()
            .map(|c| c.attach(&name, core.joins()))
            .map(|c| -> ReportResult<ColumnSpec> {
                if c.fields().is_empty() {
                    return Err(ConfigurationError::EmptyColumn(c.id().clone()).into());
                }
                if !seen.insert(c.name().to_string()) {
                    return Err(ConfigurationError::DuplicateColumn(c.id().clone()).into());
                }
                Ok(c)
            })
            .collect::<ReportResult<Vec<_>>>()?;

        let mut seen = HashSet::new();
        let filters = filters
            .into_iter()
            .map(|f| f.attach(&name, core.joins()))
            .map(|f| -> ReportResult<FilterSpec> {
                if !seen.insert(f.name().to_string()) {
                    return Err(ConfigurationError::DuplicateFilter(f.id().clone()).into());
                }
                Ok(f)
            })
            .collect::<ReportResult<Vec<_>>>()?;

        debug!(
            entity = %name,
            columns = columns.len(),
            filters = filters.len(),
            "initialised entity"
        );
        Ok(Self {
            core,
            columns,
            filters,
        })
    }

    pub fn name(&self) -> &str {
        self.core.name()
    }

    pub fn get_table_alias(&self, table: &str) -> ReportResult<&str> {
        self.core.table_alias(table)
    }

    pub fn table_aliases(&self) -> &[TableAlias] {
        self.core.table_aliases()
    }

    pub fn joins(&self) -> &[JoinFragment] {
        self.core.joins()
    }

    pub fn get_all_columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    pub fn get_all_filters(&self) -> &[FilterSpec] {
        &self.filters
    }

    pub fn column(&self, name: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|c| c.name() == name)
    }

    pub fn filter(&self, name: &str) -> Option<&FilterSpec> {
        self.filters.iter().find(|f| f.name() == name)
    }
}
