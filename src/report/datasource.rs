//! Datasources: entities composed against one base table.
//!
//! A concrete datasource implements [`Datasource::initialise`] with a
//! [`DatasourceBuilder`], calling it in a fixed order:
//!
//! 1. `set_main_table`
//! 2. `add_entity` for each entity (aliases checked, joins accumulated)
//! 3. `add_base_condition`
//! 4. `add_all_from_entity` / `add_from_entity`, then the default lists
//! 5. `set_bulk_action`
//!
//! `build` validates everything and returns a [`ComposedDatasource`].

use std::collections::HashMap;

use serde::Serialize;
use tracing::debug;

use super::column::ColumnSpec;
use super::context::{RenderContext, ReportContext};
use super::entity::{Entity, EntityContext, InitialisedEntity};
use super::error::{ConfigurationError, ReportResult};
use super::filter::{FilterSpec, FilterValue};
use super::identity::SpecId;
use super::label::LangString;
use super::value::Row;
use crate::sql::{
    ComposedQuery, Condition, Identifier, JoinFragment, JoinRegistry, OrderBy, ParamGenerator,
    ParamValue, SelectItem, SortDir,
};

/// An out-of-band action offered on selected rows (e.g. "email selected").
///
/// Opaque to this crate; passed through to the renderer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BulkAction {
    pub identifier: String,
    pub path: String,
    pub trigger_label: LangString,
}

/// A report datasource.
pub trait Datasource {
    /// Stable name used to look the datasource up.
    fn name(&self) -> &'static str;

    fn label(&self) -> LangString;

    /// Compose entities, joins and defaults.
    fn initialise(&self, ctx: &ReportContext) -> ReportResult<ComposedDatasource>;
}

/// Select alias for field `field` of the `column`-th selected column.
pub fn select_alias(column: usize, field: usize) -> String {
    format!("c{column}_{field}")
}

/// Accumulates the pieces of a datasource during initialise.
pub struct DatasourceBuilder<'a> {
    name: String,
    ctx: &'a ReportContext,
    params: ParamGenerator,
    main: Option<(String, String)>,
    alias_tables: HashMap<String, String>,
    entities: Vec<InitialisedEntity>,
    joins: JoinRegistry,
    base_conditions: Vec<Condition>,
    columns: Vec<SpecId>,
    filters: Vec<SpecId>,
    conditions: Vec<SpecId>,
    default_columns: Vec<SpecId>,
    default_filters: Vec<SpecId>,
    default_conditions: Vec<SpecId>,
    default_condition_values: Vec<(SpecId, FilterValue)>,
    default_sort: Vec<(SpecId, SortDir)>,
    bulk_action: Option<BulkAction>,
}

impl<'a> DatasourceBuilder<'a> {
    pub fn new(name: &str, ctx: &'a ReportContext) -> Self {
        Self {
            name: name.to_string(),
            ctx,
            params: ParamGenerator::new(),
            main: None,
            alias_tables: HashMap::new(),
            entities: Vec::new(),
            joins: JoinRegistry::new(),
            base_conditions: Vec::new(),
            columns: Vec::new(),
            filters: Vec::new(),
            conditions: Vec::new(),
            default_columns: Vec::new(),
            default_filters: Vec::new(),
            default_conditions: Vec::new(),
            default_condition_values: Vec::new(),
            default_sort: Vec::new(),
            bulk_action: None,
        }
    }

    /// Parameter generator shared by every condition of this datasource.
    pub fn params(&self) -> &ParamGenerator {
        &self.params
    }

    pub fn context(&self) -> &ReportContext {
        self.ctx
    }

    /// Register the base table (logical name) and its alias.
    pub fn set_main_table(&mut self, table: &str, alias: &str) -> ReportResult<()> {
        let physical = Identifier::parse(self.ctx.table(table))?;
        let alias = Identifier::parse(alias)?;
        self.claim_alias(alias.as_str(), table)?;
        self.joins.reserve_alias(alias.as_str());
        self.main = Some((physical.into_string(), alias.into_string()));
        Ok(())
    }

    /// Initialise `entity` and attach it.
    pub fn add_entity<E: Entity>(&mut self, entity: E) -> ReportResult<()> {
        let ectx = EntityContext {
            catalog: &self.ctx.catalog,
            params: &self.params,
            table_prefix: &self.ctx.table_prefix,
        };
        let entity = entity.initialise(&ectx)?;

        if self.entity(entity.name()).is_some() {
            return Err(ConfigurationError::DuplicateEntity(entity.name().to_string()).into());
        }
        for alias in entity.table_aliases() {
            self.claim_alias(&alias.alias, &alias.table)?;
        }
        debug!(datasource = %self.name, entity = %entity.name(), "attached entity");
        self.entities.push(entity);
        Ok(())
    }

    /// A join included in every query of this datasource.
    pub fn add_join(&mut self, join: JoinFragment) -> ReportResult<()> {
        self.joins.add(join)?;
        Ok(())
    }

    pub fn add_base_condition(&mut self, condition: Condition) {
        self.base_conditions.push(condition);
    }

    /// `field = :fresh` as a base condition.
    pub fn add_base_condition_equals(&mut self, field: &str, value: impl Into<ParamValue>) {
        let condition = Condition::equals(field, value, &self.params);
        self.base_conditions.push(condition);
    }

    /// Expose every column, filter and condition of an attached entity.
    pub fn add_all_from_entity(&mut self, entity: &str) -> ReportResult<()> {
        let attached = self
            .entity(entity)
            .ok_or_else(|| ConfigurationError::UnknownEntity(entity.to_string()))?;
        let columns: Vec<SpecId> = attached.get_all_columns().iter().map(|c| c.id().clone()).collect();
        let filters: Vec<SpecId> = attached.get_all_filters().iter().map(|f| f.id().clone()).collect();
        self.columns.extend(columns);
        self.conditions.extend(filters.iter().cloned());
        self.filters.extend(filters);
        Ok(())
    }

    /// Expose a named subset of an attached entity.
    pub fn add_from_entity(
        &mut self,
        entity: &str,
        columns: &[&str],
        filters: &[&str],
        conditions: &[&str],
    ) -> ReportResult<()> {
        let attached = self
            .entity(entity)
            .ok_or_else(|| ConfigurationError::UnknownEntity(entity.to_string()))?;

        let mut resolved = (Vec::new(), Vec::new(), Vec::new());
        for name in columns {
            let id = SpecId::new(entity, *name);
            if attached.column(name).is_none() {
                return Err(ConfigurationError::UnknownColumn(id).into());
            }
            resolved.0.push(id);
        }
        for name in filters {
            let id = SpecId::new(entity, *name);
            if attached.filter(name).is_none() {
                return Err(ConfigurationError::UnknownFilter(id).into());
            }
            resolved.1.push(id);
        }
        for name in conditions {
            let id = SpecId::new(entity, *name);
            if attached.filter(name).is_none() {
                return Err(ConfigurationError::UnknownCondition(id).into());
            }
            resolved.2.push(id);
        }

        self.columns.extend(resolved.0);
        self.filters.extend(resolved.1);
        self.conditions.extend(resolved.2);
        Ok(())
    }

    pub fn set_default_columns(&mut self, ids: &[&str]) -> ReportResult<()> {
        self.default_columns = parse_ids(ids)?;
        Ok(())
    }

    pub fn set_default_filters(&mut self, ids: &[&str]) -> ReportResult<()> {
        self.default_filters = parse_ids(ids)?;
        Ok(())
    }

    pub fn set_default_conditions(&mut self, ids: &[&str]) -> ReportResult<()> {
        self.default_conditions = parse_ids(ids)?;
        Ok(())
    }

    /// Initial value for one of the default conditions.
    pub fn set_default_condition_value(&mut self, id: &str, value: FilterValue) -> ReportResult<()> {
        self.default_condition_values.push((SpecId::parse(id)?, value));
        Ok(())
    }

    pub fn add_default_sort(&mut self, id: &str, dir: SortDir) -> ReportResult<()> {
        self.default_sort.push((SpecId::parse(id)?, dir));
        Ok(())
    }

    pub fn set_bulk_action(&mut self, identifier: &str, path: &str, trigger_label: LangString) {
        self.bulk_action = Some(BulkAction {
            identifier: identifier.to_string(),
            path: path.to_string(),
            trigger_label,
        });
    }

    /// Validate and freeze.
    pub fn build(self) -> ReportResult<ComposedDatasource> {
        let (base_table, base_alias) = self
            .main
            .clone()
            .ok_or_else(|| ConfigurationError::MissingBaseTable(self.name.clone()))?;

        let composed = ComposedDatasource {
            name: self.name,
            base_table,
            base_alias,
            entities: self.entities,
            joins: self.joins,
            base_conditions: self.base_conditions,
            params: self.params,
            columns: self.columns,
            filters: self.filters,
            conditions: self.conditions,
            default_columns: self.default_columns,
            default_filters: self.default_filters,
            default_conditions: self.default_conditions,
            default_condition_values: self.default_condition_values,
            default_sort: self.default_sort,
            bulk_action: self.bulk_action,
        };
        composed.validate()?;
        debug!(
            datasource = %composed.name,
            entities = composed.entities.len(),
            columns = composed.columns.len(),
            "composed datasource"
        );
        Ok(composed)
    }

    fn entity(&self, name: &str) -> Option<&InitialisedEntity> {
        self.entities.iter().find(|e| e.name() == name)
    }

    fn claim_alias(&mut self, alias: &str, table: &str) -> ReportResult<()> {
        match self.alias_tables.get(alias) {
            Some(existing) if existing != table => Err(ConfigurationError::AliasConflict {
                alias: alias.to_string(),
                first: existing.clone(),
                second: table.to_string(),
            }
            .into()),
            Some(_) => Ok(()),
            None => {
                self.alias_tables.insert(alias.to_string(), table.to_string());
                Ok(())
            }
        }
    }
}

fn parse_ids(ids: &[&str]) -> ReportResult<Vec<SpecId>> {
    ids.iter()
        .map(|id| SpecId::parse(id).map_err(Into::into))
        .collect()
}

/// What a renderer asks for: columns, filter/condition values and sorting.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportSelection {
    pub columns: Vec<SpecId>,
    pub filters: Vec<(SpecId, FilterValue)>,
    pub conditions: Vec<(SpecId, FilterValue)>,
    pub sort: Vec<(SpecId, SortDir)>,
}

impl ReportSelection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn column(mut self, id: SpecId) -> Self {
        self.columns.push(id);
        self
    }

    pub fn filter(mut self, id: SpecId, value: FilterValue) -> Self {
        self.filters.push((id, value));
        self
    }

    pub fn condition(mut self, id: SpecId, value: FilterValue) -> Self {
        self.conditions.push((id, value));
        self
    }

    pub fn sort(mut self, id: SpecId, dir: SortDir) -> Self {
        self.sort.push((id, dir));
        self
    }
}

/// A composed query plus the columns it selects, in select order.
#[derive(Debug, Clone)]
pub struct ComposedReport<'d> {
    pub query: ComposedQuery,
    pub columns: Vec<&'d ColumnSpec>,
}

impl ComposedReport<'_> {
    /// Apply each column's formatter to its raw values in `row`.
    pub fn format_row(&self, row: &Row, ctx: &RenderContext) -> Vec<String> {
        self.columns
            .iter()
            .enumerate()
            .map(|(ci, column)| {
                let values: Vec<_> = (0..column.fields().len())
                    .map(|fi| row.get(&select_alias(ci, fi)).cloned().unwrap_or_default())
                    .collect();
                column.format_values(&values, ctx)
            })
            .collect()
    }
}

/// A fully initialised datasource.
#[derive(Debug)]
pub struct ComposedDatasource {
    name: String,
    base_table: String,
    base_alias: String,
    entities: Vec<InitialisedEntity>,
    joins: JoinRegistry,
    base_conditions: Vec<Condition>,
    params: ParamGenerator,
    columns: Vec<SpecId>,
    filters: Vec<SpecId>,
    conditions: Vec<SpecId>,
    default_columns: Vec<SpecId>,
    default_filters: Vec<SpecId>,
    default_conditions: Vec<SpecId>,
    default_condition_values: Vec<(SpecId, FilterValue)>,
    default_sort: Vec<(SpecId, SortDir)>,
    bulk_action: Option<BulkAction>,
}

impl ComposedDatasource {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn base_table(&self) -> &str {
        &self.base_table
    }

    pub fn base_alias(&self) -> &str {
        &self.base_alias
    }

    pub fn entities(&self) -> &[InitialisedEntity] {
        &self.entities
    }

    pub fn entity(&self, name: &str) -> Option<&InitialisedEntity> {
        self.entities.iter().find(|e| e.name() == name)
    }

    /// Joins every query of this datasource carries.
    pub fn joins(&self) -> &[JoinFragment] {
        self.joins.fragments()
    }

    pub fn base_conditions(&self) -> &[Condition] {
        &self.base_conditions
    }

    pub fn bulk_action(&self) -> Option<&BulkAction> {
        self.bulk_action.as_ref()
    }

    pub fn column(&self, id: &SpecId) -> ReportResult<&ColumnSpec> {
        self.columns
            .contains(id)
            .then(|| self.entity(&id.entity).and_then(|e| e.column(&id.name)))
            .flatten()
            .ok_or_else(|| ConfigurationError::UnknownColumn(id.clone()).into())
    }

    pub fn filter(&self, id: &SpecId) -> ReportResult<&FilterSpec> {
        self.filters
            .contains(id)
            .then(|| self.entity(&id.entity).and_then(|e| e.filter(&id.name)))
            .flatten()
            .ok_or_else(|| ConfigurationError::UnknownFilter(id.clone()).into())
    }

    pub fn condition(&self, id: &SpecId) -> ReportResult<&FilterSpec> {
        self.conditions
            .contains(id)
            .then(|| self.entity(&id.entity).and_then(|e| e.filter(&id.name)))
            .flatten()
            .ok_or_else(|| ConfigurationError::UnknownCondition(id.clone()).into())
    }

    pub fn get_columns(&self) -> Vec<&ColumnSpec> {
        self.resolve_all(&self.columns, Self::column)
    }

    pub fn get_filters(&self) -> Vec<&FilterSpec> {
        self.resolve_all(&self.filters, Self::filter)
    }

    pub fn get_conditions(&self) -> Vec<&FilterSpec> {
        self.resolve_all(&self.conditions, Self::condition)
    }

    pub fn get_default_columns(&self) -> Vec<&ColumnSpec> {
        self.resolve_all(&self.default_columns, Self::column)
    }

    pub fn get_default_filters(&self) -> Vec<&FilterSpec> {
        self.resolve_all(&self.default_filters, Self::filter)
    }

    pub fn get_default_conditions(&self) -> Vec<&FilterSpec> {
        self.resolve_all(&self.default_conditions, Self::condition)
    }

    pub fn default_condition_values(&self) -> &[(SpecId, FilterValue)] {
        &self.default_condition_values
    }

    pub fn default_sort(&self) -> &[(SpecId, SortDir)] {
        &self.default_sort
    }

    /// Selection made of the default columns, condition values and sort.
    pub fn default_selection(&self) -> ReportSelection {
        ReportSelection {
            columns: self.default_columns.clone(),
            filters: Vec::new(),
            conditions: self.default_condition_values.clone(),
            sort: self.default_sort.clone(),
        }
    }

    /// Assemble the query for `selection`.
    ///
    /// Joins are emitted once each: datasource joins first, then the joins of
    /// the selected columns, filters, conditions and sort columns in order.
    pub fn compose(&self, selection: &ReportSelection) -> ReportResult<ComposedReport<'_>> {
        let mut joins = self.joins.clone();
        let mut select = Vec::new();
        let mut columns = Vec::with_capacity(selection.columns.len());

        for (ci, id) in selection.columns.iter().enumerate() {
            let column = self.column(id)?;
            joins.extend(column.joins())?;
            for (fi, field) in column.fields().iter().enumerate() {
                select.push(SelectItem {
                    expr: field.clone(),
                    alias: select_alias(ci, fi),
                });
            }
            columns.push(column);
        }

        let mut conditions = self.base_conditions.clone();
        for (id, value) in &selection.filters {
            let filter = self.filter(id)?;
            if let Some(condition) = filter.to_condition(value, &self.params)? {
                joins.extend(filter.joins())?;
                conditions.push(condition);
            }
        }
        for (id, value) in &selection.conditions {
            let filter = self.condition(id)?;
            if let Some(condition) = filter.to_condition(value, &self.params)? {
                joins.extend(filter.joins())?;
                conditions.push(condition);
            }
        }

        let mut order_by = Vec::new();
        for (id, dir) in &selection.sort {
            let column = self.column(id)?;
            if !column.is_sortable() {
                return Err(ConfigurationError::NotSortable(id.clone()).into());
            }
            joins.extend(column.joins())?;
            order_by.extend(column.fields().iter().map(|field| OrderBy {
                expr: field.clone(),
                dir: *dir,
            }));
        }

        let query = ComposedQuery::new(
            self.base_table.clone(),
            self.base_alias.clone(),
            select,
            joins.fragments().to_vec(),
            conditions,
            order_by,
        )?;
        Ok(ComposedReport { query, columns })
    }

    pub fn compose_default(&self) -> ReportResult<ComposedReport<'_>> {
        self.compose(&self.default_selection())
    }

    fn resolve_all<'s, T>(
        &'s self,
        ids: &[SpecId],
        resolve: fn(&'s Self, &SpecId) -> ReportResult<&'s T>,
    ) -> Vec<&'s T> {
        ids.iter().filter_map(|id| resolve(self, id).ok()).collect()
    }

    /// Fail fast on anything a later compose could trip over.
    fn validate(&self) -> ReportResult<()> {
        for id in &self.default_columns {
            self.column(id)?;
        }
        for id in &self.default_filters {
            self.filter(id)?;
        }
        for id in &self.default_conditions {
            self.condition(id)?;
        }
        for (id, value) in &self.default_condition_values {
            if !self.default_conditions.contains(id) {
                return Err(ConfigurationError::UnknownCondition(id.clone()).into());
            }
            self.condition(id)?.check_value(value)?;
        }
        for (id, _) in &self.default_sort {
            if !self.column(id)?.is_sortable() {
                return Err(ConfigurationError::NotSortable(id.clone()).into());
            }
        }

        // Every join any exposed column or filter may pull in must coexist.
        let mut probe = self.joins.clone();
        for entity in &self.entities {
            probe.extend(entity.joins())?;
        }
        for column in self.get_columns() {
            probe.extend(column.joins())?;
        }
        for filter in self.get_filters().into_iter().chain(self.get_conditions()) {
            probe.extend(filter.joins())?;
        }
        Ok(())
    }
}
