//! Reportable columns.

use serde::Serialize;

use super::context::RenderContext;
use super::format::Formatter;
use super::identity::SpecId;
use super::label::LangString;
use super::value::Value;
use crate::sql::JoinFragment;

/// Semantic type of a column's values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    #[default]
    Text,
    Integer,
    Float,
    Boolean,
    Timestamp,
}

/// One reportable field.
///
/// Built with the fluent methods below, then handed to an entity, which
/// stamps it with the entity name and the entity's joins. After that the
/// column is only reachable through shared references.
#[derive(Debug, Clone, PartialEq)]
#[must_use = "builders have no effect until used"]
pub struct ColumnSpec {
    id: SpecId,
    label: LangString,
    column_type: ColumnType,
    fields: Vec<String>,
    sortable: bool,
    formatter: Option<Formatter>,
    joins: Vec<JoinFragment>,
}

impl ColumnSpec {
    pub fn new(name: &str, label: LangString) -> Self {
        Self {
            id: SpecId::new("", name),
            label,
            column_type: ColumnType::default(),
            fields: Vec::new(),
            sortable: false,
            formatter: None,
            joins: Vec::new(),
        }
    }

    pub fn set_type(mut self, column_type: ColumnType) -> Self {
        self.column_type = column_type;
        self
    }

    pub fn add_field(mut self, sql: impl Into<String>) -> Self {
        self.fields.push(sql.into());
        self
    }

    pub fn add_fields(mut self, fields: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.fields.extend(fields.into_iter().map(Into::into));
        self
    }

    pub fn add_join(mut self, join: JoinFragment) -> Self {
        self.joins.push(join);
        self
    }

    pub fn add_joins(mut self, joins: impl IntoIterator<Item = JoinFragment>) -> Self {
        self.joins.extend(joins);
        self
    }

    pub fn set_sortable(mut self, sortable: bool) -> Self {
        self.sortable = sortable;
        self
    }

    pub fn set_formatter(mut self, formatter: Formatter) -> Self {
        self.formatter = Some(formatter);
        self
    }

    /// Stamp the owning entity and put its joins ahead of the column's own.
    pub(crate) fn attach(mut self, entity: &str, entity_joins: &[JoinFragment]) -> Self {
        self.id.entity = entity.to_string();
        let own = std::mem::take(&mut self.joins);
        self.joins = entity_joins.iter().cloned().chain(own).collect();
        self
    }

    pub fn id(&self) -> &SpecId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.id.name
    }

    pub fn label(&self) -> &LangString {
        &self.label
    }

    pub fn column_type(&self) -> ColumnType {
        self.column_type
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn is_sortable(&self) -> bool {
        self.sortable
    }

    pub fn formatter(&self) -> Option<&Formatter> {
        self.formatter.as_ref()
    }

    pub fn joins(&self) -> &[JoinFragment] {
        &self.joins
    }

    /// Display text for the raw values of this column's fields.
    ///
    /// The formatter sees the first field; extra fields exist for sorting.
    pub fn format_values(&self, values: &[Value], ctx: &RenderContext) -> String {
        let first = values.first().unwrap_or(&Value::Null);
        match &self.formatter {
            Some(formatter) => formatter.format(first, ctx),
            None => first.display(),
        }
    }
}
