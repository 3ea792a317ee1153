//! Filters and the conditions they produce.

use serde::Serialize;

use super::error::{ReportError, ReportResult};
use super::identity::SpecId;
use super::label::LangString;
use crate::sql::{Condition, JoinFragment, ParamGenerator, ParamValue};

/// One choice of a select filter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectOption {
    pub value: String,
    pub label: LangString,
}

impl SelectOption {
    pub fn new(value: impl Into<String>, label: LangString) -> Self {
        Self {
            value: value.into(),
            label,
        }
    }
}

/// Widget used to enter a filter value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "options", rename_all = "lowercase")]
pub enum FilterKind {
    Text,
    Date,
    Boolean,
    Select(Vec<SelectOption>),
}

impl FilterKind {
    fn name(&self) -> &'static str {
        match self {
            FilterKind::Text => "text",
            FilterKind::Date => "date",
            FilterKind::Boolean => "boolean",
            FilterKind::Select(_) => "select",
        }
    }
}

/// Text filter operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextOperator {
    Contains,
    Equals,
    StartsWith,
    EndsWith,
    IsEmpty,
    IsNotEmpty,
}

/// A submitted filter value.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    /// No restriction.
    Any,
    Text(TextOperator, String),
    /// Unix timestamps, both bounds inclusive.
    DateRange { from: Option<i64>, to: Option<i64> },
    Boolean(bool),
    Select(String),
}

impl FilterValue {
    fn kind_name(&self) -> &'static str {
        match self {
            FilterValue::Any => "any",
            FilterValue::Text(..) => "text",
            FilterValue::DateRange { .. } => "date",
            FilterValue::Boolean(_) => "boolean",
            FilterValue::Select(_) => "select",
        }
    }
}

/// One queryable condition over a single field expression.
#[derive(Debug, Clone, PartialEq)]
#[must_use = "builders have no effect until used"]
pub struct FilterSpec {
    id: SpecId,
    label: LangString,
    kind: FilterKind,
    field: String,
    joins: Vec<JoinFragment>,
}

impl FilterSpec {
    pub fn new(name: &str, label: LangString, kind: FilterKind, field: impl Into<String>) -> Self {
        Self {
            id: SpecId::new("", name),
            label,
            kind,
            field: field.into(),
            joins: Vec::new(),
        }
    }

    pub fn add_join(mut self, join: JoinFragment) -> Self {
        self.joins.push(join);
        self
    }

    pub fn add_joins(mut self, joins: impl IntoIterator<Item = JoinFragment>) -> Self {
        self.joins.extend(joins);
        self
    }

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

    pub fn kind(&self) -> &FilterKind {
        &self.kind
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn joins(&self) -> &[JoinFragment] {
        &self.joins
    }

    /// Check that `value` fits this filter's widget.
    pub fn check_value(&self, value: &FilterValue) -> ReportResult<()> {
        match (&self.kind, value) {
            (_, FilterValue::Any)
            | (FilterKind::Text, FilterValue::Text(..))
            | (FilterKind::Date, FilterValue::DateRange { .. })
            | (FilterKind::Boolean, FilterValue::Boolean(_)) => Ok(()),
            (FilterKind::Select(options), FilterValue::Select(choice)) => {
                if options.iter().any(|o| &o.value == choice) {
                    Ok(())
                } else {
                    Err(self.invalid(format!("'{choice}' is not one of the options")))
                }
            }
            (kind, value) => Err(self.invalid(format!(
                "a {} value does not fit a {} filter",
                value.kind_name(),
                kind.name()
            ))),
        }
    }

    /// Predicate for `value`, or `None` when the value does not restrict.
    pub fn to_condition(
        &self,
        value: &FilterValue,
        params: &ParamGenerator,
    ) -> ReportResult<Option<Condition>> {
        self.check_value(value)?;
        let field = self.field.as_str();

        let condition = match value {
            FilterValue::Any => None,
            FilterValue::Text(op, text) => Some(text_condition(field, *op, text, params)),
            FilterValue::DateRange { from, to } => {
                let mut parts = Vec::new();
                if let Some(from) = from {
                    parts.push(Condition::compare(field, ">=", *from, params));
                }
                if let Some(to) = to {
                    parts.push(Condition::compare(field, "<=", *to, params));
                }
                Condition::all(parts)
            }
            FilterValue::Boolean(flag) => {
                Some(Condition::equals(field, i64::from(*flag), params))
            }
            FilterValue::Select(choice) => {
                let numeric = match &self.kind {
                    FilterKind::Select(options) => {
                        options.iter().all(|o| as_integer(&o.value).is_some())
                    }
                    _ => false,
                };
                let bound = match as_integer(choice) {
                    Some(n) if numeric => ParamValue::Int(n),
                    _ => ParamValue::Text(choice.clone()),
                };
                Some(Condition::equals(field, bound, params))
            }
        };
        Ok(condition)
    }

    fn invalid(&self, reason: String) -> ReportError {
        ReportError::InvalidFilterValue {
            filter: self.id.clone(),
            reason,
        }
    }
}

fn text_condition(
    field: &str,
    op: TextOperator,
    text: &str,
    params: &ParamGenerator,
) -> Condition {
    let like = |pattern: String| {
        let name = params.fresh();
        Condition::new(format!("{field} LIKE :{name} ESCAPE '|'")).with_param(name, pattern)
    };
    match op {
        TextOperator::Equals => Condition::equals(field, text, params),
        TextOperator::Contains => like(format!("%{}%", escape_like(text))),
        TextOperator::StartsWith => like(format!("{}%", escape_like(text))),
        TextOperator::EndsWith => like(format!("%{}", escape_like(text))),
        TextOperator::IsEmpty => Condition::new(format!("COALESCE({field}, '') = ''")),
        TextOperator::IsNotEmpty => Condition::new(format!("COALESCE({field}, '') <> ''")),
    }
}

/// An integer whose canonical text is exactly `value` ("007" is not one).
fn as_integer(value: &str) -> Option<i64> {
    value.parse::<i64>().ok().filter(|n| n.to_string() == value)
}

fn escape_like(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '|' | '%' | '_') {
            out.push('|');
        }
        out.push(c);
    }
    out
}
