//! The composed report query handed to the external query executor.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use thiserror::Error;

use super::join::JoinFragment;
use super::params::{Condition, ParamValue};

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r":([A-Za-z_][A-Za-z0-9_]*)").expect("static regex is valid"));

/// A SELECT list item.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectItem {
    pub expr: String,
    pub alias: String,
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDir {
    #[default]
    Asc,
    Desc,
}

impl SortDir {
    fn keyword(self) -> &'static str {
        match self {
            SortDir::Asc => "ASC",
            SortDir::Desc => "DESC",
        }
    }
}

/// An ORDER BY item.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub expr: String,
    pub dir: SortDir,
}

/// Two bound values tried to use the same placeholder name.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("parameter ':{0}' is bound more than once")]
pub struct ParamCollision(pub String);

/// SELECT statement assembled from a datasource.
///
/// Parameters from joins and conditions are merged when the query is built;
/// a name bound twice is rejected.
#[derive(Debug, Clone, PartialEq)]
pub struct ComposedQuery {
    select: Vec<SelectItem>,
    from_table: String,
    from_alias: String,
    joins: Vec<JoinFragment>,
    conditions: Vec<Condition>,
    order_by: Vec<OrderBy>,
    params: Vec<(String, ParamValue)>,
}

impl ComposedQuery {
    pub fn new(
        from_table: impl Into<String>,
        from_alias: impl Into<String>,
        select: Vec<SelectItem>,
        joins: Vec<JoinFragment>,
        conditions: Vec<Condition>,
        order_by: Vec<OrderBy>,
    ) -> Result<Self, ParamCollision> {
        let mut seen = HashSet::new();
        let mut params = Vec::new();
        let bound = joins
            .iter()
            .flat_map(|j| j.params().iter())
            .chain(conditions.iter().flat_map(|c| c.params.iter()));
        for (name, value) in bound {
            if !seen.insert(name.clone()) {
                return Err(ParamCollision(name.clone()));
            }
            params.push((name.clone(), value.clone()));
        }

        Ok(Self {
            select,
            from_table: from_table.into(),
            from_alias: from_alias.into(),
            joins,
            conditions,
            order_by,
            params,
        })
    }

    pub fn select(&self) -> &[SelectItem] {
        &self.select
    }

    pub fn joins(&self) -> &[JoinFragment] {
        &self.joins
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn order_by(&self) -> &[OrderBy] {
        &self.order_by
    }

    /// Bound parameters in placeholder order of first appearance.
    pub fn params(&self) -> &[(String, ParamValue)] {
        &self.params
    }

    pub fn param(&self, name: &str) -> Option<&ParamValue> {
        self.params.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// SQL with `:name` placeholders.
    pub fn to_sql(&self) -> String {
        let select = if self.select.is_empty() {
            "1".to_string()
        } else {
            self.select
                .iter()
                .map(|s| format!("{} AS {}", s.expr, s.alias))
                .collect::<Vec<_>>()
                .join(", ")
        };
        let mut sql = format!("SELECT {select} {}", self.from_clause());
        if !self.order_by.is_empty() {
            let order = self
                .order_by
                .iter()
                .map(|o| format!("{} {}", o.expr, o.dir.keyword()))
                .collect::<Vec<_>>()
                .join(", ");
            sql.push_str(" ORDER BY ");
            sql.push_str(&order);
        }
        sql
    }

    /// Row count query over the same FROM/JOIN/WHERE.
    pub fn count_sql(&self) -> String {
        format!("SELECT COUNT(1) AS total {}", self.from_clause())
    }

    /// SQL with parameter values rendered as literals. For display only.
    pub fn to_sql_inlined(&self) -> String {
        inline_params(&self.to_sql(), &self.params)
    }

    fn from_clause(&self) -> String {
        let mut sql = format!("FROM {} {}", self.from_table, self.from_alias);
        for join in &self.joins {
            sql.push(' ');
            sql.push_str(&join.to_sql());
        }
        if !self.conditions.is_empty() {
            let predicate = self
                .conditions
                .iter()
                .map(|c| format!("({})", c.sql))
                .collect::<Vec<_>>()
                .join(" AND ");
            sql.push_str(" WHERE ");
            sql.push_str(&predicate);
        }
        sql
    }
}

/// Replace known `:name` placeholders with literals, leaving unknown ones alone.
pub fn inline_params(sql: &str, params: &[(String, ParamValue)]) -> String {
    PLACEHOLDER
        .replace_all(sql, |caps: &Captures<'_>| {
            params
                .iter()
                .find(|(name, _)| name == &caps[1])
                .map(|(_, value)| value.to_literal())
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}
