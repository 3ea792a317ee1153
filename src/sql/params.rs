//! Bound parameters and predicates.
//!
//! Every predicate that carries a value uses a named placeholder (`:name`).
//! Names come from a [`ParamGenerator`] owned by the composing datasource so
//! that two conditions never reuse a name.

use std::cell::Cell;
use std::fmt;

use serde::Serialize;

/// Prefix used for generated parameter names.
pub const PARAM_PREFIX: &str = "rsparam";

/// A value bound to a named placeholder.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ParamValue {
    Int(i64),
    Float(f64),
    Text(String),
    Bool(bool),
}

impl ParamValue {
    /// Render as a SQL literal (debug output only, never sent to a database).
    pub fn to_literal(&self) -> String {
        match self {
            ParamValue::Int(v) => v.to_string(),
            ParamValue::Float(v) => v.to_string(),
            ParamValue::Text(s) => format!("'{}'", s.replace('\'', "''")),
            ParamValue::Bool(b) => if *b { "1" } else { "0" }.to_string(),
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_literal())
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Int(v)
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Float(v)
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Bool(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Text(v.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        ParamValue::Text(v)
    }
}

/// Hands out unique parameter names (`rsparam1`, `rsparam2`, ...).
///
/// Uses interior mutability so entities can share one generator through a
/// shared reference while they build their columns.
#[derive(Debug, Default)]
pub struct ParamGenerator {
    next: Cell<u32>,
}

impl ParamGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next unused parameter name.
    pub fn fresh(&self) -> String {
        let n = self.next.get() + 1;
        self.next.set(n);
        format!("{PARAM_PREFIX}{n}")
    }

    /// Number of names handed out so far.
    pub fn issued(&self) -> u32 {
        self.next.get()
    }
}

/// A SQL predicate together with the parameters it binds.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub sql: String,
    pub params: Vec<(String, ParamValue)>,
}

impl Condition {
    /// A predicate without parameters.
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.params.push((name.into(), value.into()));
        self
    }

    /// `field <op> :fresh` with the value bound under a generated name.
    pub fn compare(
        field: &str,
        op: &str,
        value: impl Into<ParamValue>,
        params: &ParamGenerator,
    ) -> Self {
        let name = params.fresh();
        Condition::new(format!("{field} {op} :{name}")).with_param(name, value)
    }

    /// `field = :fresh`
    pub fn equals(field: &str, value: impl Into<ParamValue>, params: &ParamGenerator) -> Self {
        Self::compare(field, "=", value, params)
    }

    /// Conjunction of several conditions. Returns `None` when the input is empty.
    pub fn all(conditions: impl IntoIterator<Item = Condition>) -> Option<Condition> {
        let parts: Vec<Condition> = conditions.into_iter().collect();
        match parts.len() {
            0 => None,
            1 => parts.into_iter().next(),
            _ => {
                let sql = parts
                    .iter()
                    .map(|c| format!("({})", c.sql))
                    .collect::<Vec<_>>()
                    .join(" AND ");
                let params = parts.into_iter().flat_map(|c| c.params).collect();
                Some(Condition { sql, params })
            }
        }
    }
}
