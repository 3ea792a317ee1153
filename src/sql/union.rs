//! `UNION ALL` derived tables assembled from a variable number of SELECTs.

use super::params::ParamValue;

/// A derived table made of `UNION ALL`-ed SELECT statements.
///
/// Every branch must project `columns` in the same order. When no branch is
/// added the subquery still renders, as a typed empty row set.
#[derive(Debug, Clone, PartialEq)]
#[must_use = "builders have no effect until used"]
pub struct UnionAll {
    columns: Vec<String>,
    branches: Vec<String>,
    params: Vec<(String, ParamValue)>,
}

impl UnionAll {
    pub fn new(columns: &[&str]) -> Self {
        Self {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            branches: Vec::new(),
            params: Vec::new(),
        }
    }

    /// Add one SELECT with the parameters it binds.
    pub fn branch(
        mut self,
        select: impl Into<String>,
        params: impl IntoIterator<Item = (String, ParamValue)>,
    ) -> Self {
        self.branches.push(select.into());
        self.params.extend(params);
        self
    }

    pub fn len(&self) -> usize {
        self.branches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.branches.is_empty()
    }

    pub fn params(&self) -> &[(String, ParamValue)] {
        &self.params
    }

    pub fn into_params(self) -> Vec<(String, ParamValue)> {
        self.params
    }

    pub fn to_sql(&self) -> String {
        if self.branches.is_empty() {
            let nulls = self
                .columns
                .iter()
                .map(|c| format!("NULL AS {c}"))
                .collect::<Vec<_>>()
                .join(", ");
            return format!("SELECT {nulls} WHERE 1 = 0");
        }
        self.branches.join(" UNION ALL ")
    }
}
