//! Join fragments and their deduplication.

use std::collections::{HashMap, HashSet};

use thiserror::Error;
use tracing::debug;

use super::ident::{Identifier, UnsafeIdentifier};
use super::params::ParamValue;

/// Type of join.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    Inner,
    Left,
    Cross,
}

impl JoinType {
    fn keyword(self) -> &'static str {
        match self {
            JoinType::Inner => "JOIN",
            JoinType::Left => "LEFT JOIN",
            JoinType::Cross => "CROSS JOIN",
        }
    }
}

/// What a join brings into the query.
#[derive(Debug, Clone, PartialEq)]
pub enum JoinSource {
    /// A physical table name.
    Table(String),
    /// A derived table, rendered inside parentheses.
    Subquery(String),
}

#[derive(Debug, Clone, PartialEq)]
enum Clause {
    Structured {
        join_type: JoinType,
        source: JoinSource,
        alias: String,
        on: Option<String>,
    },
    Raw(String),
}

/// A join clause plus the aliases it introduces.
#[derive(Debug, Clone, PartialEq)]
#[must_use = "builders have no effect until used"]
pub struct JoinFragment {
    clause: Clause,
    aliases: Vec<String>,
    params: Vec<(String, ParamValue)>,
}

impl JoinFragment {
    /// `JOIN table alias`
    pub fn inner(table: impl Into<String>, alias: impl Into<String>) -> Self {
        Self::table(JoinType::Inner, table, alias)
    }

    /// `LEFT JOIN table alias`
    pub fn left(table: impl Into<String>, alias: impl Into<String>) -> Self {
        Self::table(JoinType::Left, table, alias)
    }

    pub fn table(join_type: JoinType, table: impl Into<String>, alias: impl Into<String>) -> Self {
        let alias = alias.into();
        Self {
            clause: Clause::Structured {
                join_type,
                source: JoinSource::Table(table.into()),
                alias: alias.clone(),
                on: None,
            },
            aliases: vec![alias],
            params: Vec::new(),
        }
    }

    /// Join a derived table: `LEFT JOIN (subquery) alias`.
    pub fn subquery(join_type: JoinType, sql: impl Into<String>, alias: impl Into<String>) -> Self {
        let alias = alias.into();
        Self {
            clause: Clause::Structured {
                join_type,
                source: JoinSource::Subquery(sql.into()),
                alias: alias.clone(),
                on: None,
            },
            aliases: vec![alias],
            params: Vec::new(),
        }
    }

    /// A hand-written join clause introducing `aliases`.
    pub fn raw(sql: impl Into<String>, aliases: &[&str]) -> Self {
        Self {
            clause: Clause::Raw(sql.into()),
            aliases: aliases.iter().map(|a| a.to_string()).collect(),
            params: Vec::new(),
        }
    }

    /// Set the ON predicate. Ignored for raw fragments.
    pub fn on(mut self, predicate: impl Into<String>) -> Self {
        if let Clause::Structured { on, .. } = &mut self.clause {
            *on = Some(predicate.into());
        }
        self
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.params.push((name.into(), value.into()));
        self
    }

    pub fn with_params(mut self, params: impl IntoIterator<Item = (String, ParamValue)>) -> Self {
        self.params.extend(params);
        self
    }

    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    pub fn params(&self) -> &[(String, ParamValue)] {
        &self.params
    }

    /// Rendered clause text.
    pub fn to_sql(&self) -> String {
        match &self.clause {
            Clause::Raw(sql) => sql.clone(),
            Clause::Structured {
                join_type,
                source,
                alias,
                on,
            } => {
                let source = match source {
                    JoinSource::Table(name) => name.clone(),
                    JoinSource::Subquery(sql) => format!("({sql})"),
                };
                match on {
                    Some(on) => format!("{} {source} {alias} ON {on}", join_type.keyword()),
                    None => format!("{} {source} {alias}", join_type.keyword()),
                }
            }
        }
    }

    /// Deduplication key: whitespace-insensitive text plus the sorted aliases.
    pub fn key(&self) -> JoinKey {
        let mut aliases = self.aliases.clone();
        aliases.sort();
        JoinKey {
            text: normalise_whitespace(&self.to_sql()),
            aliases,
        }
    }

    /// Check aliases and table names before the fragment reaches SQL text.
    pub fn validate(&self) -> Result<(), UnsafeIdentifier> {
        for alias in &self.aliases {
            Identifier::parse(alias.as_str())?;
        }
        if let Clause::Structured {
            source: JoinSource::Table(name),
            ..
        } = &self.clause
        {
            Identifier::parse(name.as_str())?;
        }
        Ok(())
    }
}

/// Normalised identity of a join fragment.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JoinKey {
    pub text: String,
    pub aliases: Vec<String>,
}

/// Drop whitespace except a single space between two word characters.
/// Quoted literals are kept verbatim.
fn normalise_whitespace(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len());
    let mut quote: Option<char> = None;
    let mut gap = false;
    for c in sql.chars() {
        if let Some(q) = quote {
            out.push(c);
            if c == q {
                quote = None;
            }
            continue;
        }
        if c.is_whitespace() {
            gap = true;
            continue;
        }
        if gap && is_word_char(c) && out.chars().last().is_some_and(is_word_char) {
            out.push(' ');
        }
        gap = false;
        if c == '\'' || c == '"' {
            quote = Some(c);
        }
        out.push(c);
    }
    out
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Reasons a fragment cannot be registered.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JoinConflict {
    #[error("alias '{alias}' is introduced by two different joins")]
    Alias { alias: String },

    #[error(transparent)]
    Unsafe(#[from] UnsafeIdentifier),
}

/// Ordered set of join fragments, deduplicated by [`JoinKey`].
#[derive(Debug, Clone, Default)]
pub struct JoinRegistry {
    fragments: Vec<JoinFragment>,
    seen: HashSet<JoinKey>,
    owners: HashMap<String, usize>,
    reserved: HashSet<String>,
}

impl JoinRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim an alias that is not introduced by a join (the base table alias).
    pub fn reserve_alias(&mut self, alias: &str) {
        self.reserved.insert(alias.to_string());
    }

    /// Register a fragment.
    ///
    /// Returns `Ok(true)` when it was added and `Ok(false)` when an identical
    /// fragment is already present.
    pub fn add(&mut self, fragment: JoinFragment) -> Result<bool, JoinConflict> {
        fragment.validate()?;
        let key = fragment.key();
        if self.seen.contains(&key) {
            debug!(join = %key.text, "dropping duplicate join");
            return Ok(false);
        }

        for alias in fragment.aliases() {
            if self.reserved.contains(alias) || self.owners.contains_key(alias) {
                return Err(JoinConflict::Alias {
                    alias: alias.clone(),
                });
            }
        }

        let idx = self.fragments.len();
        for alias in fragment.aliases() {
            self.owners.insert(alias.clone(), idx);
        }
        self.seen.insert(key);
        self.fragments.push(fragment);
        Ok(true)
    }

    /// Register several fragments in order.
    pub fn extend<'a>(
        &mut self,
        fragments: impl IntoIterator<Item = &'a JoinFragment>,
    ) -> Result<(), JoinConflict> {
        for fragment in fragments {
            self.add(fragment.clone())?;
        }
        Ok(())
    }

    pub fn fragments(&self) -> &[JoinFragment] {
        &self.fragments
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    pub fn contains_alias(&self, alias: &str) -> bool {
        self.owners.contains_key(alias) || self.reserved.contains(alias)
    }
}
