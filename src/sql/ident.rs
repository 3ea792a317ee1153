//! Safe identifiers for values that end up interpolated into SQL text.
//!
//! Table names, aliases and module names that come from a catalog are never
//! trusted verbatim. They must match `[A-Za-z0-9_]+` before they can be
//! embedded in a join or subquery.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

static SAFE_IDENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_]+$").expect("static regex is valid"));

/// Error returned when a string fails the safe identifier check.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsafe identifier '{0}': only [A-Za-z0-9_] is allowed")]
pub struct UnsafeIdentifier(pub String);

/// A string known to match `[A-Za-z0-9_]+`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identifier(String);

impl Identifier {
    /// Validate `raw` and wrap it.
    pub fn parse(raw: impl Into<String>) -> Result<Self, UnsafeIdentifier> {
        let raw = raw.into();
        if is_safe_identifier(&raw) {
            Ok(Self(raw))
        } else {
            Err(UnsafeIdentifier(raw))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Identifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Returns true when `s` is non-empty and only contains `[A-Za-z0-9_]`.
pub fn is_safe_identifier(s: &str) -> bool {
    SAFE_IDENT.is_match(s)
}
