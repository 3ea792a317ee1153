use std::fmt;

use inflector::cases::sentencecase::to_sentence_case;
use serde::Serialize;

/// Component used for labels that do not name one explicitly.
pub const DEFAULT_COMPONENT: &str = "local_reportsource";

/// A reference to a translatable string.
///
/// The core never resolves translations; it keeps the lookup key and a
/// fallback text that renderers can show when no translation is found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LangString {
    pub component: String,
    pub key: String,
    pub fallback: String,
}

impl LangString {
    pub fn new(component: &str, key: &str, fallback: &str) -> Self {
        Self {
            component: component.to_string(),
            key: key.to_string(),
            fallback: fallback.to_string(),
        }
    }

    /// Key in the default component, fallback derived from the key
    /// (`time_started` becomes `Time started`).
    pub fn key(key: &str) -> Self {
        Self {
            component: DEFAULT_COMPONENT.to_string(),
            key: key.to_string(),
            fallback: to_sentence_case(key),
        }
    }

    pub fn with_fallback(mut self, fallback: &str) -> Self {
        self.fallback = fallback.to_string();
        self
    }
}

impl fmt::Display for LangString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.fallback)
    }
}
