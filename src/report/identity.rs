use std::fmt;
use std::str::FromStr;

use super::error::ConfigurationError;

/// Identity of a column or filter: `(entity, name)`, written `entity:name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SpecId {
    pub entity: String,
    pub name: String,
}

impl SpecId {
    pub fn new(entity: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            name: name.into(),
        }
    }

    /// Parse `entity:name`.
    pub fn parse(s: &str) -> Result<Self, ConfigurationError> {
        match s.split_once(':') {
            Some((entity, name))
                if !entity.is_empty() && !name.is_empty() && !name.contains(':') =>
            {
                Ok(Self::new(entity, name))
            }
            _ => Err(ConfigurationError::InvalidIdentity(s.to_string())),
        }
    }
}

impl fmt::Display for SpecId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.entity, self.name)
    }
}

impl FromStr for SpecId {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
