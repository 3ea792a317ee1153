//! Error types for report composition.

use thiserror::Error;

use super::identity::SpecId;
use crate::metadata::CatalogError;
use crate::sql::{JoinConflict, ParamCollision, UnsafeIdentifier};

/// Result type for report composition.
pub type ReportResult<T> = Result<T, ReportError>;

/// Errors raised while composing entities and datasources.
#[derive(Debug, Error)]
pub enum ReportError {
    /// The datasource or one of its entities is wired incorrectly.
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// A catalog-sourced name failed the safe identifier check.
    #[error(transparent)]
    UnsafeIdentifier(#[from] UnsafeIdentifier),

    /// A submitted filter value does not fit the filter's widget.
    #[error("invalid value for filter '{filter}': {reason}")]
    InvalidFilterValue { filter: SpecId, reason: String },

    /// Schema metadata could not be read.
    #[error("schema catalog error: {0}")]
    Catalog(#[from] CatalogError),
}

impl ReportError {
    pub fn is_configuration(&self) -> bool {
        matches!(self, ReportError::Configuration(_))
    }
}

impl From<JoinConflict> for ReportError {
    fn from(err: JoinConflict) -> Self {
        match err {
            JoinConflict::Alias { alias } => {
                ReportError::Configuration(ConfigurationError::ConflictingJoin { alias })
            }
            JoinConflict::Unsafe(unsafe_ident) => ReportError::UnsafeIdentifier(unsafe_ident),
        }
    }
}

impl From<ParamCollision> for ReportError {
    fn from(err: ParamCollision) -> Self {
        ReportError::Configuration(ConfigurationError::ParameterCollision(err.0))
    }
}

/// Wiring mistakes. Always detected while composing, never while fetching rows.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("entity '{entity}' has no alias for table '{table}'")]
    UnknownTableAlias { entity: String, table: String },

    #[error("alias '{alias}' is used for both '{first}' and '{second}'")]
    AliasConflict {
        alias: String,
        first: String,
        second: String,
    },

    #[error("alias '{alias}' is introduced by two different joins")]
    ConflictingJoin { alias: String },

    #[error("unknown entity '{0}'")]
    UnknownEntity(String),

    #[error("entity '{0}' is attached twice")]
    DuplicateEntity(String),

    #[error("unknown column '{0}'")]
    UnknownColumn(SpecId),

    #[error("unknown filter '{0}'")]
    UnknownFilter(SpecId),

    #[error("unknown condition '{0}'")]
    UnknownCondition(SpecId),

    #[error("column '{0}' is defined twice")]
    DuplicateColumn(SpecId),

    #[error("filter '{0}' is defined twice")]
    DuplicateFilter(SpecId),

    #[error("column '{0}' has no field expressions")]
    EmptyColumn(SpecId),

    #[error("column '{0}' is not sortable")]
    NotSortable(SpecId),

    #[error("invalid identity '{0}', expected 'entity:name'")]
    InvalidIdentity(String),

    #[error("datasource '{0}' has no base table")]
    MissingBaseTable(String),

    #[error("datasource '{datasource}' requires {parameter}")]
    MissingParameter {
        datasource: String,
        parameter: String,
    },

    #[error("parameter ':{0}' is bound more than once")]
    ParameterCollision(String),
}
