//! # reportsource
//!
//! Declarative report datasources for a learning-analytics plugin.
//!
//! ## Architecture
//!
//! Entities describe tables, aliases, columns and filters. Datasources
//! compose entities against one base table and produce SQL text plus a
//! parameter map for an external executor:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │        SchemaCatalog (installed modules, columns)        │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [CatalogSnapshot::capture]
//! ┌─────────────────────────────────────────────────────────┐
//! │     Entities (user, enrolment, completion, activity)     │
//! │     ColumnSpec / FilterSpec + join fragments             │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [DatasourceBuilder::build]
//! ┌─────────────────────────────────────────────────────────┐
//! │  ComposedDatasource (deduplicated joins, defaults)       │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [compose]
//! ┌─────────────────────────────────────────────────────────┐
//! │        SQL text + named parameters + formatters          │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! The [`cleanup`] module holds the periodic log cleanup task.

pub mod cleanup;
pub mod config;
pub mod datasources;
pub mod entities;
pub mod metadata;
pub mod report;
pub mod sql;

/// Common imports for defining entities and datasources.
pub mod prelude {
    pub use crate::metadata::{CatalogSnapshot, SchemaCatalog, StaticCatalog};
    pub use crate::report::{
        ColumnSpec, ColumnType, ComposedDatasource, ConfigurationError, Datasource,
        DatasourceBuilder, Entity, EntityContext, EntityCore, FilterKind, FilterSpec, FilterValue,
        LangString, RenderContext, ReportContext, ReportError, ReportResult, ReportSelection,
        SpecId,
    };
    pub use crate::sql::{Condition, JoinFragment, JoinType, SortDir};
}
