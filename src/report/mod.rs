//! Report composition: columns, filters, entities and datasources.
//!
//! ```text
//! ColumnSpec / FilterSpec  (fluent builders)
//!        │ built by
//!        ▼
//! Entity ──initialise──► InitialisedEntity
//!        │ attached to
//!        ▼
//! DatasourceBuilder ──build──► ComposedDatasource ──compose──► ComposedQuery
//! ```
//!
//! Everything here is synchronous and builds fresh per report. Wiring
//! mistakes surface as [`ConfigurationError`] while composing, never while
//! rows are being formatted.

mod column;
mod context;
mod datasource;
mod entity;
mod error;
mod filter;
pub mod format;
mod identity;
mod label;
mod value;

pub use column::{ColumnSpec, ColumnType};
pub use context::{is_valid_date_format, RenderContext, ReportContext, DEFAULT_DATE_FORMAT};
pub use datasource::{
    select_alias, BulkAction, ComposedDatasource, ComposedReport, Datasource, DatasourceBuilder,
    ReportSelection,
};
pub use entity::{Entity, EntityContext, EntityCore, InitialisedEntity, TableAlias};
pub use error::{ConfigurationError, ReportError, ReportResult};
pub use filter::{FilterKind, FilterSpec, FilterValue, SelectOption, TextOperator};
pub use format::{CompletionState, Formatter};
pub use identity::SpecId;
pub use label::{LangString, DEFAULT_COMPONENT};
pub use value::{Row, Value};
