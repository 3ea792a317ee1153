//! Schema catalog module.
//!
//! Entities may emit different columns depending on the deployment (which
//! activity modules are installed, which columns exist). That information
//! comes from a [`SchemaCatalog`] and is frozen into a [`CatalogSnapshot`]
//! before composition starts.
//!
//! ```text
//! SchemaCatalog (StaticCatalog | SqliteCatalog)
//!        │ capture()
//!        ▼
//! CatalogSnapshot ──► EntityContext ──► Entity::initialise()
//! ```

mod provider;
mod snapshot;
mod sqlite;

pub use provider::{CatalogError, CatalogResult, SchemaCatalog};
pub use snapshot::{CatalogSnapshot, StaticCatalog};
pub use sqlite::SqliteCatalog;
