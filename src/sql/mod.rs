//! SQL text assembly.
//!
//! The crate never executes SQL. It produces text fragments and a parameter
//! map for an external executor:
//!
//! - [`ident`] - safe identifier validation for catalog-sourced names
//! - [`params`] - bound parameters, fresh parameter names, predicates
//! - [`join`] - join fragments and the deduplicating registry
//! - [`union`] - `UNION ALL` derived tables
//! - [`query`] - the composed SELECT

pub mod ident;
pub mod join;
pub mod params;
pub mod query;
pub mod union;

pub use ident::{is_safe_identifier, Identifier, UnsafeIdentifier};
pub use join::{JoinConflict, JoinFragment, JoinKey, JoinRegistry, JoinSource, JoinType};
pub use params::{Condition, ParamGenerator, ParamValue, PARAM_PREFIX};
pub use query::{inline_params, ComposedQuery, OrderBy, ParamCollision, SelectItem, SortDir};
pub use union::UnionAll;
