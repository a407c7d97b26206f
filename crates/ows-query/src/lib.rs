//! Ad-hoc query model.
//!
//! An ad-hoc query is a client-specified selection (as opposed to a stored
//! query). All variants share type names, projection, sort order, SRS and
//! feature version; they differ only in their constraint:
//!
//! - [`PlainQuery`]: no constraint
//! - [`BBoxQuery`]: an envelope
//! - [`FilterQuery`]: a [`Filter`] expression
//!
//! Queries are plain values. Validation happens at construction, so a query
//! that exists is always encodable.
//!
//! # Example
//!
//! ```rust
//! use ows_common::{Envelope, QName};
//! use ows_query::{QueryBuilder, TypeName, ProjectionClause};
//!
//! let query = QueryBuilder::new()
//!     .type_name(TypeName::new(QName::parse_prefixed("app:Road").unwrap()))
//!     .projection_clauses(vec![vec![ProjectionClause::new("app:Road/app:name")]])
//!     .bbox(Envelope::new(0.0, 0.0, 10.0, 10.0))
//!     .build()
//!     .unwrap();
//! assert!(query.bbox().is_some());
//! ```

pub mod filter;
pub mod query;
pub mod sort;
pub mod type_name;

pub use filter::Filter;
pub use query::{
    AdHocQuery, BBoxQuery, FilterQuery, PlainQuery, ProjectionClause, QueryBuilder, QueryCommon,
    QueryError,
};
pub use sort::{SortOrder, SortProperty};
pub use type_name::TypeName;
