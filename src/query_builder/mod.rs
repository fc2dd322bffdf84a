//! # Typed Query Builder
//!
//! A small typed query-expression builder for the persisted cache table.
//!
//! Conditions are a tagged union of operator + column + bind value, rendered
//! to `$n`-placeholder SQL and interpreted by a single execution function in
//! the Postgres backend. Values are never interpolated into SQL text, so
//! the builder is injection-safe by construction.
//!
//! ## Key Components
//!
//! - [`conditions`] - typed WHERE conditions and bind values
//! - [`builder`] - statement construction and SQL rendering
//! - [`pagination`] - LIMIT/OFFSET handling

pub mod builder;
pub mod conditions;
pub mod pagination;

pub use builder::{CacheQuery, QueryKind};
pub use conditions::{BindValue, QueryCondition, SqlOperator};
pub use pagination::Pagination;
