//! Coffee Catalog Core - Shared domain library.
//!
//! This crate provides the types used across all catalog components:
//! - `api` - HTTP service and persistence
//! - `cli` - Command-line tools for migrations and seeding
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP. The query builder, pagination arithmetic and tag-set
//! diffing live here so every store and transport shares one definition.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, prices, coffees and tags
//! - [`filter`] - Search filters and the predicate they compile to
//! - [`page`] - Pagination windows and result metadata
//! - [`relations`] - Tag sets and association diffs

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod filter;
pub mod page;
pub mod relations;
pub mod types;

pub use filter::{FilterClause, Predicate, SearchFilter};
pub use page::{Page, PageWindow, Pagination, PaginationError, SearchResult, compare_names};
pub use relations::{TagDiff, TagSet};
pub use types::*;
