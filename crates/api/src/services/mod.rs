//! Business logic services.
//!
//! # Services
//!
//! - `catalog` - Search orchestration, tag-relation synchronization and the
//!   coffee read/write surface

pub mod catalog;

pub use catalog::{CatalogError, CatalogService};
