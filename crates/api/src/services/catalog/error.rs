//! Catalog error types.

use thiserror::Error;

use coffee_catalog_core::{CoffeeId, PaginationError, TagId};

use crate::db::RepositoryError;

/// Errors that can occur during catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The coffee doesn't exist.
    #[error("coffee {0} not found")]
    NotFound(CoffeeId),

    /// The tag doesn't exist.
    #[error("tag {0} not found")]
    TagNotFound(TagId),

    /// A create or replace referenced tags that don't exist.
    #[error("unknown tag IDs: {}", join_ids(.0))]
    UnknownTag(Vec<TagId>),

    /// The requested page can't be executed.
    #[error("invalid pagination: {0}")]
    InvalidPagination(#[from] PaginationError),

    /// Repository/database error.
    #[error(transparent)]
    Persistence(RepositoryError),
}

impl From<RepositoryError> for CatalogError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::UnknownTags(ids) => Self::UnknownTag(ids),
            other => Self::Persistence(other),
        }
    }
}

fn join_ids(ids: &[TagId]) -> String {
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
