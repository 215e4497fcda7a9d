//! Catalog service.
//!
//! Orchestrates filtered search, the coffee read/write surface and tag
//! association changes. Every write runs in one store transaction; an error
//! anywhere drops the transaction and nothing is persisted.

mod error;
pub mod relations;

pub use error::CatalogError;

use tracing::{info, instrument};

use coffee_catalog_core::{
    Coffee, CoffeeChanges, CoffeeId, NewCoffee, Page, PageWindow, Pagination, Predicate,
    SearchFilter, SearchResult, Tag, TagId, TagSet,
};

use crate::db::{CatalogStore, CatalogTransaction, RepositoryError};
use relations::{create_associations, replace_associations};

/// Catalog service over a store.
#[derive(Debug, Clone)]
pub struct CatalogService<S> {
    store: S,
}

impl<S: CatalogStore> CatalogService<S> {
    /// Create a new catalog service.
    #[must_use]
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    /// The underlying store.
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    // =========================================================================
    // Search
    // =========================================================================

    /// Run a filtered, paginated search.
    ///
    /// Results are ordered by name, then ID. A filter that can never match
    /// (e.g. a start date after the end date) yields an empty page.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::InvalidPagination` if the limit is below 1 or the
    /// offset is negative.
    /// Returns `CatalogError::Persistence` if the store fails.
    #[instrument(skip(self, filter), fields(limit = filter.limit, offset = filter.offset))]
    pub async fn search(&self, filter: &SearchFilter) -> Result<SearchResult<Coffee>, CatalogError> {
        let window = PageWindow::new(filter.limit, filter.offset)?;
        let predicate = Predicate::build(filter);

        let page = if predicate.is_unsatisfiable() {
            Page::empty()
        } else {
            self.store.search_coffees(&predicate, window).await?
        };

        Ok(SearchResult {
            pagination: Pagination::new(page.total, window),
            data: page.items,
        })
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Every coffee, ordered by name then ID.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Persistence` if the store fails.
    pub async fn find_all(&self) -> Result<Vec<Coffee>, CatalogError> {
        Ok(self.store.list_coffees().await?)
    }

    /// A single coffee with its tags.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if the coffee doesn't exist.
    /// Returns `CatalogError::Persistence` if the store fails.
    pub async fn find_one(&self, id: CoffeeId) -> Result<Coffee, CatalogError> {
        self.store
            .find_coffee(id)
            .await?
            .ok_or(CatalogError::NotFound(id))
    }

    /// A single tag.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::TagNotFound` if the tag doesn't exist.
    /// Returns `CatalogError::Persistence` if the store fails.
    pub async fn find_tag(&self, id: TagId) -> Result<Tag, CatalogError> {
        self.store
            .find_tag(id)
            .await?
            .ok_or(CatalogError::TagNotFound(id))
    }

    /// Every tag, ordered by name then ID.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Persistence` if the store fails.
    pub async fn list_tags(&self) -> Result<Vec<Tag>, CatalogError> {
        Ok(self.store.list_tags().await?)
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Create a coffee associated with `tags`.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::UnknownTag` if any tag doesn't exist; nothing is
    /// created in that case.
    /// Returns `CatalogError::Persistence` if the store fails.
    #[instrument(skip(self, coffee, tags), fields(name = %coffee.name, tags = tags.len()))]
    pub async fn create(&self, coffee: &NewCoffee, tags: &TagSet) -> Result<Coffee, CatalogError> {
        let mut tx = self.store.begin().await?;

        let id = tx.insert_coffee(coffee).await?;
        create_associations(&mut tx, id, tags).await?;
        let created = reload(&mut tx, id).await?;

        tx.commit().await?;
        info!(coffee_id = %id, "Created coffee");
        Ok(created)
    }

    /// Apply `changes` to a coffee and, when `tags` is given, replace its tag
    /// set with exactly `tags`. `None` leaves the associations untouched; an
    /// empty set clears them.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if the coffee doesn't exist.
    /// Returns `CatalogError::UnknownTag` if any tag doesn't exist; the coffee
    /// is left unchanged in that case.
    /// Returns `CatalogError::Persistence` if the store fails.
    #[instrument(skip(self, changes, tags), fields(coffee_id = %id))]
    pub async fn update(
        &self,
        id: CoffeeId,
        changes: &CoffeeChanges,
        tags: Option<&TagSet>,
    ) -> Result<Coffee, CatalogError> {
        let mut tx = self.store.begin().await?;

        // Both paths lock the row until commit.
        let exists = if changes.is_empty() {
            tx.lock_coffee(id).await?
        } else {
            tx.update_coffee(id, changes).await?
        };
        if !exists {
            return Err(CatalogError::NotFound(id));
        }

        if let Some(tags) = tags {
            replace_associations(&mut tx, id, tags).await?;
        }
        let updated = reload(&mut tx, id).await?;

        tx.commit().await?;
        info!("Updated coffee");
        Ok(updated)
    }

    /// Replace a coffee's tag set with exactly `tags`.
    ///
    /// # Errors
    ///
    /// Same as [`CatalogService::update`].
    pub async fn replace_tags(&self, id: CoffeeId, tags: &TagSet) -> Result<Coffee, CatalogError> {
        self.update(id, &CoffeeChanges::default(), Some(tags)).await
    }

    /// Delete a coffee and its associations. Tags are kept.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if the coffee doesn't exist.
    /// Returns `CatalogError::Persistence` if the store fails.
    #[instrument(skip(self), fields(coffee_id = %id))]
    pub async fn remove(&self, id: CoffeeId) -> Result<(), CatalogError> {
        let mut tx = self.store.begin().await?;
        if !tx.delete_coffee(id).await? {
            return Err(CatalogError::NotFound(id));
        }
        tx.commit().await?;

        info!("Removed coffee");
        Ok(())
    }

    /// Look up tags by name, creating the missing ones. Returned in input
    /// order; names are trimmed and blank names skipped.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Persistence` if the store fails.
    #[instrument(skip(self, names), fields(count = names.len()))]
    pub async fn ensure_tags<N: AsRef<str>>(&self, names: &[N]) -> Result<Vec<Tag>, CatalogError> {
        let mut tx = self.store.begin().await?;

        let mut tags = Vec::with_capacity(names.len());
        for name in names {
            let name = name.as_ref().trim();
            if !name.is_empty() {
                tags.push(tx.upsert_tag(name).await?);
            }
        }

        tx.commit().await?;
        Ok(tags)
    }
}

async fn reload<T: CatalogTransaction>(tx: &mut T, id: CoffeeId) -> Result<Coffee, CatalogError> {
    tx.find_coffee(id).await?.ok_or_else(|| {
        CatalogError::Persistence(RepositoryError::DataCorruption(format!(
            "coffee {id} vanished inside its own transaction"
        )))
    })
}
