//! Catalog persistence.
//!
//! # Database: `coffee_catalog`
//!
//! ## Tables (schema `catalog`)
//!
//! - `tag` - Tag names, unique case-insensitively
//! - `coffee` - Catalog entries
//! - `coffee_tag` - Coffee/tag associations (cascade on coffee delete)
//!
//! # Stores
//!
//! Services talk to persistence through [`CatalogStore`] and the unit of work
//! it opens, [`CatalogTransaction`]. Two stores implement them:
//!
//! - [`PgCatalogStore`] - `PostgreSQL` via sqlx
//! - [`MemoryCatalogStore`] - in-process, for tests and local demos
//!
//! # Migrations
//!
//! Migrations are stored in `crates/api/migrations/` and run via:
//! ```bash
//! cargo run -p coffee-catalog-cli -- migrate
//! ```

pub mod memory;
pub mod postgres;
pub mod query;

use std::future::Future;

use secrecy::{ExposeSecret, SecretString};
use sqlx::PgPool;
use sqlx::migrate::Migrator;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use thiserror::Error;

use coffee_catalog_core::{
    Coffee, CoffeeChanges, CoffeeId, NewCoffee, Page, PageWindow, Predicate, Tag, TagId, TagSet,
};

use crate::config::DatabaseConfig;

pub use memory::MemoryCatalogStore;
pub use postgres::{PgCatalogStore, PgTransaction};

/// Embedded SQL migrations for the `catalog` schema.
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// An association referenced tags that don't exist.
    #[error("unknown tag IDs: {0:?}")]
    UnknownTags(Vec<TagId>),
}

/// Create a `PostgreSQL` connection pool.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
/// * `config` - Pool size and per-statement timeout
///
/// # Errors
///
/// Returns `sqlx::Error` if the URL is invalid or the connection cannot be established.
pub async fn create_pool(
    database_url: &SecretString,
    config: &DatabaseConfig,
) -> Result<PgPool, sqlx::Error> {
    let mut options: PgConnectOptions = database_url.expose_secret().parse()?;
    if let Some(timeout) = config.statement_timeout {
        options = options.options([("statement_timeout", timeout.as_millis().to_string())]);
    }

    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(2.min(config.max_connections))
        .acquire_timeout(std::time::Duration::from_secs(10))
        .connect_with(options)
        .await
}

/// Read access to the catalog, and the entry point for writes.
pub trait CatalogStore: Clone + Send + Sync + 'static {
    /// The unit of work opened by [`CatalogStore::begin`].
    type Transaction: CatalogTransaction;

    /// Open a read-write unit of work. Dropping it without committing
    /// discards every change made through it.
    fn begin(&self) -> impl Future<Output = Result<Self::Transaction, RepositoryError>> + Send;

    /// One page of the coffees matching `predicate`, ordered by name then ID,
    /// together with the unpaginated match count. Both are read from one
    /// consistent snapshot.
    fn search_coffees(
        &self,
        predicate: &Predicate,
        window: PageWindow,
    ) -> impl Future<Output = Result<Page<Coffee>, RepositoryError>> + Send;

    /// Every coffee, ordered by name then ID.
    fn list_coffees(&self) -> impl Future<Output = Result<Vec<Coffee>, RepositoryError>> + Send;

    /// A single coffee with its tags.
    fn find_coffee(
        &self,
        id: CoffeeId,
    ) -> impl Future<Output = Result<Option<Coffee>, RepositoryError>> + Send;

    /// A single tag.
    fn find_tag(&self, id: TagId)
    -> impl Future<Output = Result<Option<Tag>, RepositoryError>> + Send;

    /// Every tag, ordered by name then ID.
    fn list_tags(&self) -> impl Future<Output = Result<Vec<Tag>, RepositoryError>> + Send;

    /// Check that the store is reachable.
    fn ping(&self) -> impl Future<Output = Result<(), RepositoryError>> + Send;
}

/// A read-write unit of work over the catalog.
///
/// Changes become visible to other readers only after [`commit`](Self::commit).
pub trait CatalogTransaction: Send {
    /// Insert a coffee row and return its ID.
    fn insert_coffee(
        &mut self,
        coffee: &NewCoffee,
    ) -> impl Future<Output = Result<CoffeeId, RepositoryError>> + Send;

    /// Apply the supplied fields to a coffee and bump `updated_at`.
    ///
    /// Returns `false` if the coffee doesn't exist.
    fn update_coffee(
        &mut self,
        id: CoffeeId,
        changes: &CoffeeChanges,
    ) -> impl Future<Output = Result<bool, RepositoryError>> + Send;

    /// Delete a coffee and, by cascade, its associations.
    ///
    /// Returns `false` if the coffee doesn't exist.
    fn delete_coffee(
        &mut self,
        id: CoffeeId,
    ) -> impl Future<Output = Result<bool, RepositoryError>> + Send;

    /// Lock a coffee row against concurrent writers until the transaction ends.
    ///
    /// Returns `false` if the coffee doesn't exist.
    fn lock_coffee(
        &mut self,
        id: CoffeeId,
    ) -> impl Future<Output = Result<bool, RepositoryError>> + Send;

    /// The subset of `ids` that exist, locked against deletion until the
    /// transaction ends.
    fn existing_tags(
        &mut self,
        ids: &TagSet,
    ) -> impl Future<Output = Result<TagSet, RepositoryError>> + Send;

    /// The tag IDs currently associated with a coffee.
    fn coffee_tags(
        &mut self,
        id: CoffeeId,
    ) -> impl Future<Output = Result<TagSet, RepositoryError>> + Send;

    /// Associate tags with a coffee. Existing associations are left alone.
    ///
    /// Fails with [`RepositoryError::UnknownTags`] if a tag doesn't exist.
    fn insert_associations(
        &mut self,
        coffee_id: CoffeeId,
        tags: &TagSet,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    /// Remove associations between a coffee and the given tags.
    fn delete_associations(
        &mut self,
        coffee_id: CoffeeId,
        tags: &TagSet,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    /// A coffee with its tags, as seen by this transaction.
    fn find_coffee(
        &mut self,
        id: CoffeeId,
    ) -> impl Future<Output = Result<Option<Coffee>, RepositoryError>> + Send;

    /// Return the tag with this name (case-insensitive), creating it if needed.
    fn upsert_tag(&mut self, name: &str)
    -> impl Future<Output = Result<Tag, RepositoryError>> + Send;

    /// Make every change durable.
    fn commit(self) -> impl Future<Output = Result<(), RepositoryError>> + Send;
}
