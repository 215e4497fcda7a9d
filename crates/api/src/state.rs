//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::CatalogConfig;
use crate::db::{CatalogStore, PgCatalogStore};
use crate::services::CatalogService;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc`. The store parameter defaults
/// to `PostgreSQL`; tests plug in the in-memory store.
pub struct AppState<S = PgCatalogStore> {
    inner: Arc<AppStateInner<S>>,
}

struct AppStateInner<S> {
    catalog: CatalogService<S>,
    config: CatalogConfig,
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: CatalogStore> AppState<S> {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `store` - Catalog persistence
    /// * `config` - Search defaults
    #[must_use]
    pub fn new(store: S, config: CatalogConfig) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                catalog: CatalogService::new(store),
                config,
            }),
        }
    }

    /// Get a reference to the catalog service.
    #[must_use]
    pub fn catalog(&self) -> &CatalogService<S> {
        &self.inner.catalog
    }

    /// Get a reference to the catalog configuration.
    #[must_use]
    pub fn config(&self) -> &CatalogConfig {
        &self.inner.config
    }
}
