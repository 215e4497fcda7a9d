//! In-process catalog store.
//!
//! Holds the whole catalog behind one async mutex. A transaction owns the
//! lock for its lifetime and edits a private copy of the state, which replaces
//! the shared state on commit. Writers are therefore fully serialized and a
//! dropped transaction leaves no trace.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};

use coffee_catalog_core::{
    Coffee, CoffeeChanges, CoffeeId, NewCoffee, Page, PageWindow, Predicate, Price, Tag, TagId,
    TagSet, compare_names,
};

use super::{CatalogStore, CatalogTransaction, RepositoryError};

/// Catalog store kept in memory. Cloning shares the same catalog.
#[derive(Debug, Clone, Default)]
pub struct MemoryCatalogStore {
    state: Arc<Mutex<MemoryState>>,
}

/// A unit of work over a [`MemoryCatalogStore`].
#[derive(Debug)]
pub struct MemoryTransaction {
    shared: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
}

#[derive(Debug, Clone, Default)]
struct MemoryState {
    coffees: HashMap<CoffeeId, CoffeeRecord>,
    tags: HashMap<TagId, Tag>,
    associations: BTreeSet<(CoffeeId, TagId)>,
}

#[derive(Debug, Clone)]
struct CoffeeRecord {
    id: CoffeeId,
    name: String,
    description: String,
    price: Price,
    image_url: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl MemoryCatalogStore {
    /// An empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite a coffee's creation timestamp. Returns `false` if the coffee
    /// doesn't exist.
    pub async fn backdate(&self, id: CoffeeId, created_at: DateTime<Utc>) -> bool {
        let mut state = self.state.lock().await;
        state.coffees.get_mut(&id).is_some_and(|record| {
            record.created_at = created_at;
            true
        })
    }
}

impl MemoryState {
    fn tag_ids(&self, coffee_id: CoffeeId) -> TagSet {
        self.associations
            .iter()
            .filter(|&&(id, _)| id == coffee_id)
            .map(|&(_, tag_id)| tag_id)
            .collect()
    }

    fn resolve(&self, record: &CoffeeRecord) -> Coffee {
        let mut tags: Vec<Tag> = self
            .tag_ids(record.id)
            .iter()
            .filter_map(|id| self.tags.get(&id).cloned())
            .collect();
        tags.sort_by(|a, b| compare_names(&a.name, &b.name).then(a.id.cmp(&b.id)));

        Coffee {
            id: record.id,
            name: record.name.clone(),
            description: record.description.clone(),
            price: record.price,
            image_url: record.image_url.clone(),
            created_at: record.created_at,
            updated_at: record.updated_at,
            tags,
        }
    }

    fn find(&self, id: CoffeeId) -> Option<Coffee> {
        self.coffees.get(&id).map(|record| self.resolve(record))
    }

    /// Every coffee, ordered by name then ID.
    fn sorted(&self) -> Vec<Coffee> {
        let mut records: Vec<&CoffeeRecord> = self.coffees.values().collect();
        records.sort_by(|a, b| compare_names(&a.name, &b.name).then(a.id.cmp(&b.id)));
        records.into_iter().map(|record| self.resolve(record)).collect()
    }
}

impl CatalogStore for MemoryCatalogStore {
    type Transaction = MemoryTransaction;

    async fn begin(&self) -> Result<MemoryTransaction, RepositoryError> {
        let shared = Arc::clone(&self.state).lock_owned().await;
        let working = (*shared).clone();
        Ok(MemoryTransaction { shared, working })
    }

    async fn search_coffees(
        &self,
        predicate: &Predicate,
        window: PageWindow,
    ) -> Result<Page<Coffee>, RepositoryError> {
        let state = self.state.lock().await;
        let matches: Vec<Coffee> = state
            .sorted()
            .into_iter()
            .filter(|coffee| predicate.matches(coffee))
            .collect();

        let total = i64::try_from(matches.len())
            .map_err(|e| RepositoryError::DataCorruption(e.to_string()))?;
        let offset = usize::try_from(window.offset()).unwrap_or(usize::MAX);
        let limit = usize::try_from(window.limit()).unwrap_or(usize::MAX);
        let items = matches.into_iter().skip(offset).take(limit).collect();

        Ok(Page { items, total })
    }

    async fn list_coffees(&self) -> Result<Vec<Coffee>, RepositoryError> {
        Ok(self.state.lock().await.sorted())
    }

    async fn find_coffee(&self, id: CoffeeId) -> Result<Option<Coffee>, RepositoryError> {
        Ok(self.state.lock().await.find(id))
    }

    async fn find_tag(&self, id: TagId) -> Result<Option<Tag>, RepositoryError> {
        Ok(self.state.lock().await.tags.get(&id).cloned())
    }

    async fn list_tags(&self) -> Result<Vec<Tag>, RepositoryError> {
        let mut tags: Vec<Tag> = self.state.lock().await.tags.values().cloned().collect();
        tags.sort_by(|a, b| compare_names(&a.name, &b.name).then(a.id.cmp(&b.id)));
        Ok(tags)
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}

impl CatalogTransaction for MemoryTransaction {
    async fn insert_coffee(&mut self, coffee: &NewCoffee) -> Result<CoffeeId, RepositoryError> {
        let id = CoffeeId::random();
        let now = Utc::now();
        self.working.coffees.insert(
            id,
            CoffeeRecord {
                id,
                name: coffee.name.clone(),
                description: coffee.description.clone(),
                price: coffee.price,
                image_url: coffee.image_url.clone(),
                created_at: now,
                updated_at: now,
            },
        );
        Ok(id)
    }

    async fn update_coffee(
        &mut self,
        id: CoffeeId,
        changes: &CoffeeChanges,
    ) -> Result<bool, RepositoryError> {
        let Some(record) = self.working.coffees.get_mut(&id) else {
            return Ok(false);
        };

        if let Some(name) = &changes.name {
            record.name.clone_from(name);
        }
        if let Some(description) = &changes.description {
            record.description.clone_from(description);
        }
        if let Some(price) = changes.price {
            record.price = price;
        }
        if let Some(image_url) = &changes.image_url {
            record.image_url.clone_from(image_url);
        }
        record.updated_at = Utc::now();
        Ok(true)
    }

    async fn delete_coffee(&mut self, id: CoffeeId) -> Result<bool, RepositoryError> {
        if self.working.coffees.remove(&id).is_none() {
            return Ok(false);
        }
        self.working
            .associations
            .retain(|&(coffee_id, _)| coffee_id != id);
        Ok(true)
    }

    async fn lock_coffee(&mut self, id: CoffeeId) -> Result<bool, RepositoryError> {
        Ok(self.working.coffees.contains_key(&id))
    }

    async fn existing_tags(&mut self, ids: &TagSet) -> Result<TagSet, RepositoryError> {
        Ok(ids
            .iter()
            .filter(|id| self.working.tags.contains_key(id))
            .collect())
    }

    async fn coffee_tags(&mut self, id: CoffeeId) -> Result<TagSet, RepositoryError> {
        Ok(self.working.tag_ids(id))
    }

    async fn insert_associations(
        &mut self,
        coffee_id: CoffeeId,
        tags: &TagSet,
    ) -> Result<(), RepositoryError> {
        let missing: Vec<TagId> = tags
            .iter()
            .filter(|id| !self.working.tags.contains_key(id))
            .collect();
        if !missing.is_empty() {
            return Err(RepositoryError::UnknownTags(missing));
        }

        self.working
            .associations
            .extend(tags.iter().map(|tag_id| (coffee_id, tag_id)));
        Ok(())
    }

    async fn delete_associations(
        &mut self,
        coffee_id: CoffeeId,
        tags: &TagSet,
    ) -> Result<(), RepositoryError> {
        for tag_id in tags.iter() {
            self.working.associations.remove(&(coffee_id, tag_id));
        }
        Ok(())
    }

    async fn find_coffee(&mut self, id: CoffeeId) -> Result<Option<Coffee>, RepositoryError> {
        Ok(self.working.find(id))
    }

    async fn upsert_tag(&mut self, name: &str) -> Result<Tag, RepositoryError> {
        if let Some(tag) = self.working.tags.values().find(|tag| tag.is_named(name)) {
            return Ok(tag.clone());
        }

        let tag = Tag {
            id: TagId::random(),
            name: name.to_owned(),
        };
        self.working.tags.insert(tag.id, tag.clone());
        Ok(tag)
    }

    async fn commit(mut self) -> Result<(), RepositoryError> {
        *self.shared = self.working;
        Ok(())
    }
}
