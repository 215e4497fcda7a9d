//! Coffee/tag association synchronization.
//!
//! Both operations run inside a caller-provided transaction and validate every
//! referenced tag before the first association is written, so a failure never
//! leaves a partial tag set behind once the caller drops the transaction.

use tracing::{debug, instrument};

use coffee_catalog_core::{CoffeeId, TagDiff, TagSet};

use super::CatalogError;
use crate::db::CatalogTransaction;

/// Associate every tag in `tags` with a coffee that has none yet.
///
/// # Errors
///
/// Returns `CatalogError::UnknownTag` listing every ID that doesn't resolve.
/// Returns `CatalogError::Persistence` if the store fails.
#[instrument(skip(tx, tags), fields(coffee_id = %coffee_id, count = tags.len()))]
pub async fn create_associations<T: CatalogTransaction>(
    tx: &mut T,
    coffee_id: CoffeeId,
    tags: &TagSet,
) -> Result<(), CatalogError> {
    ensure_tags_exist(tx, tags).await?;
    tx.insert_associations(coffee_id, tags).await?;
    Ok(())
}

/// Make the coffee's associations exactly `target`.
///
/// The caller establishes that the coffee exists (and locks it) inside the
/// same transaction.
///
/// # Errors
///
/// Returns `CatalogError::UnknownTag` listing every ID that doesn't resolve.
/// Returns `CatalogError::Persistence` if the store fails.
#[instrument(skip(tx, target), fields(coffee_id = %coffee_id, count = target.len()))]
pub async fn replace_associations<T: CatalogTransaction>(
    tx: &mut T,
    coffee_id: CoffeeId,
    target: &TagSet,
) -> Result<TagDiff, CatalogError> {
    ensure_tags_exist(tx, target).await?;

    let current = tx.coffee_tags(coffee_id).await?;
    let diff = TagDiff::between(&current, target);
    if diff.is_noop() {
        return Ok(diff);
    }

    tx.delete_associations(coffee_id, &diff.remove).await?;
    tx.insert_associations(coffee_id, &diff.insert).await?;

    debug!(
        removed = diff.remove.len(),
        inserted = diff.insert.len(),
        "Replaced coffee tags"
    );
    Ok(diff)
}

async fn ensure_tags_exist<T: CatalogTransaction>(
    tx: &mut T,
    tags: &TagSet,
) -> Result<(), CatalogError> {
    let existing = tx.existing_tags(tags).await?;
    let missing = tags.difference(&existing);
    if !missing.is_empty() {
        return Err(CatalogError::UnknownTag(missing.to_vec()));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use coffee_catalog_core::{NewCoffee, TagId};

    use super::*;
    use crate::db::{CatalogStore, MemoryCatalogStore};

    async fn setup(tag_names: &[&str]) -> (MemoryCatalogStore, CoffeeId, Vec<TagId>) {
        let store = MemoryCatalogStore::new();
        let mut tx = store.begin().await.unwrap();

        let mut tags = Vec::new();
        for name in tag_names {
            tags.push(tx.upsert_tag(name).await.unwrap().id);
        }
        let coffee = NewCoffee::new(
            "Latte",
            "Smooth and creamy espresso drink",
            Decimal::new(350, 2),
            "https://example.com/latte.png",
        )
        .unwrap();
        let id = tx.insert_coffee(&coffee).await.unwrap();
        tx.commit().await.unwrap();

        (store, id, tags)
    }

    async fn stored_tags(store: &MemoryCatalogStore, id: CoffeeId) -> TagSet {
        store
            .find_coffee(id)
            .await
            .unwrap()
            .unwrap()
            .tags
            .iter()
            .map(|tag| tag.id)
            .collect()
    }

    async fn replace(store: &MemoryCatalogStore, id: CoffeeId, target: &TagSet) {
        let mut tx = store.begin().await.unwrap();
        replace_associations(&mut tx, id, target).await.unwrap();
        tx.commit().await.unwrap();
    }

    #[tokio::test]
    async fn test_replace_yields_exact_target_from_any_prior_state() {
        let (store, id, tags) = setup(&["sweet", "bitter", "fruity"]).await;
        let targets: [TagSet; 4] = [
            TagSet::from(&tags[..2]),
            TagSet::from(&tags[1..]),
            TagSet::new(),
            TagSet::from(tags.as_slice()),
        ];

        for target in &targets {
            replace(&store, id, target).await;
            assert_eq!(&stored_tags(&store, id).await, target);
        }
    }

    #[tokio::test]
    async fn test_replace_returns_minimal_diff() {
        let (store, id, tags) = setup(&["sweet", "bitter", "fruity"]).await;
        replace(&store, id, &TagSet::from(&tags[..2])).await;

        let mut tx = store.begin().await.unwrap();
        let diff = replace_associations(&mut tx, id, &TagSet::from(&tags[1..]))
            .await
            .unwrap();

        assert_eq!(diff.remove.to_vec(), vec![tags[0]]);
        assert_eq!(diff.insert.to_vec(), vec![tags[2]]);
    }

    #[tokio::test]
    async fn test_replace_with_unknown_tag_changes_nothing() {
        let (store, id, tags) = setup(&["sweet", "bitter"]).await;
        replace(&store, id, &TagSet::from(&tags[..1])).await;

        let unknown = TagId::random();
        let target: TagSet = [tags[1], unknown].into_iter().collect();

        let mut tx = store.begin().await.unwrap();
        let err = replace_associations(&mut tx, id, &target)
            .await
            .unwrap_err();
        drop(tx);

        assert!(matches!(err, CatalogError::UnknownTag(ref ids) if ids == &[unknown]));
        assert_eq!(stored_tags(&store, id).await, TagSet::from(&tags[..1]));
    }

    #[tokio::test]
    async fn test_create_validates_before_writing() {
        let (store, id, tags) = setup(&["sweet"]).await;
        let unknown = TagId::random();
        let requested: TagSet = [tags[0], unknown].into_iter().collect();

        let mut tx = store.begin().await.unwrap();
        let err = create_associations(&mut tx, id, &requested)
            .await
            .unwrap_err();

        assert!(matches!(err, CatalogError::UnknownTag(ref ids) if ids == &[unknown]));
        assert!(tx.coffee_tags(id).await.unwrap().is_empty());
    }
}
