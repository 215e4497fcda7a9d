//! `PostgreSQL` implementation of the catalog store.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use tracing::{debug, instrument};
use uuid::Uuid;

use coffee_catalog_core::{
    Coffee, CoffeeChanges, CoffeeId, NewCoffee, Page, PageWindow, Predicate, Price, Tag, TagId,
    TagSet,
};

use super::query::{COFFEE_ORDER, TAG_ORDER, push_where, push_window};
use super::{CatalogStore, CatalogTransaction, RepositoryError};

const SELECT_COFFEE: &str = "SELECT c.id, c.name, c.description, c.price, c.image_url, \
                             c.created_at, c.updated_at FROM catalog.coffee c";

/// Foreign key from `coffee_tag.tag_id` to `tag.id`.
const TAG_FOREIGN_KEY: &str = "coffee_tag_tag_id_fkey";

/// Catalog store backed by a `PostgreSQL` pool.
#[derive(Debug, Clone)]
pub struct PgCatalogStore {
    pool: PgPool,
}

impl PgCatalogStore {
    /// Create a store over an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// A `PostgreSQL` transaction. Rolled back on drop unless committed.
#[derive(Debug)]
pub struct PgTransaction {
    tx: sqlx::Transaction<'static, Postgres>,
}

// =============================================================================
// Rows
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct CoffeeRow {
    id: CoffeeId,
    name: String,
    description: String,
    price: Decimal,
    image_url: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl CoffeeRow {
    fn into_coffee(self, tags: Vec<Tag>) -> Result<Coffee, RepositoryError> {
        let price = Price::new(self.price).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid price for coffee {}: {e}", self.id))
        })?;

        Ok(Coffee {
            id: self.id,
            name: self.name,
            description: self.description,
            price,
            image_url: self.image_url,
            created_at: self.created_at,
            updated_at: self.updated_at,
            tags,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct TagRow {
    id: TagId,
    name: String,
}

impl From<TagRow> for Tag {
    fn from(row: TagRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CoffeeTagRow {
    coffee_id: CoffeeId,
    id: TagId,
    name: String,
}

// =============================================================================
// Shared queries
// =============================================================================

/// Resolve the tags of every coffee in `rows`, preserving row order.
async fn with_tags(
    conn: &mut PgConnection,
    rows: Vec<CoffeeRow>,
) -> Result<Vec<Coffee>, RepositoryError> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }

    let ids: Vec<Uuid> = rows.iter().map(|row| row.id.as_uuid()).collect();
    let mut select = QueryBuilder::<Postgres>::new(
        r"
        SELECT ct.coffee_id, t.id, t.name
        FROM catalog.coffee_tag ct
        JOIN catalog.tag t ON t.id = ct.tag_id
        WHERE ct.coffee_id = ANY(",
    );
    select.push_bind(ids).push(")").push(TAG_ORDER);
    let tag_rows: Vec<CoffeeTagRow> = select.build_query_as().fetch_all(&mut *conn).await?;

    let mut tags: HashMap<CoffeeId, Vec<Tag>> = HashMap::new();
    for row in tag_rows {
        tags.entry(row.coffee_id).or_default().push(Tag {
            id: row.id,
            name: row.name,
        });
    }

    rows.into_iter()
        .map(|row| {
            let coffee_tags = tags.remove(&row.id).unwrap_or_default();
            row.into_coffee(coffee_tags)
        })
        .collect()
}

async fn find_coffee(
    conn: &mut PgConnection,
    id: CoffeeId,
) -> Result<Option<Coffee>, RepositoryError> {
    let mut query = QueryBuilder::<Postgres>::new(SELECT_COFFEE);
    query.push(" WHERE c.id = ").push_bind(id);

    let Some(row) = query
        .build_query_as::<CoffeeRow>()
        .fetch_optional(&mut *conn)
        .await?
    else {
        return Ok(None);
    };

    Ok(with_tags(conn, vec![row]).await?.pop())
}

// =============================================================================
// Store
// =============================================================================

impl CatalogStore for PgCatalogStore {
    type Transaction = PgTransaction;

    async fn begin(&self) -> Result<PgTransaction, RepositoryError> {
        Ok(PgTransaction {
            tx: self.pool.begin().await?,
        })
    }

    #[instrument(
        skip(self, predicate, window),
        fields(clauses = predicate.clauses().len(), limit = window.limit(), offset = window.offset())
    )]
    async fn search_coffees(
        &self,
        predicate: &Predicate,
        window: PageWindow,
    ) -> Result<Page<Coffee>, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ READ ONLY")
            .execute(&mut *tx)
            .await?;

        let mut select = QueryBuilder::<Postgres>::new(SELECT_COFFEE);
        push_where(&mut select, predicate);
        push_window(&mut select, window);
        let rows: Vec<CoffeeRow> = select.build_query_as().fetch_all(&mut *tx).await?;

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM catalog.coffee c");
        push_where(&mut count, predicate);
        let total: i64 = count.build_query_scalar().fetch_one(&mut *tx).await?;

        let items = with_tags(&mut tx, rows).await?;
        tx.commit().await?;

        debug!(total, returned = items.len(), "Search executed");
        Ok(Page { items, total })
    }

    #[instrument(skip(self))]
    async fn list_coffees(&self) -> Result<Vec<Coffee>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;

        let mut select = QueryBuilder::<Postgres>::new(SELECT_COFFEE);
        select.push(COFFEE_ORDER);
        let rows: Vec<CoffeeRow> = select.build_query_as().fetch_all(&mut *conn).await?;

        with_tags(&mut conn, rows).await
    }

    #[instrument(skip(self), fields(coffee_id = %id))]
    async fn find_coffee(&self, id: CoffeeId) -> Result<Option<Coffee>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        find_coffee(&mut conn, id).await
    }

    #[instrument(skip(self), fields(tag_id = %id))]
    async fn find_tag(&self, id: TagId) -> Result<Option<Tag>, RepositoryError> {
        let row: Option<TagRow> = sqlx::query_as("SELECT id, name FROM catalog.tag WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Tag::from))
    }

    #[instrument(skip(self))]
    async fn list_tags(&self) -> Result<Vec<Tag>, RepositoryError> {
        let mut select = QueryBuilder::<Postgres>::new("SELECT t.id, t.name FROM catalog.tag t");
        select.push(TAG_ORDER);
        let rows: Vec<TagRow> = select.build_query_as().fetch_all(&self.pool).await?;

        Ok(rows.into_iter().map(Tag::from).collect())
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

// =============================================================================
// Transaction
// =============================================================================

impl CatalogTransaction for PgTransaction {
    #[instrument(skip(self, coffee), fields(name = %coffee.name))]
    async fn insert_coffee(&mut self, coffee: &NewCoffee) -> Result<CoffeeId, RepositoryError> {
        let (id,): (CoffeeId,) = sqlx::query_as(
            r"
            INSERT INTO catalog.coffee (name, description, price, image_url)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            ",
        )
        .bind(&coffee.name)
        .bind(&coffee.description)
        .bind(coffee.price)
        .bind(&coffee.image_url)
        .fetch_one(&mut *self.tx)
        .await?;

        debug!(coffee_id = %id, "Inserted coffee");
        Ok(id)
    }

    #[instrument(skip(self, changes), fields(coffee_id = %id))]
    async fn update_coffee(
        &mut self,
        id: CoffeeId,
        changes: &CoffeeChanges,
    ) -> Result<bool, RepositoryError> {
        let row: Option<(CoffeeId,)> = sqlx::query_as(
            r"
            UPDATE catalog.coffee
            SET name = COALESCE($2, name),
                description = COALESCE($3, description),
                price = COALESCE($4, price),
                image_url = COALESCE($5, image_url),
                updated_at = now()
            WHERE id = $1
            RETURNING id
            ",
        )
        .bind(id)
        .bind(changes.name.as_deref())
        .bind(changes.description.as_deref())
        .bind(changes.price)
        .bind(changes.image_url.as_deref())
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(row.is_some())
    }

    #[instrument(skip(self), fields(coffee_id = %id))]
    async fn delete_coffee(&mut self, id: CoffeeId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM catalog.coffee WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn lock_coffee(&mut self, id: CoffeeId) -> Result<bool, RepositoryError> {
        let row: Option<(CoffeeId,)> =
            sqlx::query_as("SELECT id FROM catalog.coffee WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *self.tx)
                .await?;

        Ok(row.is_some())
    }

    async fn existing_tags(&mut self, ids: &TagSet) -> Result<TagSet, RepositoryError> {
        if ids.is_empty() {
            return Ok(TagSet::new());
        }

        let rows: Vec<(TagId,)> =
            sqlx::query_as("SELECT id FROM catalog.tag WHERE id = ANY($1) FOR SHARE")
                .bind(ids.to_uuids())
                .fetch_all(&mut *self.tx)
                .await?;

        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    async fn coffee_tags(&mut self, id: CoffeeId) -> Result<TagSet, RepositoryError> {
        let rows: Vec<(TagId,)> =
            sqlx::query_as("SELECT tag_id FROM catalog.coffee_tag WHERE coffee_id = $1")
                .bind(id)
                .fetch_all(&mut *self.tx)
                .await?;

        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    #[instrument(skip(self, tags), fields(coffee_id = %coffee_id, count = tags.len()))]
    async fn insert_associations(
        &mut self,
        coffee_id: CoffeeId,
        tags: &TagSet,
    ) -> Result<(), RepositoryError> {
        if tags.is_empty() {
            return Ok(());
        }

        sqlx::query(
            r"
            INSERT INTO catalog.coffee_tag (coffee_id, tag_id)
            SELECT $1, UNNEST($2::uuid[])
            ON CONFLICT DO NOTHING
            ",
        )
        .bind(coffee_id)
        .bind(tags.to_uuids())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_foreign_key_violation()
                && db_err.constraint() == Some(TAG_FOREIGN_KEY)
            {
                return RepositoryError::UnknownTags(tags.to_vec());
            }
            RepositoryError::Database(e)
        })?;

        Ok(())
    }

    #[instrument(skip(self, tags), fields(coffee_id = %coffee_id, count = tags.len()))]
    async fn delete_associations(
        &mut self,
        coffee_id: CoffeeId,
        tags: &TagSet,
    ) -> Result<(), RepositoryError> {
        if tags.is_empty() {
            return Ok(());
        }

        sqlx::query("DELETE FROM catalog.coffee_tag WHERE coffee_id = $1 AND tag_id = ANY($2)")
            .bind(coffee_id)
            .bind(tags.to_uuids())
            .execute(&mut *self.tx)
            .await?;

        Ok(())
    }

    async fn find_coffee(&mut self, id: CoffeeId) -> Result<Option<Coffee>, RepositoryError> {
        find_coffee(&mut self.tx, id).await
    }

    #[instrument(skip(self))]
    async fn upsert_tag(&mut self, name: &str) -> Result<Tag, RepositoryError> {
        let row: TagRow = sqlx::query_as(
            r"
            INSERT INTO catalog.tag AS t (name)
            VALUES ($1)
            ON CONFLICT ((lower(name))) DO UPDATE SET name = t.name
            RETURNING id, name
            ",
        )
        .bind(name)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(row.into())
    }

    async fn commit(self) -> Result<(), RepositoryError> {
        self.tx.commit().await?;
        Ok(())
    }
}
