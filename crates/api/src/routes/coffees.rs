//! Coffee route handlers.

use std::str::FromStr;

use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::StatusCode,
};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{debug, instrument};

use coffee_catalog_core::{
    Coffee, CoffeeChanges, CoffeeError, CoffeeId, NewCoffee, SearchFilter, SearchResult, TagId,
    TagSet, page::page_offset,
};

use crate::db::CatalogStore;
use crate::error::Result;
use crate::state::AppState;

// =============================================================================
// Request types
// =============================================================================

/// Query string of `GET /coffees/search`.
///
/// Every parameter is kept as raw text and parsed leniently: a value that
/// doesn't parse is treated as absent, not as an error.
#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    /// Name substring.
    pub name: Option<String>,
    /// Inclusive lower price bound.
    #[serde(alias = "minPrice")]
    pub min_price: Option<String>,
    /// Inclusive upper price bound.
    #[serde(alias = "maxPrice")]
    pub max_price: Option<String>,
    /// Comma-separated tag names.
    pub tags: Option<String>,
    /// RFC 3339 timestamp or `YYYY-MM-DD`.
    #[serde(alias = "startDate")]
    pub start_date: Option<String>,
    /// RFC 3339 timestamp or `YYYY-MM-DD`; covers the whole day.
    #[serde(alias = "endDate")]
    pub end_date: Option<String>,
    /// 0-indexed page number, used when `offset` is absent.
    pub page: Option<String>,
    /// Page size.
    pub limit: Option<String>,
    /// Number of matches to skip; wins over `page`.
    pub offset: Option<String>,
}

impl SearchQuery {
    /// Turn the raw parameters into a search filter.
    #[must_use]
    pub fn into_filter(self, default_page_size: i64) -> SearchFilter {
        let limit = lenient("limit", self.limit.as_deref()).unwrap_or(default_page_size);
        let offset = lenient("offset", self.offset.as_deref()).unwrap_or_else(|| {
            let page = lenient("page", self.page.as_deref()).unwrap_or(0);
            page_offset(page, limit)
        });

        let tags: Vec<String> = self
            .tags
            .as_deref()
            .map(|tags| {
                tags.split(',')
                    .map(str::trim)
                    .filter(|tag| !tag.is_empty())
                    .map(str::to_owned)
                    .collect()
            })
            .unwrap_or_default();

        SearchFilter {
            name: self.name.filter(|name| !name.trim().is_empty()),
            min_price: lenient::<Decimal>("min_price", self.min_price.as_deref()),
            max_price: lenient::<Decimal>("max_price", self.max_price.as_deref()),
            tags,
            start_date: lenient_date("start_date", self.start_date.as_deref()),
            end_date: lenient_date("end_date", self.end_date.as_deref()),
            limit,
            offset,
        }
    }
}

/// Body of `POST /coffees`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCoffeeRequest {
    /// Display name.
    pub name: String,
    /// Description, 10 to 200 characters.
    pub description: String,
    /// Price, at least 0.01 with at most two decimals.
    pub price: Decimal,
    /// Absolute http(s) image URL.
    pub image_url: String,
    /// At least one existing tag.
    pub tag_ids: Vec<TagId>,
}

impl CreateCoffeeRequest {
    fn validate(&self) -> std::result::Result<(NewCoffee, TagSet), CoffeeError> {
        if self.tag_ids.is_empty() {
            return Err(CoffeeError::NoTags);
        }
        let coffee = NewCoffee::new(&self.name, &self.description, self.price, &self.image_url)?;
        Ok((coffee, self.tag_ids.as_slice().into()))
    }
}

/// Body of `PATCH /coffees/{id}`. Absent fields are left unchanged.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCoffeeRequest {
    /// New name.
    pub name: Option<String>,
    /// New description.
    pub description: Option<String>,
    /// New price.
    pub price: Option<Decimal>,
    /// New image URL.
    pub image_url: Option<String>,
    /// Replacement tag set; an empty list clears the tags.
    pub tag_ids: Option<Vec<TagId>>,
}

impl UpdateCoffeeRequest {
    fn validate(&self) -> std::result::Result<(CoffeeChanges, Option<TagSet>), CoffeeError> {
        let changes = CoffeeChanges::new(
            self.name.as_deref(),
            self.description.as_deref(),
            self.price,
            self.image_url.as_deref(),
        )?;
        let tags = self.tag_ids.as_deref().map(TagSet::from);
        Ok((changes, tags))
    }
}

/// Body of `PUT /coffees/{id}/tags`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplaceTagsRequest {
    /// The complete new tag set.
    pub tag_ids: Vec<TagId>,
}

// =============================================================================
// Handlers
// =============================================================================

/// `GET /coffees`
pub async fn list<S: CatalogStore>(State(state): State<AppState<S>>) -> Result<Json<Vec<Coffee>>> {
    Ok(Json(state.catalog().find_all().await?))
}

/// `GET /coffees/search`
#[instrument(skip(state, query))]
pub async fn search<S: CatalogStore>(
    State(state): State<AppState<S>>,
    query: std::result::Result<Query<SearchQuery>, QueryRejection>,
) -> Result<Json<SearchResult<Coffee>>> {
    let Query(query) = query?;
    let filter = query.into_filter(state.config().default_page_size);
    Ok(Json(state.catalog().search(&filter).await?))
}

/// `GET /coffees/{id}`
pub async fn show<S: CatalogStore>(
    State(state): State<AppState<S>>,
    path: std::result::Result<Path<CoffeeId>, PathRejection>,
) -> Result<Json<Coffee>> {
    let Path(id) = path?;
    Ok(Json(state.catalog().find_one(id).await?))
}

/// `POST /coffees`
#[instrument(skip(state, body))]
pub async fn create<S: CatalogStore>(
    State(state): State<AppState<S>>,
    body: std::result::Result<Json<CreateCoffeeRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Coffee>)> {
    let Json(request) = body?;
    let (coffee, tags) = request.validate()?;
    let created = state.catalog().create(&coffee, &tags).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// `PATCH /coffees/{id}`
#[instrument(skip(state, path, body))]
pub async fn update<S: CatalogStore>(
    State(state): State<AppState<S>>,
    path: std::result::Result<Path<CoffeeId>, PathRejection>,
    body: std::result::Result<Json<UpdateCoffeeRequest>, JsonRejection>,
) -> Result<Json<Coffee>> {
    let Path(id) = path?;
    let Json(request) = body?;
    let (changes, tags) = request.validate()?;
    let updated = state.catalog().update(id, &changes, tags.as_ref()).await?;
    Ok(Json(updated))
}

/// `PUT /coffees/{id}/tags`
#[instrument(skip(state, path, body))]
pub async fn replace_tags<S: CatalogStore>(
    State(state): State<AppState<S>>,
    path: std::result::Result<Path<CoffeeId>, PathRejection>,
    body: std::result::Result<Json<ReplaceTagsRequest>, JsonRejection>,
) -> Result<Json<Coffee>> {
    let Path(id) = path?;
    let Json(request) = body?;
    let tags = TagSet::from(request.tag_ids.as_slice());
    Ok(Json(state.catalog().replace_tags(id, &tags).await?))
}

/// `DELETE /coffees/{id}`
#[instrument(skip(state, path))]
pub async fn remove<S: CatalogStore>(
    State(state): State<AppState<S>>,
    path: std::result::Result<Path<CoffeeId>, PathRejection>,
) -> Result<StatusCode> {
    let Path(id) = path?;
    state.catalog().remove(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Lenient parsing
// =============================================================================

fn lenient<T: FromStr>(field: &'static str, raw: Option<&str>) -> Option<T> {
    let raw = raw.map(str::trim).filter(|raw| !raw.is_empty())?;
    let parsed = raw.parse().ok();
    if parsed.is_none() {
        debug!(field, value = raw, "Ignoring unparseable search parameter");
    }
    parsed
}

fn lenient_date(field: &'static str, raw: Option<&str>) -> Option<DateTime<Utc>> {
    let raw = raw.map(str::trim).filter(|raw| !raw.is_empty())?;
    let parsed = parse_date(raw);
    if parsed.is_none() {
        debug!(field, value = raw, "Ignoring unparseable search date");
    }
    parsed
}

/// RFC 3339, or a bare `YYYY-MM-DD` taken as midnight UTC.
fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(raw) {
        return Some(timestamp.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|midnight| midnight.and_utc())
}
