//! Tag route handlers.

use axum::{
    Json,
    extract::{Path, State, rejection::PathRejection},
};

use coffee_catalog_core::{Tag, TagId};

use crate::db::CatalogStore;
use crate::error::Result;
use crate::state::AppState;

/// `GET /tags`
pub async fn list<S: CatalogStore>(State(state): State<AppState<S>>) -> Result<Json<Vec<Tag>>> {
    Ok(Json(state.catalog().list_tags().await?))
}

/// `GET /tags/{id}`
pub async fn show<S: CatalogStore>(
    State(state): State<AppState<S>>,
    path: std::result::Result<Path<TagId>, PathRejection>,
) -> Result<Json<Tag>> {
    let Path(id) = path?;
    Ok(Json(state.catalog().find_tag(id).await?))
}
