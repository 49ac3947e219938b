use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use tracing::instrument;

use super::repo::{Equipment, Tag};
use crate::{error::ApiError, state::AppState};

/// Tags and equipment are read-only over HTTP; rows come from the seed
/// loader or from recipes naming new equipment.
pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/tags/", get(list_tags))
        .route("/tags/:slug/", get(get_tag))
        .route("/equipment/", get(list_equipment))
        .route("/equipment/:slug/", get(get_equipment))
}

#[instrument(skip(state))]
pub async fn list_tags(State(state): State<AppState>) -> Result<Json<Vec<Tag>>, ApiError> {
    Ok(Json(Tag::list(&state.db).await?))
}

#[instrument(skip(state))]
pub async fn get_tag(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<Tag>, ApiError> {
    Tag::find_by_slug(&state.db, &slug)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound("Tag"))
}

#[instrument(skip(state))]
pub async fn list_equipment(
    State(state): State<AppState>,
) -> Result<Json<Vec<Equipment>>, ApiError> {
    Ok(Json(Equipment::list(&state.db).await?))
}

#[instrument(skip(state))]
pub async fn get_equipment(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<Equipment>, ApiError> {
    Equipment::find_by_slug(&state.db, &slug)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound("Equipment"))
}
