use anyhow::Context;
use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    routing::{get, put},
    Json, Router,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{
    dto::{RecipeDetail, RecipeListQuery, RecipeWriteRequest},
    permissions::{authorize, Access},
    repo::{self, RecipeRow},
    services::{self, WriteMode},
};
use crate::{
    auth::extractors::{AuthUser, MaybeAuthUser},
    db::PgStore,
    error::ApiError,
    images::services::{self as images, ImageKind, MAX_IMAGE_BYTES},
    state::AppState,
};

pub fn recipe_routes() -> Router<AppState> {
    Router::new()
        .route("/recipes/", get(list_recipes).post(create_recipe))
        .route(
            "/recipes/:slug/",
            get(get_recipe)
                .put(replace_recipe)
                .patch(patch_recipe)
                .delete(delete_recipe),
        )
        .route(
            "/recipes/:slug/image/",
            put(upload_recipe_image).layer(DefaultBodyLimit::max(MAX_IMAGE_BYTES + 64 * 1024)),
        )
}

#[instrument(skip(state))]
pub async fn list_recipes(
    State(state): State<AppState>,
    Query(query): Query<RecipeListQuery>,
) -> Result<Json<Vec<RecipeDetail>>, ApiError> {
    let filter = query.into_filter()?;
    let rows = RecipeRow::list(&state.db, &filter).await?;
    Ok(Json(load_details(&state, rows).await?))
}

#[instrument(skip(state))]
pub async fn get_recipe(
    State(state): State<AppState>,
    MaybeAuthUser(actor): MaybeAuthUser,
    Path(slug): Path<String>,
) -> Result<Json<RecipeDetail>, ApiError> {
    let row = RecipeRow::find_by_slug(&state.db, &slug)
        .await?
        .ok_or(ApiError::NotFound("Recipe"))?;
    authorize(actor, Access::Read, row.author_id)?;
    Ok(Json(load_detail(&state, row).await?))
}

#[instrument(skip(state, payload))]
pub async fn create_recipe(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<RecipeWriteRequest>,
) -> Result<(StatusCode, HeaderMap, Json<RecipeDetail>), ApiError> {
    let mut tx = state.db.begin().await?;
    let row = services::create_recipe(&mut PgStore::new(&mut *tx), user_id, payload).await?;
    tx.commit().await?;

    let mut headers = HeaderMap::new();
    let location = format!("/api/recipes/{}/", row.slug);
    headers.insert(
        header::LOCATION,
        HeaderValue::from_str(&location).context("location header")?,
    );
    Ok((StatusCode::CREATED, headers, Json(load_detail(&state, row).await?)))
}

#[instrument(skip(state, payload))]
pub async fn replace_recipe(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(slug): Path<String>,
    Json(payload): Json<RecipeWriteRequest>,
) -> Result<Json<RecipeDetail>, ApiError> {
    write_recipe(&state, user_id, &slug, payload, WriteMode::Replace).await
}

#[instrument(skip(state, payload))]
pub async fn patch_recipe(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(slug): Path<String>,
    Json(payload): Json<RecipeWriteRequest>,
) -> Result<Json<RecipeDetail>, ApiError> {
    write_recipe(&state, user_id, &slug, payload, WriteMode::Partial).await
}

async fn write_recipe(
    state: &AppState,
    user_id: Uuid,
    slug: &str,
    payload: RecipeWriteRequest,
    mode: WriteMode,
) -> Result<Json<RecipeDetail>, ApiError> {
    let mut tx = state.db.begin().await?;
    let row = services::update_recipe(
        &mut PgStore::new(&mut *tx),
        Some(user_id),
        slug,
        payload,
        mode,
    )
    .await?;
    tx.commit().await?;
    Ok(Json(load_detail(state, row).await?))
}

#[instrument(skip(state))]
pub async fn delete_recipe(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(slug): Path<String>,
) -> Result<StatusCode, ApiError> {
    let mut tx = state.db.begin().await?;
    let row = services::delete_recipe(&mut PgStore::new(&mut *tx), Some(user_id), &slug).await?;
    tx.commit().await?;

    images::discard(&state, row.main_image).await;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state, mp))]
pub async fn upload_recipe_image(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(slug): Path<String>,
    mp: Multipart,
) -> Result<Json<RecipeDetail>, ApiError> {
    let row = RecipeRow::find_by_slug(&state.db, &slug)
        .await?
        .ok_or(ApiError::NotFound("Recipe"))?;
    authorize(Some(user_id), Access::Write, row.author_id)?;

    let item = images::read_image_field(mp, "main_image").await?;
    let key = images::upload_image(&state, ImageKind::RecipeImage, row.id, item).await?;
    let swapped = RecipeRow::set_main_image(&state.db, row.id, Some(&key)).await?;
    settle_image_swap(&state, key.clone(), swapped).await?;
    info!(recipe_id = %row.id, %key, "recipe image replaced");

    let row = RecipeRow::find_by_slug(&state.db, &slug)
        .await?
        .ok_or(ApiError::NotFound("Recipe"))?;
    Ok(Json(load_detail(&state, row).await?))
}

/// Drops whichever key is no longer referenced: the replaced image, or the
/// new upload when the recipe was deleted while it was in flight.
async fn settle_image_swap(
    state: &AppState,
    key: String,
    swapped: Option<Option<String>>,
) -> Result<(), ApiError> {
    match swapped {
        Some(previous) => {
            images::discard(state, previous).await;
            Ok(())
        }
        None => {
            warn!(%key, "recipe deleted during upload, discarding image");
            images::discard(state, Some(key)).await;
            Err(ApiError::NotFound("Recipe"))
        }
    }
}

/// Attaches authors, tags, equipment and presigned image URLs with one
/// query per relation.
async fn load_details(state: &AppState, rows: Vec<RecipeRow>) -> anyhow::Result<Vec<RecipeDetail>> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }
    let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
    let author_ids: Vec<Uuid> = rows.iter().map(|r| r.author_id).collect();

    let mut tags = repo::tags_for(&state.db, &ids).await?;
    let mut equipment = repo::equipment_for(&state.db, &ids).await?;
    let authors = repo::authors_for(&state.db, &author_ids).await?;

    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        let author = authors
            .get(&row.author_id)
            .cloned()
            .with_context(|| format!("author {} of recipe {} missing", row.author_id, row.id))?;
        let image = images::media_url(state, row.main_image.as_deref()).await;
        let recipe_tags = tags.remove(&row.id).unwrap_or_default();
        let recipe_equipment = equipment.remove(&row.id).unwrap_or_default();
        out.push(RecipeDetail::new(row, author, recipe_tags, recipe_equipment, image));
    }
    Ok(out)
}

async fn load_detail(state: &AppState, row: RecipeRow) -> anyhow::Result<RecipeDetail> {
    load_details(state, vec![row])
        .await?
        .pop()
        .context("recipe detail missing")
}
