use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use super::{
    dto::{MessageResponse, ProfileResponse, ProfileUpdateRequest, RegisterRequest},
    repo::{NewUser, ProfileChanges, User},
    services::{validate_profile, validate_registration},
};
use crate::{
    auth::{extractors::AuthUser, password::hash_password},
    error::ApiError,
    images::services::{self as images, ImageKind, MAX_IMAGE_BYTES},
    state::AppState,
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users/register/", post(register))
        .route(
            "/users/profile/",
            get(get_profile).put(update_profile).patch(update_profile),
        )
        .route(
            "/users/profile/picture/",
            put(upload_profile_picture)
                .delete(delete_profile_picture)
                .layer(DefaultBodyLimit::max(MAX_IMAGE_BYTES + 64 * 1024)),
        )
        .route("/users/", get(list_public_users))
        .route("/users/:id/", get(get_public_user))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<MessageResponse>), ApiError> {
    let valid = validate_registration(payload).map_err(|e| {
        warn!("registration rejected by validation");
        e
    })?;

    if User::find_by_email(&state.db, &valid.email).await?.is_some() {
        warn!(email = %valid.email, "email already registered");
        return Err(ApiError::field(
            "email",
            "user with this email address already exists.",
        ));
    }

    let password_hash = hash_password(&valid.password)?;
    let user = User::create(
        &state.db,
        &NewUser {
            email: valid.email,
            password_hash,
            first_name: valid.first_name,
            last_name: valid.last_name,
        },
    )
    .await?;

    info!(user_id = %user.id, email = %user.email, name = %user.full_name(), "user registered");
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            message: "User registered successfully.",
        }),
    ))
}

#[instrument(skip(state))]
pub async fn get_profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<ProfileResponse>, ApiError> {
    let user = load_self(&state, user_id).await?;
    Ok(Json(profile_response(&state, user).await))
}

/// Serves both `PUT` and `PATCH`: every editable field is optional and an
/// omitted field keeps its stored value.
#[instrument(skip(state, payload))]
pub async fn update_profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<ProfileUpdateRequest>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let changes = ProfileChanges::from(payload);
    validate_profile(&changes)?;

    let user = User::update_profile(&state.db, user_id, &changes)
        .await?
        .ok_or_else(|| ApiError::unauthorized("User not found"))?;
    info!(%user_id, "profile updated");
    Ok(Json(profile_response(&state, user).await))
}

#[instrument(skip(state, mp))]
pub async fn upload_profile_picture(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    mp: Multipart,
) -> Result<Json<ProfileResponse>, ApiError> {
    let item = images::read_image_field(mp, "profile_picture").await?;
    let key = images::upload_image(&state, ImageKind::ProfilePicture, user_id, item).await?;
    let previous = User::set_profile_picture(&state.db, user_id, Some(&key)).await?;
    images::discard(&state, previous).await;

    let user = load_self(&state, user_id).await?;
    info!(%user_id, %key, "profile picture replaced");
    Ok(Json(profile_response(&state, user).await))
}

#[instrument(skip(state))]
pub async fn delete_profile_picture(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<StatusCode, ApiError> {
    let previous = User::set_profile_picture(&state.db, user_id, None).await?;
    images::discard(&state, previous).await;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
pub async fn list_public_users(
    State(state): State<AppState>,
) -> Result<Json<Vec<ProfileResponse>>, ApiError> {
    let users = User::list_public(&state.db).await?;
    let mut out = Vec::with_capacity(users.len());
    for user in users {
        out.push(profile_response(&state, user).await);
    }
    Ok(Json(out))
}

#[instrument(skip(state))]
pub async fn get_public_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let user = User::find_public(&state.db, id)
        .await?
        .ok_or(ApiError::NotFound("User"))?;
    Ok(Json(profile_response(&state, user).await))
}

async fn load_self(state: &AppState, user_id: Uuid) -> Result<User, ApiError> {
    match User::find_by_id(&state.db, user_id).await? {
        Some(user) if user.is_active => Ok(user),
        _ => {
            error!(%user_id, "token subject has no active user");
            Err(ApiError::unauthorized("User not found"))
        }
    }
}

async fn profile_response(state: &AppState, user: User) -> ProfileResponse {
    let url = images::media_url(state, user.profile_picture.as_deref()).await;
    ProfileResponse::new(user, url)
}
