use axum::{
    extract::{FromRef, State},
    routing::post,
    Json, Router,
};
use tracing::{info, instrument, warn};

use super::{
    dto::{LoginRequest, RefreshRequest, TokenResponse},
    jwt::JwtKeys,
    password::verify_password,
};
use crate::{
    error::{ApiError, FieldErrors},
    state::AppState,
    users::{repo::User, services::normalize_email},
};

const BAD_CREDENTIALS: &str = "No active account found with the given credentials";

pub fn token_routes() -> Router<AppState> {
    Router::new()
        .route("/token/", post(obtain_pair))
        .route("/token/refresh/", post(refresh))
}

#[instrument(skip(state, payload))]
pub async fn obtain_pair(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let email = normalize_email(&payload.email);

    let mut errors = FieldErrors::new();
    if email.is_empty() {
        errors.add("email", "This field is required.");
    }
    if payload.password.is_empty() {
        errors.add("password", "This field is required.");
    }
    errors.into_result()?;

    let user = match User::find_by_email(&state.db, &email).await? {
        Some(u) if u.is_active => u,
        _ => {
            warn!(%email, "login unknown or inactive account");
            return Err(ApiError::unauthorized(BAD_CREDENTIALS));
        }
    };

    if !verify_password(&payload.password, &user.password_hash)? {
        warn!(%email, user_id = %user.id, "login invalid password");
        return Err(ApiError::unauthorized(BAD_CREDENTIALS));
    }

    let pair = JwtKeys::from_ref(&state).sign_pair(user.id)?;
    info!(user_id = %user.id, "user logged in");
    Ok(Json(TokenResponse {
        access: pair.access,
        refresh: pair.refresh,
    }))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let keys = JwtKeys::from_ref(&state);
    let claims = keys.verify_refresh(&payload.refresh).map_err(|e| {
        warn!(error = %e, "refresh rejected");
        ApiError::unauthorized("Token is invalid or expired")
    })?;

    match User::find_by_id(&state.db, claims.sub).await? {
        Some(u) if u.is_active => {}
        _ => return Err(ApiError::unauthorized("User not found")),
    }

    let pair = keys.sign_pair(claims.sub)?;
    Ok(Json(TokenResponse {
        access: pair.access,
        refresh: pair.refresh,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request, http::StatusCode};
    use tower::ServiceExt;

    #[tokio::test]
    async fn empty_login_is_a_field_error_before_any_lookup() {
        let app = token_routes().with_state(AppState::fake());
        let response = app
            .oneshot(
                Request::post("/token/")
                    .header("content-type", "application/json")
                    .body(Body::from("{}"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn refresh_with_access_token_is_unauthorized() {
        let state = AppState::fake();
        let access = JwtKeys::from_ref(&state)
            .sign_access(uuid::Uuid::new_v4())
            .unwrap();
        let app = token_routes().with_state(state);
        let response = app
            .oneshot(
                Request::post("/token/refresh/")
                    .header("content-type", "application/json")
                    .body(Body::from(format!(r#"{{"refresh": "{}"}}"#, access)))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
