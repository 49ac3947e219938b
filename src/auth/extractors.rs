use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use tracing::warn;
use uuid::Uuid;

use super::jwt::JwtKeys;
use crate::error::ApiError;

/// Authenticated caller. Rejects with `401` when the request carries no
/// valid access token.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub Uuid);

/// Acting identity if one was presented. A malformed or expired token is
/// still a `401`; only a missing header yields `None`.
#[derive(Debug, Clone, Copy)]
pub struct MaybeAuthUser(pub Option<Uuid>);

fn bearer_token(parts: &Parts) -> Result<Option<&str>, ApiError> {
    let Some(header) = parts.headers.get(axum::http::header::AUTHORIZATION) else {
        return Ok(None);
    };
    let value = header
        .to_str()
        .map_err(|_| ApiError::unauthorized("Invalid Authorization header"))?;
    value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("bearer "))
        .map(Some)
        .ok_or_else(|| ApiError::unauthorized("Invalid Authorization header"))
}

fn resolve(parts: &Parts, keys: &JwtKeys) -> Result<Option<Uuid>, ApiError> {
    let Some(token) = bearer_token(parts)? else {
        return Ok(None);
    };
    match keys.verify_access(token) {
        Ok(claims) => Ok(Some(claims.sub)),
        Err(e) => {
            warn!(error = %e, "invalid or expired token");
            Err(ApiError::unauthorized("Invalid or expired token"))
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let keys = JwtKeys::from_ref(state);
        resolve(parts, &keys)?
            .map(AuthUser)
            .ok_or_else(|| ApiError::unauthorized("Authentication credentials were not provided."))
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for MaybeAuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let keys = JwtKeys::from_ref(state);
        Ok(MaybeAuthUser(resolve(parts, &keys)?))
    }
}
