use anyhow::Context;
use axum::extract::Multipart;
use bytes::Bytes;
use tracing::warn;
use uuid::Uuid;

use crate::{error::ApiError, state::AppState};

pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

pub struct UploadItem {
    pub body: Bytes,
    pub content_type: String,
}

/// Where an uploaded image belongs; decides the key prefix.
#[derive(Debug, Clone, Copy)]
pub enum ImageKind {
    ProfilePicture,
    RecipeImage,
}

impl ImageKind {
    fn prefix(self) -> &'static str {
        match self {
            ImageKind::ProfilePicture => "profile_pics",
            ImageKind::RecipeImage => "recipe_images",
        }
    }
}

/// Pulls the single file field `field` out of a multipart body.
pub async fn read_image_field(mut mp: Multipart, field: &str) -> Result<UploadItem, ApiError> {
    while let Some(part) = mp
        .next_field()
        .await
        .map_err(|e| ApiError::field(field, e.body_text()))?
    {
        if part.name() != Some(field) {
            continue;
        }
        let content_type = part
            .content_type()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "application/octet-stream".into());
        if ext_from_mime(&content_type).is_none() {
            return Err(ApiError::field(
                field,
                "Upload a valid image. Supported types: jpeg, png, webp, heic.",
            ));
        }
        let body = part
            .bytes()
            .await
            .map_err(|e| ApiError::field(field, e.body_text()))?;
        if body.is_empty() {
            return Err(ApiError::field(field, "The submitted file is empty."));
        }
        if body.len() > MAX_IMAGE_BYTES {
            return Err(ApiError::field(field, "The submitted file is too large."));
        }
        return Ok(UploadItem { body, content_type });
    }
    Err(ApiError::field(field, "No file was submitted."))
}

/// Stores the image and returns its object key.
pub async fn upload_image(
    st: &AppState,
    kind: ImageKind,
    owner: Uuid,
    item: UploadItem,
) -> anyhow::Result<String> {
    let ext = ext_from_mime(&item.content_type).unwrap_or("bin");
    let key = object_key(kind, owner, Uuid::new_v4(), ext);
    st.storage
        .put_object(&key, item.body, &item.content_type)
        .await
        .with_context(|| format!("put_object {}", key))?;
    Ok(key)
}

/// Best-effort removal of a replaced image; failures only leave an orphan.
pub async fn discard(st: &AppState, key: Option<String>) {
    if let Some(key) = key {
        if let Err(e) = st.storage.delete_object(&key).await {
            warn!(error = %e, %key, "failed to delete replaced image");
        }
    }
}

/// Presigned URL for a stored key. Presign failures degrade to `None` so a
/// storage outage does not take down read endpoints.
pub async fn media_url(st: &AppState, key: Option<&str>) -> Option<String> {
    let key = key?;
    match st
        .storage
        .presign_get(key, st.config.storage.url_ttl_seconds)
        .await
    {
        Ok(url) => Some(url),
        Err(e) => {
            warn!(error = %e, %key, "presign failed");
            None
        }
    }
}

fn object_key(kind: ImageKind, owner: Uuid, id: Uuid, ext: &str) -> String {
    format!("{}/{}/{}.{}", kind.prefix(), owner, id, ext)
}

fn ext_from_mime(ct: &str) -> Option<&'static str> {
    match ct {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/heic" => Some("heic"),
        _ => None,
    }
}
