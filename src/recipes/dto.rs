use serde::{Deserialize, Deserializer, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo::{Difficulty, Ingredient, RecipeFilter, RecipeOrdering, RecipeRow};
use crate::{
    error::ApiError,
    taxonomy::repo::{Equipment, Tag},
    users::dto::AuthorSummary,
};

/// Body of recipe create, `PUT` and `PATCH`. Every key is optional on the
/// wire; which ones are required depends on the operation. `author`,
/// `slug` and `main_image` are not writable here and are ignored if sent.
#[derive(Debug, Default, Deserialize)]
pub struct RecipeWriteRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub ingredients: Option<Vec<Ingredient>>,
    pub instructions: Option<Vec<String>>,
    #[serde(default, deserialize_with = "present")]
    pub prep_time_minutes: Option<Option<i32>>,
    #[serde(default, deserialize_with = "present")]
    pub cook_time_minutes: Option<Option<i32>>,
    #[serde(default, deserialize_with = "present")]
    pub servings: Option<Option<i32>>,
    pub difficulty: Option<Difficulty>,
    pub tags: Option<Vec<Uuid>>,
    pub equipment: Option<Vec<Uuid>>,
    pub equipment_names: Option<Vec<String>>,
}

/// Distinguishes an explicit `null` (`Some(None)`) from an absent key (`None`).
fn present<'de, D, T>(d: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(d).map(Some)
}

#[derive(Debug, Default, Deserialize)]
pub struct RecipeListQuery {
    #[serde(rename = "tags__slug")]
    pub tag_slug: Option<String>,
    pub difficulty: Option<Difficulty>,
    pub search: Option<String>,
    pub ordering: Option<String>,
}

impl RecipeListQuery {
    pub fn into_filter(self) -> Result<RecipeFilter, ApiError> {
        let ordering = match self.ordering.as_deref().map(str::trim) {
            None | Some("") => RecipeOrdering::default(),
            Some(key) => key
                .parse::<RecipeOrdering>()
                .map_err(|msg| ApiError::field("ordering", msg))?,
        };
        Ok(RecipeFilter {
            tag_slug: self.tag_slug.filter(|s| !s.is_empty()),
            difficulty: self.difficulty,
            search: self
                .search
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            ordering,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct RecipeDetail {
    pub id: Uuid,
    pub author: AuthorSummary,
    pub title: String,
    pub slug: String,
    pub description: String,
    pub ingredients: Vec<Ingredient>,
    pub instructions: Vec<String>,
    pub prep_time_minutes: Option<i32>,
    pub cook_time_minutes: Option<i32>,
    pub servings: Option<i32>,
    pub difficulty: Difficulty,
    pub main_image: Option<String>, // presigned URL
    pub tags: Vec<Tag>,
    pub equipment: Vec<Equipment>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl RecipeDetail {
    pub fn new(
        row: RecipeRow,
        author: AuthorSummary,
        tags: Vec<Tag>,
        equipment: Vec<Equipment>,
        main_image: Option<String>,
    ) -> Self {
        Self {
            id: row.id,
            author,
            title: row.title,
            slug: row.slug,
            description: row.description,
            ingredients: row.ingredients.0,
            instructions: row.instructions.0,
            prep_time_minutes: row.prep_time_minutes,
            cook_time_minutes: row.cook_time_minutes,
            servings: row.servings,
            difficulty: row.difficulty,
            main_image,
            tags,
            equipment,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}
