use async_trait::async_trait;
use uuid::Uuid;

use super::repo::{RecipeFields, RecipeRow};
use crate::taxonomy::store::TaxonomyStore;

/// Write-side access to recipes and their relation sets. Everything goes
/// through one connection so a caller can wrap a whole write in a
/// transaction.
#[async_trait]
pub trait RecipeStore: TaxonomyStore {
    /// Recipe by slug, locked for the rest of the transaction.
    async fn find_recipe(&mut self, slug: &str) -> anyhow::Result<Option<RecipeRow>>;
    async fn insert_recipe(
        &mut self,
        author_id: Uuid,
        slug: &str,
        fields: &RecipeFields,
    ) -> anyhow::Result<RecipeRow>;
    async fn update_recipe(
        &mut self,
        id: Uuid,
        slug: &str,
        fields: &RecipeFields,
    ) -> anyhow::Result<RecipeRow>;
    async fn delete_recipe(&mut self, id: Uuid) -> anyhow::Result<()>;
    /// Full replacement of the recipe's tag set.
    async fn replace_recipe_tags(&mut self, recipe_id: Uuid, tag_ids: &[Uuid]) -> anyhow::Result<()>;
    /// Full replacement of the recipe's equipment set.
    async fn replace_recipe_equipment(
        &mut self,
        recipe_id: Uuid,
        equipment_ids: &[Uuid],
    ) -> anyhow::Result<()>;
    /// Adds `delta` to the user's recipe count, never going below zero.
    async fn adjust_recipe_count(&mut self, user_id: Uuid, delta: i32) -> anyhow::Result<()>;
}
