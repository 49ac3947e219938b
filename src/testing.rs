//! In-memory stores for unit tests.

use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use sqlx::types::Json;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    recipes::{
        repo::{RecipeFields, RecipeRow},
        store::RecipeStore,
    },
    slug::{SlugLookup, SlugTable},
    taxonomy::{
        repo::{Equipment, Tag},
        store::TaxonomyStore,
    },
};

#[derive(Debug, Default)]
pub struct MemoryStore {
    pub tags: Vec<Tag>,
    pub equipment: Vec<Equipment>,
    pub recipes: Vec<RecipeRow>,
    pub recipe_tags: HashMap<Uuid, BTreeSet<Uuid>>,
    pub recipe_equipment: HashMap<Uuid, BTreeSet<Uuid>>,
    /// Users by id, with their recipe count.
    pub recipe_counts: HashMap<Uuid, i32>,
}

impl MemoryStore {
    pub fn add_user(&mut self) -> Uuid {
        let id = Uuid::new_v4();
        self.recipe_counts.insert(id, 0);
        id
    }

    pub fn add_tag(&mut self, name: &str) -> Uuid {
        let now = OffsetDateTime::now_utc();
        let tag = Tag {
            id: Uuid::new_v4(),
            name: name.to_string(),
            slug: crate::slug::base_slug(name, SlugTable::Tags),
            created_at: now,
            updated_at: now,
        };
        let id = tag.id;
        self.tags.push(tag);
        id
    }

    fn recipe_mut(&mut self, id: Uuid) -> anyhow::Result<&mut RecipeRow> {
        self.recipes
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| anyhow::anyhow!("no recipe {}", id))
    }
}

#[async_trait]
impl SlugLookup for MemoryStore {
    async fn slug_taken(&mut self, table: SlugTable, slug: &str) -> anyhow::Result<bool> {
        Ok(match table {
            SlugTable::Tags => self.tags.iter().any(|t| t.slug == slug),
            SlugTable::Equipment => self.equipment.iter().any(|e| e.slug == slug),
            SlugTable::Recipes => self.recipes.iter().any(|r| r.slug == slug),
        })
    }
}

#[async_trait]
impl TaxonomyStore for MemoryStore {
    async fn find_tag_by_name(&mut self, name: &str) -> anyhow::Result<Option<Tag>> {
        Ok(self.tags.iter().find(|t| t.name == name).cloned())
    }

    async fn insert_tag(&mut self, name: &str, slug: &str) -> anyhow::Result<Tag> {
        anyhow::ensure!(
            !self.tags.iter().any(|t| t.name == name || t.slug == slug),
            "duplicate tag"
        );
        let now = OffsetDateTime::now_utc();
        let tag = Tag {
            id: Uuid::new_v4(),
            name: name.to_string(),
            slug: slug.to_string(),
            created_at: now,
            updated_at: now,
        };
        self.tags.push(tag.clone());
        Ok(tag)
    }

    async fn find_equipment_by_name(&mut self, name: &str) -> anyhow::Result<Option<Equipment>> {
        let wanted = name.to_lowercase();
        Ok(self
            .equipment
            .iter()
            .find(|e| e.name.to_lowercase() == wanted)
            .cloned())
    }

    async fn insert_equipment(&mut self, name: &str, slug: &str) -> anyhow::Result<Equipment> {
        anyhow::ensure!(
            !self
                .equipment
                .iter()
                .any(|e| e.name.to_lowercase() == name.to_lowercase() || e.slug == slug),
            "duplicate equipment"
        );
        let now = OffsetDateTime::now_utc();
        let equipment = Equipment {
            id: Uuid::new_v4(),
            name: name.to_string(),
            slug: slug.to_string(),
            created_at: now,
            updated_at: now,
        };
        self.equipment.push(equipment.clone());
        Ok(equipment)
    }

    async fn missing_tags(&mut self, ids: &[Uuid]) -> anyhow::Result<Vec<Uuid>> {
        Ok(ids
            .iter()
            .copied()
            .filter(|id| !self.tags.iter().any(|t| t.id == *id))
            .collect())
    }

    async fn missing_equipment(&mut self, ids: &[Uuid]) -> anyhow::Result<Vec<Uuid>> {
        Ok(ids
            .iter()
            .copied()
            .filter(|id| !self.equipment.iter().any(|e| e.id == *id))
            .collect())
    }
}

#[async_trait]
impl RecipeStore for MemoryStore {
    async fn find_recipe(&mut self, slug: &str) -> anyhow::Result<Option<RecipeRow>> {
        Ok(self.recipes.iter().find(|r| r.slug == slug).cloned())
    }

    async fn insert_recipe(
        &mut self,
        author_id: Uuid,
        slug: &str,
        fields: &RecipeFields,
    ) -> anyhow::Result<RecipeRow> {
        anyhow::ensure!(
            !self.recipes.iter().any(|r| r.slug == slug),
            "duplicate recipe slug {}",
            slug
        );
        let now = OffsetDateTime::now_utc();
        let row = RecipeRow {
            id: Uuid::new_v4(),
            author_id,
            title: fields.title.clone(),
            slug: slug.to_string(),
            description: fields.description.clone(),
            ingredients: Json(fields.ingredients.clone()),
            instructions: Json(fields.instructions.clone()),
            prep_time_minutes: fields.prep_time_minutes,
            cook_time_minutes: fields.cook_time_minutes,
            servings: fields.servings,
            difficulty: fields.difficulty,
            main_image: None,
            created_at: now,
            updated_at: now,
        };
        self.recipes.push(row.clone());
        Ok(row)
    }

    async fn update_recipe(
        &mut self,
        id: Uuid,
        slug: &str,
        fields: &RecipeFields,
    ) -> anyhow::Result<RecipeRow> {
        anyhow::ensure!(
            !self.recipes.iter().any(|r| r.slug == slug && r.id != id),
            "duplicate recipe slug {}",
            slug
        );
        let row = self.recipe_mut(id)?;
        row.title = fields.title.clone();
        row.slug = slug.to_string();
        row.description = fields.description.clone();
        row.ingredients = Json(fields.ingredients.clone());
        row.instructions = Json(fields.instructions.clone());
        row.prep_time_minutes = fields.prep_time_minutes;
        row.cook_time_minutes = fields.cook_time_minutes;
        row.servings = fields.servings;
        row.difficulty = fields.difficulty;
        row.updated_at = OffsetDateTime::now_utc();
        Ok(row.clone())
    }

    async fn delete_recipe(&mut self, id: Uuid) -> anyhow::Result<()> {
        self.recipes.retain(|r| r.id != id);
        self.recipe_tags.remove(&id);
        self.recipe_equipment.remove(&id);
        Ok(())
    }

    async fn replace_recipe_tags(&mut self, recipe_id: Uuid, tag_ids: &[Uuid]) -> anyhow::Result<()> {
        self.recipe_tags
            .insert(recipe_id, tag_ids.iter().copied().collect());
        Ok(())
    }

    async fn replace_recipe_equipment(
        &mut self,
        recipe_id: Uuid,
        equipment_ids: &[Uuid],
    ) -> anyhow::Result<()> {
        self.recipe_equipment
            .insert(recipe_id, equipment_ids.iter().copied().collect());
        Ok(())
    }

    async fn adjust_recipe_count(&mut self, user_id: Uuid, delta: i32) -> anyhow::Result<()> {
        let count = self.recipe_counts.entry(user_id).or_insert(0);
        *count = (*count + delta).max(0);
        Ok(())
    }
}
