use std::{collections::HashMap, str::FromStr};

use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow, PgPool, Postgres, QueryBuilder};
use time::OffsetDateTime;
use uuid::Uuid;

use super::store::RecipeStore;
use crate::{
    db::PgStore,
    taxonomy::repo::{Equipment, Tag},
    users::dto::AuthorSummary,
};

#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(type_name = "difficulty")]
pub enum Difficulty {
    #[default]
    Easy,
    Medium,
    Hard,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ingredient {
    pub item: String,
    #[serde(default)]
    pub quantity: String,
}

const RECIPE_COLUMNS: &str = "r.id, r.author_id, r.title, r.slug, r.description, r.ingredients, \
     r.instructions, r.prep_time_minutes, r.cook_time_minutes, r.servings, r.difficulty, \
     r.main_image, r.created_at, r.updated_at";

#[derive(Debug, Clone, FromRow)]
pub struct RecipeRow {
    pub id: Uuid,
    pub author_id: Uuid,
    pub title: String,
    pub slug: String,
    pub description: String,
    pub ingredients: Json<Vec<Ingredient>>,
    pub instructions: Json<Vec<String>>,
    pub prep_time_minutes: Option<i32>,
    pub cook_time_minutes: Option<i32>,
    pub servings: Option<i32>,
    pub difficulty: Difficulty,
    pub main_image: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Editable, non-relational recipe attributes.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RecipeFields {
    pub title: String,
    pub description: String,
    pub ingredients: Vec<Ingredient>,
    pub instructions: Vec<String>,
    pub prep_time_minutes: Option<i32>,
    pub cook_time_minutes: Option<i32>,
    pub servings: Option<i32>,
    pub difficulty: Difficulty,
}

impl RecipeRow {
    pub fn fields(&self) -> RecipeFields {
        RecipeFields {
            title: self.title.clone(),
            description: self.description.clone(),
            ingredients: self.ingredients.0.clone(),
            instructions: self.instructions.0.clone(),
            prep_time_minutes: self.prep_time_minutes,
            cook_time_minutes: self.cook_time_minutes,
            servings: self.servings,
            difficulty: self.difficulty,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderField {
    CreatedAt,
    Title,
    Difficulty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecipeOrdering {
    pub field: OrderField,
    pub descending: bool,
}

impl Default for RecipeOrdering {
    fn default() -> Self {
        Self {
            field: OrderField::CreatedAt,
            descending: true,
        }
    }
}

impl FromStr for RecipeOrdering {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (descending, key) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };
        let field = match key {
            "created_at" => OrderField::CreatedAt,
            "title" => OrderField::Title,
            "difficulty" => OrderField::Difficulty,
            _ => return Err(format!("Unknown ordering field \"{}\".", s)),
        };
        Ok(Self { field, descending })
    }
}

impl RecipeOrdering {
    fn sql(self) -> &'static str {
        match (self.field, self.descending) {
            (OrderField::CreatedAt, false) => "r.created_at ASC",
            (OrderField::CreatedAt, true) => "r.created_at DESC",
            (OrderField::Title, false) => "r.title ASC",
            (OrderField::Title, true) => "r.title DESC",
            (OrderField::Difficulty, false) => "r.difficulty ASC",
            (OrderField::Difficulty, true) => "r.difficulty DESC",
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RecipeFilter {
    pub tag_slug: Option<String>,
    pub difficulty: Option<Difficulty>,
    pub search: Option<String>,
    pub ordering: RecipeOrdering,
}

/// `%term%` with LIKE metacharacters escaped.
fn like_pattern(term: &str) -> String {
    let mut out = String::with_capacity(term.len() + 2);
    out.push('%');
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('%');
    out
}

#[derive(FromRow)]
struct TagLink {
    recipe_id: Uuid,
    #[sqlx(flatten)]
    tag: Tag,
}

#[derive(FromRow)]
struct EquipmentLink {
    recipe_id: Uuid,
    #[sqlx(flatten)]
    equipment: Equipment,
}

impl RecipeRow {
    pub async fn list(db: &PgPool, filter: &RecipeFilter) -> anyhow::Result<Vec<RecipeRow>> {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "SELECT {} FROM recipes r WHERE TRUE",
            RECIPE_COLUMNS
        ));

        if let Some(tag) = &filter.tag_slug {
            qb.push(
                " AND EXISTS (SELECT 1 FROM recipe_tags rt JOIN tags t ON t.id = rt.tag_id \
                 WHERE rt.recipe_id = r.id AND t.slug = ",
            )
            .push_bind(tag.clone())
            .push(")");
        }
        if let Some(difficulty) = filter.difficulty {
            qb.push(" AND r.difficulty = ").push_bind(difficulty);
        }
        if let Some(term) = &filter.search {
            let pattern = like_pattern(term);
            qb.push(" AND (r.title ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR r.description ILIKE ")
                .push_bind(pattern.clone())
                .push(
                    " OR EXISTS (SELECT 1 FROM jsonb_array_elements(r.ingredients) i \
                     WHERE i->>'item' ILIKE ",
                )
                .push_bind(pattern.clone())
                .push(
                    ") OR EXISTS (SELECT 1 FROM recipe_tags rt JOIN tags t ON t.id = rt.tag_id \
                     WHERE rt.recipe_id = r.id AND t.name ILIKE ",
                )
                .push_bind(pattern.clone())
                .push(
                    ") OR EXISTS (SELECT 1 FROM recipe_equipment re \
                     JOIN equipment e ON e.id = re.equipment_id \
                     WHERE re.recipe_id = r.id AND e.name ILIKE ",
                )
                .push_bind(pattern)
                .push("))");
        }
        qb.push(" ORDER BY ")
            .push(filter.ordering.sql())
            .push(", r.id");

        let rows = qb
            .build_query_as::<RecipeRow>()
            .fetch_all(db)
            .await
            .context("list recipes")?;
        Ok(rows)
    }

    pub async fn find_by_slug(db: &PgPool, slug: &str) -> anyhow::Result<Option<RecipeRow>> {
        let sql = format!("SELECT {} FROM recipes r WHERE r.slug = $1", RECIPE_COLUMNS);
        let row = sqlx::query_as::<_, RecipeRow>(&sql)
            .bind(slug)
            .fetch_optional(db)
            .await?;
        Ok(row)
    }

    /// Swap the stored main image key. `None` means the row no longer
    /// exists; otherwise the previous key is returned.
    pub async fn set_main_image(
        db: &PgPool,
        id: Uuid,
        key: Option<&str>,
    ) -> anyhow::Result<Option<Option<String>>> {
        let previous: Option<Option<String>> = sqlx::query_scalar(
            r#"
            UPDATE recipes r
               SET main_image = $2, updated_at = now()
              FROM (SELECT id, main_image FROM recipes WHERE id = $1 FOR UPDATE) old
             WHERE r.id = old.id
            RETURNING old.main_image
            "#,
        )
        .bind(id)
        .bind(key)
        .fetch_optional(db)
        .await?;
        Ok(previous)
    }
}

/// Tags of every recipe in `ids`, ordered by name.
pub async fn tags_for(db: &PgPool, ids: &[Uuid]) -> anyhow::Result<HashMap<Uuid, Vec<Tag>>> {
    let links = sqlx::query_as::<_, TagLink>(
        r#"
        SELECT rt.recipe_id, t.id, t.name, t.slug, t.created_at, t.updated_at
          FROM recipe_tags rt
          JOIN tags t ON t.id = rt.tag_id
         WHERE rt.recipe_id = ANY($1)
         ORDER BY t.name
        "#,
    )
    .bind(ids)
    .fetch_all(db)
    .await
    .context("load recipe tags")?;

    let mut out: HashMap<Uuid, Vec<Tag>> = HashMap::new();
    for link in links {
        out.entry(link.recipe_id).or_default().push(link.tag);
    }
    Ok(out)
}

/// Equipment of every recipe in `ids`, ordered by name.
pub async fn equipment_for(
    db: &PgPool,
    ids: &[Uuid],
) -> anyhow::Result<HashMap<Uuid, Vec<Equipment>>> {
    let links = sqlx::query_as::<_, EquipmentLink>(
        r#"
        SELECT re.recipe_id, e.id, e.name, e.slug, e.created_at, e.updated_at
          FROM recipe_equipment re
          JOIN equipment e ON e.id = re.equipment_id
         WHERE re.recipe_id = ANY($1)
         ORDER BY e.name
        "#,
    )
    .bind(ids)
    .fetch_all(db)
    .await
    .context("load recipe equipment")?;

    let mut out: HashMap<Uuid, Vec<Equipment>> = HashMap::new();
    for link in links {
        out.entry(link.recipe_id).or_default().push(link.equipment);
    }
    Ok(out)
}

pub async fn authors_for(
    db: &PgPool,
    ids: &[Uuid],
) -> anyhow::Result<HashMap<Uuid, AuthorSummary>> {
    let rows = sqlx::query_as::<_, AuthorSummary>(
        "SELECT id, email, first_name, last_name FROM users WHERE id = ANY($1)",
    )
    .bind(ids)
    .fetch_all(db)
    .await
    .context("load recipe authors")?;
    Ok(rows.into_iter().map(|a| (a.id, a)).collect())
}

#[async_trait]
impl RecipeStore for PgStore<'_> {
    async fn find_recipe(&mut self, slug: &str) -> anyhow::Result<Option<RecipeRow>> {
        let sql = format!(
            "SELECT {} FROM recipes r WHERE r.slug = $1 FOR UPDATE",
            RECIPE_COLUMNS
        );
        let row = sqlx::query_as::<_, RecipeRow>(&sql)
            .bind(slug)
            .fetch_optional(&mut *self.conn)
            .await
            .context("find recipe")?;
        Ok(row)
    }

    async fn insert_recipe(
        &mut self,
        author_id: Uuid,
        slug: &str,
        fields: &RecipeFields,
    ) -> anyhow::Result<RecipeRow> {
        let sql = format!(
            r#"
            INSERT INTO recipes AS r
                   (author_id, title, slug, description, ingredients, instructions,
                    prep_time_minutes, cook_time_minutes, servings, difficulty)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {}
            "#,
            RECIPE_COLUMNS
        );
        let row = sqlx::query_as::<_, RecipeRow>(&sql)
            .bind(author_id)
            .bind(&fields.title)
            .bind(slug)
            .bind(&fields.description)
            .bind(Json(&fields.ingredients))
            .bind(Json(&fields.instructions))
            .bind(fields.prep_time_minutes)
            .bind(fields.cook_time_minutes)
            .bind(fields.servings)
            .bind(fields.difficulty)
            .fetch_one(&mut *self.conn)
            .await
            .with_context(|| format!("insert recipe {:?}", slug))?;
        Ok(row)
    }

    async fn update_recipe(
        &mut self,
        id: Uuid,
        slug: &str,
        fields: &RecipeFields,
    ) -> anyhow::Result<RecipeRow> {
        let sql = format!(
            r#"
            UPDATE recipes r
               SET title = $2,
                   slug = $3,
                   description = $4,
                   ingredients = $5,
                   instructions = $6,
                   prep_time_minutes = $7,
                   cook_time_minutes = $8,
                   servings = $9,
                   difficulty = $10,
                   updated_at = now()
             WHERE r.id = $1
            RETURNING {}
            "#,
            RECIPE_COLUMNS
        );
        let row = sqlx::query_as::<_, RecipeRow>(&sql)
            .bind(id)
            .bind(&fields.title)
            .bind(slug)
            .bind(&fields.description)
            .bind(Json(&fields.ingredients))
            .bind(Json(&fields.instructions))
            .bind(fields.prep_time_minutes)
            .bind(fields.cook_time_minutes)
            .bind(fields.servings)
            .bind(fields.difficulty)
            .fetch_one(&mut *self.conn)
            .await
            .with_context(|| format!("update recipe {}", id))?;
        Ok(row)
    }

    async fn delete_recipe(&mut self, id: Uuid) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM recipes WHERE id = $1")
            .bind(id)
            .execute(&mut *self.conn)
            .await
            .with_context(|| format!("delete recipe {}", id))?;
        Ok(())
    }

    async fn replace_recipe_tags(&mut self, recipe_id: Uuid, tag_ids: &[Uuid]) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = $1")
            .bind(recipe_id)
            .execute(&mut *self.conn)
            .await
            .context("clear recipe tags")?;
        sqlx::query(
            r#"
            INSERT INTO recipe_tags (recipe_id, tag_id)
            SELECT $1, UNNEST($2::uuid[])
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(recipe_id)
        .bind(tag_ids)
        .execute(&mut *self.conn)
        .await
        .context("set recipe tags")?;
        Ok(())
    }

    async fn replace_recipe_equipment(
        &mut self,
        recipe_id: Uuid,
        equipment_ids: &[Uuid],
    ) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM recipe_equipment WHERE recipe_id = $1")
            .bind(recipe_id)
            .execute(&mut *self.conn)
            .await
            .context("clear recipe equipment")?;
        sqlx::query(
            r#"
            INSERT INTO recipe_equipment (recipe_id, equipment_id)
            SELECT $1, UNNEST($2::uuid[])
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(recipe_id)
        .bind(equipment_ids)
        .execute(&mut *self.conn)
        .await
        .context("set recipe equipment")?;
        Ok(())
    }

    async fn adjust_recipe_count(&mut self, user_id: Uuid, delta: i32) -> anyhow::Result<()> {
        sqlx::query(
            "UPDATE users SET recipe_count = GREATEST(recipe_count + $2, 0) WHERE id = $1",
        )
        .bind(user_id)
        .bind(delta)
        .execute(&mut *self.conn)
        .await
        .context("adjust recipe count")?;
        Ok(())
    }
}
