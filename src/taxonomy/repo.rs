use anyhow::Context;
use async_trait::async_trait;
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use super::store::TaxonomyStore;
use crate::db::PgStore;

/// Recipe tag ("Vegan", "Weeknight Meal").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct Tag {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Piece of kitchen equipment ("Dutch Oven").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct Equipment {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Tag {
    pub async fn list(db: &PgPool) -> anyhow::Result<Vec<Tag>> {
        let rows = sqlx::query_as::<_, Tag>(
            "SELECT id, name, slug, created_at, updated_at FROM tags ORDER BY name",
        )
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    pub async fn find_by_slug(db: &PgPool, slug: &str) -> anyhow::Result<Option<Tag>> {
        let row = sqlx::query_as::<_, Tag>(
            "SELECT id, name, slug, created_at, updated_at FROM tags WHERE slug = $1",
        )
        .bind(slug)
        .fetch_optional(db)
        .await?;
        Ok(row)
    }
}

impl Equipment {
    pub async fn list(db: &PgPool) -> anyhow::Result<Vec<Equipment>> {
        let rows = sqlx::query_as::<_, Equipment>(
            "SELECT id, name, slug, created_at, updated_at FROM equipment ORDER BY name",
        )
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    pub async fn find_by_slug(db: &PgPool, slug: &str) -> anyhow::Result<Option<Equipment>> {
        let row = sqlx::query_as::<_, Equipment>(
            "SELECT id, name, slug, created_at, updated_at FROM equipment WHERE slug = $1",
        )
        .bind(slug)
        .fetch_optional(db)
        .await?;
        Ok(row)
    }
}

#[async_trait]
impl TaxonomyStore for PgStore<'_> {
    async fn find_tag_by_name(&mut self, name: &str) -> anyhow::Result<Option<Tag>> {
        let row = sqlx::query_as::<_, Tag>(
            "SELECT id, name, slug, created_at, updated_at FROM tags WHERE name = $1",
        )
        .bind(name)
        .fetch_optional(&mut *self.conn)
        .await
        .context("find tag by name")?;
        Ok(row)
    }

    async fn insert_tag(&mut self, name: &str, slug: &str) -> anyhow::Result<Tag> {
        let row = sqlx::query_as::<_, Tag>(
            r#"
            INSERT INTO tags (name, slug)
            VALUES ($1, $2)
            RETURNING id, name, slug, created_at, updated_at
            "#,
        )
        .bind(name)
        .bind(slug)
        .fetch_one(&mut *self.conn)
        .await
        .with_context(|| format!("insert tag {:?}", name))?;
        Ok(row)
    }

    async fn find_equipment_by_name(&mut self, name: &str) -> anyhow::Result<Option<Equipment>> {
        let row = sqlx::query_as::<_, Equipment>(
            r#"
            SELECT id, name, slug, created_at, updated_at
              FROM equipment
             WHERE lower(name) = lower($1)
            "#,
        )
        .bind(name)
        .fetch_optional(&mut *self.conn)
        .await
        .context("find equipment by name")?;
        Ok(row)
    }

    async fn insert_equipment(&mut self, name: &str, slug: &str) -> anyhow::Result<Equipment> {
        let row = sqlx::query_as::<_, Equipment>(
            r#"
            INSERT INTO equipment (name, slug)
            VALUES ($1, $2)
            RETURNING id, name, slug, created_at, updated_at
            "#,
        )
        .bind(name)
        .bind(slug)
        .fetch_one(&mut *self.conn)
        .await
        .with_context(|| format!("insert equipment {:?}", name))?;
        Ok(row)
    }

    async fn missing_tags(&mut self, ids: &[Uuid]) -> anyhow::Result<Vec<Uuid>> {
        let missing: Vec<Uuid> = sqlx::query_scalar(
            r#"
            SELECT x.id
              FROM UNNEST($1::uuid[]) AS x(id)
             WHERE NOT EXISTS (SELECT 1 FROM tags t WHERE t.id = x.id)
            "#,
        )
        .bind(ids)
        .fetch_all(&mut *self.conn)
        .await
        .context("check tag ids")?;
        Ok(missing)
    }

    async fn missing_equipment(&mut self, ids: &[Uuid]) -> anyhow::Result<Vec<Uuid>> {
        let missing: Vec<Uuid> = sqlx::query_scalar(
            r#"
            SELECT x.id
              FROM UNNEST($1::uuid[]) AS x(id)
             WHERE NOT EXISTS (SELECT 1 FROM equipment e WHERE e.id = x.id)
            "#,
        )
        .bind(ids)
        .fetch_all(&mut *self.conn)
        .await
        .context("check equipment ids")?;
        Ok(missing)
    }
}
