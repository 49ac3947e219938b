use anyhow::Context;
use async_trait::async_trait;
use sqlx::{PgConnection, PgPool};

use crate::slug::{SlugLookup, SlugTable};

pub async fn run_migrations(db: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations")
        .run(db)
        .await
        .context("run migrations")?;
    Ok(())
}

/// Write-side store bound to one connection, normally a transaction.
///
/// Taxonomy and recipe write operations are implemented on it in their own
/// modules; dropping the surrounding transaction without commit discards
/// everything done through it.
pub struct PgStore<'c> {
    pub(crate) conn: &'c mut PgConnection,
}

impl<'c> PgStore<'c> {
    pub fn new(conn: &'c mut PgConnection) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl SlugLookup for PgStore<'_> {
    async fn slug_taken(&mut self, table: SlugTable, slug: &str) -> anyhow::Result<bool> {
        // table name comes from a closed enum, never from input
        let sql = format!(
            "SELECT EXISTS (SELECT 1 FROM {} WHERE slug = $1)",
            table.table_name()
        );
        let taken: bool = sqlx::query_scalar(&sql)
            .bind(slug)
            .fetch_one(&mut *self.conn)
            .await
            .with_context(|| format!("slug lookup in {}", table.table_name()))?;
        Ok(taken)
    }
}
