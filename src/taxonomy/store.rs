use async_trait::async_trait;
use uuid::Uuid;

use super::repo::{Equipment, Tag};
use crate::slug::SlugLookup;

/// Write-side access to tags and equipment.
#[async_trait]
pub trait TaxonomyStore: SlugLookup {
    /// Exact-name match.
    async fn find_tag_by_name(&mut self, name: &str) -> anyhow::Result<Option<Tag>>;
    async fn insert_tag(&mut self, name: &str, slug: &str) -> anyhow::Result<Tag>;
    /// Case-insensitive name match.
    async fn find_equipment_by_name(&mut self, name: &str) -> anyhow::Result<Option<Equipment>>;
    async fn insert_equipment(&mut self, name: &str, slug: &str) -> anyhow::Result<Equipment>;
    /// The subset of `ids` with no tag row.
    async fn missing_tags(&mut self, ids: &[Uuid]) -> anyhow::Result<Vec<Uuid>>;
    /// The subset of `ids` with no equipment row.
    async fn missing_equipment(&mut self, ids: &[Uuid]) -> anyhow::Result<Vec<Uuid>>;
}
