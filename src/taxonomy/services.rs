use tracing::debug;

use super::{
    repo::{Equipment, Tag},
    store::TaxonomyStore,
};
use crate::slug::{base_slug, unique_slug, SlugTable};

/// Existing tag named exactly `name`, or a new one with a fresh slug.
/// The flag is true when a row was inserted.
pub async fn get_or_create_tag<S>(store: &mut S, name: &str) -> anyhow::Result<(Tag, bool)>
where
    S: TaxonomyStore + ?Sized,
{
    if let Some(tag) = store.find_tag_by_name(name).await? {
        return Ok((tag, false));
    }
    let slug = unique_slug(&mut *store, SlugTable::Tags, &base_slug(name, SlugTable::Tags)).await?;
    let tag = store.insert_tag(name, &slug).await?;
    debug!(tag_id = %tag.id, %slug, "tag created");
    Ok((tag, true))
}

/// Existing equipment whose name matches `name` ignoring case, or a new row
/// spelled as given.
pub async fn get_or_create_equipment<S>(
    store: &mut S,
    name: &str,
) -> anyhow::Result<(Equipment, bool)>
where
    S: TaxonomyStore + ?Sized,
{
    if let Some(equipment) = store.find_equipment_by_name(name).await? {
        return Ok((equipment, false));
    }
    let slug = unique_slug(
        &mut *store,
        SlugTable::Equipment,
        &base_slug(name, SlugTable::Equipment),
    )
    .await?;
    let equipment = store.insert_equipment(name, &slug).await?;
    debug!(equipment_id = %equipment.id, %slug, "equipment created");
    Ok((equipment, true))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryStore;

    #[tokio::test]
    async fn same_tag_name_is_reused() {
        let mut store = MemoryStore::default();
        let (first, created) = get_or_create_tag(&mut store, "Spicy").await.unwrap();
        assert!(created);
        assert_eq!(first.slug, "spicy");

        let (again, created) = get_or_create_tag(&mut store, "Spicy").await.unwrap();
        assert!(!created);
        assert_eq!(again.id, first.id);
        assert_eq!(store.tags.len(), 1);
    }

    #[tokio::test]
    async fn colliding_tag_names_get_suffixed_slugs() {
        let mut store = MemoryStore::default();
        let (a, _) = get_or_create_tag(&mut store, "Spicy").await.unwrap();
        let (b, _) = get_or_create_tag(&mut store, "spicy").await.unwrap();
        let (c, _) = get_or_create_tag(&mut store, "SPICY!").await.unwrap();
        assert_eq!(a.slug, "spicy");
        assert_eq!(b.slug, "spicy-1");
        assert_eq!(c.slug, "spicy-2");
    }

    #[tokio::test]
    async fn equipment_lookup_ignores_case() {
        let mut store = MemoryStore::default();
        let (whisk, created) = get_or_create_equipment(&mut store, "Whisk").await.unwrap();
        assert!(created);
        let (again, created) = get_or_create_equipment(&mut store, "whisk").await.unwrap();
        assert!(!created);
        assert_eq!(again.id, whisk.id);
        assert_eq!(again.name, "Whisk");
    }

    #[tokio::test]
    async fn unsluggable_names_fall_back_to_kind() {
        let mut store = MemoryStore::default();
        let (a, _) = get_or_create_equipment(&mut store, "???").await.unwrap();
        let (b, _) = get_or_create_equipment(&mut store, "!!!").await.unwrap();
        assert_eq!(a.slug, "equipment");
        assert_eq!(b.slug, "equipment-1");
    }
}
