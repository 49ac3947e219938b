//! Recipe write path: validation, tag/equipment reconciliation, slugs and
//! the author's recipe count. Every function works against a
//! [`RecipeStore`] so the handler decides the transaction boundary.

use std::collections::HashSet;

use tracing::{debug, info};
use uuid::Uuid;

use super::{
    dto::RecipeWriteRequest,
    permissions::{authorize, Access},
    repo::{Ingredient, RecipeFields, RecipeRow},
    store::RecipeStore,
};
use crate::{
    error::{ApiError, FieldErrors},
    slug::{base_slug, unique_slug, ExcludingOwn, SlugTable},
    taxonomy::services::get_or_create_equipment,
};

pub const MAX_TITLE_LEN: usize = 200;
/// Matches `equipment.name VARCHAR(100)`.
pub const MAX_EQUIPMENT_NAME_LEN: usize = 100;

/// How a write names the recipe's equipment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EquipmentRefs {
    ById(Vec<Uuid>),
    /// Free-text names; unknown ones are created.
    ByName(Vec<String>),
}

/// `PUT` replaces and needs a title; `PATCH` takes any subset of fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    Replace,
    Partial,
}

#[derive(Debug)]
struct RecipeWrite {
    fields: RecipeFields,
    tags: Option<Vec<Uuid>>,
    equipment: Option<EquipmentRefs>,
}

/// Trims, drops blanks and removes case-insensitive duplicates. The first
/// spelling of a name wins.
pub fn normalize_equipment_names(names: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    names
        .iter()
        .map(|n| n.trim())
        .filter(|n| !n.is_empty())
        .filter(|n| seen.insert(n.to_lowercase()))
        .map(str::to_string)
        .collect()
}

fn dedupe_ids(ids: &[Uuid]) -> Vec<Uuid> {
    let mut seen = HashSet::new();
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}

/// Applies the request on top of `base` and validates the result.
fn prepare(
    req: RecipeWriteRequest,
    base: RecipeFields,
    title_required: bool,
) -> Result<RecipeWrite, ApiError> {
    let mut errors = FieldErrors::new();

    let equipment = match (req.equipment, req.equipment_names) {
        (Some(_), Some(_)) => {
            errors.add(
                "equipment",
                "Provide either equipment or equipment_names, not both.",
            );
            None
        }
        (Some(ids), None) => Some(EquipmentRefs::ById(ids)),
        (None, Some(names)) => {
            if normalize_equipment_names(&names)
                .iter()
                .any(|n| n.chars().count() > MAX_EQUIPMENT_NAME_LEN)
            {
                errors.add(
                    "equipment_names",
                    format!(
                        "Ensure this field has no more than {} characters.",
                        MAX_EQUIPMENT_NAME_LEN
                    ),
                );
            }
            Some(EquipmentRefs::ByName(names))
        }
        (None, None) => None,
    };

    let mut fields = base;
    match req.title {
        Some(title) => fields.title = title.trim().to_string(),
        None if title_required => errors.add("title", "This field is required."),
        None => {}
    }
    if let Some(description) = req.description {
        fields.description = description;
    }
    if let Some(ingredients) = req.ingredients {
        fields.ingredients = ingredients
            .into_iter()
            .map(|i| Ingredient {
                item: i.item.trim().to_string(),
                quantity: i.quantity.trim().to_string(),
            })
            .collect();
    }
    if let Some(steps) = req.instructions {
        fields.instructions = steps.into_iter().map(|s| s.trim().to_string()).collect();
    }
    if let Some(v) = req.prep_time_minutes {
        fields.prep_time_minutes = v;
    }
    if let Some(v) = req.cook_time_minutes {
        fields.cook_time_minutes = v;
    }
    if let Some(v) = req.servings {
        fields.servings = v;
    }
    if let Some(difficulty) = req.difficulty {
        fields.difficulty = difficulty;
    }

    validate_fields(&fields, &mut errors);
    errors.into_result()?;

    Ok(RecipeWrite {
        fields,
        tags: req.tags,
        equipment,
    })
}

fn validate_fields(fields: &RecipeFields, errors: &mut FieldErrors) {
    if errors.get("title").is_none() {
        if fields.title.is_empty() {
            errors.add("title", "This field may not be blank.");
        } else if fields.title.chars().count() > MAX_TITLE_LEN {
            errors.add(
                "title",
                format!("Ensure this field has no more than {} characters.", MAX_TITLE_LEN),
            );
        }
    }
    if fields.ingredients.iter().any(|i| i.item.is_empty()) {
        errors.add("ingredients", "Every ingredient needs an item.");
    }
    if fields.instructions.iter().any(String::is_empty) {
        errors.add("instructions", "Instruction steps may not be blank.");
    }
    for (name, value) in [
        ("prep_time_minutes", fields.prep_time_minutes),
        ("cook_time_minutes", fields.cook_time_minutes),
    ] {
        if matches!(value, Some(v) if v < 0) {
            errors.add(name, "Ensure this value is greater than or equal to 0.");
        }
    }
    if matches!(fields.servings, Some(v) if v < 1) {
        errors.add("servings", "Ensure this value is greater than or equal to 1.");
    }
}

fn not_found_errors(field: &str, missing: &[Uuid]) -> ApiError {
    let mut errors = FieldErrors::new();
    for id in missing {
        errors.add(field, format!("related object not found: {}", id));
    }
    ApiError::Validation(errors)
}

/// Deduplicated tag ids, all known to exist.
pub async fn resolve_tags<S>(store: &mut S, ids: &[Uuid]) -> Result<Vec<Uuid>, ApiError>
where
    S: RecipeStore + ?Sized,
{
    let ids = dedupe_ids(ids);
    let missing = store.missing_tags(&ids).await?;
    if !missing.is_empty() {
        return Err(not_found_errors("tags", &missing));
    }
    Ok(ids)
}

/// Equipment ids for `refs`, creating rows for unknown names.
pub async fn resolve_equipment<S>(store: &mut S, refs: &EquipmentRefs) -> Result<Vec<Uuid>, ApiError>
where
    S: RecipeStore + ?Sized,
{
    match refs {
        EquipmentRefs::ById(ids) => {
            let ids = dedupe_ids(ids);
            let missing = store.missing_equipment(&ids).await?;
            if !missing.is_empty() {
                return Err(not_found_errors("equipment", &missing));
            }
            Ok(ids)
        }
        EquipmentRefs::ByName(names) => {
            let mut ids = Vec::new();
            for name in normalize_equipment_names(names) {
                let (equipment, created) = get_or_create_equipment(&mut *store, &name).await?;
                if created {
                    info!(equipment_id = %equipment.id, name = %equipment.name, "equipment created from recipe");
                }
                ids.push(equipment.id);
            }
            Ok(dedupe_ids(&ids))
        }
    }
}

/// Resolves both relation inputs before anything is written, so an unknown
/// id rejects the request without side effects on the recipe.
async fn resolve_relations<S>(
    store: &mut S,
    write: &RecipeWrite,
) -> Result<(Option<Vec<Uuid>>, Option<Vec<Uuid>>), ApiError>
where
    S: RecipeStore + ?Sized,
{
    let tags = match &write.tags {
        Some(ids) => Some(resolve_tags(&mut *store, ids).await?),
        None => None,
    };
    let equipment = match &write.equipment {
        Some(refs) => Some(resolve_equipment(&mut *store, refs).await?),
        None => None,
    };
    Ok((tags, equipment))
}

async fn apply_relations<S>(
    store: &mut S,
    recipe_id: Uuid,
    tags: Option<Vec<Uuid>>,
    equipment: Option<Vec<Uuid>>,
) -> anyhow::Result<()>
where
    S: RecipeStore + ?Sized,
{
    if let Some(ids) = tags {
        store.replace_recipe_tags(recipe_id, &ids).await?;
    }
    if let Some(ids) = equipment {
        store.replace_recipe_equipment(recipe_id, &ids).await?;
    }
    Ok(())
}

pub async fn create_recipe<S>(
    store: &mut S,
    author_id: Uuid,
    req: RecipeWriteRequest,
) -> Result<RecipeRow, ApiError>
where
    S: RecipeStore + ?Sized,
{
    let write = prepare(req, RecipeFields::default(), true)?;
    let (tags, equipment) = resolve_relations(&mut *store, &write).await?;

    let base = base_slug(&write.fields.title, SlugTable::Recipes);
    let slug = unique_slug(&mut *store, SlugTable::Recipes, &base).await?;
    let row = store.insert_recipe(author_id, &slug, &write.fields).await?;
    apply_relations(&mut *store, row.id, tags, equipment).await?;
    store.adjust_recipe_count(author_id, 1).await?;

    info!(recipe_id = %row.id, %slug, %author_id, "recipe created");
    Ok(row)
}

pub async fn update_recipe<S>(
    store: &mut S,
    actor: Option<Uuid>,
    slug: &str,
    req: RecipeWriteRequest,
    mode: WriteMode,
) -> Result<RecipeRow, ApiError>
where
    S: RecipeStore + ?Sized,
{
    let row = store
        .find_recipe(slug)
        .await?
        .ok_or(ApiError::NotFound("Recipe"))?;
    authorize(actor, Access::Write, row.author_id)?;

    let write = prepare(req, row.fields(), mode == WriteMode::Replace)?;
    let (tags, equipment) = resolve_relations(&mut *store, &write).await?;

    let new_slug = if write.fields.title != row.title {
        let base = base_slug(&write.fields.title, SlugTable::Recipes);
        let mut lookup = ExcludingOwn {
            inner: &mut *store,
            own: &row.slug,
        };
        let fresh = unique_slug(&mut lookup, SlugTable::Recipes, &base).await?;
        debug!(recipe_id = %row.id, old = %row.slug, new = %fresh, "title changed, slug regenerated");
        fresh
    } else {
        row.slug.clone()
    };

    let updated = store.update_recipe(row.id, &new_slug, &write.fields).await?;
    apply_relations(&mut *store, row.id, tags, equipment).await?;

    info!(recipe_id = %row.id, slug = %new_slug, ?mode, "recipe updated");
    Ok(updated)
}

/// Removes the recipe and returns the deleted row.
pub async fn delete_recipe<S>(
    store: &mut S,
    actor: Option<Uuid>,
    slug: &str,
) -> Result<RecipeRow, ApiError>
where
    S: RecipeStore + ?Sized,
{
    let row = store
        .find_recipe(slug)
        .await?
        .ok_or(ApiError::NotFound("Recipe"))?;
    authorize(actor, Access::Write, row.author_id)?;

    store.delete_recipe(row.id).await?;
    store.adjust_recipe_count(row.author_id, -1).await?;
    info!(recipe_id = %row.id, slug = %row.slug, "recipe deleted");
    Ok(row)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{recipes::repo::Difficulty, testing::MemoryStore};
    use serde_json::json;

    fn req(body: serde_json::Value) -> RecipeWriteRequest {
        serde_json::from_value(body).unwrap()
    }

    fn field_error(err: ApiError, field: &str) -> Vec<String> {
        match err {
            ApiError::Validation(errors) => errors
                .get(field)
                .unwrap_or_else(|| panic!("no error for {}: {:?}", field, errors))
                .to_vec(),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    fn seeded() -> (MemoryStore, Uuid) {
        let mut store = MemoryStore::default();
        let author = store.add_user();
        (store, author)
    }

    #[test]
    fn equipment_names_normalize() {
        let names: Vec<String> = ["Whisk", "whisk ", "  ", "Tongs", "WHISK"]
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(normalize_equipment_names(&names), vec!["Whisk", "Tongs"]);
    }

    #[tokio::test]
    async fn create_assigns_slug_and_counts() {
        let (mut store, author) = seeded();
        let first = create_recipe(&mut store, author, req(json!({"title": "Tomato Soup"})))
            .await
            .unwrap();
        let second = create_recipe(&mut store, author, req(json!({"title": "Tomato soup!"})))
            .await
            .unwrap();

        assert_eq!(first.slug, "tomato-soup");
        assert_eq!(second.slug, "tomato-soup-1");
        assert_eq!(first.difficulty, Difficulty::Easy);
        assert_eq!(store.recipe_counts[&author], 2);
    }

    #[tokio::test]
    async fn create_requires_title() {
        let (mut store, author) = seeded();
        let err = create_recipe(&mut store, author, req(json!({"description": "no title"})))
            .await
            .unwrap_err();
        assert_eq!(field_error(err, "title"), vec!["This field is required."]);

        let err = create_recipe(&mut store, author, req(json!({"title": "   "})))
            .await
            .unwrap_err();
        assert_eq!(field_error(err, "title"), vec!["This field may not be blank."]);
        assert!(store.recipes.is_empty());
    }

    #[tokio::test]
    async fn unsluggable_title_falls_back() {
        let (mut store, author) = seeded();
        let row = create_recipe(&mut store, author, req(json!({"title": "???"})))
            .await
            .unwrap();
        assert_eq!(row.slug, "recipe");
    }

    #[tokio::test]
    async fn retitle_regenerates_slug_and_same_title_keeps_it() {
        let (mut store, author) = seeded();
        create_recipe(&mut store, author, req(json!({"title": "Pasta"})))
            .await
            .unwrap();

        let same = update_recipe(
            &mut store,
            Some(author),
            "pasta",
            req(json!({"title": "Pasta", "description": "al dente"})),
            WriteMode::Replace,
        )
        .await
        .unwrap();
        assert_eq!(same.slug, "pasta");
        assert_eq!(same.description, "al dente");

        let renamed = update_recipe(
            &mut store,
            Some(author),
            "pasta",
            req(json!({"title": "Spicy Pasta"})),
            WriteMode::Partial,
        )
        .await
        .unwrap();
        assert_eq!(renamed.slug, "spicy-pasta");
        assert_eq!(renamed.description, "al dente");
    }

    #[tokio::test]
    async fn retitle_to_same_slug_does_not_collide_with_itself() {
        let (mut store, author) = seeded();
        create_recipe(&mut store, author, req(json!({"title": "Pasta"})))
            .await
            .unwrap();
        let row = update_recipe(
            &mut store,
            Some(author),
            "pasta",
            req(json!({"title": "PASTA!"})),
            WriteMode::Partial,
        )
        .await
        .unwrap();
        assert_eq!(row.slug, "pasta");
        assert_eq!(row.title, "PASTA!");
    }

    #[tokio::test]
    async fn equipment_names_reconcile_case_insensitively() {
        let (mut store, author) = seeded();
        let (whisk, _) = get_or_create_equipment(&mut store, "Whisk").await.unwrap();

        let row = create_recipe(
            &mut store,
            author,
            req(json!({
                "title": "Pancakes",
                "equipment_names": ["Whisk", "whisk ", "Tongs"]
            })),
        )
        .await
        .unwrap();

        let linked = &store.recipe_equipment[&row.id];
        assert_eq!(linked.len(), 2);
        assert!(linked.contains(&whisk.id));
        assert_eq!(store.equipment.len(), 2);
    }

    #[tokio::test]
    async fn overlong_equipment_name_is_a_field_error() {
        let (mut store, author) = seeded();
        let long = "W".repeat(MAX_EQUIPMENT_NAME_LEN + 50);
        let err = create_recipe(
            &mut store,
            author,
            req(json!({"title": "Soup", "equipment_names": ["Ladle", long]})),
        )
        .await
        .unwrap_err();

        let messages = field_error(err, "equipment_names");
        assert!(messages[0].contains("no more than 100 characters"));
        assert!(store.recipes.is_empty());
        assert!(store.equipment.is_empty());

        let padded = format!("  {}  ", "W".repeat(MAX_EQUIPMENT_NAME_LEN));
        let row = create_recipe(
            &mut store,
            author,
            req(json!({"title": "Soup", "equipment_names": [padded]})),
        )
        .await
        .unwrap();
        assert_eq!(store.recipe_equipment[&row.id].len(), 1);
    }

    #[tokio::test]
    async fn equipment_by_id_and_by_name_together_is_rejected() {
        let (mut store, author) = seeded();
        let err = create_recipe(
            &mut store,
            author,
            req(json!({
                "title": "Pancakes",
                "equipment": [],
                "equipment_names": ["Whisk"]
            })),
        )
        .await
        .unwrap_err();
        field_error(err, "equipment");
        assert!(store.recipes.is_empty());
    }

    #[tokio::test]
    async fn unknown_tag_rejects_without_writes() {
        let (mut store, author) = seeded();
        let ghost = Uuid::new_v4();
        let err = create_recipe(
            &mut store,
            author,
            req(json!({"title": "Stew", "tags": [ghost]})),
        )
        .await
        .unwrap_err();

        let messages = field_error(err, "tags");
        assert!(messages[0].contains("related object not found"));
        assert!(store.recipes.is_empty());
        assert_eq!(store.recipe_counts.get(&author).copied().unwrap_or(0), 0);
    }

    #[tokio::test]
    async fn duplicate_tag_ids_collapse() {
        let (mut store, author) = seeded();
        let vegan = store.add_tag("Vegan");
        let row = create_recipe(
            &mut store,
            author,
            req(json!({"title": "Salad", "tags": [vegan, vegan]})),
        )
        .await
        .unwrap();
        assert_eq!(store.recipe_tags[&row.id].len(), 1);
    }

    #[tokio::test]
    async fn omitted_tags_are_kept_and_empty_list_clears() {
        let (mut store, author) = seeded();
        let vegan = store.add_tag("Vegan");
        let quick = store.add_tag("Quick & Easy");
        let row = create_recipe(
            &mut store,
            author,
            req(json!({"title": "Salad", "tags": [vegan, quick]})),
        )
        .await
        .unwrap();

        update_recipe(
            &mut store,
            Some(author),
            &row.slug,
            req(json!({"description": "crunchy"})),
            WriteMode::Partial,
        )
        .await
        .unwrap();
        assert_eq!(store.recipe_tags[&row.id].len(), 2);

        update_recipe(
            &mut store,
            Some(author),
            &row.slug,
            req(json!({"tags": []})),
            WriteMode::Partial,
        )
        .await
        .unwrap();
        assert!(store.recipe_tags[&row.id].is_empty());
    }

    #[tokio::test]
    async fn put_requires_title_patch_does_not() {
        let (mut store, author) = seeded();
        let row = create_recipe(&mut store, author, req(json!({"title": "Bread"})))
            .await
            .unwrap();

        let err = update_recipe(
            &mut store,
            Some(author),
            &row.slug,
            req(json!({"servings": 4})),
            WriteMode::Replace,
        )
        .await
        .unwrap_err();
        field_error(err, "title");

        let patched = update_recipe(
            &mut store,
            Some(author),
            &row.slug,
            req(json!({"servings": 4})),
            WriteMode::Partial,
        )
        .await
        .unwrap();
        assert_eq!(patched.servings, Some(4));
        assert_eq!(patched.title, "Bread");
    }

    #[tokio::test]
    async fn explicit_null_clears_optional_numbers() {
        let (mut store, author) = seeded();
        let row = create_recipe(
            &mut store,
            author,
            req(json!({"title": "Bread", "servings": 2, "prep_time_minutes": 10})),
        )
        .await
        .unwrap();
        let patched = update_recipe(
            &mut store,
            Some(author),
            &row.slug,
            req(json!({"servings": null})),
            WriteMode::Partial,
        )
        .await
        .unwrap();
        assert_eq!(patched.servings, None);
        assert_eq!(patched.prep_time_minutes, Some(10));
    }

    #[tokio::test]
    async fn non_author_cannot_write() {
        let (mut store, author) = seeded();
        let stranger = store.add_user();
        let row = create_recipe(&mut store, author, req(json!({"title": "Curry"})))
            .await
            .unwrap();

        let err = update_recipe(
            &mut store,
            Some(stranger),
            &row.slug,
            req(json!({"title": ""})),
            WriteMode::Partial,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::Forbidden));

        let err = delete_recipe(&mut store, Some(stranger), &row.slug)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Forbidden));

        let err = delete_recipe(&mut store, None, &row.slug).await.unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(_)));

        assert_eq!(store.recipes.len(), 1);
        assert_eq!(store.recipes[0].title, "Curry");
    }

    #[tokio::test]
    async fn unknown_slug_is_not_found() {
        let (mut store, author) = seeded();
        let err = update_recipe(
            &mut store,
            Some(author),
            "nope",
            req(json!({})),
            WriteMode::Partial,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::NotFound("Recipe")));
        let err = delete_recipe(&mut store, Some(author), "nope").await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound("Recipe")));
    }

    #[tokio::test]
    async fn delete_decrements_count_and_saturates() {
        let (mut store, author) = seeded();
        let row = create_recipe(&mut store, author, req(json!({"title": "Pie"})))
            .await
            .unwrap();
        assert_eq!(store.recipe_counts[&author], 1);

        store.recipe_counts.insert(author, 0);
        let deleted = delete_recipe(&mut store, Some(author), &row.slug).await.unwrap();
        assert_eq!(deleted.id, row.id);
        assert!(store.recipes.is_empty());
        assert!(!store.recipe_tags.contains_key(&row.id));
        assert_eq!(store.recipe_counts[&author], 0);
    }

    #[tokio::test]
    async fn invalid_numbers_are_field_errors() {
        let (mut store, author) = seeded();
        let err = create_recipe(
            &mut store,
            author,
            req(json!({"title": "Toast", "prep_time_minutes": -5, "servings": 0})),
        )
        .await
        .unwrap_err();
        match err {
            ApiError::Validation(errors) => {
                assert!(errors.get("prep_time_minutes").is_some());
                assert!(errors.get("servings").is_some());
                assert!(errors.get("title").is_none());
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
