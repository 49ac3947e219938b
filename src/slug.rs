//! URL slugs for tags, equipment and recipes.
//!
//! A slug is derived from a human label and must be unique within its table.
//! [`unique_slug`] owns the collision loop for every entity type; callers
//! supply a [`SlugLookup`] that answers "is this slug already used here?".

use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;

/// Tables that carry a unique slug column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlugTable {
    Tags,
    Equipment,
    Recipes,
}

impl SlugTable {
    pub fn table_name(self) -> &'static str {
        match self {
            SlugTable::Tags => "tags",
            SlugTable::Equipment => "equipment",
            SlugTable::Recipes => "recipes",
        }
    }

    /// Slug used when a label has no sluggable characters at all.
    pub fn fallback(self) -> &'static str {
        match self {
            SlugTable::Tags => "tag",
            SlugTable::Equipment => "equipment",
            SlugTable::Recipes => "recipe",
        }
    }
}

#[async_trait]
pub trait SlugLookup: Send {
    async fn slug_taken(&mut self, table: SlugTable, slug: &str) -> anyhow::Result<bool>;
}

/// Lower-case, hyphenated ASCII form of `name`. May be empty.
pub fn slugify(name: &str) -> String {
    lazy_static! {
        static ref SEPARATORS: Regex = Regex::new(r"[\s_\-]+").unwrap();
    }
    let folded: String = name
        .chars()
        .filter_map(|c| {
            let c = fold_latin(c);
            if c.is_ascii_alphanumeric() {
                Some(c.to_ascii_lowercase())
            } else if c.is_whitespace() || c == '-' || c == '_' {
                Some(' ')
            } else {
                None
            }
        })
        .collect();
    SEPARATORS
        .replace_all(folded.trim(), "-")
        .trim_matches('-')
        .to_string()
}

/// [`slugify`] that never returns an empty string.
pub fn base_slug(name: &str, table: SlugTable) -> String {
    let slug = slugify(name);
    if slug.is_empty() {
        table.fallback().to_string()
    } else {
        slug
    }
}

/// First of `base`, `base-1`, `base-2`, ... not yet present in `table`.
///
/// Check-then-use: two writers racing on the same base can both see the same
/// candidate as free. The unique index decides; the loser gets a conflict.
pub async fn unique_slug<L>(lookup: &mut L, table: SlugTable, base: &str) -> anyhow::Result<String>
where
    L: SlugLookup + ?Sized,
{
    if !lookup.slug_taken(table, base).await? {
        return Ok(base.to_string());
    }
    let mut counter: u32 = 1;
    loop {
        let candidate = format!("{}-{}", base, counter);
        if !lookup.slug_taken(table, &candidate).await? {
            tracing::debug!(table = table.table_name(), %candidate, "slug collision resolved");
            return Ok(candidate);
        }
        counter += 1;
    }
}

/// Lookup that treats one row's current slug as free, so re-slugging a row
/// can land on the slug it already owns.
pub struct ExcludingOwn<'a, L: ?Sized> {
    pub inner: &'a mut L,
    pub own: &'a str,
}

#[async_trait]
impl<L> SlugLookup for ExcludingOwn<'_, L>
where
    L: SlugLookup + ?Sized,
{
    async fn slug_taken(&mut self, table: SlugTable, slug: &str) -> anyhow::Result<bool> {
        if slug == self.own {
            return Ok(false);
        }
        self.inner.slug_taken(table, slug).await
    }
}

fn fold_latin(c: char) -> char {
    match c {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'À' | 'Á' | 'Â' | 'Ã' | 'Ä' | 'Å' => 'a',
        'ç' | 'Ç' => 'c',
        'è' | 'é' | 'ê' | 'ë' | 'È' | 'É' | 'Ê' | 'Ë' => 'e',
        'ì' | 'í' | 'î' | 'ï' | 'Ì' | 'Í' | 'Î' | 'Ï' => 'i',
        'ñ' | 'Ñ' => 'n',
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' | 'Ò' | 'Ó' | 'Ô' | 'Õ' | 'Ö' | 'Ø' => 'o',
        'ù' | 'ú' | 'û' | 'ü' | 'Ù' | 'Ú' | 'Û' | 'Ü' => 'u',
        'ý' | 'ÿ' | 'Ý' => 'y',
        other => other,
    }
}
