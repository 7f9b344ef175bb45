//! In-process implementation of every store collaborator.
//!
//! Used by the CLI and the test suite. Recipe saves are staged in local
//! buffers and committed under a single lock, so a failure anywhere in the
//! link loop leaves the store exactly as it was.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, warn};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use super::{
    ConversionLog, ConversionRecord, ConversionStatus, ConversionUpdate, IngredientLink,
    LinkTarget, RecipeStore,
};
use crate::error::{MatchingError, PersistenceError};
use crate::model::{CanonicalIngredient, StructuredRecipe};
use crate::resolver::{IngredientCatalog, SearchPattern};

#[derive(Debug, Clone, PartialEq)]
pub struct StoredRecipe {
    pub id: String,
    pub recipe: StructuredRecipe,
    pub source_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredLink {
    pub recipe_id: String,
    pub ingredient_id: String,
    pub quantity: Option<String>,
    pub unit: Option<String>,
    pub section: Option<String>,
}

#[derive(Default)]
struct Tables {
    ingredients: Vec<CanonicalIngredient>,
    recipes: HashMap<String, StoredRecipe>,
    links: Vec<StoredLink>,
    conversions: HashMap<String, ConversionRecord>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    /// 1-based link insert that should fail; 0 disables injection
    fail_on_link: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the catalog with canonical ingredients
    pub fn with_ingredients<I, S>(self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if let Ok(mut tables) = self.tables.lock() {
            for name in names {
                tables.ingredients.push(new_ingredient(name.into()));
            }
        }
        self
    }

    /// Make the `n`th link insert of every following save fail
    pub fn fail_on_link_insert(&self, n: usize) {
        self.fail_on_link.store(n, Ordering::SeqCst);
    }

    pub fn recipe_count(&self) -> usize {
        self.tables.lock().map(|t| t.recipes.len()).unwrap_or_default()
    }

    pub fn link_count(&self) -> usize {
        self.tables.lock().map(|t| t.links.len()).unwrap_or_default()
    }

    pub fn ingredient_count(&self) -> usize {
        self.tables.lock().map(|t| t.ingredients.len()).unwrap_or_default()
    }

    pub fn recipe(&self, id: &str) -> Option<StoredRecipe> {
        self.tables.lock().ok()?.recipes.get(id).cloned()
    }

    pub fn links_for(&self, recipe_id: &str) -> Vec<StoredLink> {
        self.tables
            .lock()
            .map(|t| {
                t.links
                    .iter()
                    .filter(|link| link.recipe_id == recipe_id)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn conversions(&self) -> Vec<ConversionRecord> {
        let mut records: Vec<ConversionRecord> = self
            .tables
            .lock()
            .map(|t| t.conversions.values().cloned().collect())
            .unwrap_or_default();
        records.sort_by_key(|r| r.created_at);
        records
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, PersistenceError> {
        self.tables
            .lock()
            .map_err(|_| PersistenceError::Storage("store lock poisoned".to_string()))
    }
}

fn new_ingredient(name: String) -> CanonicalIngredient {
    CanonicalIngredient {
        id: Uuid::new_v4().to_string(),
        canonical_name: name,
        form: None,
    }
}

#[async_trait]
impl IngredientCatalog for MemoryStore {
    async fn search(
        &self,
        pattern: &SearchPattern,
    ) -> Result<Vec<CanonicalIngredient>, MatchingError> {
        let (SearchPattern::Equals(query)
        | SearchPattern::Contains(query)
        | SearchPattern::ContainedIn(query)) = pattern;
        let query = query.trim().to_lowercase();

        let tables = self.tables.lock().map_err(|_| MatchingError {
            ingredient: query.clone(),
            message: "catalog lock poisoned".to_string(),
        })?;
        Ok(tables
            .ingredients
            .iter()
            .filter(|entry| {
                let name = entry.canonical_name.trim().to_lowercase();
                match pattern {
                    SearchPattern::Equals(_) => name == query,
                    SearchPattern::Contains(_) => name.contains(&query),
                    SearchPattern::ContainedIn(_) => query.contains(&name),
                }
            })
            .cloned()
            .collect())
    }

    async fn create(&self, name: &str) -> Result<CanonicalIngredient, MatchingError> {
        let mut tables = self.tables.lock().map_err(|_| MatchingError {
            ingredient: name.to_string(),
            message: "catalog lock poisoned".to_string(),
        })?;
        let ingredient = new_ingredient(name.trim().to_string());
        tables.ingredients.push(ingredient.clone());
        Ok(ingredient)
    }
}

#[async_trait]
impl RecipeStore for MemoryStore {
    async fn save_recipe(
        &self,
        recipe: &StructuredRecipe,
        links: &[IngredientLink],
        source_url: Option<&str>,
    ) -> Result<String, PersistenceError> {
        let mut tables = self.lock()?;
        let recipe_id = Uuid::new_v4().to_string();
        let fail_on = self.fail_on_link.load(Ordering::SeqCst);

        let mut staged_ingredients: Vec<CanonicalIngredient> = Vec::new();
        let mut staged_links = Vec::with_capacity(links.len());

        for (position, link) in links.iter().enumerate() {
            if fail_on == position + 1 {
                warn!("Injected failure on link {} of {}", position + 1, links.len());
                return Err(PersistenceError::RolledBack(format!(
                    "insert of ingredient link {} ('{}') failed",
                    position + 1,
                    link.raw_name
                )));
            }

            let ingredient_id = match &link.target {
                LinkTarget::Existing(id) => {
                    if !tables.ingredients.iter().any(|i| &i.id == id) {
                        return Err(PersistenceError::RolledBack(format!(
                            "unknown ingredient id {id} for '{}'",
                            link.raw_name
                        )));
                    }
                    id.clone()
                }
                LinkTarget::New(name) => {
                    let wanted = name.trim().to_lowercase();
                    let existing = tables
                        .ingredients
                        .iter()
                        .chain(staged_ingredients.iter())
                        .find(|i| i.canonical_name.trim().to_lowercase() == wanted)
                        .map(|i| i.id.clone());
                    match existing {
                        Some(id) => id,
                        None => {
                            let created = new_ingredient(name.trim().to_string());
                            let id = created.id.clone();
                            staged_ingredients.push(created);
                            id
                        }
                    }
                }
            };

            staged_links.push(StoredLink {
                recipe_id: recipe_id.clone(),
                ingredient_id,
                quantity: link.quantity.clone(),
                unit: link.unit.clone(),
                section: link.section.clone(),
            });
        }

        debug!(
            "Committing recipe {recipe_id} with {} link(s), {} new ingredient(s)",
            staged_links.len(),
            staged_ingredients.len()
        );
        tables.ingredients.extend(staged_ingredients);
        tables.links.extend(staged_links);
        tables.recipes.insert(
            recipe_id.clone(),
            StoredRecipe {
                id: recipe_id.clone(),
                recipe: recipe.clone(),
                source_url: source_url.map(String::from),
                created_at: Utc::now(),
            },
        );
        Ok(recipe_id)
    }
}

#[async_trait]
impl ConversionLog for MemoryStore {
    async fn create_conversion(&self, record: ConversionRecord) -> Result<(), PersistenceError> {
        let mut tables = self.lock()?;
        tables.conversions.insert(record.id.clone(), record);
        Ok(())
    }

    async fn update_conversion(
        &self,
        id: &str,
        update: ConversionUpdate,
    ) -> Result<ConversionRecord, PersistenceError> {
        let mut tables = self.lock()?;
        let record = tables
            .conversions
            .get_mut(id)
            .ok_or_else(|| PersistenceError::UnknownConversion(id.to_string()))?;
        record.apply(update)?;
        Ok(record.clone())
    }

    async fn get_conversion(&self, id: &str) -> Result<Option<ConversionRecord>, PersistenceError> {
        Ok(self.lock()?.conversions.get(id).cloned())
    }

    async fn find_saved_conversion(
        &self,
        source_url: &str,
    ) -> Result<Option<ConversionRecord>, PersistenceError> {
        let tables = self.lock()?;
        Ok(tables
            .conversions
            .values()
            .filter(|r| {
                r.status == ConversionStatus::RecipeSaved
                    && r.source_url.as_deref() == Some(source_url)
            })
            .max_by_key(|r| r.updated_at)
            .cloned())
    }
}
