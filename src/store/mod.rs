//! Persistence collaborators: the conversion audit log and the recipe store.

mod conversion;
mod memory;

pub use conversion::{ConversionRecord, ConversionStatus, ConversionUpdate, StatusChange};
pub use memory::{MemoryStore, StoredLink, StoredRecipe};

use async_trait::async_trait;

use crate::error::PersistenceError;
use crate::model::StructuredRecipe;

/// Catalog row a saved ingredient line points at
#[derive(Debug, Clone, PartialEq)]
pub enum LinkTarget {
    Existing(String),
    /// Create this canonical ingredient inside the save transaction
    New(String),
}

/// One ingredient line of a saved recipe
#[derive(Debug, Clone, PartialEq)]
pub struct IngredientLink {
    pub target: LinkTarget,
    pub raw_name: String,
    pub quantity: Option<String>,
    pub unit: Option<String>,
    pub section: Option<String>,
}

/// Append-only audit trail of pipeline runs
#[async_trait]
pub trait ConversionLog: Send + Sync {
    async fn create_conversion(&self, record: ConversionRecord) -> Result<(), PersistenceError>;

    /// Apply one status transition; rejected transitions leave the record untouched
    async fn update_conversion(
        &self,
        id: &str,
        update: ConversionUpdate,
    ) -> Result<ConversionRecord, PersistenceError>;

    async fn get_conversion(&self, id: &str) -> Result<Option<ConversionRecord>, PersistenceError>;

    /// Most recent `recipe_saved` run for this source URL
    async fn find_saved_conversion(
        &self,
        source_url: &str,
    ) -> Result<Option<ConversionRecord>, PersistenceError>;
}

/// Transactional recipe writer
#[async_trait]
pub trait RecipeStore: Send + Sync {
    /// Write the recipe row and every link row, or nothing at all
    async fn save_recipe(
        &self,
        recipe: &StructuredRecipe,
        links: &[IngredientLink],
        source_url: Option<&str>,
    ) -> Result<String, PersistenceError>;
}
