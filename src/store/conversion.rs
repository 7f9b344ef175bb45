use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use uuid::Uuid;

use crate::error::PersistenceError;
use crate::model::Platform;

/// Lifecycle of one pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversionStatus {
    Initiated,
    MetadataFetched,
    MetadataFetchFailed,
    IngredientsExtracted,
    CommentsMined,
    WebsiteAugmented,
    RecipeGenerationRequested,
    RecipeGenerated,
    RecipeGenerationFailed,
    IngredientsMatched,
    RecipeSaved,
    RecipeSaveFailed,
}

impl ConversionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConversionStatus::Initiated => "initiated",
            ConversionStatus::MetadataFetched => "metadata_fetched",
            ConversionStatus::MetadataFetchFailed => "metadata_fetch_failed",
            ConversionStatus::IngredientsExtracted => "ingredients_extracted",
            ConversionStatus::CommentsMined => "comments_mined",
            ConversionStatus::WebsiteAugmented => "website_augmented",
            ConversionStatus::RecipeGenerationRequested => "recipe_generation_requested",
            ConversionStatus::RecipeGenerated => "recipe_generated",
            ConversionStatus::RecipeGenerationFailed => "recipe_generation_failed",
            ConversionStatus::IngredientsMatched => "ingredients_matched",
            ConversionStatus::RecipeSaved => "recipe_saved",
            ConversionStatus::RecipeSaveFailed => "recipe_save_failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ConversionStatus::MetadataFetchFailed
                | ConversionStatus::RecipeGenerationFailed
                | ConversionStatus::RecipeSaveFailed
                | ConversionStatus::RecipeSaved
        )
    }

    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            ConversionStatus::MetadataFetchFailed
                | ConversionStatus::RecipeGenerationFailed
                | ConversionStatus::RecipeSaveFailed
        )
    }

    pub fn can_transition_to(&self, next: ConversionStatus) -> bool {
        use ConversionStatus::*;
        matches!(
            (*self, next),
            (Initiated, MetadataFetched | MetadataFetchFailed)
                | (MetadataFetched, IngredientsExtracted)
                | (
                    IngredientsExtracted,
                    CommentsMined | WebsiteAugmented | RecipeGenerationRequested
                )
                | (CommentsMined, WebsiteAugmented | RecipeGenerationRequested)
                | (WebsiteAugmented, RecipeGenerationRequested)
                | (
                    RecipeGenerationRequested,
                    RecipeGenerated | RecipeGenerationFailed
                )
                | (RecipeGenerated, IngredientsMatched)
                | (IngredientsMatched, RecipeSaved | RecipeSaveFailed)
        )
    }
}

impl fmt::Display for ConversionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusChange {
    pub status: ConversionStatus,
    pub at: DateTime<Utc>,
}

/// Audit row for one pipeline run; never deleted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionRecord {
    pub id: String,
    pub source_type: Platform,
    pub source_url: Option<String>,
    pub status: ConversionStatus,
    pub error_message: Option<String>,
    pub recipe_json: Option<Value>,
    pub recipe_id: Option<String>,
    /// Kept on structuring failures so the run can be retried or debugged
    pub raw_text: Option<String>,
    pub user_id: Option<String>,
    pub history: Vec<StatusChange>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ConversionRecord {
    pub fn new(source_type: Platform, source_url: Option<String>, user_id: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            source_type,
            source_url,
            status: ConversionStatus::Initiated,
            error_message: None,
            recipe_json: None,
            recipe_id: None,
            raw_text: None,
            user_id,
            history: vec![StatusChange {
                status: ConversionStatus::Initiated,
                at: now,
            }],
            created_at: now,
            updated_at: now,
        }
    }

    /// Statuses in the order they were reached
    pub fn statuses(&self) -> Vec<ConversionStatus> {
        self.history.iter().map(|change| change.status).collect()
    }

    /// Apply an update if the state machine allows it
    pub fn apply(&mut self, update: ConversionUpdate) -> Result<(), PersistenceError> {
        if !self.status.can_transition_to(update.status) {
            return Err(PersistenceError::InvalidTransition {
                from: self.status.to_string(),
                to: update.status.to_string(),
            });
        }

        let now = Utc::now();
        self.status = update.status;
        if update.error_message.is_some() {
            self.error_message = update.error_message;
        }
        if update.recipe_json.is_some() {
            self.recipe_json = update.recipe_json;
        }
        if update.recipe_id.is_some() {
            self.recipe_id = update.recipe_id;
        }
        if update.raw_text.is_some() {
            self.raw_text = update.raw_text;
        }
        self.history.push(StatusChange {
            status: update.status,
            at: now,
        });
        self.updated_at = now;
        Ok(())
    }
}

/// One status transition plus its payload
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionUpdate {
    pub status: ConversionStatus,
    pub error_message: Option<String>,
    pub recipe_json: Option<Value>,
    pub recipe_id: Option<String>,
    pub raw_text: Option<String>,
}

impl ConversionUpdate {
    pub fn new(status: ConversionStatus) -> Self {
        Self {
            status,
            error_message: None,
            recipe_json: None,
            recipe_id: None,
            raw_text: None,
        }
    }

    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }

    pub fn with_recipe_json(mut self, recipe_json: Value) -> Self {
        self.recipe_json = Some(recipe_json);
        self
    }

    pub fn with_recipe_id(mut self, recipe_id: impl Into<String>) -> Self {
        self.recipe_id = Some(recipe_id.into());
        self
    }

    pub fn with_raw_text(mut self, raw_text: impl Into<String>) -> Self {
        self.raw_text = Some(raw_text.into());
        self
    }
}

impl From<ConversionStatus> for ConversionUpdate {
    fn from(status: ConversionStatus) -> Self {
        Self::new(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ConversionStatus::*;

    #[test]
    fn test_happy_path_is_allowed() {
        let path = [
            Initiated,
            MetadataFetched,
            IngredientsExtracted,
            CommentsMined,
            WebsiteAugmented,
            RecipeGenerationRequested,
            RecipeGenerated,
            IngredientsMatched,
            RecipeSaved,
        ];
        for pair in path.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]), "{} -> {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_terminal_states_have_no_exits() {
        let all = [
            Initiated,
            MetadataFetched,
            MetadataFetchFailed,
            IngredientsExtracted,
            CommentsMined,
            WebsiteAugmented,
            RecipeGenerationRequested,
            RecipeGenerated,
            RecipeGenerationFailed,
            IngredientsMatched,
            RecipeSaved,
            RecipeSaveFailed,
        ];
        for from in all.iter().filter(|s| s.is_terminal()) {
            assert!(all.iter().all(|to| !from.can_transition_to(*to)), "{from}");
        }
    }

    #[test]
    fn test_apply_rejects_skipped_stage() {
        let mut record = ConversionRecord::new(Platform::YouTube, None, None);
        let err = record.apply(RecipeGenerated.into()).unwrap_err();
        assert!(matches!(err, PersistenceError::InvalidTransition { .. }));
        assert_eq!(record.status, Initiated);
    }

    #[test]
    fn test_apply_records_payload_and_history() {
        let mut record = ConversionRecord::new(Platform::Webpage, Some("https://a.b".into()), None);
        record
            .apply(ConversionUpdate::new(MetadataFetchFailed).with_error("404"))
            .unwrap();
        assert_eq!(record.error_message.as_deref(), Some("404"));
        assert_eq!(record.statuses(), vec![Initiated, MetadataFetchFailed]);
        assert!(record.status.is_terminal());
        assert_eq!(serde_json::to_value(record.status).unwrap(), "metadata_fetch_failed");
    }
}
