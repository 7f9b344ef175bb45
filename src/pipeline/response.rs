use serde::Serialize;
use std::time::Duration;

use super::{IngestFailure, IngestOutcome};
use crate::model::{MatchResult, StructuredRecipe};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestSuccess {
    pub success: bool,
    pub conversion_id: String,
    pub recipe_id: String,
    pub recipe: StructuredRecipe,
    pub ingredient_matches: Vec<MatchResult>,
    pub already_processed: bool,
    pub processing_time_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestFailureBody {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversion_id: Option<String>,
    pub message: String,
    /// Machine-readable error class
    pub error: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub troubleshooting: Vec<String>,
    pub http_status: u16,
    pub processing_time_ms: u64,
}

/// Response body of the inbound API
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum IngestResponse {
    Success(Box<IngestSuccess>),
    Failure(IngestFailureBody),
}

impl IngestResponse {
    pub fn from_result(result: Result<IngestOutcome, IngestFailure>, elapsed: Duration) -> Self {
        let processing_time_ms = elapsed.as_millis() as u64;
        match result {
            Ok(outcome) => IngestResponse::Success(Box::new(IngestSuccess {
                success: true,
                conversion_id: outcome.conversion_id,
                recipe_id: outcome.recipe_id,
                recipe: outcome.recipe,
                ingredient_matches: outcome.matches,
                already_processed: outcome.already_processed,
                processing_time_ms,
            })),
            Err(failure) => IngestResponse::Failure(IngestFailureBody {
                success: false,
                conversion_id: failure.conversion_id,
                message: failure.error.to_string(),
                error: failure.error.error_code().to_string(),
                troubleshooting: failure.error.troubleshooting(),
                http_status: failure.error.http_status(),
                processing_time_ms,
            }),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, IngestResponse::Success(_))
    }

    pub fn http_status(&self) -> u16 {
        match self {
            IngestResponse::Success(_) => 200,
            IngestResponse::Failure(body) => body.http_status,
        }
    }

    pub fn conversion_id(&self) -> Option<&str> {
        match self {
            IngestResponse::Success(body) => Some(&body.conversion_id),
            IngestResponse::Failure(body) => body.conversion_id.as_deref(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{IngestError, SourceFetchError, ValidationError};

    #[test]
    fn test_failure_body_shape() {
        let failure = IngestFailure {
            conversion_id: Some("abc".to_string()),
            error: IngestError::from(SourceFetchError::not_found("video removed")),
        };
        let response = IngestResponse::from_result(Err(failure), Duration::from_millis(12));
        assert_eq!(response.http_status(), 400);

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["conversionId"], "abc");
        assert_eq!(json["error"], "source_fetch_error");
        assert_eq!(json["httpStatus"], 400);
        assert!(json["troubleshooting"].as_array().is_some_and(|h| !h.is_empty()));
    }

    #[test]
    fn test_validation_failure_omits_conversion_id() {
        let failure = IngestFailure {
            conversion_id: None,
            error: IngestError::from(ValidationError::MissingSource),
        };
        let response = IngestResponse::from_result(Err(failure), Duration::ZERO);
        let json = serde_json::to_value(&response).unwrap();
        assert!(json.get("conversionId").is_none());
        assert!(response.conversion_id().is_none());
    }

    #[test]
    fn test_success_body_shape() {
        let outcome = IngestOutcome {
            conversion_id: "c1".to_string(),
            recipe_id: "r1".to_string(),
            recipe: StructuredRecipe::default(),
            matches: Vec::new(),
            already_processed: false,
        };
        let response = IngestResponse::from_result(Ok(outcome), Duration::from_millis(5));
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["recipeId"], "r1");
        assert_eq!(json["recipe"]["title"], "Untitled Recipe");
        assert_eq!(json["processingTimeMs"], 5);
        assert_eq!(response.http_status(), 200);
    }
}
