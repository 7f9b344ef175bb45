//! Client for the external structuring engine.
//!
//! Builds the request from raw text and extractor hints, sends it through an
//! [`LlmProvider`], recovers a JSON object from the reply and sanitizes it.

mod sanitize;

pub use sanitize::{sanitize, RawStep};

use log::{debug, info};
use serde_json::Value;
use std::fmt::Write;
use std::sync::Arc;

use crate::error::StructuringError;
use crate::model::{CandidateIngredient, StructuredRecipe};
use crate::providers::LlmProvider;

/// System instruction sent with every structuring request
pub const STRUCTURING_PROMPT: &str = include_str!("prompt.txt");

/// Everything the structuring engine is given for one recipe
#[derive(Debug, Clone)]
pub struct StructuringRequest {
    pub system_instruction: String,
    pub raw_text: String,
    pub title_hint: Option<String>,
    pub channel_hint: Option<String>,
    pub candidates: Vec<CandidateIngredient>,
}

impl StructuringRequest {
    pub fn new(raw_text: impl Into<String>) -> Self {
        Self {
            system_instruction: STRUCTURING_PROMPT.to_string(),
            raw_text: raw_text.into(),
            title_hint: None,
            channel_hint: None,
            candidates: Vec::new(),
        }
    }

    pub fn with_title(mut self, title: Option<String>) -> Self {
        self.title_hint = title;
        self
    }

    pub fn with_channel(mut self, channel: Option<String>) -> Self {
        self.channel_hint = channel;
        self
    }

    pub fn with_candidates(mut self, candidates: Vec<CandidateIngredient>) -> Self {
        self.candidates = candidates;
        self
    }

    /// User message: metadata, candidate hints, then the source text capped
    /// at `max_text_chars`
    pub fn user_content(&self, max_text_chars: usize) -> String {
        let mut content = String::new();
        if let Some(title) = &self.title_hint {
            let _ = writeln!(content, "Title: {title}");
        }
        if let Some(channel) = &self.channel_hint {
            let _ = writeln!(content, "Channel: {channel}");
        }

        if !self.candidates.is_empty() {
            content.push_str("\nPre-extracted ingredients (hints, may be incomplete):\n");
            for candidate in &self.candidates {
                let amount = [candidate.quantity.as_deref(), candidate.unit.as_deref()]
                    .into_iter()
                    .flatten()
                    .collect::<Vec<_>>()
                    .join(" ");
                let _ = write!(content, "- ");
                if !amount.is_empty() {
                    let _ = write!(content, "{amount} ");
                }
                let _ = write!(content, "{}", candidate.raw_name);
                if let Some(section) = &candidate.section {
                    let _ = write!(content, " [{section}]");
                }
                content.push('\n');
            }
        }

        let text: String = self.raw_text.chars().take(max_text_chars).collect();
        let _ = write!(content, "\nSource text:\n{text}");
        content
    }
}

/// Recover a JSON object from a reply that may carry prose or code fences
pub fn parse_response(reply: &str) -> Result<Value, StructuringError> {
    let parsed = serde_json::from_str::<Value>(reply.trim()).ok().or_else(|| {
        first_balanced_object(reply).and_then(|slice| serde_json::from_str(slice).ok())
    });

    match parsed {
        Some(value @ Value::Object(_)) => Ok(value),
        Some(_) => Err(StructuringError::parse_failure(
            "Structuring engine reply is not a JSON object",
        )),
        None => {
            let snippet: String = reply.chars().take(200).collect();
            Err(StructuringError::parse_failure(format!(
                "No JSON object in structuring engine reply: {snippet}"
            )))
        }
    }
}

/// First `{...}` substring whose braces balance, ignoring braces in strings
fn first_balanced_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Sends structuring requests and sanitizes every reply
#[derive(Clone)]
pub struct StructuringClient {
    provider: Arc<dyn LlmProvider>,
    max_prompt_chars: usize,
}

impl StructuringClient {
    pub fn new(provider: Arc<dyn LlmProvider>, max_prompt_chars: usize) -> Self {
        Self {
            provider,
            max_prompt_chars,
        }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.provider_name()
    }

    pub async fn structure(
        &self,
        request: &StructuringRequest,
    ) -> Result<StructuredRecipe, StructuringError> {
        info!(
            "Requesting structured recipe from {} with {} candidate(s)",
            self.provider.provider_name(),
            request.candidates.len()
        );
        let reply = self
            .provider
            .complete(
                &request.system_instruction,
                &request.user_content(self.max_prompt_chars),
            )
            .await?;
        debug!("Structuring engine reply: {reply}");

        let value = parse_response(&reply)?;
        Ok(sanitize(&value, request.title_hint.as_deref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StructuringErrorKind;
    use crate::model::{Difficulty, IngredientOrigin};
    use crate::providers::OpenAIProvider;
    use mockito::Server;

    #[test]
    fn test_parse_plain_json() {
        let value = parse_response(r#"{"title": "Soup"}"#).unwrap();
        assert_eq!(value["title"], "Soup");
    }

    #[test]
    fn test_parse_recovers_first_balanced_object() {
        let reply = "Sure! Here you go:\n```json\n{\"title\": \"Stew {hearty}\", \"tags\": [\"a\"]}\n```\nEnjoy {not json}";
        let value = parse_response(reply).unwrap();
        assert_eq!(value["title"], "Stew {hearty}");
    }

    #[test]
    fn test_parse_failure() {
        let err = parse_response("I cannot help with that.").unwrap_err();
        assert_eq!(err.kind, StructuringErrorKind::ParseFailure);

        let err = parse_response("[1, 2]").unwrap_err();
        assert_eq!(err.kind, StructuringErrorKind::ParseFailure);

        let err = parse_response("{\"title\": ").unwrap_err();
        assert_eq!(err.kind, StructuringErrorKind::ParseFailure);
    }

    #[test]
    fn test_user_content_includes_hints_and_caps_text() {
        let request = StructuringRequest::new("a".repeat(50))
            .with_title(Some("Pancakes".to_string()))
            .with_channel(Some("Brunch Club".to_string()))
            .with_candidates(vec![
                CandidateIngredient::new("flour", IngredientOrigin::Description)
                    .with_quantity("2")
                    .with_unit("cup")
                    .with_section("Batter"),
                CandidateIngredient::new("salt", IngredientOrigin::Description),
            ]);

        let content = request.user_content(10);
        assert!(content.starts_with("Title: Pancakes\nChannel: Brunch Club\n"));
        assert!(content.contains("- 2 cup flour [Batter]\n- salt\n"));
        assert!(content.ends_with(&format!("Source text:\n{}", "a".repeat(10))));
    }

    #[tokio::test]
    async fn test_structure_sanitizes_reply() {
        let mut server = Server::new_async().await;
        let reply = serde_json::json!({
            "choices": [{"message": {"content":
                "```json\n{\"title\": \"\", \"difficulty\": \"Impossible\", \"ingredients\": [{\"name\": \"flour\", \"quantity\": \"2\", \"unit\": \"cups\"}], \"steps\": [\"Mix\"]}\n```"
            }}]
        });
        let _mock = server
            .mock("POST", "/v1/chat/completions")
            .with_status(200)
            .with_body(reply.to_string())
            .create_async()
            .await;

        let provider = OpenAIProvider::with_base_url("key".into(), server.url(), "m".into());
        let client = StructuringClient::new(Arc::new(provider), 12_000);
        let request = StructuringRequest::new("2 cups flour, mix").with_title(Some("Bread".into()));
        let recipe = client.structure(&request).await.unwrap();

        assert_eq!(recipe.title, "Bread");
        assert_eq!(recipe.difficulty, Difficulty::Medium);
        assert_eq!(recipe.ingredients[0].unit.as_deref(), Some("cup"));
        assert_eq!(recipe.steps[0].instruction, "Mix");
    }
}
