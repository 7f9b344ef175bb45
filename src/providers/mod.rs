mod anthropic;
mod factory;
mod ollama;
mod open_ai;

pub use anthropic::AnthropicProvider;
pub use factory::ProviderFactory;
pub use ollama::OllamaProvider;
pub use open_ai::OpenAIProvider;

use async_trait::async_trait;
use log::debug;
use reqwest::{Client, Response};
use serde_json::Value;
use std::time::Duration;

use crate::error::StructuringError;
use crate::sources::build_client;

/// Unified trait for all structuring engine backends
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Get the provider name (e.g., "openai", "anthropic")
    fn provider_name(&self) -> &str;

    /// Send one system instruction plus user content and return the raw reply text
    async fn complete(
        &self,
        system_prompt: &str,
        user_content: &str,
    ) -> Result<String, StructuringError>;
}

fn http_client(timeout: Duration) -> Client {
    build_client(Client::builder().timeout(timeout), "structuring")
}

/// Check the status, then decode the JSON body
async fn read_json(response: Response, provider: &str) -> Result<Value, StructuringError> {
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(StructuringError::from_status(status, &body));
    }
    debug!("{provider} response: {body}");
    serde_json::from_str(&body).map_err(|e| {
        StructuringError::parse_failure(format!("{provider} returned invalid JSON: {e}"))
    })
}
