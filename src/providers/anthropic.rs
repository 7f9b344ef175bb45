use crate::config::ProviderConfig;
use crate::error::{IngestError, StructuringError};
use crate::providers::{http_client, read_json, LlmProvider};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com";

pub struct AnthropicProvider {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl AnthropicProvider {
    /// Create a new Anthropic provider from configuration
    pub fn new(config: &ProviderConfig, timeout: Duration) -> Result<Self, IngestError> {
        // Try config first, then fall back to environment variable
        let api_key = config
            .api_key
            .clone()
            .or_else(|| std::env::var("ANTHROPIC_API_KEY").ok())
            .ok_or_else(|| {
                IngestError::BuilderError(
                    "ANTHROPIC_API_KEY not found in config or environment".to_string(),
                )
            })?;

        Ok(AnthropicProvider {
            client: http_client(timeout),
            api_key,
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| ANTHROPIC_API_URL.to_string()),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }

    #[doc(hidden)]
    pub fn with_base_url(api_key: String, base_url: String, model: String) -> Self {
        AnthropicProvider {
            client: Client::new(),
            api_key,
            base_url,
            model,
            temperature: 0.2,
            max_tokens: 4000,
        }
    }
}

#[async_trait]
impl LlmProvider for AnthropicProvider {
    fn provider_name(&self) -> &str {
        "anthropic"
    }

    async fn complete(
        &self,
        system_prompt: &str,
        user_content: &str,
    ) -> Result<String, StructuringError> {
        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .json(&json!({
                "model": self.model,
                "max_tokens": self.max_tokens,
                "temperature": self.temperature,
                "system": system_prompt,
                "messages": [
                    {
                        "role": "user",
                        "content": user_content
                    }
                ]
            }))
            .send()
            .await?;

        let response_body = read_json(response, "anthropic").await?;
        let text = response_body["content"][0]["text"]
            .as_str()
            .ok_or_else(|| {
                StructuringError::parse_failure("Failed to extract content from Anthropic response")
            })?
            .to_string();

        Ok(text)
    }
}
