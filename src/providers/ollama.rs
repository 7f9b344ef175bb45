use crate::config::ProviderConfig;
use crate::error::{StructuringError, StructuringErrorKind};
use crate::providers::{http_client, read_json, LlmProvider};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;

/// Local models served by Ollama; no API key needed
pub struct OllamaProvider {
    client: Client,
    base_url: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl OllamaProvider {
    pub fn new(config: &ProviderConfig, timeout: Duration) -> Self {
        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| "http://localhost:11434".to_string());

        OllamaProvider {
            client: http_client(timeout),
            base_url,
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }

    #[doc(hidden)]
    pub fn with_base_url(base_url: String, model: String) -> Self {
        OllamaProvider {
            client: Client::new(),
            base_url,
            model,
            temperature: 0.2,
            max_tokens: 4000,
        }
    }
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    fn provider_name(&self) -> &str {
        "ollama"
    }

    async fn complete(
        &self,
        system_prompt: &str,
        user_content: &str,
    ) -> Result<String, StructuringError> {
        // Ollama exposes an OpenAI-compatible endpoint
        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .json(&json!({
                "model": self.model,
                "messages": [
                    {"role": "system", "content": system_prompt},
                    {"role": "user", "content": user_content}
                ],
                "temperature": self.temperature,
                "max_tokens": self.max_tokens
            }))
            .send()
            .await?;

        let response_body = read_json(response, "ollama").await?;
        if let Some(error) = response_body.get("error") {
            return Err(StructuringError::new(
                StructuringErrorKind::ServerError,
                format!("Ollama error: {error}"),
            ));
        }

        response_body["choices"][0]["message"]["content"]
            .as_str()
            .map(String::from)
            .ok_or_else(|| StructuringError::parse_failure("Empty response from Ollama"))
    }
}
