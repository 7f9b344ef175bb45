use crate::config::ProviderConfig;
use crate::error::{IngestError, StructuringError};
use crate::providers::{http_client, read_json, LlmProvider};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;

pub struct OpenAIProvider {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl OpenAIProvider {
    /// Create a new OpenAI provider from configuration
    pub fn new(config: &ProviderConfig, timeout: Duration) -> Result<Self, IngestError> {
        // Try config first, then fall back to environment variable
        let api_key = config
            .api_key
            .clone()
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .ok_or_else(|| {
                IngestError::BuilderError(
                    "OPENAI_API_KEY not found in config or environment".to_string(),
                )
            })?;

        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| "https://api.openai.com".to_string());

        Ok(OpenAIProvider {
            client: http_client(timeout),
            api_key,
            base_url,
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }

    #[doc(hidden)]
    pub fn with_base_url(api_key: String, base_url: String, model: String) -> Self {
        OpenAIProvider {
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
impl LlmProvider for OpenAIProvider {
    fn provider_name(&self) -> &str {
        "openai"
    }

    async fn complete(
        &self,
        system_prompt: &str,
        user_content: &str,
    ) -> Result<String, StructuringError> {
        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&json!({
                "model": self.model,
                "messages": [
                    {"role": "system", "content": system_prompt},
                    {"role": "user", "content": user_content}
                ],
                "temperature": self.temperature,
                "max_tokens": self.max_tokens,
                "response_format": {"type": "json_object"}
            }))
            .send()
            .await?;

        let response_body = read_json(response, "openai").await?;
        let content = response_body["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| {
                StructuringError::parse_failure("Failed to extract content from response")
            })?
            .to_string();

        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StructuringErrorKind;
    use mockito::Server;

    fn provider(url: String) -> OpenAIProvider {
        OpenAIProvider::with_base_url("fake_api_key".to_string(), url, "gpt-4.1-mini".to_string())
    }

    #[tokio::test]
    async fn test_complete() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/chat/completions")
            .match_header("authorization", "Bearer fake_api_key")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{
                    "choices": [{
                        "message": {
                            "content": "{\"title\": \"Pasta\"}"
                        }
                    }]
                }"#,
            )
            .create_async()
            .await;

        let result = provider(server.url())
            .complete("system", "2 cups pasta")
            .await
            .unwrap();
        assert_eq!(result, r#"{"title": "Pasta"}"#);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_status_mapping() {
        let cases = [
            (401, StructuringErrorKind::AuthInvalid),
            (429, StructuringErrorKind::RateLimited),
            (503, StructuringErrorKind::ServerError),
        ];
        for (status, kind) in cases {
            let mut server = Server::new_async().await;
            let _mock = server
                .mock("POST", "/v1/chat/completions")
                .with_status(status)
                .with_body(r#"{"error": "nope"}"#)
                .create_async()
                .await;

            let err = provider(server.url())
                .complete("system", "text")
                .await
                .unwrap_err();
            assert_eq!(err.kind, kind, "status {status}");
        }
    }

    #[tokio::test]
    async fn test_missing_content_is_parse_failure() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/chat/completions")
            .with_status(200)
            .with_body(r#"{"choices": []}"#)
            .create_async()
            .await;

        let err = provider(server.url())
            .complete("system", "text")
            .await
            .unwrap_err();
        assert_eq!(err.kind, StructuringErrorKind::ParseFailure);
    }

    #[test]
    fn test_provider_name() {
        let provider = provider("http://localhost".to_string());
        assert_eq!(provider.provider_name(), "openai");
    }
}
