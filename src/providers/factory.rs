use crate::config::{IngestConfig, ProviderConfig};
use crate::error::IngestError;
use crate::providers::{AnthropicProvider, LlmProvider, OllamaProvider, OpenAIProvider};
use std::sync::Arc;
use std::time::Duration;

pub struct ProviderFactory;

impl ProviderFactory {
    /// Create a provider instance from configuration
    pub fn create(
        provider_name: &str,
        config: &ProviderConfig,
        timeout: Duration,
    ) -> Result<Arc<dyn LlmProvider>, IngestError> {
        // Validate that provider is enabled
        if !config.enabled {
            return Err(IngestError::BuilderError(format!(
                "Provider '{}' is not enabled in configuration",
                provider_name
            )));
        }

        match provider_name {
            "openai" => Ok(Arc::new(OpenAIProvider::new(config, timeout)?)),
            "anthropic" => Ok(Arc::new(AnthropicProvider::new(config, timeout)?)),
            "ollama" => Ok(Arc::new(OllamaProvider::new(config, timeout))),
            _ => Err(IngestError::BuilderError(format!(
                "Unknown provider: {}",
                provider_name
            ))),
        }
    }

    /// Get the default provider from configuration
    pub fn get_default_provider(config: &IngestConfig) -> Result<Arc<dyn LlmProvider>, IngestError> {
        let provider_name = &config.default_provider;
        let provider_config = config.providers.get(provider_name).ok_or_else(|| {
            IngestError::BuilderError(format!(
                "Default provider '{}' not found in configuration",
                provider_name
            ))
        })?;

        Self::create(provider_name, provider_config, config.structuring_timeout())
    }

    /// List all available provider names
    pub fn available_providers() -> Vec<&'static str> {
        vec!["openai", "anthropic", "ollama"]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const TIMEOUT: Duration = Duration::from_secs(30);

    fn create_test_provider_config() -> ProviderConfig {
        ProviderConfig {
            enabled: true,
            model: "test-model".to_string(),
            temperature: 0.2,
            max_tokens: 4000,
            api_key: Some("test-key".to_string()),
            base_url: None,
        }
    }

    #[test]
    fn test_create_each_provider() {
        let config = create_test_provider_config();
        for name in ProviderFactory::available_providers() {
            let provider = ProviderFactory::create(name, &config, TIMEOUT).unwrap();
            assert_eq!(provider.provider_name(), name);
        }
    }

    #[test]
    fn test_create_unknown_provider() {
        let config = create_test_provider_config();
        let result = ProviderFactory::create("unknown", &config, TIMEOUT);
        assert!(result.is_err());
        if let Err(e) = result {
            assert!(e.to_string().contains("Unknown provider"));
        }
    }

    #[test]
    fn test_create_disabled_provider() {
        let mut config = create_test_provider_config();
        config.enabled = false;

        let result = ProviderFactory::create("openai", &config, TIMEOUT);
        assert!(result.is_err());
        if let Err(e) = result {
            assert!(e.to_string().contains("not enabled in configuration"));
        }
    }

    #[test]
    fn test_get_default_provider() {
        let mut providers = HashMap::new();
        providers.insert("anthropic".to_string(), create_test_provider_config());

        let config = IngestConfig {
            default_provider: "anthropic".to_string(),
            providers,
            ..IngestConfig::default()
        };

        let provider = ProviderFactory::get_default_provider(&config).unwrap();
        assert_eq!(provider.provider_name(), "anthropic");
    }

    #[test]
    fn test_get_default_provider_not_found() {
        let config = IngestConfig {
            default_provider: "openai".to_string(),
            providers: HashMap::new(),
            ..IngestConfig::default()
        };

        let result = ProviderFactory::get_default_provider(&config);
        assert!(result.is_err());
        if let Err(e) = result {
            assert!(e.to_string().contains("not found"));
        }
    }
}
