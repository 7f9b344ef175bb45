use std::sync::Arc;

use crate::config::{IngestConfig, ProviderConfig};
use crate::error::IngestError;
use crate::extract::IngredientExtractor;
use crate::normalize::{NameNormalizer, NormalizationCache};
use crate::pipeline::Pipeline;
use crate::providers::{LlmProvider, ProviderFactory};
use crate::resolver::{IngredientCatalog, IngredientResolver};
use crate::sources::SourceRegistry;
use crate::store::{ConversionLog, MemoryStore, RecipeStore};
use crate::structuring::StructuringClient;

/// Builder for assembling a [`Pipeline`] from configuration and collaborators
#[derive(Default)]
pub struct PipelineBuilder {
    config: Option<IngestConfig>,
    provider: Option<Arc<dyn LlmProvider>>,
    provider_name: Option<String>,
    api_key: Option<String>,
    model: Option<String>,
    sources: Option<SourceRegistry>,
    cache: Option<Arc<NormalizationCache>>,
    catalog: Option<Arc<dyn IngredientCatalog>>,
    recipes: Option<Arc<dyn RecipeStore>>,
    conversions: Option<Arc<dyn ConversionLog>>,
}

impl PipelineBuilder {
    /// Use this configuration instead of loading `config.toml` and the
    /// environment
    pub fn config(mut self, config: IngestConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Use an already constructed structuring provider
    ///
    /// # Example
    /// ```no_run
    /// use recipe_ingest::{OpenAIProvider, Pipeline};
    /// use std::sync::Arc;
    ///
    /// let provider = OpenAIProvider::with_base_url(
    ///     "sk-test".to_string(),
    ///     "http://localhost:8080".to_string(),
    ///     "gpt-4.1-mini".to_string(),
    /// );
    /// let builder = Pipeline::builder().provider(Arc::new(provider));
    /// ```
    pub fn provider(mut self, provider: Arc<dyn LlmProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Pick a configured provider by name ("openai", "anthropic", "ollama")
    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.provider_name = Some(name.into());
        self
    }

    /// Set the API key for the named provider
    ///
    /// This allows passing the API key directly instead of relying on
    /// environment variables or config files.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Set the model for the named provider
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Replace the HTTP source adapters
    pub fn sources(mut self, sources: SourceRegistry) -> Self {
        self.sources = Some(sources);
        self
    }

    /// Share a normalization cache between pipelines
    pub fn normalization_cache(mut self, cache: Arc<NormalizationCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn catalog(mut self, catalog: Arc<dyn IngredientCatalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    pub fn recipe_store(mut self, recipes: Arc<dyn RecipeStore>) -> Self {
        self.recipes = Some(recipes);
        self
    }

    pub fn conversion_log(mut self, conversions: Arc<dyn ConversionLog>) -> Self {
        self.conversions = Some(conversions);
        self
    }

    /// Use one in-memory store as catalog, recipe store and conversion log
    pub fn store(self, store: Arc<MemoryStore>) -> Self {
        self.catalog(store.clone())
            .recipe_store(store.clone())
            .conversion_log(store)
    }

    /// Assemble the pipeline
    ///
    /// # Errors
    /// Returns `IngestError` if:
    /// - A store collaborator is missing
    /// - Configuration cannot be loaded
    /// - The structuring provider is unknown, disabled or has no API key
    pub fn build(self) -> Result<Pipeline, IngestError> {
        let catalog = self.catalog.clone().ok_or_else(|| missing("ingredient catalog"))?;
        let recipes = self.recipes.clone().ok_or_else(|| missing("recipe store"))?;
        let conversions = self
            .conversions
            .clone()
            .ok_or_else(|| missing("conversion log"))?;

        let config = match self.config.clone() {
            Some(config) => config,
            None => IngestConfig::load()?,
        };

        let provider = self.resolve_provider(&config)?;
        let cache = self
            .cache
            .clone()
            .unwrap_or_else(|| Arc::new(NormalizationCache::from_config(&config.cache)));
        let normalizer = NameNormalizer::new(cache);
        let sources = self
            .sources
            .unwrap_or_else(|| SourceRegistry::from_config(&config));

        Ok(Pipeline {
            settings: config.pipeline.clone(),
            sources,
            extractor: IngredientExtractor::new(normalizer.clone()),
            structuring: StructuringClient::new(provider, config.pipeline.max_prompt_chars),
            resolver: IngredientResolver::new(normalizer.clone())
                .with_similarity_fallback(config.pipeline.enable_similarity_fallback),
            normalizer,
            catalog,
            recipes,
            conversions,
        })
    }

    fn resolve_provider(&self, config: &IngestConfig) -> Result<Arc<dyn LlmProvider>, IngestError> {
        if let Some(provider) = &self.provider {
            return Ok(provider.clone());
        }
        if self.provider_name.is_none() && self.api_key.is_none() && self.model.is_none() {
            return ProviderFactory::get_default_provider(config);
        }

        let name = self
            .provider_name
            .clone()
            .unwrap_or_else(|| config.default_provider.clone());
        let provider_config = match (config.providers.get(&name), &self.model) {
            (Some(existing), _) => existing.clone(),
            (None, Some(model)) => ProviderConfig {
                enabled: true,
                model: model.clone(),
                temperature: 0.2,
                max_tokens: 4000,
                api_key: None,
                base_url: None,
            },
            (None, None) => {
                return Err(IngestError::BuilderError(format!(
                    "Provider '{name}' not found in configuration. Use .model() to configure it"
                )))
            }
        };
        let provider_config = ProviderConfig {
            model: self.model.clone().unwrap_or(provider_config.model),
            api_key: self.api_key.clone().or(provider_config.api_key),
            ..provider_config
        };

        ProviderFactory::create(&name, &provider_config, config.structuring_timeout())
    }
}

fn missing(collaborator: &str) -> IngestError {
    IngestError::BuilderError(format!(
        "No {collaborator} configured. Use .store() or set it explicitly"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_requires_stores() {
        let result = PipelineBuilder::default()
            .config(IngestConfig::default())
            .build();
        assert!(matches!(result, Err(IngestError::BuilderError(_))));
    }

    #[test]
    fn test_unknown_provider_name_is_rejected() {
        let result = PipelineBuilder::default()
            .config(IngestConfig::default())
            .store(Arc::new(MemoryStore::new()))
            .provider_name("gemini")
            .model("gemini-pro")
            .build();
        match result {
            Err(IngestError::BuilderError(msg)) => assert!(msg.contains("Unknown provider")),
            _ => panic!("expected builder error"),
        }
    }

    #[test]
    fn test_named_provider_with_inline_key_and_model() {
        let result = PipelineBuilder::default()
            .config(IngestConfig::default())
            .store(Arc::new(MemoryStore::new()))
            .provider_name("anthropic")
            .api_key("sk-ant-test")
            .model("claude-sonnet-4-5")
            .build();
        let pipeline = result.unwrap();
        assert_eq!(pipeline.structuring.provider_name(), "anthropic");
    }

    #[test]
    fn test_missing_default_provider_config_is_rejected() {
        let result = PipelineBuilder::default()
            .config(IngestConfig::default())
            .store(Arc::new(MemoryStore::new()))
            .build();
        assert!(matches!(result, Err(IngestError::BuilderError(_))));
    }
}
