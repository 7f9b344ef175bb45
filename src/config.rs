use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

/// Main pipeline configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct IngestConfig {
    /// Structuring provider to use when not specified
    #[serde(default = "default_provider")]
    pub default_provider: String,
    /// Map of provider name to provider configuration
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
    /// Structuring engine request timeout in seconds
    #[serde(default = "default_structuring_timeout")]
    pub structuring_timeout: u64,
    /// Source fetch timeout in seconds
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout: u64,
    #[serde(default)]
    pub youtube: YouTubeConfig,
    #[serde(default)]
    pub tiktok: TikTokConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub cache: CacheConfig,
}

/// Configuration for a specific structuring provider
#[derive(Debug, Deserialize, Clone)]
pub struct ProviderConfig {
    /// Whether this provider is enabled
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Model identifier (e.g., "gpt-4.1-mini", "claude-sonnet-4-5")
    pub model: String,
    /// Temperature for generation (0.0-1.0)
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Maximum tokens to generate
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// API key for authentication (can also be set via environment variable)
    pub api_key: Option<String>,
    /// Base URL for API endpoint (for custom or proxy endpoints)
    pub base_url: Option<String>,
}

/// YouTube Data API and oEmbed endpoints
#[derive(Debug, Deserialize, Clone)]
pub struct YouTubeConfig {
    /// Data API key; without it only oEmbed metadata is available
    pub api_key: Option<String>,
    #[serde(default = "default_youtube_api_base")]
    pub api_base_url: String,
    #[serde(default = "default_youtube_oembed")]
    pub oembed_url: String,
}

impl Default for YouTubeConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base_url: default_youtube_api_base(),
            oembed_url: default_youtube_oembed(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct TikTokConfig {
    #[serde(default = "default_tiktok_oembed")]
    pub oembed_url: String,
}

impl Default for TikTokConfig {
    fn default() -> Self {
        Self {
            oembed_url: default_tiktok_oembed(),
        }
    }
}

/// Tuning knobs for a pipeline run
#[derive(Debug, Deserialize, Clone)]
pub struct PipelineConfig {
    /// Fewer candidates than this triggers comment mining / website augmentation
    #[serde(default = "default_augmentation_threshold")]
    pub augmentation_threshold: usize,
    /// Comments requested from the comment collaborator
    #[serde(default = "default_max_comments")]
    pub max_comments: u32,
    /// Highest-scoring comments that are actually parsed
    #[serde(default = "default_top_comments")]
    pub top_comments: usize,
    /// Character budget for full-page text extraction
    #[serde(default = "default_max_page_chars")]
    pub max_page_chars: usize,
    /// Character budget for raw text sent to the structuring engine
    #[serde(default = "default_max_prompt_chars")]
    pub max_prompt_chars: usize,
    /// Enables the fourth (similarity) matching strategy
    #[serde(default)]
    pub enable_similarity_fallback: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            augmentation_threshold: default_augmentation_threshold(),
            max_comments: default_max_comments(),
            top_comments: default_top_comments(),
            max_page_chars: default_max_page_chars(),
            max_prompt_chars: default_max_prompt_chars(),
            enable_similarity_fallback: false,
        }
    }
}

/// Bounds for the name-normalization cache
#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    #[serde(default = "default_cache_capacity")]
    pub capacity: usize,
    #[serde(default = "default_cache_ttl_secs")]
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: default_cache_capacity(),
            ttl_secs: default_cache_ttl_secs(),
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            default_provider: default_provider(),
            providers: HashMap::new(),
            structuring_timeout: default_structuring_timeout(),
            fetch_timeout: default_fetch_timeout(),
            youtube: YouTubeConfig::default(),
            tiktok: TikTokConfig::default(),
            pipeline: PipelineConfig::default(),
            cache: CacheConfig::default(),
        }
    }
}

// Default value functions
fn default_provider() -> String {
    "openai".to_string()
}

fn default_enabled() -> bool {
    true
}

fn default_temperature() -> f32 {
    0.2
}

fn default_max_tokens() -> u32 {
    4000
}

fn default_structuring_timeout() -> u64 {
    30
}

fn default_fetch_timeout() -> u64 {
    15
}

fn default_youtube_api_base() -> String {
    "https://www.googleapis.com".to_string()
}

fn default_youtube_oembed() -> String {
    "https://www.youtube.com/oembed".to_string()
}

fn default_tiktok_oembed() -> String {
    "https://www.tiktok.com/oembed".to_string()
}

fn default_augmentation_threshold() -> usize {
    3
}

fn default_max_comments() -> u32 {
    50
}

fn default_top_comments() -> usize {
    5
}

fn default_max_page_chars() -> usize {
    15_000
}

fn default_max_prompt_chars() -> usize {
    12_000
}

fn default_cache_capacity() -> usize {
    10_000
}

fn default_cache_ttl_secs() -> u64 {
    3600
}

impl IngestConfig {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded with the following priority (highest to lowest):
    /// 1. Environment variables with RECIPE_INGEST__ prefix
    /// 2. config.toml file in current directory
    /// 3. Default values
    ///
    /// Environment variable format: RECIPE_INGEST__PROVIDERS__OPENAI__API_KEY
    pub fn load() -> Result<Self, ConfigError> {
        load_config()
    }

    pub fn structuring_timeout(&self) -> Duration {
        Duration::from_secs(self.structuring_timeout)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout)
    }

    /// YouTube API key from config, falling back to YOUTUBE_API_KEY
    pub fn youtube_api_key(&self) -> Option<String> {
        self.youtube
            .api_key
            .clone()
            .or_else(|| std::env::var("YOUTUBE_API_KEY").ok())
            .filter(|k| !k.trim().is_empty())
    }
}

/// Load configuration from file and environment variables
pub fn load_config() -> Result<IngestConfig, ConfigError> {
    let settings = Config::builder()
        // Optional config file (can be missing)
        .add_source(File::with_name("config").required(false))
        // Use double underscore for nested: RECIPE_INGEST__PIPELINE__TOP_COMMENTS
        .add_source(
            Environment::with_prefix("RECIPE_INGEST")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    settings.try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;

    #[test]
    fn test_default_values() {
        assert_eq!(default_provider(), "openai");
        assert_eq!(default_structuring_timeout(), 30);
        assert_eq!(default_augmentation_threshold(), 3);
        assert_eq!(default_top_comments(), 5);
        assert_eq!(default_cache_capacity(), 10_000);
    }

    #[test]
    fn test_pipeline_config_default() {
        let pipeline = PipelineConfig::default();
        assert!(!pipeline.enable_similarity_fallback);
        assert_eq!(pipeline.max_comments, 50);
        assert_eq!(pipeline.max_page_chars, 15_000);
    }

    #[test]
    fn test_deserialize_partial_toml() {
        let toml = r#"
            default_provider = "anthropic"

            [providers.anthropic]
            model = "claude-sonnet-4-5"
            api_key = "test-key"

            [pipeline]
            top_comments = 3
        "#;

        let config: IngestConfig = Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.default_provider, "anthropic");
        let provider = config.providers.get("anthropic").unwrap();
        assert!(provider.enabled);
        assert_eq!(provider.max_tokens, 4000);
        assert_eq!(config.pipeline.top_comments, 3);
        assert_eq!(config.pipeline.augmentation_threshold, 3);
        assert_eq!(config.fetch_timeout, 15);
        assert_eq!(config.youtube.oembed_url, "https://www.youtube.com/oembed");
    }

    #[test]
    fn test_timeouts_as_durations() {
        let config = IngestConfig::default();
        assert_eq!(config.structuring_timeout(), Duration::from_secs(30));
        assert_eq!(config.fetch_timeout(), Duration::from_secs(15));
        assert_eq!(config.cache.ttl(), Duration::from_secs(3600));
    }
}
