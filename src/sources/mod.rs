//! Source adapters: fetch raw text and metadata for one platform each.

pub mod comments;
mod http;
mod tiktok;
mod transcript;
mod webpage;
mod youtube;

pub use comments::{score_comment, select_top_comments, CommentMiner, CommentSource};
pub(crate) use http::build_client;
pub use http::HttpFetcher;
pub use tiktok::TikTokAdapter;
pub use transcript::{clean_transcript, TranscriptAdapter, MIN_TRANSCRIPT_CHARS};
pub use webpage::{find_external_link, parse_page, WebpageAdapter};
pub use youtube::YouTubeAdapter;

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use crate::config::IngestConfig;
use crate::error::SourceFetchError;
use crate::model::{Platform, SourceContent};

/// Fetches raw text for one platform
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    fn platform(&self) -> Platform;

    /// Platform id embedded in the URL. Video adapters must return `None`
    /// for URLs they cannot handle so the caller can reject them up front.
    fn extract_id(&self, _url: &str) -> Option<String> {
        None
    }

    async fn fetch(&self, url: &str) -> Result<SourceContent, SourceFetchError>;
}

/// Adapter lookup by platform, plus the optional comment collaborator
#[derive(Clone, Default)]
pub struct SourceRegistry {
    adapters: HashMap<Platform, Arc<dyn SourceAdapter>>,
    comments: Option<Arc<dyn CommentSource>>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the HTTP adapters for every platform
    pub fn from_config(config: &IngestConfig) -> Self {
        let fetcher = HttpFetcher::new(Some(config.fetch_timeout()));
        let youtube = Arc::new(YouTubeAdapter::from_config(config, fetcher.clone()));

        let mut registry = Self::new()
            .with_adapter(youtube.clone())
            .with_adapter(Arc::new(TikTokAdapter::new(
                fetcher.clone(),
                config.tiktok.oembed_url.clone(),
            )))
            .with_adapter(Arc::new(WebpageAdapter::new(
                fetcher.clone(),
                config.pipeline.max_page_chars,
            )))
            .with_adapter(Arc::new(TranscriptAdapter::new(fetcher)));

        if youtube.has_api_key() {
            registry = registry.with_comments(youtube);
        }
        registry
    }

    /// Register an adapter, replacing any previous one for its platform
    pub fn with_adapter(mut self, adapter: Arc<dyn SourceAdapter>) -> Self {
        self.adapters.insert(adapter.platform(), adapter);
        self
    }

    pub fn with_comments(mut self, source: Arc<dyn CommentSource>) -> Self {
        self.comments = Some(source);
        self
    }

    pub fn get(&self, platform: Platform) -> Option<Arc<dyn SourceAdapter>> {
        self.adapters.get(&platform).cloned()
    }

    pub fn comments(&self) -> Option<Arc<dyn CommentSource>> {
        self.comments.clone()
    }
}
