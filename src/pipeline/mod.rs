//! End-to-end ingestion run.
//!
//! One run is a single sequential flow:
//! 1. Validate the request (nothing is written for rejected input)
//! 2. Return the saved recipe if this source URL was already ingested
//! 3. Fetch raw text and metadata with the platform's adapter
//! 4. Extract candidate ingredients with the platform's rule chain
//! 5. Augment from comments or a linked website when too few were found
//! 6. Ask the structuring engine for a sanitized recipe
//! 7. Resolve every ingredient against the catalog
//! 8. Save the recipe and its ingredient links in one transaction
//!
//! Every stage boundary is recorded on the run's [`ConversionRecord`].

mod response;

pub use response::{IngestFailureBody, IngestResponse, IngestSuccess};

use log::{debug, error, info, warn};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Instant;
use url::Url;

use crate::builder::PipelineBuilder;
use crate::config::PipelineConfig;
use crate::error::{IngestError, SourceFetchError, ValidationError};
use crate::extract::{IngredientExtractor, RuleChain};
use crate::merge::merge;
use crate::model::{
    CandidateIngredient, IngredientOrigin, MatchResult, Platform, RawSource, SourceContent,
    StructuredRecipe,
};
use crate::normalize::NameNormalizer;
use crate::resolver::{IngredientCatalog, IngredientResolver};
use crate::sources::{find_external_link, CommentMiner, SourceRegistry, TranscriptAdapter};
use crate::store::{
    ConversionLog, ConversionRecord, ConversionStatus, ConversionUpdate, IngredientLink,
    LinkTarget, RecipeStore,
};
use crate::structuring::{StructuringClient, StructuringRequest};

/// Inbound request: a source URL or pasted transcript text
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestRequest {
    pub source_url: Option<String>,
    pub transcript: Option<String>,
    /// Title for transcript input; overrides the fetched title for URLs
    pub title: Option<String>,
    pub user_id: Option<String>,
}

impl IngestRequest {
    pub fn from_url(url: impl Into<String>) -> Self {
        Self {
            source_url: Some(url.into()),
            ..Default::default()
        }
    }

    pub fn from_transcript(text: impl Into<String>) -> Self {
        Self {
            transcript: Some(text.into()),
            ..Default::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }
}

/// A request that passed validation
#[derive(Debug, Clone)]
enum ValidSource {
    Url {
        url: String,
        platform: Platform,
        video_id: Option<String>,
    },
    Transcript(SourceContent),
}

impl ValidSource {
    fn platform(&self) -> Platform {
        match self {
            ValidSource::Url { platform, .. } => *platform,
            ValidSource::Transcript(_) => Platform::Transcript,
        }
    }

    fn url(&self) -> Option<&str> {
        match self {
            ValidSource::Url { url, .. } => Some(url),
            ValidSource::Transcript(_) => None,
        }
    }

    fn video_id(&self) -> Option<&str> {
        match self {
            ValidSource::Url { video_id, .. } => video_id.as_deref(),
            ValidSource::Transcript(_) => None,
        }
    }
}

/// Result of a successful run
#[derive(Debug, Clone)]
pub struct IngestOutcome {
    pub conversion_id: String,
    pub recipe_id: String,
    pub recipe: StructuredRecipe,
    pub matches: Vec<MatchResult>,
    /// The source URL had already been ingested; nothing new was written
    pub already_processed: bool,
}

/// A failed run, with the conversion id when a record had been created
#[derive(Debug)]
pub struct IngestFailure {
    pub conversion_id: Option<String>,
    pub error: IngestError,
}

impl IngestFailure {
    fn new(conversion_id: Option<&str>, error: impl Into<IngestError>) -> Self {
        Self {
            conversion_id: conversion_id.map(String::from),
            error: error.into(),
        }
    }
}

/// Candidate list plus the text that will be sent for structuring
struct Extraction {
    candidates: Vec<CandidateIngredient>,
    raw_text: String,
}

/// Orchestrates a full ingestion run over injected collaborators
#[derive(Clone)]
pub struct Pipeline {
    pub(crate) settings: PipelineConfig,
    pub(crate) sources: SourceRegistry,
    pub(crate) normalizer: NameNormalizer,
    pub(crate) extractor: IngredientExtractor,
    pub(crate) structuring: StructuringClient,
    pub(crate) resolver: IngredientResolver,
    pub(crate) catalog: Arc<dyn IngredientCatalog>,
    pub(crate) recipes: Arc<dyn RecipeStore>,
    pub(crate) conversions: Arc<dyn ConversionLog>,
}

impl Pipeline {
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    /// Run the pipeline and shape the result for the inbound API
    pub async fn ingest(&self, request: IngestRequest) -> IngestResponse {
        let started = Instant::now();
        let result = self.run(request).await;
        IngestResponse::from_result(result, started.elapsed())
    }

    /// Run the pipeline, returning the typed outcome
    pub async fn run(&self, request: IngestRequest) -> Result<IngestOutcome, IngestFailure> {
        let source = self
            .validate(&request)
            .map_err(|e| IngestFailure::new(None, e))?;

        if let Some(url) = source.url() {
            if let Some(outcome) = self.find_existing(url).await {
                return Ok(outcome);
            }
        }

        let record = ConversionRecord::new(
            source.platform(),
            source.url().map(String::from),
            request.user_id.clone(),
        );
        let conversion_id = record.id.clone();
        info!(
            "Starting conversion {conversion_id} for {} source",
            source.platform()
        );
        if let Err(e) = self.conversions.create_conversion(record).await {
            warn!("Could not create conversion record {conversion_id}: {e}");
        }

        let result = self.execute(&conversion_id, &source, &request).await;
        match &result {
            Ok(outcome) => info!(
                "Conversion {conversion_id} saved recipe {}",
                outcome.recipe_id
            ),
            Err(failure) => error!("Conversion {conversion_id} failed: {}", failure.error),
        }
        result
    }

    fn validate(&self, request: &IngestRequest) -> Result<ValidSource, ValidationError> {
        let url = request
            .source_url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty());
        let transcript = request
            .transcript
            .as_deref()
            .filter(|t| !t.trim().is_empty());

        match (url, transcript) {
            (Some(url), _) => {
                let parsed =
                    Url::parse(url).map_err(|e| ValidationError::InvalidUrl(format!("{url}: {e}")))?;
                if !matches!(parsed.scheme(), "http" | "https") {
                    return Err(ValidationError::InvalidUrl(format!(
                        "{url}: unsupported scheme '{}'",
                        parsed.scheme()
                    )));
                }

                let platform = Platform::detect(&parsed);
                let video_id = self
                    .sources
                    .get(platform)
                    .and_then(|adapter| adapter.extract_id(url));
                if platform.is_video() && video_id.is_none() {
                    return Err(ValidationError::UnrecognizedVideoUrl {
                        platform: platform.to_string(),
                        url: url.to_string(),
                    });
                }

                Ok(ValidSource::Url {
                    url: url.to_string(),
                    platform,
                    video_id,
                })
            }
            (None, Some(text)) => {
                let content = TranscriptAdapter::from_text(text, request.title.as_deref())?;
                Ok(ValidSource::Transcript(content))
            }
            (None, None) => Err(ValidationError::MissingSource),
        }
    }

    /// Best-effort lookup of an earlier saved run for the same URL
    async fn find_existing(&self, url: &str) -> Option<IngestOutcome> {
        let record = match self.conversions.find_saved_conversion(url).await {
            Ok(record) => record?,
            Err(e) => {
                warn!("Existing-recipe lookup failed for {url}: {e}");
                return None;
            }
        };
        let recipe_id = record.recipe_id.clone()?;
        let recipe = record
            .recipe_json
            .clone()
            .and_then(|json| serde_json::from_value::<StructuredRecipe>(json).ok())?;

        info!("{url} already saved as recipe {recipe_id}; skipping conversion");
        Some(IngestOutcome {
            conversion_id: record.id,
            recipe_id,
            recipe,
            matches: Vec::new(),
            already_processed: true,
        })
    }

    async fn execute(
        &self,
        conversion_id: &str,
        source: &ValidSource,
        request: &IngestRequest,
    ) -> Result<IngestOutcome, IngestFailure> {
        let fail = |e: IngestError| IngestFailure::new(Some(conversion_id), e);

        // Fetch
        let raw = match self.fetch(source).await {
            Ok(raw) => raw,
            Err(e) => {
                self.record(
                    conversion_id,
                    ConversionUpdate::new(ConversionStatus::MetadataFetchFailed)
                        .with_error(e.to_string()),
                )
                .await;
                return Err(fail(e.into()));
            }
        };
        info!(
            "Fetched {} characters from {} source",
            raw.raw_text.chars().count(),
            raw.platform
        );
        self.record(conversion_id, ConversionStatus::MetadataFetched.into())
            .await;

        // Extract, augmenting when the source text is thin
        let chain = RuleChain::for_platform(raw.platform);
        let candidates = self.extractor.extract_with(
            &raw.raw_text,
            &chain,
            IngredientOrigin::for_platform(raw.platform),
        );
        info!("Extracted {} candidate ingredient(s)", candidates.len());
        self.record(conversion_id, ConversionStatus::IngredientsExtracted.into())
            .await;

        let extraction = self
            .augment(conversion_id, source, &raw, candidates)
            .await;

        // Structure
        self.record(
            conversion_id,
            ConversionStatus::RecipeGenerationRequested.into(),
        )
        .await;
        let title = request.title.clone().or_else(|| raw.title.clone());
        let structuring_request = StructuringRequest::new(extraction.raw_text.as_str())
            .with_title(title)
            .with_channel(raw.channel.clone())
            .with_candidates(extraction.candidates.clone());

        let mut recipe = match self.structuring.structure(&structuring_request).await {
            Ok(recipe) => recipe,
            Err(e) => {
                self.record(
                    conversion_id,
                    ConversionUpdate::new(ConversionStatus::RecipeGenerationFailed)
                        .with_error(e.to_string())
                        .with_raw_text(extraction.raw_text),
                )
                .await;
                return Err(fail(e.into()));
            }
        };
        if recipe.ingredients.is_empty() && !extraction.candidates.is_empty() {
            debug!("Structured recipe has no ingredients; using extracted candidates");
            recipe.ingredients = extraction.candidates;
        }
        let recipe_json = serde_json::to_value(&recipe).ok();
        let mut generated = ConversionUpdate::new(ConversionStatus::RecipeGenerated);
        if let Some(json) = recipe_json.clone() {
            generated = generated.with_recipe_json(json);
        }
        self.record(conversion_id, generated).await;

        // Resolve
        let matches = self
            .resolver
            .resolve_all(self.catalog.as_ref(), recipe.ingredients.clone())
            .await;
        let matched = matches.iter().filter(|m| m.is_matched()).count();
        info!(
            "Matched {matched} of {} ingredient(s) to the catalog",
            matches.len()
        );
        self.record(conversion_id, ConversionStatus::IngredientsMatched.into())
            .await;

        // Persist
        let links: Vec<IngredientLink> = matches.iter().map(|m| self.link_for(m)).collect();
        let recipe_id = match self
            .recipes
            .save_recipe(&recipe, &links, source.url())
            .await
        {
            Ok(id) => id,
            Err(e) => {
                self.record(
                    conversion_id,
                    ConversionUpdate::new(ConversionStatus::RecipeSaveFailed)
                        .with_error(e.to_string()),
                )
                .await;
                return Err(fail(e.into()));
            }
        };
        let mut saved =
            ConversionUpdate::new(ConversionStatus::RecipeSaved).with_recipe_id(recipe_id.as_str());
        if let Some(json) = recipe_json {
            saved = saved.with_recipe_json(json);
        }
        self.record(conversion_id, saved).await;

        Ok(IngestOutcome {
            conversion_id: conversion_id.to_string(),
            recipe_id,
            recipe,
            matches,
            already_processed: false,
        })
    }

    async fn fetch(&self, source: &ValidSource) -> Result<RawSource, SourceFetchError> {
        match source {
            ValidSource::Transcript(content) => {
                Ok(RawSource::new(Platform::Transcript, "", content.clone()))
            }
            ValidSource::Url { url, platform, .. } => {
                let adapter = self.sources.get(*platform).ok_or_else(|| {
                    SourceFetchError::blocked(format!("No source adapter registered for {platform}"))
                })?;
                let content = adapter.fetch(url).await?;
                Ok(RawSource::new(*platform, url.as_str(), content))
            }
        }
    }

    /// Comment mining for videos, then the first linked website.
    ///
    /// Failures here are logged and never fail the run.
    async fn augment(
        &self,
        conversion_id: &str,
        source: &ValidSource,
        raw: &RawSource,
        candidates: Vec<CandidateIngredient>,
    ) -> Extraction {
        let mut extraction = Extraction {
            candidates,
            raw_text: raw.raw_text.clone(),
        };
        if extraction.candidates.len() >= self.settings.augmentation_threshold {
            return extraction;
        }
        info!(
            "Only {} candidate(s) found; augmenting",
            extraction.candidates.len()
        );

        let mut mined_any = false;
        if let (Some(comments), Some(video_id)) = (self.sources.comments(), source.video_id()) {
            let miner = CommentMiner::new(
                comments,
                self.extractor.clone(),
                self.settings.max_comments,
                self.settings.top_comments,
            );
            match miner.mine(video_id, raw.platform).await {
                Ok(mined) if !mined.is_empty() => {
                    mined_any = true;
                    extraction.candidates =
                        merge(extraction.candidates, mined, &self.normalizer);
                    self.record(conversion_id, ConversionStatus::CommentsMined.into())
                        .await;
                }
                Ok(_) => debug!("Comments on {video_id} yielded no ingredients"),
                Err(e) => warn!("Comment mining failed for {video_id}: {e}"),
            }
        }
        if mined_any || raw.platform == Platform::Webpage {
            return extraction;
        }

        let Some(link) = find_external_link(&raw.raw_text) else {
            return extraction;
        };
        let Some(webpage) = self.sources.get(Platform::Webpage) else {
            return extraction;
        };
        match webpage.fetch(&link).await {
            Ok(page) => {
                let found = self.extractor.extract_with(
                    &page.raw_text,
                    &RuleChain::standard(),
                    IngredientOrigin::Website,
                );
                info!("Linked website {link} yielded {} candidate(s)", found.len());
                extraction.candidates = merge(extraction.candidates, found, &self.normalizer);
                extraction.raw_text = format!(
                    "{}\n\nLinked recipe page ({link}):\n{}",
                    extraction.raw_text, page.raw_text
                );
                self.record(conversion_id, ConversionStatus::WebsiteAugmented.into())
                    .await;
            }
            Err(e) => warn!("Website augmentation failed for {link}: {e}"),
        }
        extraction
    }

    fn link_for(&self, result: &MatchResult) -> IngredientLink {
        let candidate = &result.candidate;
        let target = match &result.matched_canonical_id {
            Some(id) => LinkTarget::Existing(id.clone()),
            None => {
                let normalized = self.normalizer.normalize(&candidate.raw_name);
                if normalized.is_empty() {
                    LinkTarget::New(candidate.raw_name.trim().to_string())
                } else {
                    LinkTarget::New(normalized)
                }
            }
        };
        IngredientLink {
            target,
            raw_name: candidate.raw_name.clone(),
            quantity: candidate.quantity.clone(),
            unit: candidate.unit.clone(),
            section: candidate.section.clone(),
        }
    }

    /// Write one transition; the run continues if the log is unavailable
    async fn record(&self, conversion_id: &str, update: ConversionUpdate) {
        let status = update.status;
        if let Err(e) = self.conversions.update_conversion(conversion_id, update).await {
            warn!("Could not record {status} for conversion {conversion_id}: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IngestConfig;
    use crate::error::StructuringError;
    use crate::providers::LlmProvider;
    use crate::store::MemoryStore;
    use async_trait::async_trait;

    struct NeverCalled;

    #[async_trait]
    impl LlmProvider for NeverCalled {
        fn provider_name(&self) -> &str {
            "never"
        }

        async fn complete(&self, _: &str, _: &str) -> Result<String, StructuringError> {
            panic!("structuring engine must not be called");
        }
    }

    fn pipeline(store: Arc<MemoryStore>) -> Pipeline {
        Pipeline::builder()
            .config(IngestConfig::default())
            .provider(Arc::new(NeverCalled))
            .sources(SourceRegistry::from_config(&IngestConfig::default()))
            .store(store)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_missing_source_is_rejected_without_record() {
        let store = Arc::new(MemoryStore::new());
        let failure = pipeline(store.clone())
            .run(IngestRequest::default())
            .await
            .unwrap_err();

        assert!(matches!(
            failure.error,
            IngestError::Validation(ValidationError::MissingSource)
        ));
        assert!(failure.conversion_id.is_none());
        assert!(store.conversions().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_urls_are_rejected() {
        let store = Arc::new(MemoryStore::new());
        let pipeline = pipeline(store.clone());

        for url in ["not a url", "ftp://example.com/recipe"] {
            let failure = pipeline.run(IngestRequest::from_url(url)).await.unwrap_err();
            assert!(
                matches!(
                    failure.error,
                    IngestError::Validation(ValidationError::InvalidUrl(_))
                ),
                "{url}"
            );
        }

        let failure = pipeline
            .run(IngestRequest::from_url("https://www.youtube.com/feed/trending"))
            .await
            .unwrap_err();
        assert!(matches!(
            failure.error,
            IngestError::Validation(ValidationError::UnrecognizedVideoUrl { .. })
        ));
        assert!(store.conversions().is_empty());
    }

    #[tokio::test]
    async fn test_short_transcript_is_rejected() {
        let store = Arc::new(MemoryStore::new());
        let failure = pipeline(store)
            .run(IngestRequest::from_transcript("salt"))
            .await
            .unwrap_err();
        assert!(matches!(
            failure.error,
            IngestError::Validation(ValidationError::TranscriptTooShort(_))
        ));
    }

    #[test]
    fn test_link_for_unmatched_uses_normalized_name() {
        let pipeline = pipeline(Arc::new(MemoryStore::new()));
        let candidate = CandidateIngredient::new("Fresh Tomatoes", IngredientOrigin::Description)
            .with_quantity("2");
        let link = pipeline.link_for(&MatchResult::unmatched(candidate));

        assert_eq!(link.target, LinkTarget::New("tomato".to_string()));
        assert_eq!(link.raw_name, "Fresh Tomatoes");
        assert_eq!(link.quantity.as_deref(), Some("2"));
    }
}
