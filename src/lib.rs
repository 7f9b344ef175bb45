//! Recipe ingestion pipeline.
//!
//! Turns a cooking video, a recipe web page or a pasted transcript into a
//! structured recipe whose ingredients are resolved against a canonical
//! catalog, recording every stage of the run in an audit log.
//!
//! ```no_run
//! use recipe_ingest::{IngestRequest, MemoryStore, Pipeline};
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let pipeline = Pipeline::builder()
//!     .store(Arc::new(MemoryStore::new()))
//!     .build()?;
//! let response = pipeline
//!     .ingest(IngestRequest::from_url("https://www.youtube.com/watch?v=dQw4w9WgXcQ"))
//!     .await;
//! println!("{}", serde_json::to_string_pretty(&response)?);
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod config;
pub mod error;
pub mod extract;
pub mod merge;
pub mod model;
pub mod normalize;
pub mod pipeline;
pub mod providers;
pub mod resolver;
pub mod sources;
pub mod store;
pub mod structuring;

pub use builder::PipelineBuilder;
pub use config::IngestConfig;
pub use error::{
    FetchFailureReason, IngestError, MatchingError, PersistenceError, SourceFetchError,
    StructuringError, StructuringErrorKind, ValidationError,
};
pub use extract::{IngredientExtractor, RuleChain};
pub use merge::merge;
pub use model::{
    CandidateIngredient, CanonicalIngredient, MatchResult, MatchType, Platform, RawSource,
    StructuredRecipe,
};
pub use normalize::{normalize_name, NameNormalizer, NormalizationCache};
pub use pipeline::{IngestFailure, IngestOutcome, IngestRequest, IngestResponse, Pipeline};
pub use providers::{
    AnthropicProvider, LlmProvider, OllamaProvider, OpenAIProvider, ProviderFactory,
};
pub use resolver::{IngredientCatalog, IngredientResolver, SearchPattern};
pub use sources::{CommentSource, SourceAdapter, SourceRegistry};
pub use store::{
    ConversionLog, ConversionRecord, ConversionStatus, MemoryStore, RecipeStore,
};
pub use structuring::{StructuringClient, StructuringRequest};
