//! Matching candidate ingredients against the canonical catalog.
//!
//! Strategies run in order and the first hit wins:
//!
//! 1. exact, case-insensitive equality
//! 2. bidirectional substring containment, shortest catalog name first
//! 3. normalized-name ranking (normalized-exact, raw-equals-catalog,
//!    normalized-prefix, normalized-substring), shortest name on ties
//! 4. token-overlap similarity, only when enabled; its results go through the
//!    same ranking as step 3 before being accepted
//!
//! A failing catalog call downgrades that one candidate to unmatched.

use async_trait::async_trait;
use log::{debug, warn};
use std::collections::HashSet;

use crate::error::MatchingError;
use crate::model::{CandidateIngredient, CanonicalIngredient, MatchResult, MatchType};
use crate::normalize::NameNormalizer;

/// Catalog entries shorter than this never match by containment in the query
const MIN_CONTAINED_CHARS: usize = 3;

/// Minimum share of tokens two names must have in common for step 4
const SIMILARITY_THRESHOLD: f64 = 0.5;

/// Catalog query shapes; all comparisons are case-insensitive
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchPattern {
    /// `name = query`
    Equals(String),
    /// `name LIKE %query%`
    Contains(String),
    /// `query LIKE %name%`
    ContainedIn(String),
}

/// Catalog-of-record collaborator
///
/// The pipeline only reads through this trait. Canonical rows for unmatched
/// ingredients are created by [`RecipeStore::save_recipe`] from
/// [`LinkTarget::New`] links, inside the same transaction as the recipe, so
/// a rolled-back save leaves no orphan rows behind.
///
/// [`RecipeStore::save_recipe`]: crate::store::RecipeStore::save_recipe
/// [`LinkTarget::New`]: crate::store::LinkTarget::New
#[async_trait]
pub trait IngredientCatalog: Send + Sync {
    async fn search(
        &self,
        pattern: &SearchPattern,
    ) -> Result<Vec<CanonicalIngredient>, MatchingError>;

    /// Insert a canonical ingredient outside of any recipe save, for seeding
    /// and admin tooling. Read-only catalogs keep the default, which refuses.
    async fn create(&self, name: &str) -> Result<CanonicalIngredient, MatchingError> {
        Err(MatchingError {
            ingredient: name.to_string(),
            message: "catalog is read-only".to_string(),
        })
    }
}

/// Runs the matching cascade for each candidate independently
#[derive(Clone)]
pub struct IngredientResolver {
    normalizer: NameNormalizer,
    enable_similarity: bool,
}

impl IngredientResolver {
    pub fn new(normalizer: NameNormalizer) -> Self {
        Self {
            normalizer,
            enable_similarity: false,
        }
    }

    pub fn with_similarity_fallback(mut self, enabled: bool) -> Self {
        self.enable_similarity = enabled;
        self
    }

    /// Resolve a batch; one bad candidate never fails the rest
    pub async fn resolve_all(
        &self,
        catalog: &dyn IngredientCatalog,
        candidates: Vec<CandidateIngredient>,
    ) -> Vec<MatchResult> {
        let mut results = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            results.push(self.resolve(catalog, candidate).await);
        }
        results
    }

    pub async fn resolve(
        &self,
        catalog: &dyn IngredientCatalog,
        candidate: CandidateIngredient,
    ) -> MatchResult {
        match self.try_resolve(catalog, &candidate).await {
            Ok(Some((canonical, match_type))) => {
                debug!(
                    "'{}' -> '{}' ({:?})",
                    candidate.raw_name, canonical.canonical_name, match_type
                );
                MatchResult::matched(candidate, &canonical, match_type)
            }
            Ok(None) => {
                debug!("No catalog match for '{}'", candidate.raw_name);
                MatchResult::unmatched(candidate)
            }
            Err(e) => {
                warn!("{e}; treating as unmatched");
                MatchResult::unmatched(candidate)
            }
        }
    }

    async fn try_resolve(
        &self,
        catalog: &dyn IngredientCatalog,
        candidate: &CandidateIngredient,
    ) -> Result<Option<(CanonicalIngredient, MatchType)>, MatchingError> {
        let query = candidate.raw_name.trim().to_lowercase();
        if query.is_empty() {
            return Ok(None);
        }

        // 1. exact
        let exact = catalog
            .search(&SearchPattern::Equals(query.clone()))
            .await?
            .into_iter()
            .find(|entry| entry.canonical_name.trim().to_lowercase() == query);
        if let Some(entry) = exact {
            return Ok(Some((entry, MatchType::Exact)));
        }

        // 2. containment either way
        let contained = self.containment(catalog, &query).await?;
        if let Some(entry) = shortest(contained) {
            return Ok(Some((entry, MatchType::Partial)));
        }

        // 3. normalized ranking
        let normalized = self.normalizer.normalize(&query);
        if normalized.is_empty() {
            return Ok(None);
        }
        let pool = self.containment(catalog, &normalized).await?;
        if let Some(entry) = self.best_ranked(pool, &query, &normalized) {
            return Ok(Some((entry, MatchType::Normalized)));
        }

        // 4. similarity
        if self.enable_similarity {
            if let Some(entry) = self.similar(catalog, &query, &normalized).await? {
                return Ok(Some((entry, MatchType::Similarity)));
            }
        }

        Ok(None)
    }

    async fn containment(
        &self,
        catalog: &dyn IngredientCatalog,
        query: &str,
    ) -> Result<Vec<CanonicalIngredient>, MatchingError> {
        let mut entries = catalog
            .search(&SearchPattern::Contains(query.to_string()))
            .await?;
        entries.extend(
            catalog
                .search(&SearchPattern::ContainedIn(query.to_string()))
                .await?
                .into_iter()
                .filter(|entry| entry.canonical_name.trim().chars().count() >= MIN_CONTAINED_CHARS),
        );
        Ok(entries)
    }

    /// Step 3 priority; lower is better, `None` means "not a match"
    fn rank(&self, entry: &CanonicalIngredient, query: &str, normalized: &str) -> Option<u8> {
        let name = entry.canonical_name.trim().to_lowercase();
        let entry_key = self.normalizer.normalize(&name);
        if entry_key.is_empty() {
            return None;
        }
        if entry_key == normalized {
            Some(0)
        } else if name == query {
            Some(1)
        } else if entry_key.starts_with(normalized) || normalized.starts_with(entry_key.as_str()) {
            Some(2)
        } else if entry_key.contains(normalized) || normalized.contains(entry_key.as_str()) {
            Some(3)
        } else {
            None
        }
    }

    fn best_ranked(
        &self,
        pool: Vec<CanonicalIngredient>,
        query: &str,
        normalized: &str,
    ) -> Option<CanonicalIngredient> {
        pool.into_iter()
            .filter_map(|entry| self.rank(&entry, query, normalized).map(|rank| (rank, entry)))
            .min_by(|(rank_a, a), (rank_b, b)| {
                rank_a
                    .cmp(rank_b)
                    .then_with(|| name_order(a).cmp(&name_order(b)))
            })
            .map(|(_, entry)| entry)
    }

    async fn similar(
        &self,
        catalog: &dyn IngredientCatalog,
        query: &str,
        normalized: &str,
    ) -> Result<Option<CanonicalIngredient>, MatchingError> {
        let tokens: Vec<&str> = normalized
            .split_whitespace()
            .filter(|t| t.chars().count() >= MIN_CONTAINED_CHARS)
            .collect();

        let mut seen = HashSet::new();
        let mut pool = Vec::new();
        for token in &tokens {
            for entry in catalog
                .search(&SearchPattern::Contains(token.to_string()))
                .await?
            {
                if seen.insert(entry.id.clone()) {
                    pool.push(entry);
                }
            }
        }

        if let Some(entry) = self.best_ranked(pool.clone(), query, normalized) {
            return Ok(Some(entry));
        }

        let query_tokens: HashSet<&str> = normalized.split_whitespace().collect();
        let best = pool
            .into_iter()
            .filter_map(|entry| {
                let key = self.normalizer.normalize(&entry.canonical_name);
                let entry_tokens: HashSet<&str> = key.split_whitespace().collect();
                let shared = query_tokens.intersection(&entry_tokens).count();
                let total = query_tokens.union(&entry_tokens).count();
                let score = if total == 0 { 0.0 } else { shared as f64 / total as f64 };
                (score >= SIMILARITY_THRESHOLD).then_some((score, entry))
            })
            .max_by(|(score_a, a), (score_b, b)| {
                score_a
                    .total_cmp(score_b)
                    .then_with(|| name_order(b).cmp(&name_order(a)))
            })
            .map(|(_, entry)| entry);
        Ok(best)
    }
}

/// Shortest name first, then alphabetical for a stable choice
fn name_order(entry: &CanonicalIngredient) -> (usize, String) {
    let name = entry.canonical_name.trim().to_lowercase();
    (name.chars().count(), name)
}

fn shortest(entries: Vec<CanonicalIngredient>) -> Option<CanonicalIngredient> {
    entries.into_iter().min_by_key(name_order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::IngredientOrigin;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Catalog {
        entries: Vec<CanonicalIngredient>,
        fail_on: Option<String>,
        searches: AtomicUsize,
    }

    impl Catalog {
        fn new(names: &[&str]) -> Self {
            Self {
                entries: names
                    .iter()
                    .enumerate()
                    .map(|(i, name)| CanonicalIngredient {
                        id: format!("ing-{i}"),
                        canonical_name: name.to_string(),
                        form: None,
                    })
                    .collect(),
                fail_on: None,
                searches: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl IngredientCatalog for Catalog {
        async fn search(
            &self,
            pattern: &SearchPattern,
        ) -> Result<Vec<CanonicalIngredient>, MatchingError> {
            self.searches.fetch_add(1, Ordering::SeqCst);
            let (SearchPattern::Equals(q) | SearchPattern::Contains(q) | SearchPattern::ContainedIn(q)) =
                pattern;
            if self.fail_on.as_deref() == Some(q.as_str()) {
                return Err(MatchingError {
                    ingredient: q.clone(),
                    message: "connection reset".to_string(),
                });
            }
            let q = q.to_lowercase();
            Ok(self
                .entries
                .iter()
                .filter(|e| {
                    let name = e.canonical_name.to_lowercase();
                    match pattern {
                        SearchPattern::Equals(_) => name == q,
                        SearchPattern::Contains(_) => name.contains(&q),
                        SearchPattern::ContainedIn(_) => q.contains(&name),
                    }
                })
                .cloned()
                .collect())
        }
    }

    fn candidate(name: &str) -> CandidateIngredient {
        CandidateIngredient::new(name, IngredientOrigin::Description)
    }

    #[tokio::test]
    async fn test_exact_match() {
        let catalog = Catalog::new(&["Egg", "Flour"]);
        let result = IngredientResolver::new(NameNormalizer::default())
            .resolve(&catalog, candidate(" flour "))
            .await;
        assert_eq!(result.match_type, MatchType::Exact);
        assert_eq!(result.matched_canonical_id.as_deref(), Some("ing-1"));
    }

    #[tokio::test]
    async fn test_plural_resolves_to_singular() {
        let catalog = Catalog::new(&["egg"]);
        let result = IngredientResolver::new(NameNormalizer::default())
            .resolve(&catalog, candidate("Eggs"))
            .await;
        assert!(matches!(
            result.match_type,
            MatchType::Partial | MatchType::Normalized
        ));
        assert_eq!(result.matched_name.as_deref(), Some("egg"));
    }

    #[tokio::test]
    async fn test_partial_prefers_shortest_name() {
        let catalog = Catalog::new(&["brown sugar", "sugar", "powdered sugar"]);
        let result = IngredientResolver::new(NameNormalizer::default())
            .resolve(&catalog, candidate("sugar cubes"))
            .await;
        assert_eq!(result.match_type, MatchType::Partial);
        assert_eq!(result.matched_name.as_deref(), Some("sugar"));
    }

    #[tokio::test]
    async fn test_normalized_match() {
        let catalog = Catalog::new(&["tomato", "cherry"]);
        let result = IngredientResolver::new(NameNormalizer::default())
            .resolve(&catalog, candidate("2 ripe tomatoes (diced)"))
            .await;
        assert_eq!(result.match_type, MatchType::Partial);

        let catalog = Catalog::new(&["Tomatoes"]);
        let result = IngredientResolver::new(NameNormalizer::default())
            .resolve(&catalog, candidate("tomato (diced)"))
            .await;
        assert_eq!(result.match_type, MatchType::Normalized);
    }

    #[tokio::test]
    async fn test_no_match_and_similarity_disabled_by_default() {
        let catalog = Catalog::new(&["smoked paprika powder"]);
        let resolver = IngredientResolver::new(NameNormalizer::default());
        let result = resolver.resolve(&catalog, candidate("sweet paprika powder")).await;
        assert_eq!(result.match_type, MatchType::None);

        let result = resolver
            .with_similarity_fallback(true)
            .resolve(&catalog, candidate("sweet paprika powder"))
            .await;
        assert_eq!(result.match_type, MatchType::Similarity);
        assert_eq!(result.matched_name.as_deref(), Some("smoked paprika powder"));
    }

    #[tokio::test]
    async fn test_catalog_error_downgrades_single_item() {
        let mut catalog = Catalog::new(&["salt", "pepper"]);
        catalog.fail_on = Some("salt".to_string());
        let results = IngredientResolver::new(NameNormalizer::default())
            .resolve_all(&catalog, vec![candidate("salt"), candidate("pepper")])
            .await;
        assert_eq!(results[0].match_type, MatchType::None);
        assert_eq!(results[1].match_type, MatchType::Exact);
        assert!(catalog.searches.load(Ordering::SeqCst) >= 2);
    }

    #[tokio::test]
    async fn test_unmatched_resolves_against_read_only_catalog() {
        let catalog = Catalog::new(&["salt"]);
        let result = IngredientResolver::new(NameNormalizer::default())
            .resolve(&catalog, candidate("saffron threads"))
            .await;
        assert_eq!(result.match_type, MatchType::None);

        let err = catalog.create("saffron thread").await.unwrap_err();
        assert_eq!(err.ingredient, "saffron thread");
        assert!(catalog.entries.iter().all(|e| e.canonical_name != "saffron thread"));
    }
}
