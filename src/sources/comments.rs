//! Ingredient mining from video comments.
//!
//! Viewers often post the full ingredient list when the description lacks
//! one. Comments are scored with a fixed heuristic and only the best few are
//! run through the extractor.

use async_trait::async_trait;
use log::{debug, info};
use regex::Regex;
use std::sync::{Arc, LazyLock};

use crate::error::SourceFetchError;
use crate::extract::vocabulary::{COOKING_VERBS, INGREDIENT_WORDS, UNIT_TABLE};
use crate::extract::{IngredientExtractor, RuleChain};
use crate::model::{CandidateIngredient, IngredientOrigin, Platform};

const MEASUREMENT_SCORE: i32 = 35;
const INGREDIENT_WORD_SCORE: i32 = 25;
const MULTILINE_SCORE: i32 = 15;
const COOKING_VERB_SCORE: i32 = 10;
const VERY_SHORT_PENALTY: i32 = 30;
const SHORT_PENALTY: i32 = 10;

static MEASUREMENT: LazyLock<Regex> = LazyLock::new(|| {
    let mut spellings: Vec<&str> = UNIT_TABLE.iter().map(|(spelling, _)| *spelling).collect();
    spellings.sort_by_key(|s| std::cmp::Reverse(s.len()));
    let units = spellings
        .iter()
        .map(|s| regex::escape(s))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"(?i)(?:\d+(?:[.,/]\d+)?|[½¼¾⅓⅔⅛])\s*(?:{units})\b")).unwrap()
});

static WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[a-zA-Z]+").unwrap());

/// Collaborator that lists the comments under a video
#[async_trait]
pub trait CommentSource: Send + Sync {
    async fn fetch_comments(
        &self,
        video_id: &str,
        max_results: u32,
    ) -> Result<Vec<String>, SourceFetchError>;
}

/// Heuristic likelihood that a comment contains an ingredient list
pub fn score_comment(comment: &str) -> i32 {
    let text = comment.trim();
    let lowered = text.to_lowercase();
    let words: Vec<&str> = WORD.find_iter(&lowered).map(|m| m.as_str()).collect();

    let mut score = 0;
    if MEASUREMENT.is_match(text) {
        score += MEASUREMENT_SCORE;
    }
    if words.iter().any(|w| INGREDIENT_WORDS.contains(w)) {
        score += INGREDIENT_WORD_SCORE;
    }
    if text.lines().filter(|l| !l.trim().is_empty()).count() >= 3 {
        score += MULTILINE_SCORE;
    }
    if words.iter().any(|w| COOKING_VERBS.contains(w)) {
        score += COOKING_VERB_SCORE;
    }

    let length = text.chars().count();
    if length < 20 {
        score -= VERY_SHORT_PENALTY;
    } else if length < 50 {
        score -= SHORT_PENALTY;
    }
    score
}

/// The `top_n` best-scoring comments with a positive score, best first
pub fn select_top_comments(comments: &[String], top_n: usize) -> Vec<&str> {
    let mut scored: Vec<(i32, &str)> = comments
        .iter()
        .map(|c| (score_comment(c), c.as_str()))
        .filter(|(score, _)| *score > 0)
        .collect();
    scored.sort_by_key(|(score, _)| std::cmp::Reverse(*score));
    scored.into_iter().take(top_n).map(|(_, c)| c).collect()
}

/// Fetches, ranks and extracts ingredients from comments
#[derive(Clone)]
pub struct CommentMiner {
    source: Arc<dyn CommentSource>,
    extractor: IngredientExtractor,
    max_comments: u32,
    top_comments: usize,
}

impl CommentMiner {
    pub fn new(
        source: Arc<dyn CommentSource>,
        extractor: IngredientExtractor,
        max_comments: u32,
        top_comments: usize,
    ) -> Self {
        Self {
            source,
            extractor,
            max_comments,
            top_comments,
        }
    }

    pub async fn mine(
        &self,
        video_id: &str,
        platform: Platform,
    ) -> Result<Vec<CandidateIngredient>, SourceFetchError> {
        let comments = self
            .source
            .fetch_comments(video_id, self.max_comments)
            .await?;
        let top = select_top_comments(&comments, self.top_comments);
        info!(
            "Mining {} of {} comments on {video_id}",
            top.len(),
            comments.len()
        );

        let chain = RuleChain::for_platform(platform);
        let candidates: Vec<CandidateIngredient> = top
            .iter()
            .flat_map(|comment| {
                self.extractor
                    .extract_with(comment, &chain, IngredientOrigin::Comment)
            })
            .collect();
        debug!("Comments yielded {} candidate(s)", candidates.len());
        Ok(candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedComments(Vec<String>);

    #[async_trait]
    impl CommentSource for FixedComments {
        async fn fetch_comments(
            &self,
            _video_id: &str,
            max_results: u32,
        ) -> Result<Vec<String>, SourceFetchError> {
            Ok(self.0.iter().take(max_results as usize).cloned().collect())
        }
    }

    #[test]
    fn test_scoring_weights() {
        assert_eq!(score_comment("yum"), -30);
        assert_eq!(
            score_comment("I added 2 cups of flour and it came out great!"),
            MEASUREMENT_SCORE + INGREDIENT_WORD_SCORE - SHORT_PENALTY
        );
        let list = "Ingredients I used:\n200g butter\n2 eggs\n1 cup sugar\nMix and bake for 20 min";
        assert_eq!(
            score_comment(list),
            MEASUREMENT_SCORE + INGREDIENT_WORD_SCORE + MULTILINE_SCORE + COOKING_VERB_SCORE
        );
    }

    #[test]
    fn test_select_top_comments() {
        let comments = vec![
            "First!".to_string(),
            "Great video, thanks for sharing this with us all".to_string(),
            "Recipe:\n2 cups rice\n1 tbsp soy sauce\n3 cloves garlic".to_string(),
            "how much salt do you put in the water for this recipe?".to_string(),
        ];
        let top = select_top_comments(&comments, 2);
        assert_eq!(top.len(), 2);
        assert!(top[0].starts_with("Recipe:"));
        assert!(top[1].starts_with("how much salt"));
    }

    #[tokio::test]
    async fn test_mine_extracts_from_best_comment() {
        let source = Arc::new(FixedComments(vec![
            "so good".to_string(),
            "Full list:\n2 cups rice\n1 tbsp soy sauce\n3 cloves garlic".to_string(),
        ]));
        let miner = CommentMiner::new(source, IngredientExtractor::default(), 50, 5);
        let candidates = miner.mine("abc", Platform::YouTube).await.unwrap();

        let names: Vec<&str> = candidates.iter().map(|c| c.raw_name.as_str()).collect();
        assert_eq!(names, vec!["rice", "soy sauce", "garlic"]);
        assert!(candidates
            .iter()
            .all(|c| c.provenance.origin == IngredientOrigin::Comment));
    }
}
