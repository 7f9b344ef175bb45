//! Ingredient name canonicalization.
//!
//! Turns "2 Large Eggs (room temperature)" and "eggs, to taste" into the same
//! matching key, `egg`. The key is used for extraction dedup, merging and
//! catalog matching, so it is computed at very high multiplicity and memoized
//! through an injected [`NormalizationCache`].

mod cache;

pub use cache::NormalizationCache;

use regex::Regex;
use std::sync::{Arc, LazyLock};

static BRACKETED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\([^)]*\)|\[[^\]]*\]|\{[^}]*\}|[(\[{].*$").unwrap());

static OR_ALTERNATIVE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+or\s+.*$").unwrap());

static DASH_CLAUSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*[—–].*$|\s+-\s+.*$").unwrap());

static SERVING_QUALIFIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:to taste|optional|for garnish(?:ing)?|for serving|for decoration|as needed)\b")
        .unwrap()
});

static NUMERIC_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bgrade\s+[a-z]\b|\d+(?:[.,/]\d+)*\s*%?|[½¼¾⅓⅔⅛]").unwrap()
});

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Leading words that describe size, state, preparation or quality rather
/// than the ingredient itself.
const MODIFIERS: &[&str] = &[
    // size
    "large", "small", "medium", "big", "extra", "jumbo", "baby", "mini",
    // state
    "fresh", "freshly", "frozen", "dried", "dry", "raw", "cooked", "ripe", "canned", "whole",
    "boneless", "skinless", "unsalted", "salted", "softened", "melted", "cold", "warm", "hot",
    "room-temperature", "organic",
    // preparation
    "chopped", "diced", "minced", "sliced", "grated", "shredded", "crushed", "ground", "peeled",
    "beaten", "sifted", "packed", "toasted", "roasted", "finely", "roughly", "thinly",
    "coarsely", "heaping", "level",
    // colour / quality
    "all-purpose", "plain", "red", "green", "yellow", "white", "black", "brown", "golden",
    "light", "dark", "extra-virgin", "virgin", "good", "quality", "best", "premium",
];

/// Canonicalize an ingredient name without touching any cache.
///
/// Pure, deterministic and idempotent: `normalize_name(normalize_name(x))`
/// equals `normalize_name(x)` for every input. A single pass can expose new
/// work ("eggs to tastes" singularizes into a serving qualifier), so passes
/// repeat until the key stops changing.
pub fn normalize_name(raw: &str) -> String {
    let mut current = normalize_pass(raw);
    for _ in 0..MAX_PASSES {
        let next = normalize_pass(&current);
        if next == current {
            break;
        }
        current = next;
    }
    current
}

/// Passes after the first only ever shorten the key.
const MAX_PASSES: usize = 8;

fn normalize_pass(raw: &str) -> String {
    let lowered = raw.trim().to_lowercase();
    if lowered.is_empty() {
        return String::new();
    }

    let text = BRACKETED.replace_all(&lowered, " ");
    let text = OR_ALTERNATIVE.replace(&text, "");
    let text = DASH_CLAUSE.replace(&text, "");
    let text = SERVING_QUALIFIER.replace_all(&text, " ");
    let text = NUMERIC_TOKEN.replace_all(&text, " ");
    let text = trim_punctuation(&text);

    let mut words: Vec<&str> = text.split_whitespace().collect();
    while words.len() > 1 && is_modifier(words[0]) {
        words.remove(0);
    }

    if let Some(last) = words.pop() {
        let singular = singularize(last);
        let mut joined = words.join(" ");
        if !joined.is_empty() {
            joined.push(' ');
        }
        joined.push_str(&singular);
        let collapsed = WHITESPACE.replace_all(&joined, " ");
        return trim_punctuation(&collapsed).to_string();
    }

    String::new()
}

fn is_modifier(word: &str) -> bool {
    let word = word.trim_end_matches(',');
    MODIFIERS.contains(&word)
}

fn trim_punctuation(text: &str) -> &str {
    text.trim_matches(|c: char| c.is_whitespace() || matches!(c, ',' | ';' | ':' | '.' | '*' | '-'))
}

/// Naive English plural stripping; only the last word of a name is touched.
fn singularize(word: &str) -> String {
    if word.chars().count() <= 3 {
        return word.to_string();
    }
    if let Some(stem) = word.strip_suffix("ies") {
        return format!("{stem}y");
    }
    for suffix in ["sses", "xes", "ches", "shes", "oes"] {
        if word.ends_with(suffix) {
            return word[..word.len() - 2].to_string();
        }
    }
    if word.ends_with("ss") || word.ends_with("us") || word.ends_with("is") {
        return word.to_string();
    }
    match word.strip_suffix('s') {
        Some(stem) => stem.to_string(),
        None => word.to_string(),
    }
}

/// Memoizing front-end for [`normalize_name`].
///
/// The cache key is the lowercased, trimmed input, so callers that differ
/// only in casing or surrounding whitespace share entries.
#[derive(Clone, Default)]
pub struct NameNormalizer {
    cache: Arc<NormalizationCache>,
}

impl NameNormalizer {
    pub fn new(cache: Arc<NormalizationCache>) -> Self {
        Self { cache }
    }

    pub fn normalize(&self, raw: &str) -> String {
        let key = raw.trim().to_lowercase();
        if key.is_empty() {
            return String::new();
        }
        if let Some(hit) = self.cache.get(&key) {
            return hit;
        }
        let value = normalize_name(&key);
        self.cache.insert(key, value.clone());
        value
    }

    pub fn cache(&self) -> &NormalizationCache {
        &self.cache
    }
}
