//! Heuristic ingredient extraction from free text.
//!
//! Walks the text line by line keeping two pieces of state: the current
//! section name and whether we are still inside an ingredient list. Lines
//! that survive the header/metadata/instruction filters go through a
//! [`RuleChain`]; the first rule that matches produces the candidates.

mod rules;
pub mod vocabulary;

pub use rules::{format_quantity, Rule, RuleChain, RuleMatch};

use log::debug;
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

use crate::model::{CandidateIngredient, IngredientOrigin, Provenance};
use crate::normalize::NameNormalizer;
use vocabulary::{COMPONENT_HEADINGS, COOKING_VERBS, INSTRUCTION_HEADINGS, NON_INGREDIENT_LEADS};

const MIN_NAME_CHARS: usize = 2;
const MAX_NAME_CHARS: usize = 100;

static BULLET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:[-*•·▪►➤>✓✔]+\s*|\d{1,2}[.)]\s+)").unwrap());

static MIXED_GLYPH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)?\s*([½¼¾⅓⅔⅛])").unwrap());

static HASHTAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"#\w+").unwrap());

static METADATA_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(?:serves|serving|servings|yield|yields|makes|portions|prep time|cook time|total time)\b",
    )
    .unwrap()
});

/// Section / mode change signalled by a header line
#[derive(Debug, Clone, PartialEq)]
enum Header {
    Ingredients(String),
    Instructions,
}

/// Replace fraction glyphs with decimal literals; "1½" becomes "1.5".
pub fn convert_fraction_glyphs(line: &str) -> String {
    MIXED_GLYPH
        .replace_all(line, |caps: &regex::Captures| {
            let fraction = match &caps[2] {
                "½" => 0.5,
                "¼" => 0.25,
                "¾" => 0.75,
                "⅓" => 0.33,
                "⅔" => 0.67,
                _ => 0.125,
            };
            match caps.get(1).and_then(|whole| whole.as_str().parse::<f64>().ok()) {
                Some(whole) => rules::format_decimal(whole + fraction),
                None => {
                    let prefix = if caps[0].starts_with(char::is_whitespace) { " " } else { "" };
                    format!("{prefix}{}", rules::format_decimal(fraction))
                }
            }
        })
        .into_owned()
}

fn strip_social_noise(line: &str) -> String {
    let without_tags = HASHTAG.replace_all(line, "");
    without_tags
        .chars()
        .filter(|c| {
            let code = *c as u32;
            !(code >= 0x1F000 || (0x2600..=0x27BF).contains(&code) || code == 0xFE0F || code == 0x200D)
        })
        .collect()
}

fn clean_line(line: &str, chain: &RuleChain) -> String {
    let line = if chain.strip_social_noise {
        strip_social_noise(line)
    } else {
        line.to_string()
    };
    let line = line.replace("**", "");
    let line = BULLET.replace(line.trim(), "");
    convert_fraction_glyphs(line.trim()).trim().to_string()
}

fn parse_header(line: &str) -> Option<Header> {
    let had_marker = line.starts_with('#') || line.ends_with(':');
    let text = line
        .trim_start_matches('#')
        .trim_end_matches(':')
        .trim();
    if text.is_empty() || text.chars().count() > 40 || text.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }
    if text.split_whitespace().count() > 5 {
        return None;
    }

    let lowered = text.to_lowercase();
    let is_caps = text.chars().any(char::is_alphabetic)
        && text.chars().filter(|c| c.is_alphabetic()).all(char::is_uppercase);

    let short = lowered.split_whitespace().count() <= 3;
    if INSTRUCTION_HEADINGS.iter().any(|h| lowered.contains(h)) && (had_marker || is_caps || short)
    {
        return Some(Header::Instructions);
    }

    let bare_component = COMPONENT_HEADINGS.iter().any(|h| {
        lowered == *h || lowered.strip_prefix("for the ") == Some(*h)
            || lowered.strip_prefix("for ") == Some(*h)
    });
    if !(had_marker || is_caps || bare_component) {
        return None;
    }

    Some(Header::Ingredients(section_name(&lowered)))
}

/// "For the Frosting" -> "Frosting"; a plain "Ingredients" header -> "Main"
pub fn section_name(heading: &str) -> String {
    let lowered = heading.trim().trim_end_matches(':').to_lowercase();
    let stripped = lowered
        .trim_start_matches("for the ")
        .trim_start_matches("for ")
        .replace("ingredients for the", "")
        .replace("ingredients for", "")
        .replace("ingredients", "");
    let stripped = stripped.trim_matches(|c: char| c.is_whitespace() || c == '-' || c == ':');
    if stripped.is_empty() {
        return "Main".to_string();
    }
    let mut chars = stripped.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => "Main".to_string(),
    }
}

fn is_instruction_line(line: &str) -> bool {
    let first_word = line
        .split_whitespace()
        .next()
        .map(|w| {
            w.trim_matches(|c: char| !c.is_alphabetic())
                .to_lowercase()
        })
        .unwrap_or_default();
    COOKING_VERBS.contains(&first_word.as_str()) || line.to_lowercase().starts_with("step ")
}

fn is_plausible_name(name: &str) -> bool {
    let len = name.chars().count();
    if !(MIN_NAME_CHARS..=MAX_NAME_CHARS).contains(&len) {
        return false;
    }
    if !name.chars().any(char::is_alphabetic) {
        return false;
    }
    let lead = name
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_lowercase();
    !NON_INGREDIENT_LEADS.contains(&lead.as_str())
}

/// Parses candidate ingredients out of raw text
#[derive(Clone, Default)]
pub struct IngredientExtractor {
    normalizer: NameNormalizer,
}

impl IngredientExtractor {
    pub fn new(normalizer: NameNormalizer) -> Self {
        Self { normalizer }
    }

    /// Extract with the standard chain; candidates are tagged as description text
    pub fn extract(&self, text: &str) -> Vec<CandidateIngredient> {
        self.extract_with(text, &RuleChain::standard(), IngredientOrigin::Description)
    }

    pub fn extract_with(
        &self,
        text: &str,
        chain: &RuleChain,
        origin: IngredientOrigin,
    ) -> Vec<CandidateIngredient> {
        let mut candidates = Vec::new();
        let mut seen = HashSet::new();
        let mut section: Option<String> = None;
        let mut ingredient_mode = true;

        for original in text.lines() {
            if original.trim().is_empty() {
                continue;
            }
            let line = clean_line(original, chain);
            if line.is_empty() {
                continue;
            }

            if let Some(header) = parse_header(&line) {
                match header {
                    Header::Ingredients(name) => {
                        section = Some(name);
                        ingredient_mode = true;
                    }
                    Header::Instructions => ingredient_mode = false,
                }
                continue;
            }

            if METADATA_LINE.is_match(&line) {
                continue;
            }

            if chain.stop_on_instructions && is_instruction_line(&line) {
                ingredient_mode = false;
                continue;
            }

            if !ingredient_mode {
                continue;
            }

            let Some((rule, matches)) = chain.apply(&line) else {
                continue;
            };
            debug!("{:?} matched {} item(s) in {:?}", rule, matches.len(), line);

            for RuleMatch {
                quantity,
                unit,
                name,
            } in matches
            {
                if !is_plausible_name(&name) {
                    continue;
                }
                let key = format!(
                    "{}|{}|{}",
                    quantity.as_deref().unwrap_or_default(),
                    unit.as_deref().unwrap_or_default(),
                    self.normalizer.normalize(&name)
                );
                if !seen.insert(key) {
                    continue;
                }
                candidates.push(CandidateIngredient {
                    raw_name: name,
                    quantity,
                    unit,
                    section: section.clone(),
                    provenance: Provenance {
                        origin,
                        line: original.trim().to_string(),
                    },
                });
            }
        }

        candidates
    }
}
