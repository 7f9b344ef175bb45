//! Ordered ingredient-line patterns.
//!
//! Every platform shares the same patterns; a [`RuleChain`] only decides
//! which of them run, in what order, and how lines are pre-cleaned.

use regex::{Captures, Regex};
use std::sync::LazyLock;

use super::vocabulary::{canonical_unit, UNIT_TABLE};
use crate::model::Platform;

const QTY: &str = r"(?P<qty>\d+\s+\d+/\d+|\d+/\d+|\d+(?:[.,]\d+)?)(?:\s*(?:-|–|to)\s*(?P<qty_max>\d+/\d+|\d+(?:[.,]\d+)?))?";

/// Unit alternation, longest spelling first so "tbsp" wins over "tb".
static UNITS: LazyLock<String> = LazyLock::new(|| {
    let mut spellings: Vec<&str> = UNIT_TABLE.iter().map(|(spelling, _)| *spelling).collect();
    spellings.sort_by(|a, b| b.len().cmp(&a.len()));
    spellings
        .iter()
        .map(|s| regex::escape(s))
        .collect::<Vec<_>>()
        .join("|")
});

static QTY_UNIT_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)^{QTY}\s*(?P<unit>{units})\b\.?\s+(?:of\s+)?(?P<name>.+)$",
        units = *UNITS
    ))
    .unwrap()
});

static QTY_UNIT_DASH_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)^{QTY}\s*(?P<unit>{units})\b\.?\s*[-–—:]\s*(?P<name>.+)$",
        units = *UNITS
    ))
    .unwrap()
});

static NAME_DASH_QTY_UNIT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)^(?P<name>[^\d:–—\-][^:–—]*?)\s*(?:[-–—:]|\.{{2,}})\s*{QTY}\s*(?:(?P<unit>{units})\b\.?)?\s*(?:\([^)]*\))?$",
        units = *UNITS
    ))
    .unwrap()
});

static QTY_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)^{QTY}\s+(?:x\s+)?(?P<name>[a-z].*)$")).unwrap()
});

static INLINE_ITEM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i){QTY}\s*(?:(?P<unit>{units})\b\.?\s*)?(?:of\s+)?(?P<name>[a-z][^,;•|+\d]*)",
        units = *UNITS
    ))
    .unwrap()
});

static SPOKEN_ITEM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)\b{QTY}\s*(?P<unit>{units})\b\.?\s+(?:of\s+)?(?P<name>[a-z][a-z'-]*(?:\s+[a-z][a-z'-]*){{0,2}})",
        units = *UNITS
    ))
    .unwrap()
});

static LIST_SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)[,;•|+]|\band\b").unwrap());

static CONNECTOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\s+(?:and|then|into|in|to|with|until|&)(?:\s.*)?$").unwrap()
});

/// One ingredient pulled out of a line
#[derive(Debug, Clone, PartialEq)]
pub struct RuleMatch {
    pub quantity: Option<String>,
    pub unit: Option<String>,
    pub name: String,
}

/// A single line pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    /// Several "qty [unit] name" items on one comma/and-separated line
    InlineList,
    /// "qty unit [of] name" anywhere inside running speech
    Spoken,
    /// "2 cups - flour"
    QtyUnitDashName,
    /// "2 cups flour"
    QtyUnitName,
    /// "Flour - 2 cups", "Salt: 1 tsp"
    NameDashQtyUnit,
    /// "3 eggs"
    QtyName,
}

impl Rule {
    /// Matches on `line`; empty when the rule does not apply
    pub fn apply(&self, line: &str) -> Vec<RuleMatch> {
        match self {
            Rule::InlineList => {
                if !LIST_SEPARATOR.is_match(line) {
                    return Vec::new();
                }
                let items: Vec<RuleMatch> = INLINE_ITEM
                    .captures_iter(line)
                    .filter_map(|caps| from_captures(&caps, true))
                    .collect();
                if items.len() >= 2 {
                    items
                } else {
                    Vec::new()
                }
            }
            Rule::Spoken => SPOKEN_ITEM
                .captures_iter(line)
                .filter_map(|caps| from_captures(&caps, true))
                .collect(),
            Rule::QtyUnitDashName => single(&QTY_UNIT_DASH_NAME, line),
            Rule::QtyUnitName => single(&QTY_UNIT_NAME, line),
            Rule::NameDashQtyUnit => single(&NAME_DASH_QTY_UNIT, line),
            Rule::QtyName => single(&QTY_NAME, line),
        }
    }
}

fn single(pattern: &Regex, line: &str) -> Vec<RuleMatch> {
    pattern
        .captures(line)
        .and_then(|caps| from_captures(&caps, false))
        .into_iter()
        .collect()
}

fn from_captures(caps: &Captures, cut_connectors: bool) -> Option<RuleMatch> {
    let raw_name = caps.name("name")?.as_str();
    let raw_name = if cut_connectors {
        CONNECTOR.replace(raw_name, "").into_owned()
    } else {
        raw_name.to_string()
    };
    let name = clean_name(&raw_name);
    if name.is_empty() {
        return None;
    }

    let quantity = caps.name("qty").map(|qty| {
        let min = format_quantity(qty.as_str());
        match caps.name("qty_max") {
            Some(max) => format!("{min}-{}", format_quantity(max.as_str())),
            None => min,
        }
    });

    let unit = caps
        .name("unit")
        .map(|u| canonical_unit(u.as_str()).map_or_else(|| u.as_str().to_lowercase(), String::from));

    Some(RuleMatch {
        quantity,
        unit,
        name,
    })
}

fn clean_name(raw: &str) -> String {
    let trimmed = raw.trim_matches(|c: char| {
        c.is_whitespace() || matches!(c, ',' | '.' | ';' | ':' | '-' | '–' | '—' | '*')
    });
    let trimmed = trimmed
        .strip_prefix("of ")
        .or_else(|| trimmed.strip_prefix("Of "))
        .unwrap_or(trimmed);
    trimmed.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Render an amount as a decimal string: "1 1/2" -> "1.5", "2,5" -> "2.5".
pub fn format_quantity(raw: &str) -> String {
    match parse_amount(raw) {
        Some(value) => format_decimal(value),
        None => raw.trim().to_string(),
    }
}

fn parse_amount(raw: &str) -> Option<f64> {
    let raw = raw.trim().replace(',', ".");
    let mut total = 0.0;
    for part in raw.split_whitespace() {
        total += match part.split_once('/') {
            Some((num, den)) => {
                let num: f64 = num.parse().ok()?;
                let den: f64 = den.parse().ok()?;
                if den == 0.0 {
                    return None;
                }
                num / den
            }
            None => part.parse::<f64>().ok()?,
        };
    }
    Some(total)
}

pub(crate) fn format_decimal(value: f64) -> String {
    let formatted = format!("{value:.2}");
    let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
    if trimmed.is_empty() {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Ordered rule list plus per-platform line handling
#[derive(Debug, Clone)]
pub struct RuleChain {
    rules: Vec<Rule>,
    /// Instruction-keyword lines end ingredient mode
    pub stop_on_instructions: bool,
    /// Drop hashtags and emoji before matching
    pub strip_social_noise: bool,
}

impl RuleChain {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self {
            rules,
            stop_on_instructions: true,
            strip_social_noise: false,
        }
    }

    /// The chain used for free-form ingredient lists
    pub fn standard() -> Self {
        Self::new(vec![
            Rule::InlineList,
            Rule::QtyUnitDashName,
            Rule::QtyUnitName,
            Rule::NameDashQtyUnit,
            Rule::QtyName,
        ])
    }

    pub fn for_platform(platform: Platform) -> Self {
        match platform {
            Platform::YouTube | Platform::TikTok => Self {
                strip_social_noise: true,
                ..Self::standard()
            },
            // List items on pages carry one ingredient each
            Platform::Webpage => Self::new(vec![
                Rule::QtyUnitDashName,
                Rule::QtyUnitName,
                Rule::NameDashQtyUnit,
                Rule::QtyName,
            ]),
            // Speech: no reliable line structure and verbs everywhere
            Platform::Transcript => Self {
                rules: vec![
                    Rule::InlineList,
                    Rule::QtyUnitDashName,
                    Rule::QtyUnitName,
                    Rule::NameDashQtyUnit,
                    Rule::Spoken,
                ],
                stop_on_instructions: false,
                strip_social_noise: false,
            },
        }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// First rule that matches wins
    pub fn apply(&self, line: &str) -> Option<(Rule, Vec<RuleMatch>)> {
        self.rules.iter().find_map(|rule| {
            let matches = rule.apply(line);
            if matches.is_empty() {
                None
            } else {
                Some((*rule, matches))
            }
        })
    }
}

impl Default for RuleChain {
    fn default() -> Self {
        Self::standard()
    }
}
