use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// Where raw cooking content comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    YouTube,
    TikTok,
    Webpage,
    Transcript,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::YouTube => "youtube",
            Platform::TikTok => "tiktok",
            Platform::Webpage => "webpage",
            Platform::Transcript => "transcript",
        }
    }

    pub fn is_video(&self) -> bool {
        matches!(self, Platform::YouTube | Platform::TikTok)
    }

    /// Route a URL to the platform whose adapter should handle it
    pub fn detect(url: &Url) -> Platform {
        let host = url
            .host_str()
            .unwrap_or_default()
            .trim_start_matches("www.")
            .trim_start_matches("m.")
            .to_lowercase();

        if host == "youtu.be" || host == "youtube.com" || host.ends_with(".youtube.com") {
            return Platform::YouTube;
        }
        if host == "tiktok.com" || host.ends_with(".tiktok.com") {
            return Platform::TikTok;
        }

        let path = url.path().to_lowercase();
        if path.ends_with(".vtt") || path.ends_with(".srt") || path.ends_with(".txt") {
            return Platform::Transcript;
        }

        Platform::Webpage
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What an adapter hands back from a fetch
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceContent {
    pub title: String,
    pub raw_text: String,
    pub channel: Option<String>,
    pub thumbnail: Option<String>,
}

/// Raw text and metadata for one run
#[derive(Debug, Clone)]
pub struct RawSource {
    pub platform: Platform,
    pub url: String,
    pub raw_text: String,
    pub title: Option<String>,
    pub channel: Option<String>,
    pub thumbnail: Option<String>,
    pub fetched_at: DateTime<Utc>,
}

impl RawSource {
    pub fn new(platform: Platform, url: impl Into<String>, content: SourceContent) -> Self {
        let title = Some(content.title).filter(|t| !t.trim().is_empty());
        Self {
            platform,
            url: url.into(),
            raw_text: content.raw_text,
            title,
            channel: content.channel,
            thumbnail: content.thumbnail,
            fetched_at: Utc::now(),
        }
    }
}

/// Which text a candidate was extracted from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IngredientOrigin {
    Description,
    Comment,
    Website,
    Transcript,
    StructuringEngine,
}

impl IngredientOrigin {
    /// Origin for text fetched directly from a platform
    pub fn for_platform(platform: Platform) -> Self {
        match platform {
            Platform::YouTube | Platform::TikTok => IngredientOrigin::Description,
            Platform::Webpage => IngredientOrigin::Website,
            Platform::Transcript => IngredientOrigin::Transcript,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    pub origin: IngredientOrigin,
    /// Original line the candidate was parsed from
    pub line: String,
}

/// An unresolved ingredient tuple
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateIngredient {
    pub raw_name: String,
    /// Decimal-as-string, e.g. "0.5" or "2"
    pub quantity: Option<String>,
    pub unit: Option<String>,
    pub section: Option<String>,
    pub provenance: Provenance,
}

impl CandidateIngredient {
    pub fn new(raw_name: impl Into<String>, origin: IngredientOrigin) -> Self {
        let raw_name = raw_name.into();
        Self {
            provenance: Provenance {
                origin,
                line: raw_name.clone(),
            },
            raw_name,
            quantity: None,
            unit: None,
            section: None,
        }
    }

    pub fn with_quantity(mut self, quantity: impl Into<String>) -> Self {
        self.quantity = Some(quantity.into());
        self
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    pub fn with_section(mut self, section: impl Into<String>) -> Self {
        self.section = Some(section.into());
        self
    }
}

/// Catalog-of-record ingredient identity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalIngredient {
    pub id: String,
    pub canonical_name: String,
    pub form: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    Exact,
    Partial,
    Normalized,
    Similarity,
    None,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResult {
    pub candidate: CandidateIngredient,
    pub matched_canonical_id: Option<String>,
    pub matched_name: Option<String>,
    pub match_type: MatchType,
}

impl MatchResult {
    pub fn unmatched(candidate: CandidateIngredient) -> Self {
        Self {
            candidate,
            matched_canonical_id: None,
            matched_name: None,
            match_type: MatchType::None,
        }
    }

    pub fn matched(
        candidate: CandidateIngredient,
        canonical: &CanonicalIngredient,
        match_type: MatchType,
    ) -> Self {
        Self {
            candidate,
            matched_canonical_id: Some(canonical.id.clone()),
            matched_name: Some(canonical.canonical_name.clone()),
            match_type,
        }
    }

    pub fn is_matched(&self) -> bool {
        self.match_type != MatchType::None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CourseType {
    Appetizer,
    #[default]
    #[serde(rename = "Main Course")]
    MainCourse,
    #[serde(rename = "Side Dish")]
    SideDish,
    Dessert,
    Soup,
    Salad,
    Bread,
    Sauce,
    Beverage,
    Snack,
}

impl CourseType {
    pub const ALL: [CourseType; 10] = [
        CourseType::Appetizer,
        CourseType::MainCourse,
        CourseType::SideDish,
        CourseType::Dessert,
        CourseType::Soup,
        CourseType::Salad,
        CourseType::Bread,
        CourseType::Sauce,
        CourseType::Beverage,
        CourseType::Snack,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CourseType::Appetizer => "Appetizer",
            CourseType::MainCourse => "Main Course",
            CourseType::SideDish => "Side Dish",
            CourseType::Dessert => "Dessert",
            CourseType::Soup => "Soup",
            CourseType::Salad => "Salad",
            CourseType::Bread => "Bread",
            CourseType::Sauce => "Sauce",
            CourseType::Beverage => "Beverage",
            CourseType::Snack => "Snack",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MealType {
    Breakfast,
    Brunch,
    Lunch,
    #[default]
    Dinner,
    Snack,
    Dessert,
}

impl MealType {
    pub const ALL: [MealType; 6] = [
        MealType::Breakfast,
        MealType::Brunch,
        MealType::Lunch,
        MealType::Dinner,
        MealType::Snack,
        MealType::Dessert,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MealType::Breakfast => "Breakfast",
            MealType::Brunch => "Brunch",
            MealType::Lunch => "Lunch",
            MealType::Dinner => "Dinner",
            MealType::Snack => "Snack",
            MealType::Dessert => "Dessert",
        }
    }
}

/// A recipe step in its normalized (structured) shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    pub section: Option<String>,
    pub index: u32,
    pub instruction: String,
    pub duration_minutes: Option<u32>,
    #[serde(default)]
    pub sub_steps: Vec<String>,
}

/// Sanitized recipe produced by the structuring engine client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuredRecipe {
    pub title: String,
    pub description: Option<String>,
    pub servings: Option<u32>,
    /// Minutes
    pub prep_time: Option<u32>,
    pub cook_time: Option<u32>,
    pub total_time: Option<u32>,
    pub difficulty: Difficulty,
    pub course_type: CourseType,
    pub meal_type: MealType,
    pub cuisine_type: Option<String>,
    pub ingredients: Vec<CandidateIngredient>,
    pub steps: Vec<Step>,
    pub notes: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Default for StructuredRecipe {
    fn default() -> Self {
        Self {
            title: "Untitled Recipe".to_string(),
            description: None,
            servings: None,
            prep_time: None,
            cook_time: None,
            total_time: None,
            difficulty: Difficulty::default(),
            course_type: CourseType::default(),
            meal_type: MealType::default(),
            cuisine_type: None,
            ingredients: Vec::new(),
            steps: Vec::new(),
            notes: None,
            tags: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn platform_of(url: &str) -> Platform {
        Platform::detect(&Url::parse(url).unwrap())
    }

    #[test]
    fn test_platform_detection() {
        assert_eq!(
            platform_of("https://www.youtube.com/watch?v=dQw4w9WgXcQ"),
            Platform::YouTube
        );
        assert_eq!(platform_of("https://youtu.be/dQw4w9WgXcQ"), Platform::YouTube);
        assert_eq!(platform_of("https://m.youtube.com/shorts/abc"), Platform::YouTube);
        assert_eq!(
            platform_of("https://www.tiktok.com/@chef/video/7212345678901234567"),
            Platform::TikTok
        );
        assert_eq!(platform_of("https://vm.tiktok.com/ZMabc123/"), Platform::TikTok);
        assert_eq!(
            platform_of("https://example.com/subs/pasta.vtt"),
            Platform::Transcript
        );
        assert_eq!(
            platform_of("https://www.seriouseats.com/best-lasagna"),
            Platform::Webpage
        );
    }

    #[test]
    fn test_enum_serialization_uses_display_names() {
        assert_eq!(
            serde_json::to_string(&CourseType::MainCourse).unwrap(),
            "\"Main Course\""
        );
        assert_eq!(serde_json::to_string(&MealType::Dinner).unwrap(), "\"Dinner\"");
        assert_eq!(serde_json::to_string(&MatchType::None).unwrap(), "\"none\"");
    }

    #[test]
    fn test_default_recipe_has_title() {
        let recipe = StructuredRecipe::default();
        assert_eq!(recipe.title, "Untitled Recipe");
        assert_eq!(recipe.difficulty, Difficulty::Medium);
    }
}
