//! Coercion of untrusted structuring engine output into a [`StructuredRecipe`].
//!
//! Nothing in here fails: every field is either coerced into range or
//! replaced by its documented default.

use regex::Regex;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::sync::LazyLock;

use crate::extract::vocabulary::canonical_unit;
use crate::extract::{convert_fraction_glyphs, format_quantity};
use crate::model::{
    CandidateIngredient, CourseType, Difficulty, IngredientOrigin, MealType, Provenance, Step,
    StructuredRecipe,
};

const MAX_TITLE: usize = 200;
const MAX_DESCRIPTION: usize = 2000;
const MAX_CUISINE: usize = 50;
const MAX_NOTES: usize = 2000;
const MAX_INGREDIENT_NAME: usize = 100;
const MAX_QUANTITY: usize = 20;
const MAX_UNIT: usize = 30;
const MAX_SECTION: usize = 100;
const MAX_INSTRUCTION: usize = 2000;
const MAX_SUB_STEP: usize = 500;
const MAX_TAG: usize = 50;
const MAX_TAGS: usize = 20;
const MAX_INGREDIENTS: usize = 200;
const MAX_STEPS: usize = 100;

const MAX_SERVINGS: u32 = 1000;
/// One week
const MAX_MINUTES: u32 = 10_080;

static LEADING_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(\d+(?:\.\d+)?)").unwrap());

/// A step as the engine may send it: a bare string or an object
#[derive(Debug, Clone, PartialEq)]
pub enum RawStep {
    Simple(String),
    Structured {
        section: Option<String>,
        index: Option<u32>,
        instruction: String,
        duration_minutes: Option<u32>,
        sub_steps: Vec<String>,
    },
}

impl RawStep {
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(text) => Some(RawStep::Simple(text.clone())),
            Value::Object(map) => {
                let instruction = ["instruction", "text", "description"]
                    .iter()
                    .find_map(|key| map.get(*key).and_then(Value::as_str))
                    .unwrap_or_default()
                    .to_string();
                Some(RawStep::Structured {
                    section: text_field(map, "section", MAX_SECTION),
                    index: map.get("step_number").and_then(|v| bounded_number(v, u32::MAX)),
                    instruction,
                    duration_minutes: map
                        .get("duration_minutes")
                        .and_then(|v| bounded_number(v, MAX_MINUTES)),
                    sub_steps: string_list(map.get("sub_steps"), MAX_SUB_STEP),
                })
            }
            _ => None,
        }
    }

    /// Structured shape with a non-empty instruction, or `None`
    pub fn normalize(self, position: u32) -> Option<Step> {
        let step = match self {
            RawStep::Simple(text) => Step {
                section: None,
                index: position,
                instruction: text,
                duration_minutes: None,
                sub_steps: Vec::new(),
            },
            RawStep::Structured {
                section,
                index,
                instruction,
                duration_minutes,
                sub_steps,
            } => Step {
                section,
                index: index.filter(|i| *i > 0).unwrap_or(position),
                instruction,
                duration_minutes,
                sub_steps,
            },
        };

        let instruction = clean_text(&step.instruction, MAX_INSTRUCTION)?;
        Some(Step {
            instruction,
            ..step
        })
    }
}

fn truncate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => text[..cut].trim_end().to_string(),
        None => text.to_string(),
    }
}

fn clean_text(text: &str, max: usize) -> Option<String> {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        return None;
    }
    Some(truncate(&collapsed, max))
}

fn text_value(value: &Value, max: usize) -> Option<String> {
    match value {
        Value::String(text) => clean_text(text, max),
        Value::Number(n) => clean_text(&n.to_string(), max),
        _ => None,
    }
}

fn text_field(map: &Map<String, Value>, key: &str, max: usize) -> Option<String> {
    map.get(key).and_then(|v| text_value(v, max))
}

/// Parse-or-null for whole, non-negative numbers within `max`
fn bounded_number(value: &Value, max: u32) -> Option<u32> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(text) => LEADING_NUMBER
            .captures(text)
            .and_then(|caps| caps[1].parse::<f64>().ok()),
        _ => None,
    }?;
    if !parsed.is_finite() || parsed < 0.0 || parsed > max as f64 {
        return None;
    }
    Some(parsed.round() as u32)
}

fn string_list(value: Option<&Value>, max: usize) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(|v| text_value(v, max)).collect())
        .unwrap_or_default()
}

fn label_key(label: &str) -> String {
    label
        .trim()
        .to_lowercase()
        .replace(['_', '-'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Whitelist lookup; anything unrecognised maps to the default
fn pick<T: Copy + Default>(value: Option<&Value>, all: &[T], label: fn(&T) -> &'static str) -> T {
    let Some(raw) = value.and_then(Value::as_str) else {
        return T::default();
    };
    let wanted = label_key(raw);
    all.iter()
        .copied()
        .find(|candidate| label_key(label(candidate)) == wanted)
        .unwrap_or_default()
}

fn quantity_value(value: &Value) -> Option<String> {
    let raw = text_value(value, MAX_QUANTITY)?;
    let quantity = format_quantity(&convert_fraction_glyphs(&raw));
    Some(truncate(&quantity, MAX_QUANTITY))
}

fn unit_value(value: &Value) -> Option<String> {
    let raw = text_value(value, MAX_UNIT)?;
    Some(canonical_unit(&raw).map(String::from).unwrap_or(raw.to_lowercase()))
}

fn ingredient(value: &Value) -> Option<CandidateIngredient> {
    let (name, quantity, unit, section) = match value {
        Value::String(text) => (clean_text(text, MAX_INGREDIENT_NAME)?, None, None, None),
        Value::Object(map) => (
            text_field(map, "name", MAX_INGREDIENT_NAME)?,
            map.get("quantity").and_then(quantity_value),
            map.get("unit").and_then(unit_value),
            text_field(map, "section", MAX_SECTION),
        ),
        _ => return None,
    };

    Some(CandidateIngredient {
        provenance: Provenance {
            origin: IngredientOrigin::StructuringEngine,
            line: name.clone(),
        },
        raw_name: name,
        quantity,
        unit,
        section,
    })
}

fn tags(value: Option<&Value>) -> Vec<String> {
    let mut seen = HashSet::new();
    string_list(value, MAX_TAG)
        .into_iter()
        .map(|tag| tag.to_lowercase())
        .filter(|tag| seen.insert(tag.clone()))
        .take(MAX_TAGS)
        .collect()
}

/// Coerce an engine response into a recipe; `title_hint` is used when the
/// engine gives no usable title.
pub fn sanitize(value: &Value, title_hint: Option<&str>) -> StructuredRecipe {
    let empty = Map::new();
    let map = value.as_object().unwrap_or(&empty);
    let defaults = StructuredRecipe::default();

    let title = text_field(map, "title", MAX_TITLE)
        .or_else(|| title_hint.and_then(|hint| clean_text(hint, MAX_TITLE)))
        .unwrap_or(defaults.title);

    let ingredients = map
        .get("ingredients")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(ingredient)
                .take(MAX_INGREDIENTS)
                .collect()
        })
        .unwrap_or_default();

    let steps = map
        .get("steps")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(RawStep::from_value)
                .filter_map({
                    let mut position = 0;
                    move |raw| {
                        let step = raw.normalize(position + 1)?;
                        position += 1;
                        Some(step)
                    }
                })
                .take(MAX_STEPS)
                .collect()
        })
        .unwrap_or_default();

    StructuredRecipe {
        title,
        description: text_field(map, "description", MAX_DESCRIPTION),
        servings: map
            .get("servings")
            .and_then(|v| bounded_number(v, MAX_SERVINGS))
            .filter(|s| *s > 0),
        prep_time: map.get("prep_time").and_then(|v| bounded_number(v, MAX_MINUTES)),
        cook_time: map.get("cook_time").and_then(|v| bounded_number(v, MAX_MINUTES)),
        total_time: map.get("total_time").and_then(|v| bounded_number(v, MAX_MINUTES)),
        difficulty: pick(map.get("difficulty"), &Difficulty::ALL, Difficulty::as_str),
        course_type: pick(map.get("course_type"), &CourseType::ALL, CourseType::as_str),
        meal_type: pick(map.get("meal_type"), &MealType::ALL, MealType::as_str),
        cuisine_type: text_field(map, "cuisine_type", MAX_CUISINE),
        ingredients,
        steps,
        notes: text_field(map, "notes", MAX_NOTES),
        tags: tags(map.get("tags")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_bogus_enums_fall_back_to_defaults() {
        let recipe = sanitize(
            &json!({"difficulty": "Bogus", "course_type": 7, "meal_type": "Midnight Feast"}),
            None,
        );
        assert_eq!(recipe.difficulty, Difficulty::Medium);
        assert_eq!(recipe.course_type, CourseType::MainCourse);
        assert_eq!(recipe.meal_type, MealType::Dinner);
        assert_eq!(recipe.title, "Untitled Recipe");
    }

    #[test]
    fn test_enum_matching_is_lenient_on_case_and_separators() {
        let recipe = sanitize(
            &json!({"difficulty": "easy", "course_type": "side_dish", "meal_type": "BRUNCH"}),
            None,
        );
        assert_eq!(recipe.difficulty, Difficulty::Easy);
        assert_eq!(recipe.course_type, CourseType::SideDish);
        assert_eq!(recipe.meal_type, MealType::Brunch);
    }

    #[test]
    fn test_numbers_parse_or_null() {
        let recipe = sanitize(
            &json!({
                "servings": "4 people",
                "prep_time": 15.4,
                "cook_time": "about an hour",
                "total_time": -5
            }),
            None,
        );
        assert_eq!(recipe.servings, Some(4));
        assert_eq!(recipe.prep_time, Some(15));
        assert_eq!(recipe.cook_time, None);
        assert_eq!(recipe.total_time, None);
    }

    #[test]
    fn test_strings_truncated_and_title_hint_used() {
        let long = "x".repeat(5000);
        let recipe = sanitize(&json!({"title": "   ", "description": long}), Some("Video Title"));
        assert_eq!(recipe.title, "Video Title");
        assert_eq!(recipe.description.unwrap().chars().count(), MAX_DESCRIPTION);
    }

    #[test]
    fn test_ingredients_filtered_and_normalized() {
        let recipe = sanitize(
            &json!({"ingredients": [
                {"name": "Flour", "quantity": "1/2", "unit": "Cups", "section": "Main"},
                {"name": "", "quantity": "2"},
                {"name": "Eggs", "quantity": 2},
                "salt",
                42
            ]}),
            None,
        );
        assert_eq!(recipe.ingredients.len(), 3);
        let flour = &recipe.ingredients[0];
        assert_eq!(flour.quantity.as_deref(), Some("0.5"));
        assert_eq!(flour.unit.as_deref(), Some("cup"));
        assert_eq!(flour.provenance.origin, IngredientOrigin::StructuringEngine);
        assert_eq!(recipe.ingredients[1].quantity.as_deref(), Some("2"));
        assert_eq!(recipe.ingredients[2].raw_name, "salt");
    }

    #[test]
    fn test_steps_normalized_to_structured_shape() {
        let recipe = sanitize(
            &json!({"steps": [
                "Boil the water.",
                {"instruction": "  ", "step_number": 2},
                null,
                {"section": "Sauce", "step_number": "3", "instruction": "Whisk the sauce",
                 "duration_minutes": "5", "sub_steps": ["add garlic", ""]},
                {"text": "Serve hot"}
            ]}),
            None,
        );

        assert_eq!(recipe.steps.len(), 3);
        assert_eq!(recipe.steps[0].index, 1);
        assert_eq!(recipe.steps[0].instruction, "Boil the water.");
        assert_eq!(recipe.steps[1].section.as_deref(), Some("Sauce"));
        assert_eq!(recipe.steps[1].index, 3);
        assert_eq!(recipe.steps[1].duration_minutes, Some(5));
        assert_eq!(recipe.steps[1].sub_steps, vec!["add garlic"]);
        assert_eq!(recipe.steps[2].index, 3);
        assert_eq!(recipe.steps[2].instruction, "Serve hot");
    }

    #[test]
    fn test_non_object_input() {
        let recipe = sanitize(&json!([1, 2, 3]), None);
        assert_eq!(recipe, StructuredRecipe::default());
    }

    #[test]
    fn test_tags_deduplicated() {
        let recipe = sanitize(&json!({"tags": ["Vegan", "vegan", " quick ", 5]}), None);
        assert_eq!(recipe.tags, vec!["vegan", "quick", "5"]);
    }
}
