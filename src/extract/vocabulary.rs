//! Word lists shared by the extractor, the webpage adapter and comment scoring.

/// Raw unit spellings and the canonical token stored on a candidate.
pub const UNIT_TABLE: &[(&str, &str)] = &[
    // Volume - US
    ("fluid ounces", "fl oz"),
    ("fluid ounce", "fl oz"),
    ("fl. oz", "fl oz"),
    ("fl oz", "fl oz"),
    ("tablespoons", "tbsp"),
    ("tablespoon", "tbsp"),
    ("tbsps", "tbsp"),
    ("tbsp", "tbsp"),
    ("tbls", "tbsp"),
    ("tbl", "tbsp"),
    ("tbs", "tbsp"),
    ("teaspoons", "tsp"),
    ("teaspoon", "tsp"),
    ("tsps", "tsp"),
    ("tsp", "tsp"),
    ("cups", "cup"),
    ("cup", "cup"),
    ("c", "cup"),
    ("quarts", "qt"),
    ("quart", "qt"),
    ("qt", "qt"),
    ("pints", "pt"),
    ("pint", "pt"),
    ("pt", "pt"),
    ("gallons", "gal"),
    ("gallon", "gal"),
    ("gal", "gal"),
    // Volume - Metric
    ("milliliters", "ml"),
    ("milliliter", "ml"),
    ("millilitres", "ml"),
    ("millilitre", "ml"),
    ("ml", "ml"),
    ("liters", "l"),
    ("liter", "l"),
    ("litres", "l"),
    ("litre", "l"),
    ("l", "l"),
    // Weight
    ("ounces", "oz"),
    ("ounce", "oz"),
    ("oz", "oz"),
    ("pounds", "lb"),
    ("pound", "lb"),
    ("lbs", "lb"),
    ("lb", "lb"),
    ("kilograms", "kg"),
    ("kilogram", "kg"),
    ("kgs", "kg"),
    ("kg", "kg"),
    ("grams", "g"),
    ("gram", "g"),
    ("gr", "g"),
    ("g", "g"),
    ("milligrams", "mg"),
    ("milligram", "mg"),
    ("mg", "mg"),
    // Count / size
    ("pinches", "pinch"),
    ("pinch", "pinch"),
    ("dashes", "dash"),
    ("dash", "dash"),
    ("cloves", "clove"),
    ("clove", "clove"),
    ("cans", "can"),
    ("can", "can"),
    ("slices", "slice"),
    ("slice", "slice"),
    ("sticks", "stick"),
    ("stick", "stick"),
    ("packages", "package"),
    ("package", "package"),
    ("pkg", "package"),
    ("bunches", "bunch"),
    ("bunch", "bunch"),
    ("sprigs", "sprig"),
    ("sprig", "sprig"),
    ("handfuls", "handful"),
    ("handful", "handful"),
    ("pieces", "piece"),
    ("piece", "piece"),
    ("stalks", "stalk"),
    ("stalk", "stalk"),
    ("heads", "head"),
    ("head", "head"),
    ("jars", "jar"),
    ("jar", "jar"),
    ("drops", "drop"),
    ("drop", "drop"),
];

/// Canonical form of a unit token, if it is one we recognise
pub fn canonical_unit(raw: &str) -> Option<&'static str> {
    let token = raw.trim().trim_end_matches('.').to_lowercase();
    UNIT_TABLE
        .iter()
        .find(|(spelling, _)| *spelling == token)
        .map(|(_, canonical)| *canonical)
}

/// Headings that name a component of a recipe ("For the frosting").
pub const COMPONENT_HEADINGS: &[&str] = &[
    "ingredients",
    "frosting",
    "icing",
    "batter",
    "filling",
    "topping",
    "glaze",
    "sauce",
    "dough",
    "crust",
    "marinade",
    "dressing",
    "syrup",
    "streusel",
    "crumble",
    "ganache",
    "garnish",
    "base",
    "cake",
    "salad",
    "seasoning",
    "spice mix",
    "rub",
    "broth",
];

/// Headings after which ingredient lines stop.
pub const INSTRUCTION_HEADINGS: &[&str] = &[
    "instructions",
    "directions",
    "method",
    "steps",
    "preparation",
    "how to make",
    "procedure",
];

/// Leading words of an instruction line.
pub const COOKING_VERBS: &[&str] = &[
    "preheat", "mix", "stir", "bake", "cook", "add", "combine", "whisk", "pour", "place", "heat",
    "bring", "boil", "simmer", "fry", "saute", "sauté", "serve", "remove", "transfer", "let",
    "cover", "blend", "fold", "season", "cut", "chop", "slice", "spread", "roll", "knead",
    "drain", "toss", "grill", "roast", "beat", "melt", "put", "then", "finally", "meanwhile",
    "refrigerate", "chill", "marinate", "sprinkle", "arrange", "layer", "flip", "reduce",
];

/// Common ingredient words used when scoring free-form comments.
pub const INGREDIENT_WORDS: &[&str] = &[
    "flour", "sugar", "butter", "egg", "eggs", "salt", "pepper", "oil", "garlic", "onion",
    "milk", "cream", "cheese", "water", "vanilla", "baking", "yeast", "honey", "lemon",
    "chicken", "beef", "rice", "pasta", "tomato", "tomatoes", "sauce", "vinegar", "ginger",
    "soy", "cinnamon", "chocolate", "cocoa", "parsley", "basil",
];

/// Words that start a "name" which is really a time or temperature.
pub const NON_INGREDIENT_LEADS: &[&str] = &[
    "minute", "minutes", "min", "mins", "hour", "hours", "hr", "hrs", "second", "seconds",
    "degree", "degrees", "°", "serving", "servings", "people", "person", "portions", "days",
    "times", "inch", "inches", "cm",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_unit() {
        assert_eq!(canonical_unit("Cups"), Some("cup"));
        assert_eq!(canonical_unit("tbsp."), Some("tbsp"));
        assert_eq!(canonical_unit("Tablespoons"), Some("tbsp"));
        assert_eq!(canonical_unit("lbs"), Some("lb"));
        assert_eq!(canonical_unit("g"), Some("g"));
        assert_eq!(canonical_unit("handful"), Some("handful"));
        assert_eq!(canonical_unit("bowl"), None);
    }
}
