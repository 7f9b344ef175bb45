//! Union of candidate lists from several sources.

use std::collections::HashMap;

use crate::model::CandidateIngredient;
use crate::normalize::NameNormalizer;

/// Keys shorter than this are too ambiguous to merge on ("oz", "a").
const MIN_KEY_CHARS: usize = 3;

/// Merge `secondary` candidates into `primary`.
///
/// Every primary element appears in the result in its original order, with
/// its name and any present quantity/unit kept. A secondary element is
/// appended when no entry already in the result shares its normalized key.
/// On a collision, a missing quantity or unit on the existing entry (primary
/// or appended) is filled from the secondary one; present values are never
/// overwritten.
pub fn merge(
    primary: Vec<CandidateIngredient>,
    secondary: Vec<CandidateIngredient>,
    normalizer: &NameNormalizer,
) -> Vec<CandidateIngredient> {
    let mut result = primary;
    let mut index: HashMap<String, usize> = HashMap::new();

    for (position, candidate) in result.iter().enumerate() {
        let key = normalizer.normalize(&candidate.raw_name);
        index.entry(key).or_insert(position);
    }

    for candidate in secondary {
        let key = normalizer.normalize(&candidate.raw_name);
        if key.chars().count() < MIN_KEY_CHARS {
            continue;
        }

        match index.get(&key) {
            Some(&position) => fill_gaps(&mut result[position], candidate),
            None => {
                index.insert(key, result.len());
                result.push(candidate);
            }
        }
    }

    result
}

fn fill_gaps(existing: &mut CandidateIngredient, incoming: CandidateIngredient) {
    if existing.quantity.is_none() {
        existing.quantity = incoming.quantity;
    }
    if existing.unit.is_none() {
        existing.unit = incoming.unit;
    }
}
