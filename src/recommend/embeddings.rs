use serde::Serialize;
use std::collections::HashMap;

use crate::catalog::{IngredientCatalog, IngredientRecord, CATEGORY_COUNT};
use crate::recommend::DietaryRestriction;

/// 8 normalized nutrition values + 5 property values + category one-hot (10)
/// + flavor one-hot (8) + allergen one-hot (5).
pub const EMBEDDING_DIM: usize = 36;

const FLAVOR_SLOTS: [&str; 8] = [
    "sweet", "nutty", "fruity", "bitter", "tart", "spicy", "earthy", "creamy",
];
const ALLERGEN_SLOTS: [&str; 5] = ["tree_nuts", "milk", "soy", "gluten", "eggs"];

/// Hand-built feature embedding of one ingredient. No external model: the
/// vector is assembled directly from catalog fields, so similarity stays
/// deterministic and dependency-free.
fn embed(record: &IngredientRecord) -> [f32; EMBEDDING_DIM] {
    let mut v = [0.0f32; EMBEDDING_DIM];
    let n = &record.nutrition;
    let p = &record.properties;

    v[0] = n.protein_g / 100.0;
    v[1] = n.fiber_g / 50.0;
    v[2] = n.sugars_g / 100.0;
    v[3] = n.total_fat_g / 100.0;
    v[4] = n.calories_per_100g / 1000.0;
    v[5] = n.iron_mg / 20.0;
    v[6] = n.calcium_mg / 1000.0;
    v[7] = n.potassium_mg / 3000.0;

    v[8] = p.glycemic_index / 100.0;
    v[9] = p.antioxidant_score / 100.0;
    v[10] = p.processing_level as f32 / 5.0;
    v[11] = p.organic_score;
    v[12] = p.sustainability_score;

    v[13 + record.category.one_hot_index()] = 1.0;

    let flavor_base = 13 + CATEGORY_COUNT;
    for flavor in &record.flavor_profile {
        if let Some(slot) = FLAVOR_SLOTS.iter().position(|f| f == flavor) {
            v[flavor_base + slot] = 1.0;
        }
    }

    let allergen_base = flavor_base + FLAVOR_SLOTS.len();
    for allergen in &record.allergens {
        if let Some(slot) = ALLERGEN_SLOTS.iter().position(|a| a == allergen) {
            v[allergen_base + slot] = 1.0;
        }
    }

    v
}

fn cosine_similarity(a: &[f32; EMBEDDING_DIM], b: &[f32; EMBEDDING_DIM]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[derive(Debug, Clone, Serialize)]
pub struct SubstitutionSuggestion {
    pub name: String,
    pub similarity: f32,
    pub reason: String,
}

/// Precomputed embedding table over the whole catalog.
pub struct IngredientEmbeddings {
    names: Vec<String>,
    vectors: Vec<[f32; EMBEDDING_DIM]>,
    index: HashMap<String, usize>,
}

impl IngredientEmbeddings {
    pub fn build(catalog: &IngredientCatalog) -> Self {
        // Sorted by name so suggestion ordering is stable across runs.
        let mut entries: Vec<(&String, &IngredientRecord)> = catalog.records().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));

        let mut names = Vec::with_capacity(entries.len());
        let mut vectors = Vec::with_capacity(entries.len());
        for (name, record) in entries {
            vectors.push(embed(record));
            names.push(name.clone());
        }

        let index = names
            .iter()
            .enumerate()
            .map(|(i, n)| (n.clone(), i))
            .collect();

        Self {
            names,
            vectors,
            index,
        }
    }

    /// Rank catalog ingredients by cosine similarity to `ingredient_name`,
    /// excluding the ingredient itself and any candidate carrying an allergen
    /// disallowed by the given restrictions. Empty when the name is unknown.
    pub fn suggest_substitutions(
        &self,
        catalog: &IngredientCatalog,
        ingredient_name: &str,
        restrictions: &[DietaryRestriction],
        top_n: usize,
    ) -> Vec<SubstitutionSuggestion> {
        let name = ingredient_name.to_lowercase();
        let Some(&query_idx) = self.index.get(&name) else {
            return Vec::new();
        };
        let query = &self.vectors[query_idx];
        let query_record = match catalog.get(&name) {
            Some(record) => record,
            None => return Vec::new(),
        };

        let disallowed: Vec<&str> = restrictions
            .iter()
            .flat_map(|r| r.disallowed_allergens().iter().copied())
            .collect();

        let mut ranked: Vec<(usize, f32)> = self
            .vectors
            .iter()
            .enumerate()
            .filter(|(idx, _)| *idx != query_idx)
            .map(|(idx, vector)| (idx, cosine_similarity(query, vector)))
            .collect();
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        let mut suggestions = Vec::new();
        for (idx, similarity) in ranked {
            if suggestions.len() >= top_n {
                break;
            }
            let candidate_name = &self.names[idx];
            let Some(candidate) = catalog.get(candidate_name) else {
                continue;
            };
            if candidate
                .allergens
                .iter()
                .any(|a| disallowed.contains(&a.as_str()))
            {
                continue;
            }

            suggestions.push(SubstitutionSuggestion {
                name: candidate_name.clone(),
                similarity,
                reason: substitution_reason(&name, query_record, candidate),
            });
        }
        suggestions
    }
}

fn substitution_reason(
    original_name: &str,
    original: &IngredientRecord,
    candidate: &IngredientRecord,
) -> String {
    if candidate.category == original.category {
        return format!("Same category with a similar nutritional profile to {original_name}");
    }

    let shared_flavor = candidate
        .flavor_profile
        .iter()
        .find(|f| original.flavor_profile.contains(f));
    if let Some(flavor) = shared_flavor {
        return format!("Shares the {flavor} flavor of {original_name}");
    }

    if !candidate.texture.is_empty() && candidate.texture == original.texture {
        return format!("Similar {} texture to {original_name}", candidate.texture);
    }

    if (candidate.nutrition.protein_g - original.nutrition.protein_g).abs() < 5.0 {
        return format!("Comparable protein content to {original_name}");
    }

    format!("Similar nutritional profile to {original_name}")
}
