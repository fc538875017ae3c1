use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::warn;

/// Embedded copy of the reference catalog, used when no external document is given.
const BUILTIN_CATALOG_JSON: &str = include_str!("../data/ingredients.json");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    NutsSeeds,
    Fruits,
    Chocolate,
    Grains,
    Protein,
    Sweeteners,
    Coconut,
    Spices,
    Flavorings,
    Other,
}

pub const CATEGORY_COUNT: usize = 10;

impl Category {
    /// Stable index used for one-hot encoding in the similarity embedding.
    pub fn one_hot_index(self) -> usize {
        match self {
            Category::NutsSeeds => 0,
            Category::Fruits => 1,
            Category::Chocolate => 2,
            Category::Grains => 3,
            Category::Protein => 4,
            Category::Sweeteners => 5,
            Category::Coconut => 6,
            Category::Spices => 7,
            Category::Flavorings => 8,
            Category::Other => 9,
        }
    }
}

/// Nutrient values per 100g of ingredient. Field names match the persisted
/// catalog document and the analysis output contract verbatim.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NutrientProfile {
    pub calories_per_100g: f32,
    pub protein_g: f32,
    pub total_fat_g: f32,
    pub saturated_fat_g: f32,
    pub carbohydrates_g: f32,
    pub sugars_g: f32,
    pub fiber_g: f32,
    pub sodium_mg: f32,
    pub potassium_mg: f32,
    pub vitamin_c_mg: f32,
    pub calcium_mg: f32,
    pub iron_mg: f32,
}

impl NutrientProfile {
    fn all_non_negative(&self) -> bool {
        self.calories_per_100g >= 0.0
            && self.protein_g >= 0.0
            && self.total_fat_g >= 0.0
            && self.saturated_fat_g >= 0.0
            && self.carbohydrates_g >= 0.0
            && self.sugars_g >= 0.0
            && self.fiber_g >= 0.0
            && self.sodium_mg >= 0.0
            && self.potassium_mg >= 0.0
            && self.vitamin_c_mg >= 0.0
            && self.calcium_mg >= 0.0
            && self.iron_mg >= 0.0
    }
}

/// Categorical quality properties of an ingredient.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IngredientProperties {
    pub glycemic_index: f32,
    pub antioxidant_score: f32,
    pub processing_level: u32,
    pub artificial_additives: u32,
    pub preservatives: u32,
    pub allergen_count: u32,
    pub organic_score: f32,
    pub sustainability_score: f32,
}

impl IngredientProperties {
    fn within_bounds(&self) -> bool {
        (0.0..=100.0).contains(&self.glycemic_index)
            && (0.0..=100.0).contains(&self.antioxidant_score)
            && (1..=5).contains(&self.processing_level)
            && (0.0..=1.0).contains(&self.organic_score)
            && (0.0..=1.0).contains(&self.sustainability_score)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngredientRecord {
    pub category: Category,
    pub nutrition: NutrientProfile,
    pub properties: IngredientProperties,
    #[serde(default)]
    pub allergens: Vec<String>,
    #[serde(default)]
    pub flavor_profile: Vec<String>,
    #[serde(default)]
    pub texture: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub description: String,
}

/// Read-only name → record mapping, loaded once at startup.
pub struct IngredientCatalog {
    records: HashMap<String, IngredientRecord>,
}

impl IngredientCatalog {
    /// Load the catalog from a persisted JSON document.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read ingredient catalog at {:?}", path))?;
        Self::from_json_str(&content)
            .with_context(|| format!("Failed to parse ingredient catalog at {:?}", path))
    }

    /// Build the catalog from the embedded reference document.
    pub fn builtin() -> Result<Self> {
        Self::from_json_str(BUILTIN_CATALOG_JSON).context("Embedded ingredient catalog is invalid")
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let raw: HashMap<String, IngredientRecord> =
            serde_json::from_str(json).context("Ingredient catalog is not valid JSON")?;

        let mut records = HashMap::with_capacity(raw.len());
        for (name, record) in raw {
            // Records violating the documented bounds are skipped rather than
            // rejecting the whole catalog.
            if !record.nutrition.all_non_negative() || !record.properties.within_bounds() {
                warn!(ingredient = %name, "Skipping catalog entry with out-of-bounds values");
                continue;
            }
            records.insert(name.to_lowercase(), record);
        }

        if records.is_empty() {
            return Err(anyhow::anyhow!("No valid ingredient records in catalog"));
        }
        Ok(Self { records })
    }

    /// Case-normalized lookup. `None` is non-fatal for callers: the
    /// aggregator skips missing ingredients instead of aborting.
    pub fn get(&self, name: &str) -> Option<&IngredientRecord> {
        self.records.get(&name.to_lowercase())
    }

    pub fn all_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.records.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> impl Iterator<Item = (&String, &IngredientRecord)> {
        self.records.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_builtin_catalog_loads() -> Result<()> {
        let catalog = IngredientCatalog::builtin()?;
        assert!(catalog.len() >= 20, "Expected a reasonably sized catalog");

        let almonds = catalog.get("almonds").expect("almonds must be present");
        assert_eq!(almonds.category, Category::NutsSeeds);
        assert_eq!(almonds.nutrition.calories_per_100g, 579.0);
        assert_eq!(almonds.nutrition.protein_g, 21.15);
        assert_eq!(almonds.nutrition.total_fat_g, 49.93);
        assert_eq!(almonds.nutrition.fiber_g, 12.5);
        assert_eq!(almonds.allergens, vec!["tree_nuts".to_string()]);
        Ok(())
    }

    #[test]
    fn test_lookup_is_case_normalized() -> Result<()> {
        let catalog = IngredientCatalog::builtin()?;
        assert!(catalog.get("Almonds").is_some());
        assert!(catalog.get("ALMONDS").is_some());
        assert!(catalog.get("unobtainium").is_none());
        Ok(())
    }

    #[test]
    fn test_load_from_file() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        write!(file, "{}", BUILTIN_CATALOG_JSON)?;
        file.flush()?;

        let catalog = IngredientCatalog::load(file.path())?;
        assert_eq!(catalog.len(), IngredientCatalog::builtin()?.len());
        Ok(())
    }

    #[test]
    fn test_out_of_bounds_record_is_skipped() -> Result<()> {
        let json = r#"{
            "good": {
                "category": "other",
                "nutrition": {
                    "calories_per_100g": 100, "protein_g": 5, "total_fat_g": 2,
                    "saturated_fat_g": 1, "carbohydrates_g": 10, "sugars_g": 3,
                    "fiber_g": 2, "sodium_mg": 10, "potassium_mg": 100,
                    "vitamin_c_mg": 1, "calcium_mg": 20, "iron_mg": 1
                },
                "properties": {
                    "glycemic_index": 50, "antioxidant_score": 20, "processing_level": 2,
                    "artificial_additives": 0, "preservatives": 0, "allergen_count": 0,
                    "organic_score": 0.5, "sustainability_score": 0.5
                }
            },
            "bad": {
                "category": "other",
                "nutrition": {
                    "calories_per_100g": -5, "protein_g": 5, "total_fat_g": 2,
                    "saturated_fat_g": 1, "carbohydrates_g": 10, "sugars_g": 3,
                    "fiber_g": 2, "sodium_mg": 10, "potassium_mg": 100,
                    "vitamin_c_mg": 1, "calcium_mg": 20, "iron_mg": 1
                },
                "properties": {
                    "glycemic_index": 50, "antioxidant_score": 20, "processing_level": 2,
                    "artificial_additives": 0, "preservatives": 0, "allergen_count": 0,
                    "organic_score": 0.5, "sustainability_score": 0.5
                }
            }
        }"#;

        let catalog = IngredientCatalog::from_json_str(json)?;
        assert_eq!(catalog.len(), 1);
        assert!(catalog.get("good").is_some());
        assert!(catalog.get("bad").is_none());
        Ok(())
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let result = IngredientCatalog::load(Path::new("no_such_catalog.json"));
        assert!(result.is_err());
    }
}
