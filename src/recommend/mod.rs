pub mod embeddings;
pub mod engine;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

pub use embeddings::{IngredientEmbeddings, SubstitutionSuggestion};
pub use engine::RecommendationEngine;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthGoal {
    IncreaseProtein,
    ReduceSugar,
    IncreaseFiber,
    KetoFriendly,
    IncreaseAntioxidants,
}

impl HealthGoal {
    pub fn as_str(self) -> &'static str {
        match self {
            HealthGoal::IncreaseProtein => "increase_protein",
            HealthGoal::ReduceSugar => "reduce_sugar",
            HealthGoal::IncreaseFiber => "increase_fiber",
            HealthGoal::KetoFriendly => "keto_friendly",
            HealthGoal::IncreaseAntioxidants => "increase_antioxidants",
        }
    }

    /// Human form used in improvement summaries, e.g. "increase protein".
    pub fn display_name(self) -> String {
        self.as_str().replace('_', " ")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DietaryRestriction {
    Vegan,
    GlutenFree,
    NutFree,
    DairyFree,
    SoyFree,
}

impl DietaryRestriction {
    /// Allergen tags a candidate ingredient must not carry.
    pub fn disallowed_allergens(self) -> &'static [&'static str] {
        match self {
            DietaryRestriction::Vegan => &["milk", "eggs", "honey"],
            DietaryRestriction::GlutenFree => &["gluten"],
            DietaryRestriction::NutFree => &["tree_nuts"],
            DietaryRestriction::DairyFree => &["milk"],
            DietaryRestriction::SoyFree => &["soy"],
        }
    }
}
