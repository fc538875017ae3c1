use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::warn;

use crate::catalog::{Category, IngredientCatalog, IngredientProperties, NutrientProfile};
use crate::error::AnalysisError;
use crate::scoring::HealthScorer;

/// Applies a callback macro to every nutrient field, in catalog order.
macro_rules! with_nutrient_fields {
    ($cb:ident) => {
        $cb!(
            calories_per_100g,
            protein_g,
            total_fat_g,
            saturated_fat_g,
            carbohydrates_g,
            sugars_g,
            fiber_g,
            sodium_mg,
            potassium_mg,
            vitamin_c_mg,
            calcium_mg,
            iron_mg
        )
    };
}

fn scaled_profile(profile: &NutrientProfile, factor: f32) -> NutrientProfile {
    macro_rules! scale {
        ($($field:ident),*) => {
            NutrientProfile { $($field: profile.$field * factor),* }
        };
    }
    with_nutrient_fields!(scale)
}

fn accumulate(total: &mut NutrientProfile, contribution: &NutrientProfile) {
    macro_rules! add {
        ($($field:ident),*) => {
            { $(total.$field += contribution.$field;)* }
        };
    }
    with_nutrient_fields!(add)
}

fn profile_to_map(profile: &NutrientProfile) -> HashMap<String, f32> {
    macro_rules! to_map {
        ($($field:ident),*) => {
            HashMap::from([$((stringify!($field).to_string(), profile.$field)),*])
        };
    }
    with_nutrient_fields!(to_map)
}

/// One line of a recipe. Lines with the same name are NOT merged; each
/// contributes independently.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeIngredientLine {
    pub name: String,
    pub amount_g: f32,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct MacroBreakdown {
    pub protein_percent: f32,
    pub carb_percent: f32,
    pub fat_percent: f32,
    pub protein_calories: f32,
    pub carb_calories: f32,
    pub fat_calories: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct IngredientContribution {
    pub name: String,
    pub amount_g: f32,
    pub nutrition: NutrientProfile,
    pub properties: IngredientProperties,
    pub category: Category,
}

/// Full analysis of one recipe. Field names are a serialization contract
/// that downstream consumers key on.
#[derive(Debug, Clone, Serialize)]
pub struct NutritionAnalysis {
    pub nutrition_per_serving: NutrientProfile,
    pub nutrition_per_100g: NutrientProfile,
    pub total_weight_g: f32,
    pub health_score: f32,
    pub health_confidence: f32,
    pub health_explanation: String,
    pub macros: MacroBreakdown,
    pub allergens: Vec<String>,
    pub glycemic_load: f32,
    pub sustainability_score: f32,
    pub ingredient_breakdown: Vec<IngredientContribution>,
    pub nutritional_highlights: Vec<String>,
    pub recommendations: Vec<String>,
}

impl NutritionAnalysis {
    fn empty() -> Self {
        Self {
            nutrition_per_serving: NutrientProfile::default(),
            nutrition_per_100g: NutrientProfile::default(),
            total_weight_g: 0.0,
            health_score: 0.0,
            health_confidence: 0.0,
            health_explanation: "No ingredients provided".to_string(),
            macros: MacroBreakdown::default(),
            allergens: Vec::new(),
            glycemic_load: 0.0,
            sustainability_score: 0.0,
            ingredient_breakdown: Vec::new(),
            nutritional_highlights: Vec::new(),
            recommendations: Vec::new(),
        }
    }
}

fn round1(value: f32) -> f32 {
    (value * 10.0).round() / 10.0
}

fn round2(value: f32) -> f32 {
    (value * 100.0).round() / 100.0
}

/// Turns recipe lines into a full [`NutritionAnalysis`].
///
/// Holds shared read-only handles to the catalog and the scorer; every call
/// is a pure function of its input, so concurrent use needs no locking.
pub struct NutritionAggregator {
    catalog: Arc<IngredientCatalog>,
    scorer: Arc<HealthScorer>,
}

impl NutritionAggregator {
    pub fn new(catalog: Arc<IngredientCatalog>, scorer: Arc<HealthScorer>) -> Self {
        Self { catalog, scorer }
    }

    pub fn calculate_snack_nutrition(
        &self,
        lines: &[RecipeIngredientLine],
    ) -> Result<NutritionAnalysis, AnalysisError> {
        if lines.is_empty() {
            return Ok(NutritionAnalysis::empty());
        }

        for line in lines {
            if line.name.trim().is_empty() {
                return Err(AnalysisError::InvalidInput(
                    "ingredient name must not be empty".to_string(),
                ));
            }
            if !(line.amount_g > 0.0) {
                return Err(AnalysisError::InvalidInput(format!(
                    "amount for '{}' must be positive, got {}",
                    line.name, line.amount_g
                )));
            }
        }

        let mut totals = NutrientProfile::default();
        let mut total_weight = 0.0f32;
        let mut allergens = BTreeSet::new();
        let mut breakdown = Vec::new();

        for line in lines {
            let name = line.name.to_lowercase();
            let Some(record) = self.catalog.get(&name) else {
                // Unknown names degrade gracefully: the line contributes
                // nothing and the rest of the recipe is still analyzed.
                warn!(ingredient = %name, "Ingredient not found in catalog, skipping");
                continue;
            };

            let contribution = scaled_profile(&record.nutrition, line.amount_g / 100.0);
            accumulate(&mut totals, &contribution);
            allergens.extend(record.allergens.iter().cloned());
            breakdown.push(IngredientContribution {
                name,
                amount_g: line.amount_g,
                nutrition: contribution,
                properties: record.properties.clone(),
                category: record.category,
            });
            total_weight += line.amount_g;
        }

        let nutrition_per_100g = if total_weight > 0.0 {
            scaled_profile(&totals, 100.0 / total_weight)
        } else {
            totals.clone()
        };

        let prediction = self.scorer.predict(&profile_to_map(&nutrition_per_100g));
        let macros = calculate_macros(&totals);
        let glycemic_load = calculate_glycemic_load(&breakdown);
        let sustainability_score = calculate_sustainability_score(&breakdown);
        let nutritional_highlights = generate_highlights(&nutrition_per_100g, &breakdown);
        let recommendations = generate_recommendations(&nutrition_per_100g, &breakdown);

        Ok(NutritionAnalysis {
            nutrition_per_serving: totals,
            nutrition_per_100g,
            total_weight_g: total_weight,
            health_score: prediction.health_score,
            health_confidence: prediction.confidence,
            health_explanation: prediction.explanation,
            macros,
            allergens: allergens.into_iter().collect(),
            glycemic_load,
            sustainability_score,
            ingredient_breakdown: breakdown,
            nutritional_highlights,
            recommendations,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct IngredientContributionShare {
    pub name: String,
    pub calorie_contribution_percent: f32,
    pub protein_contribution_g: f32,
    pub fiber_contribution_g: f32,
    pub sugar_contribution_g: f32,
    pub key_benefits: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ContributionReport {
    pub ingredient_contributions: Vec<IngredientContributionShare>,
    pub total_ingredients: usize,
    pub primary_contributor: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricDifference {
    pub absolute_difference: f32,
    pub percent_difference: f32,
    pub version_a_value: f32,
    pub version_b_value: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct SnackComparison {
    pub version_a: NutritionAnalysis,
    pub version_b: NutritionAnalysis,
    pub differences: std::collections::BTreeMap<String, MetricDifference>,
    pub winner_by_metric: std::collections::BTreeMap<String, String>,
    pub overall_recommendation: String,
}

impl NutritionAggregator {
    /// Rank each ingredient by its share of the recipe's calories, with the
    /// grams it contributes for the headline nutrients and its catalog-level
    /// benefit tags.
    pub fn analyze_ingredient_contribution(
        &self,
        lines: &[RecipeIngredientLine],
    ) -> Result<ContributionReport, AnalysisError> {
        let analysis = self.calculate_snack_nutrition(lines)?;
        let total_calories = analysis.nutrition_per_serving.calories_per_100g;

        let mut contributions: Vec<IngredientContributionShare> = analysis
            .ingredient_breakdown
            .iter()
            .map(|entry| IngredientContributionShare {
                name: entry.name.clone(),
                calorie_contribution_percent: round1(
                    entry.nutrition.calories_per_100g / total_calories.max(1.0) * 100.0,
                ),
                protein_contribution_g: entry.nutrition.protein_g,
                fiber_contribution_g: entry.nutrition.fiber_g,
                sugar_contribution_g: entry.nutrition.sugars_g,
                key_benefits: self
                    .catalog
                    .get(&entry.name)
                    .map(ingredient_benefits)
                    .unwrap_or_default(),
            })
            .collect();

        contributions.sort_by(|a, b| {
            b.calorie_contribution_percent
                .partial_cmp(&a.calorie_contribution_percent)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        Ok(ContributionReport {
            total_ingredients: contributions.len(),
            primary_contributor: contributions.first().map(|c| c.name.clone()),
            ingredient_contributions: contributions,
        })
    }

    /// Side-by-side diff of two recipe versions over the headline metrics,
    /// with a per-metric winner and an overall verdict.
    pub fn compare_snack_versions(
        &self,
        version_a: &[RecipeIngredientLine],
        version_b: &[RecipeIngredientLine],
    ) -> Result<SnackComparison, AnalysisError> {
        let analysis_a = self.calculate_snack_nutrition(version_a)?;
        let analysis_b = self.calculate_snack_nutrition(version_b)?;

        // Lower is better only for sugars and calories.
        let metrics: [(&str, f32, f32, bool); 6] = [
            (
                "health_score",
                analysis_a.health_score,
                analysis_b.health_score,
                true,
            ),
            (
                "protein_g",
                analysis_a.nutrition_per_100g.protein_g,
                analysis_b.nutrition_per_100g.protein_g,
                true,
            ),
            (
                "fiber_g",
                analysis_a.nutrition_per_100g.fiber_g,
                analysis_b.nutrition_per_100g.fiber_g,
                true,
            ),
            (
                "sugars_g",
                analysis_a.nutrition_per_100g.sugars_g,
                analysis_b.nutrition_per_100g.sugars_g,
                false,
            ),
            (
                "calories_per_100g",
                analysis_a.nutrition_per_100g.calories_per_100g,
                analysis_b.nutrition_per_100g.calories_per_100g,
                false,
            ),
            (
                "sustainability_score",
                analysis_a.sustainability_score,
                analysis_b.sustainability_score,
                true,
            ),
        ];

        let mut differences = std::collections::BTreeMap::new();
        let mut winner_by_metric = std::collections::BTreeMap::new();

        for (metric, val_a, val_b, higher_is_better) in metrics {
            let diff = val_b - val_a;
            differences.insert(
                metric.to_string(),
                MetricDifference {
                    absolute_difference: round2(diff),
                    percent_difference: round1(diff / val_a.max(0.1) * 100.0),
                    version_a_value: round2(val_a),
                    version_b_value: round2(val_b),
                },
            );
            let a_wins = if higher_is_better {
                val_a > val_b
            } else {
                val_a < val_b
            };
            winner_by_metric.insert(metric.to_string(), if a_wins { "A" } else { "B" }.to_string());
        }

        let a_wins = winner_by_metric.values().filter(|w| *w == "A").count();
        let b_wins = winner_by_metric.len() - a_wins;
        let overall_recommendation = if a_wins > b_wins {
            "Version A is nutritionally superior"
        } else if b_wins > a_wins {
            "Version B is nutritionally superior"
        } else {
            "Both versions are nutritionally similar"
        }
        .to_string();

        Ok(SnackComparison {
            version_a: analysis_a,
            version_b: analysis_b,
            differences,
            winner_by_metric,
            overall_recommendation,
        })
    }
}

/// Catalog-level benefit tags for one ingredient, capped at 3.
fn ingredient_benefits(record: &crate::catalog::IngredientRecord) -> Vec<String> {
    let n = &record.nutrition;
    let p = &record.properties;
    let mut benefits = Vec::new();

    if n.protein_g > 15.0 {
        benefits.push("High protein");
    }
    if n.fiber_g > 10.0 {
        benefits.push("High fiber");
    }
    if p.antioxidant_score > 70.0 {
        benefits.push("Rich antioxidants");
    }
    if n.total_fat_g > 10.0 && n.saturated_fat_g / n.total_fat_g.max(1.0) < 0.3 {
        benefits.push("Healthy fats");
    }
    if p.glycemic_index < 35.0 {
        benefits.push("Low glycemic");
    }
    if n.iron_mg > 3.0 {
        benefits.push("Iron source");
    }
    if n.calcium_mg > 100.0 {
        benefits.push("Calcium source");
    }
    if n.potassium_mg > 400.0 {
        benefits.push("Potassium source");
    }

    benefits.truncate(3);
    benefits.into_iter().map(str::to_string).collect()
}

/// Calorie split from per-serving totals, 4/4/9 kcal per gram.
fn calculate_macros(per_serving: &NutrientProfile) -> MacroBreakdown {
    let protein_calories = per_serving.protein_g * 4.0;
    let carb_calories = per_serving.carbohydrates_g * 4.0;
    let fat_calories = per_serving.total_fat_g * 9.0;
    let total = (protein_calories + carb_calories + fat_calories).max(1.0);

    MacroBreakdown {
        protein_percent: round1(protein_calories / total * 100.0),
        carb_percent: round1(carb_calories / total * 100.0),
        fat_percent: round1(fat_calories / total * 100.0),
        protein_calories,
        carb_calories,
        fat_calories,
    }
}

/// Glycemic load uses each ingredient's own index against its own absolute
/// carb contribution, not the recipe average.
fn calculate_glycemic_load(breakdown: &[IngredientContribution]) -> f32 {
    let total: f32 = breakdown
        .iter()
        .map(|entry| entry.properties.glycemic_index * entry.nutrition.carbohydrates_g / 100.0)
        .sum();
    round1(total)
}

fn calculate_sustainability_score(breakdown: &[IngredientContribution]) -> f32 {
    if breakdown.is_empty() {
        return 0.0;
    }
    let weighted: f32 = breakdown
        .iter()
        .map(|entry| entry.properties.sustainability_score * entry.amount_g)
        .sum();
    let weight: f32 = breakdown.iter().map(|entry| entry.amount_g).sum();
    round1(weighted / weight.max(1.0) * 100.0)
}

fn generate_highlights(
    per_100g: &NutrientProfile,
    breakdown: &[IngredientContribution],
) -> Vec<String> {
    let mut highlights = Vec::new();

    if per_100g.protein_g > 20.0 {
        highlights.push(format!(
            "Excellent protein source ({:.1}g per 100g)",
            per_100g.protein_g
        ));
    } else if per_100g.protein_g > 10.0 {
        highlights.push(format!(
            "Good protein content ({:.1}g per 100g)",
            per_100g.protein_g
        ));
    }

    if per_100g.fiber_g > 15.0 {
        highlights.push(format!(
            "Very high fiber content ({:.1}g per 100g)",
            per_100g.fiber_g
        ));
    } else if per_100g.fiber_g > 8.0 {
        highlights.push(format!(
            "High fiber content ({:.1}g per 100g)",
            per_100g.fiber_g
        ));
    } else if per_100g.fiber_g > 3.0 {
        highlights.push(format!(
            "Good fiber source ({:.1}g per 100g)",
            per_100g.fiber_g
        ));
    }

    if per_100g.sugars_g < 5.0 {
        highlights.push("Low sugar content".to_string());
    } else if per_100g.sugars_g > 25.0 {
        highlights.push(format!(
            "High sugar content ({:.1}g per 100g)",
            per_100g.sugars_g
        ));
    }

    let antioxidant_rich: Vec<&str> = breakdown
        .iter()
        .filter(|entry| entry.properties.antioxidant_score > 70.0)
        .map(|entry| entry.name.as_str())
        .collect();
    if !antioxidant_rich.is_empty() {
        highlights.push(format!(
            "Rich in antioxidants from {}",
            antioxidant_rich.join(", ")
        ));
    }

    let has_whole_nuts = breakdown.iter().any(|entry| {
        entry.category == Category::NutsSeeds && entry.properties.processing_level <= 2
    });
    if has_whole_nuts {
        highlights.push("Contains healthy unsaturated fats".to_string());
    }

    if per_100g.iron_mg > 5.0 {
        highlights.push(format!(
            "Good source of iron ({:.1}mg per 100g)",
            per_100g.iron_mg
        ));
    }
    if per_100g.calcium_mg > 100.0 {
        highlights.push(format!(
            "Good source of calcium ({:.0}mg per 100g)",
            per_100g.calcium_mg
        ));
    }
    if per_100g.potassium_mg > 500.0 {
        highlights.push(format!(
            "High in potassium ({:.0}mg per 100g)",
            per_100g.potassium_mg
        ));
    }

    highlights.truncate(5);
    highlights
}

fn generate_recommendations(
    per_100g: &NutrientProfile,
    breakdown: &[IngredientContribution],
) -> Vec<String> {
    let mut recommendations = Vec::new();

    if per_100g.protein_g < 8.0 {
        recommendations.push(
            "Consider adding protein powder, nuts, or seeds to increase protein content"
                .to_string(),
        );
    }
    if per_100g.fiber_g < 3.0 {
        recommendations.push("Add more fiber with chia seeds, flax seeds, or oats".to_string());
    }
    if per_100g.sugars_g > 20.0 {
        recommendations.push(
            "Consider reducing added sweeteners or using lower-sugar alternatives like stevia"
                .to_string(),
        );
    }
    if per_100g.sodium_mg > 400.0 {
        recommendations
            .push("Consider reducing sodium content for better heart health".to_string());
    }

    let highly_processed = breakdown
        .iter()
        .filter(|entry| entry.properties.processing_level > 3)
        .count();
    if highly_processed as f32 > breakdown.len() as f32 * 0.5 {
        recommendations.push(
            "Try incorporating more whole food ingredients to reduce processing".to_string(),
        );
    }

    let mean_antioxidant: f32 = breakdown
        .iter()
        .map(|entry| entry.properties.antioxidant_score)
        .sum::<f32>()
        / breakdown.len().max(1) as f32;
    if mean_antioxidant < 50.0 {
        recommendations.push(
            "Add berries, dark chocolate, or cinnamon to boost antioxidant content".to_string(),
        );
    }

    let macros = calculate_macros(per_100g);
    if macros.fat_percent > 60.0 {
        recommendations.push(
            "Consider adding more protein or complex carbs to balance macronutrients".to_string(),
        );
    } else if macros.carb_percent > 70.0 {
        recommendations.push("Add healthy fats or protein to slow sugar absorption".to_string());
    }

    recommendations.truncate(4);
    recommendations
}
