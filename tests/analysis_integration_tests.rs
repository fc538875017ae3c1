use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use snacksense::analysis::{NutritionAggregator, RecipeIngredientLine};
use snacksense::catalog::IngredientCatalog;
use snacksense::recommend::{DietaryRestriction, HealthGoal, RecommendationEngine};
use snacksense::scoring::{HealthScorer, TrainingConfig};

/// One reduced-size training run shared across the whole file.
fn shared_scorer() -> Arc<HealthScorer> {
    static SCORER: OnceLock<Arc<HealthScorer>> = OnceLock::new();
    SCORER
        .get_or_init(|| {
            let mut config = TrainingConfig::default();
            config.n_samples = 1000;
            config.forest.n_estimators = 30;
            config.forest.max_depth = 10;
            Arc::new(HealthScorer::train(&config).expect("training failed"))
        })
        .clone()
}

fn aggregator() -> NutritionAggregator {
    let catalog = Arc::new(IngredientCatalog::builtin().expect("builtin catalog"));
    NutritionAggregator::new(catalog, shared_scorer())
}

fn engine() -> RecommendationEngine {
    let catalog = Arc::new(IngredientCatalog::builtin().expect("builtin catalog"));
    let aggregator = Arc::new(NutritionAggregator::new(catalog.clone(), shared_scorer()));
    RecommendationEngine::new(aggregator, catalog, None)
}

fn line(name: &str, amount_g: f32) -> RecipeIngredientLine {
    RecipeIngredientLine {
        name: name.to_string(),
        amount_g,
    }
}

#[test]
fn almonds_only_scenario() {
    let analysis = aggregator()
        .calculate_snack_nutrition(&[line("almonds", 100.0)])
        .unwrap();

    // multiplier is exactly 1: per-100g equals the catalog values
    assert_eq!(analysis.nutrition_per_100g.calories_per_100g, 579.0);
    assert_eq!(analysis.nutrition_per_100g.protein_g, 21.15);
    assert_eq!(analysis.nutrition_per_100g.total_fat_g, 49.93);
    assert_eq!(analysis.nutrition_per_100g.fiber_g, 12.5);
    assert!(
        analysis.health_score > 65.0,
        "high protein, high fiber, low sugar should score well, got {}",
        analysis.health_score
    );
    assert!((0.0..=1.0).contains(&analysis.health_confidence));
}

#[test]
fn per_100g_scales_from_per_serving() {
    let analysis = aggregator()
        .calculate_snack_nutrition(&[
            line("oats", 40.0),
            line("almonds", 30.0),
            line("dates", 30.0),
        ])
        .unwrap();

    let weight = analysis.total_weight_g;
    assert!(weight > 0.0);
    for (per_serving, per_100g) in [
        (
            analysis.nutrition_per_serving.protein_g,
            analysis.nutrition_per_100g.protein_g,
        ),
        (
            analysis.nutrition_per_serving.calories_per_100g,
            analysis.nutrition_per_100g.calories_per_100g,
        ),
        (
            analysis.nutrition_per_serving.sodium_mg,
            analysis.nutrition_per_100g.sodium_mg,
        ),
    ] {
        assert!((per_100g - per_serving / weight * 100.0).abs() < 1e-3);
    }
}

#[test]
fn scores_stay_clamped() {
    for recipe in [
        vec![line("almonds", 100.0)],
        vec![line("milk_chocolate", 100.0)],
        vec![line("honey", 100.0)],
        vec![line("chia_seeds", 50.0), line("dark_chocolate_70", 50.0)],
    ] {
        let analysis = aggregator().calculate_snack_nutrition(&recipe).unwrap();
        assert!((0.0..=100.0).contains(&analysis.health_score));
        assert!((0.0..=1.0).contains(&analysis.health_confidence));
        assert!(analysis.glycemic_load >= 0.0);
        assert!((0.0..=100.0).contains(&analysis.sustainability_score));
    }
}

#[test]
fn macro_percentages_sum_to_100() {
    let analysis = aggregator()
        .calculate_snack_nutrition(&[line("almonds", 40.0), line("dates", 40.0)])
        .unwrap();
    let sum = analysis.macros.protein_percent
        + analysis.macros.carb_percent
        + analysis.macros.fat_percent;
    assert!((sum - 100.0).abs() <= 0.2, "sum was {}", sum);
}

#[test]
fn aggregation_is_idempotent() {
    let agg = aggregator();
    let recipe = [line("walnuts", 35.0), line("maple_syrup", 10.0)];
    let a = agg.calculate_snack_nutrition(&recipe).unwrap();
    let b = agg.calculate_snack_nutrition(&recipe).unwrap();

    assert_eq!(a.health_score, b.health_score);
    assert_eq!(a.glycemic_load, b.glycemic_load);
    assert_eq!(
        serde_json::to_string(&a).unwrap(),
        serde_json::to_string(&b).unwrap()
    );
}

#[test]
fn unknown_ingredient_matches_valid_only_result() {
    let agg = aggregator();
    let with_unknown = agg
        .calculate_snack_nutrition(&[line("almonds", 60.0), line("moon dust", 20.0)])
        .unwrap();
    let valid_only = agg.calculate_snack_nutrition(&[line("almonds", 60.0)]).unwrap();

    assert_eq!(with_unknown.total_weight_g, valid_only.total_weight_g);
    assert_eq!(with_unknown.health_score, valid_only.health_score);
    assert_eq!(with_unknown.ingredient_breakdown.len(), 1);
}

#[test]
fn empty_recipe_is_all_zero() {
    let analysis = aggregator().calculate_snack_nutrition(&[]).unwrap();
    assert_eq!(analysis.total_weight_g, 0.0);
    assert_eq!(analysis.health_score, 0.0);
    assert_eq!(analysis.health_confidence, 0.0);
    assert!(analysis.ingredient_breakdown.is_empty());
    assert!(analysis.nutritional_highlights.is_empty());
}

#[test]
fn glycemic_load_does_not_decrease_with_amount() {
    let agg = aggregator();
    let mut previous = 0.0;
    for amount in [10.0, 30.0, 60.0, 120.0] {
        let analysis = agg
            .calculate_snack_nutrition(&[line("dates", amount), line("almonds", 30.0)])
            .unwrap();
        assert!(
            analysis.glycemic_load >= previous,
            "glycemic load dropped from {} to {} at {}g",
            previous,
            analysis.glycemic_load,
            amount
        );
        previous = analysis.glycemic_load;
    }
}

#[test]
fn serialized_analysis_uses_contract_field_names() {
    let analysis = aggregator()
        .calculate_snack_nutrition(&[line("almonds", 50.0)])
        .unwrap();
    let value: serde_json::Value =
        serde_json::from_str(&serde_json::to_string(&analysis).unwrap()).unwrap();
    let object = value.as_object().unwrap();

    for key in [
        "nutrition_per_serving",
        "nutrition_per_100g",
        "total_weight_g",
        "health_score",
        "health_confidence",
        "health_explanation",
        "macros",
        "allergens",
        "glycemic_load",
        "sustainability_score",
        "ingredient_breakdown",
        "nutritional_highlights",
        "recommendations",
    ] {
        assert!(object.contains_key(key), "missing field '{}'", key);
    }
}

#[test]
fn dairy_free_substitutions_exclude_milk() {
    let report = engine().suggest_substitutions("dark_chocolate_70", &[DietaryRestriction::DairyFree]);
    let catalog = IngredientCatalog::builtin().unwrap();

    assert!(!report.suggestions.is_empty());
    for suggestion in &report.suggestions {
        let record = catalog.get(&suggestion.name).unwrap();
        assert!(
            !record.allergens.contains(&"milk".to_string()),
            "{} carries milk despite dairy_free",
            suggestion.name
        );
    }
}

#[test]
fn explanation_tiering_scenario() {
    let prediction = shared_scorer().predict(&HashMap::from([
        ("protein_g".to_string(), 25.0),
        ("fiber_g".to_string(), 12.0),
        ("sugars_g".to_string(), 3.0),
    ]));

    assert!(prediction.explanation.contains("High protein content"));
    assert!(prediction
        .explanation
        .contains("High fiber content significantly boosts"));
    assert!(!prediction.explanation.contains("High sugar content"));
}

#[test]
fn neutral_feature_vector_scores_near_base() {
    // Everything at the no-bonus, no-penalty point of the label formula.
    let prediction = shared_scorer().predict(&HashMap::from([
        ("calories_per_100g".to_string(), 300.0),
        ("glycemic_index".to_string(), 50.0),
        ("antioxidant_score".to_string(), 0.0),
        ("processing_level".to_string(), 1.0),
        ("artificial_additives".to_string(), 0.0),
        ("preservatives".to_string(), 0.0),
        ("allergen_count".to_string(), 0.0),
        ("organic_score".to_string(), 0.0),
        ("sustainability_score".to_string(), 0.0),
    ]));

    // The trained model approximates the formula, it does not reproduce it.
    assert!(
        (prediction.health_score - 50.0).abs() <= 15.0,
        "expected roughly base score, got {}",
        prediction.health_score
    );
}

#[test]
fn keto_recommendation_analysis_has_low_carb_share() {
    let recommendation = engine()
        .generate_snack_recommendation(&[HealthGoal::KetoFriendly], &[])
        .unwrap();
    assert!(recommendation.analysis.macros.carb_percent < 40.0);
}

// Full-size training (5000 samples, 200 trees), slow in debug builds.
#[test]
#[ignore]
fn full_size_model_scores_almonds_high() {
    let scorer = Arc::new(HealthScorer::train(&TrainingConfig::default()).unwrap());
    let catalog = Arc::new(IngredientCatalog::builtin().unwrap());
    let aggregator = NutritionAggregator::new(catalog, scorer);

    let analysis = aggregator
        .calculate_snack_nutrition(&[line("almonds", 100.0)])
        .unwrap();
    assert!(
        analysis.health_score >= 70.0,
        "got {}",
        analysis.health_score
    );
}
