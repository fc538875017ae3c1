use serde::Serialize;
use std::sync::Arc;
use tracing::warn;

use crate::analysis::{NutritionAggregator, NutritionAnalysis, RecipeIngredientLine};
use crate::api_connection::TextGenerator;
use crate::catalog::IngredientCatalog;
use crate::error::AnalysisError;
use crate::recommend::{DietaryRestriction, HealthGoal, IngredientEmbeddings, SubstitutionSuggestion};

const CHAT_MAX_TOKENS: u32 = 400;
const SUBSTITUTION_TOP_N: usize = 5;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SuggestedChange {
    Add {
        ingredient: String,
        amount_g: f32,
        reason: String,
    },
    Substitute {
        original: String,
        replacement: String,
        reason: String,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct RecipeImprovement {
    pub suggested_changes: Vec<SuggestedChange>,
    pub expected_improvements: Vec<String>,
    pub estimated_new_score: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct SnackRecommendation {
    pub name: String,
    pub description: String,
    pub ingredients: Vec<RecipeIngredientLine>,
    pub instructions: Vec<String>,
    pub prep_time_minutes: u32,
    pub key_benefits: Vec<String>,
    pub analysis: NutritionAnalysis,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubstitutionReport {
    pub original: String,
    pub suggestions: Vec<SubstitutionSuggestion>,
    pub tips: Vec<String>,
}

/// Goal-directed layer over the aggregator. Rule-based throughout; the only
/// non-deterministic path is chat, which delegates to a configured text
/// generator and falls back to canned answers on any failure.
pub struct RecommendationEngine {
    aggregator: Arc<NutritionAggregator>,
    catalog: Arc<IngredientCatalog>,
    embeddings: IngredientEmbeddings,
    text_generator: Option<Box<dyn TextGenerator>>,
}

impl RecommendationEngine {
    pub fn new(
        aggregator: Arc<NutritionAggregator>,
        catalog: Arc<IngredientCatalog>,
        text_generator: Option<Box<dyn TextGenerator>>,
    ) -> Self {
        let embeddings = IngredientEmbeddings::build(&catalog);
        Self {
            aggregator,
            catalog,
            embeddings,
            text_generator,
        }
    }

    /// Suggest ingredient-level changes for the given goals. Each goal maps
    /// deterministically to at most one change, gated on the recipe's current
    /// per-100g numbers.
    pub fn improve_recipe(
        &self,
        lines: &[RecipeIngredientLine],
        goals: &[HealthGoal],
    ) -> Result<RecipeImprovement, AnalysisError> {
        let analysis = self.aggregator.calculate_snack_nutrition(lines)?;
        let per_100g = &analysis.nutrition_per_100g;
        let mut changes = Vec::new();

        for goal in goals {
            match goal {
                HealthGoal::IncreaseProtein if per_100g.protein_g < 15.0 => {
                    changes.push(SuggestedChange::Add {
                        ingredient: "protein_powder_plant".to_string(),
                        amount_g: 20.0,
                        reason: "Boost protein content for muscle support and satiety".to_string(),
                    });
                }
                HealthGoal::IncreaseFiber if per_100g.fiber_g < 8.0 => {
                    changes.push(SuggestedChange::Add {
                        ingredient: "chia_seeds".to_string(),
                        amount_g: 15.0,
                        reason: "Add fiber for digestive health and sustained energy".to_string(),
                    });
                }
                HealthGoal::ReduceSugar if per_100g.sugars_g > 20.0 => {
                    changes.push(SuggestedChange::Substitute {
                        original: "dates".to_string(),
                        replacement: "cinnamon".to_string(),
                        reason: "Reduce sugar content while adding natural sweetness and flavor"
                            .to_string(),
                    });
                }
                HealthGoal::IncreaseAntioxidants => {
                    changes.push(SuggestedChange::Add {
                        ingredient: "blueberries_dried".to_string(),
                        amount_g: 20.0,
                        reason: "Add powerful antioxidants for cellular protection".to_string(),
                    });
                }
                HealthGoal::KetoFriendly => {
                    changes.push(SuggestedChange::Substitute {
                        original: "oats".to_string(),
                        replacement: "coconut_flakes".to_string(),
                        reason: "Lower carb content for ketogenic diet compatibility".to_string(),
                    });
                }
                _ => {}
            }
        }

        let estimated_new_score =
            (analysis.health_score + changes.len() as f32 * 5.0).min(100.0);
        let expected_improvements = goals
            .iter()
            .map(|goal| format!("Addresses {}", goal.display_name()))
            .collect();

        Ok(RecipeImprovement {
            suggested_changes: changes,
            expected_improvements,
            estimated_new_score,
        })
    }

    /// Build a new recipe from goals and flavor preferences, then analyze it.
    pub fn generate_snack_recommendation(
        &self,
        goals: &[HealthGoal],
        flavors: &[String],
    ) -> Result<SnackRecommendation, AnalysisError> {
        let mut ingredients = vec![
            RecipeIngredientLine {
                name: "oats".to_string(),
                amount_g: 40.0,
            },
            RecipeIngredientLine {
                name: "almonds".to_string(),
                amount_g: 30.0,
            },
        ];

        if goals.contains(&HealthGoal::IncreaseProtein) {
            ingredients.push(RecipeIngredientLine {
                name: "protein_powder_plant".to_string(),
                amount_g: 25.0,
            });
        }

        if goals.contains(&HealthGoal::ReduceSugar) {
            ingredients.push(RecipeIngredientLine {
                name: "cinnamon".to_string(),
                amount_g: 2.0,
            });
        } else {
            ingredients.push(RecipeIngredientLine {
                name: "dates".to_string(),
                amount_g: 20.0,
            });
        }

        if goals.contains(&HealthGoal::IncreaseFiber) {
            ingredients.push(RecipeIngredientLine {
                name: "chia_seeds".to_string(),
                amount_g: 15.0,
            });
        }

        if goals.contains(&HealthGoal::IncreaseAntioxidants) {
            ingredients.push(RecipeIngredientLine {
                name: "blueberries_dried".to_string(),
                amount_g: 20.0,
            });
        }

        if goals.contains(&HealthGoal::KetoFriendly) {
            ingredients.retain(|line| line.name != "oats" && line.name != "dates");
            ingredients.push(RecipeIngredientLine {
                name: "coconut_flakes".to_string(),
                amount_g: 25.0,
            });
            ingredients.push(RecipeIngredientLine {
                name: "cashews".to_string(),
                amount_g: 35.0,
            });
        }

        if flavors.iter().any(|f| f == "chocolate") {
            ingredients.push(RecipeIngredientLine {
                name: "dark_chocolate_70".to_string(),
                amount_g: 15.0,
            });
        } else if flavors.iter().any(|f| f == "sweet")
            && !ingredients.iter().any(|line| line.name == "dates")
        {
            ingredients.push(RecipeIngredientLine {
                name: "honey".to_string(),
                amount_g: 15.0,
            });
        }

        let analysis = self.aggregator.calculate_snack_nutrition(&ingredients)?;

        Ok(SnackRecommendation {
            name: "Custom Healthy Snack".to_string(),
            description: "Nutritious snack tailored to your preferences and goals".to_string(),
            ingredients,
            instructions: vec![
                "Process nuts and oats in food processor until roughly chopped".to_string(),
                "Add dates or sweetener and process until mixture starts to stick".to_string(),
                "Mix in remaining ingredients".to_string(),
                "Form into desired shape (balls, bars, or clusters)".to_string(),
                "Refrigerate for 30 minutes to set".to_string(),
            ],
            prep_time_minutes: 15,
            key_benefits: benefits_from_goals(goals),
            analysis,
        })
    }

    /// Ranked catalog substitutions plus practical tips.
    pub fn suggest_substitutions(
        &self,
        ingredient_name: &str,
        restrictions: &[DietaryRestriction],
    ) -> SubstitutionReport {
        let name = ingredient_name.to_lowercase();
        let suggestions = self.embeddings.suggest_substitutions(
            &self.catalog,
            &name,
            restrictions,
            SUBSTITUTION_TOP_N,
        );
        let tips = substitution_tips(&name);

        SubstitutionReport {
            original: name,
            suggestions,
            tips,
        }
    }

    /// Answer a free-form nutrition question, optionally grounded in the
    /// analysis of the snack the user is currently working on. Delegates to
    /// the configured text generator; any failure falls back to the
    /// keyword-routed canned answers, indistinguishable from the caller's
    /// side. The fallback ignores the context.
    pub async fn chat_about_nutrition(
        &self,
        message: &str,
        context: Option<&NutritionAnalysis>,
    ) -> String {
        if let Some(generator) = &self.text_generator {
            let mut prompt = format!(
                "You are a nutrition expert helping users build healthy snacks. \
                 Answer the following question concisely and practically.\n\n\
                 Question: {message}"
            );
            if let Some(analysis) = context {
                prompt.push_str(&format!(
                    "\n\nThe user's current snack: health score {:.0}/100, \
                     per 100g: {:.0} kcal, {:.1}g protein, {:.1}g fiber, {:.1}g sugars.",
                    analysis.health_score,
                    analysis.nutrition_per_100g.calories_per_100g,
                    analysis.nutrition_per_100g.protein_g,
                    analysis.nutrition_per_100g.fiber_g,
                    analysis.nutrition_per_100g.sugars_g,
                ));
            }
            match generator.generate(&prompt, CHAT_MAX_TOKENS).await {
                Ok(answer) if !answer.trim().is_empty() => return answer,
                Ok(_) => warn!("text generator returned an empty answer, using fallback"),
                Err(e) => warn!(error = %e, "text generation failed, using fallback"),
            }
        }
        fallback_chat_response(message)
    }
}

fn benefits_from_goals(goals: &[HealthGoal]) -> Vec<String> {
    let mut benefits: Vec<String> = goals
        .iter()
        .map(|goal| {
            match goal {
                HealthGoal::IncreaseProtein => "High protein for muscle support",
                HealthGoal::ReduceSugar => "Low sugar for stable energy",
                HealthGoal::IncreaseFiber => "High fiber for digestive health",
                HealthGoal::KetoFriendly => "Low carb for ketogenic diet",
                HealthGoal::IncreaseAntioxidants => {
                    "Rich in antioxidants for cellular protection"
                }
            }
            .to_string()
        })
        .collect();

    if benefits.is_empty() {
        benefits = vec![
            "Natural ingredients".to_string(),
            "Balanced nutrition".to_string(),
            "Sustained energy".to_string(),
        ];
    }
    benefits.truncate(4);
    benefits
}

fn substitution_tips(original: &str) -> Vec<String> {
    let tips: &[&str] = if ["honey", "maple_syrup", "dates"].contains(&original) {
        &[
            "When substituting sweeteners, start with less and adjust to taste",
            "Liquid sweeteners may require reducing other liquids in the recipe",
        ]
    } else if ["almonds", "walnuts", "cashews", "pecans"].contains(&original) {
        &[
            "Different nuts provide different textures - consider the final mouthfeel",
            "Toast substituted nuts lightly to enhance their flavor",
        ]
    } else if ["oats", "quinoa", "buckwheat"].contains(&original) {
        &[
            "Grain substitutions may affect binding - add extra liquid if needed",
            "Consider grinding harder grains for better integration",
        ]
    } else if original.contains("protein_powder") {
        &[
            "Different protein powders have varying sweetness levels",
            "Plant proteins may need extra flavoring compared to whey",
        ]
    } else {
        &[
            "Start with small amounts when trying new ingredients",
            "Consider how the substitution affects both nutrition and taste",
        ]
    };

    tips.iter().take(3).map(|t| t.to_string()).collect()
}

fn fallback_chat_response(message: &str) -> String {
    let lower = message.to_lowercase();
    let mentions = |words: &[&str]| words.iter().any(|w| lower.contains(w));

    if mentions(&["protein", "muscle", "workout"]) {
        "Protein is essential for muscle building and repair. For snacks, aim for 15-20g \
         protein. Great sources include protein powder, Greek yogurt, nuts, seeds, and \
         legumes. Post-workout snacks should combine protein with some carbs for optimal \
         recovery."
    } else if mentions(&["sugar", "sweet", "diabetes"]) {
        "Natural sugars from fruits like dates are generally better than refined sugars \
         because they come with fiber and nutrients. Try pairing sweet ingredients with \
         protein and fiber to slow sugar absorption. For diabetic-friendly options, focus \
         on low-glycemic ingredients like nuts, seeds, and berries."
    } else if mentions(&["fiber", "digestion", "gut"]) {
        "Fiber is crucial for digestive health and helps you feel full longer. Aim for \
         25-35g daily total. Great snack sources include chia seeds (10g per 2 tbsp), flax \
         seeds, oats, and berries. Start slowly if increasing fiber intake to avoid \
         digestive discomfort."
    } else if mentions(&["fat", "omega"]) {
        "Healthy fats from nuts, seeds, avocados, and olive oil provide sustained energy \
         and help absorb fat-soluble vitamins. Omega-3 fatty acids from chia seeds, \
         walnuts, and flax are especially beneficial for brain and heart health."
    } else if mentions(&["energy", "tired", "boost"]) {
        "For sustained energy, combine complex carbs with protein and healthy fats. Avoid \
         simple sugars that cause energy crashes. Great energizing combinations include \
         nuts with fruit, oats with protein powder, or seeds with berries."
    } else if mentions(&["weight", "lose", "diet"]) {
        "For weight management, focus on nutrient-dense, high-fiber, high-protein snacks \
         that keep you satisfied. Examples include protein balls, veggie sticks with nut \
         butter, or Greek yogurt with berries. Portion control is key - aim for 150-200 \
         calorie snacks."
    } else if mentions(&["antioxidant", "inflammation"]) {
        "Antioxidants help fight inflammation and protect cells. The best sources for \
         snacks include berries (especially blueberries), dark chocolate (70%+ cacao), \
         nuts, seeds, and colorful fruits and vegetables."
    } else if mentions(&["calcium", "bone"]) {
        "Calcium is essential for bone health. Good snack sources include almonds, sesame \
         seeds (tahini), leafy greens, and fortified plant milks. Pair with vitamin D for \
         better absorption."
    } else if mentions(&["iron", "anemia"]) {
        "Iron supports oxygen transport and energy levels. Plant-based sources for snacks \
         include pumpkin seeds, dark chocolate, quinoa, and dried fruits. Pair with \
         vitamin C (like citrus) to enhance absorption."
    } else {
        "That's a great nutrition question! I'd recommend focusing on whole food \
         ingredients and balanced macronutrients for the healthiest snacks. What specific \
         aspect of nutrition would you like to explore further?"
    }
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api_connection::ApiConnectionError;
    use crate::scoring::scorer::test_scorer;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct FailingGenerator;

    #[async_trait]
    impl TextGenerator for FailingGenerator {
        async fn generate(&self, _prompt: &str, _max_tokens: u32) -> Result<String, ApiConnectionError> {
            Err(ApiConnectionError::MissingApiKey("OPENROUTER_API_KEY".to_string()))
        }
    }

    struct RecordingGenerator(Arc<Mutex<String>>);

    #[async_trait]
    impl TextGenerator for RecordingGenerator {
        async fn generate(&self, prompt: &str, _max_tokens: u32) -> Result<String, ApiConnectionError> {
            *self.0.lock().unwrap() = prompt.to_string();
            Ok("Recorded.".to_string())
        }
    }

    struct CannedGenerator(&'static str);

    #[async_trait]
    impl TextGenerator for CannedGenerator {
        async fn generate(&self, _prompt: &str, _max_tokens: u32) -> Result<String, ApiConnectionError> {
            Ok(self.0.to_string())
        }
    }

    fn engine(generator: Option<Box<dyn TextGenerator>>) -> RecommendationEngine {
        let catalog = Arc::new(IngredientCatalog::builtin().expect("builtin catalog"));
        let aggregator = Arc::new(NutritionAggregator::new(catalog.clone(), test_scorer()));
        RecommendationEngine::new(aggregator, catalog, generator)
    }

    fn line(name: &str, amount_g: f32) -> RecipeIngredientLine {
        RecipeIngredientLine {
            name: name.to_string(),
            amount_g,
        }
    }

    #[test]
    fn test_improve_recipe_low_protein_triggers_addition() {
        let engine = engine(None);
        // dates only: low protein, low fiber per 100g
        let improvement = engine
            .improve_recipe(
                &[line("dates", 100.0)],
                &[HealthGoal::IncreaseProtein, HealthGoal::IncreaseFiber],
            )
            .unwrap();

        assert_eq!(improvement.suggested_changes.len(), 2);
        assert!(matches!(
            &improvement.suggested_changes[0],
            SuggestedChange::Add { ingredient, .. } if ingredient == "protein_powder_plant"
        ));
        assert_eq!(
            improvement.expected_improvements,
            vec![
                "Addresses increase protein".to_string(),
                "Addresses increase fiber".to_string()
            ]
        );
    }

    #[test]
    fn test_improve_recipe_skips_already_met_goals() {
        let engine = engine(None);
        // almonds alone are already above the protein and fiber gates
        let improvement = engine
            .improve_recipe(
                &[line("almonds", 100.0)],
                &[HealthGoal::IncreaseProtein, HealthGoal::IncreaseFiber],
            )
            .unwrap();

        assert!(improvement.suggested_changes.is_empty());
        assert_eq!(improvement.expected_improvements.len(), 2);
    }

    #[test]
    fn test_estimated_score_is_capped_at_100() {
        let engine = engine(None);
        let improvement = engine
            .improve_recipe(
                &[line("almonds", 100.0)],
                &[HealthGoal::IncreaseAntioxidants, HealthGoal::KetoFriendly],
            )
            .unwrap();

        assert_eq!(improvement.suggested_changes.len(), 2);
        assert!(improvement.estimated_new_score <= 100.0);
    }

    #[test]
    fn test_recommendation_keto_drops_oats_and_dates() {
        let engine = engine(None);
        let recommendation = engine
            .generate_snack_recommendation(&[HealthGoal::KetoFriendly], &[])
            .unwrap();

        let names: Vec<&str> = recommendation
            .ingredients
            .iter()
            .map(|l| l.name.as_str())
            .collect();
        assert!(!names.contains(&"oats"));
        assert!(!names.contains(&"dates"));
        assert!(names.contains(&"coconut_flakes"));
        assert!(names.contains(&"cashews"));
        assert!(recommendation.analysis.total_weight_g > 0.0);
    }

    #[test]
    fn test_recommendation_chocolate_flavor_adds_dark_chocolate() {
        let engine = engine(None);
        let recommendation = engine
            .generate_snack_recommendation(&[], &["chocolate".to_string()])
            .unwrap();

        assert!(recommendation
            .ingredients
            .iter()
            .any(|l| l.name == "dark_chocolate_70"));
        assert_eq!(
            recommendation.key_benefits,
            vec!["Natural ingredients", "Balanced nutrition", "Sustained energy"]
        );
    }

    #[test]
    fn test_substitution_report_includes_tips() {
        let engine = engine(None);
        let report = engine.suggest_substitutions("Almonds", &[]);

        assert_eq!(report.original, "almonds");
        assert!(!report.suggestions.is_empty());
        assert_eq!(report.tips.len(), 2);
        assert!(report.tips[0].contains("texture"));
    }

    #[tokio::test]
    async fn test_chat_uses_generator_when_available() {
        let engine = engine(Some(Box::new(CannedGenerator("Eat more lentils."))));
        let answer = engine.chat_about_nutrition("What should I eat?", None).await;
        assert_eq!(answer, "Eat more lentils.");
    }

    #[tokio::test]
    async fn test_chat_folds_snack_analysis_into_prompt() {
        let seen = Arc::new(Mutex::new(String::new()));
        let engine = engine(Some(Box::new(RecordingGenerator(seen.clone()))));

        let analysis = engine
            .aggregator
            .calculate_snack_nutrition(&[line("almonds", 100.0)])
            .unwrap();
        engine
            .chat_about_nutrition("Is this snack too fatty?", Some(&analysis))
            .await;

        let prompt = seen.lock().unwrap().clone();
        assert!(prompt.contains("Is this snack too fatty?"));
        assert!(prompt.contains("The user's current snack"));
        assert!(prompt.contains("579 kcal"));
        assert!(prompt.contains("g protein"));
    }

    #[tokio::test]
    async fn test_chat_without_context_omits_snack_block() {
        let seen = Arc::new(Mutex::new(String::new()));
        let engine = engine(Some(Box::new(RecordingGenerator(seen.clone()))));

        engine.chat_about_nutrition("What should I eat?", None).await;

        let prompt = seen.lock().unwrap().clone();
        assert!(prompt.contains("What should I eat?"));
        assert!(!prompt.contains("The user's current snack"));
    }

    #[tokio::test]
    async fn test_chat_falls_back_on_generator_failure() {
        let engine = engine(Some(Box::new(FailingGenerator)));
        let answer = engine
            .chat_about_nutrition("How much protein do I need after a workout?", None)
            .await;
        assert!(answer.contains("Protein is essential"));
    }

    #[tokio::test]
    async fn test_chat_keyword_routing_without_generator() {
        let engine = engine(None);

        let fiber = engine
            .chat_about_nutrition("Is fiber good for digestion?", None)
            .await;
        assert!(fiber.contains("Fiber is crucial"));

        let iron = engine.chat_about_nutrition("I might have anemia", None).await;
        assert!(iron.contains("Iron supports"));

        let default = engine.chat_about_nutrition("Hello there", None).await;
        assert!(default.contains("great nutrition question"));
    }
}
