use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use tokio::fs;
use tracing_subscriber::EnvFilter;

use snacksense::analysis::{NutritionAggregator, RecipeIngredientLine};
use snacksense::api_connection::{OpenRouterTextGenerator, TextGenerator};
use snacksense::catalog::IngredientCatalog;
use snacksense::cli::{parse_args, Command};
use snacksense::error::AnalysisError;
use snacksense::recommend::RecommendationEngine;
use snacksense::scoring::{HealthScorer, TrainingConfig};

const API_KEY_ENV_VAR: &str = "OPENROUTER_API_KEY";

async fn read_recipe_file(path: &str) -> Result<Vec<RecipeIngredientLine>> {
    let content = fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read recipe file '{}'", path))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Recipe file '{}' is not a JSON array of ingredient lines", path))
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli_args = parse_args();

    let catalog = Arc::new(match &cli_args.catalog {
        Some(path) => IngredientCatalog::load(Path::new(path))?,
        None => IngredientCatalog::builtin()?,
    });
    tracing::info!(ingredients = catalog.len(), "ingredient catalog ready");

    let scorer = Arc::new(
        HealthScorer::load_or_train(Path::new(&cli_args.model_dir), &TrainingConfig::default())
            .map_err(|e| AnalysisError::ModelUnavailable(e.to_string()))?,
    );

    let aggregator = Arc::new(NutritionAggregator::new(catalog.clone(), scorer));

    // AI collaboration is optional; without a key every path is deterministic.
    let text_generator: Option<Box<dyn TextGenerator>> = if std::env::var(API_KEY_ENV_VAR).is_ok() {
        Some(Box::new(OpenRouterTextGenerator::new(API_KEY_ENV_VAR)))
    } else {
        None
    };
    let engine = RecommendationEngine::new(aggregator.clone(), catalog, text_generator);

    match cli_args.command {
        Command::Analyze { recipe_file } => {
            let lines = read_recipe_file(&recipe_file).await?;
            let analysis = aggregator.calculate_snack_nutrition(&lines)?;
            println!("{}", serde_json::to_string_pretty(&analysis)?);
        }
        Command::Improve { recipe_file, goals } => {
            let lines = read_recipe_file(&recipe_file).await?;
            let improvement = engine.improve_recipe(&lines, &goals)?;
            println!("{}", serde_json::to_string_pretty(&improvement)?);
        }
        Command::Substitute {
            ingredient,
            restrictions,
        } => {
            let report = engine.suggest_substitutions(&ingredient, &restrictions);
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Recommend { goals, flavors } => {
            let recommendation = engine.generate_snack_recommendation(&goals, &flavors)?;
            println!("{}", serde_json::to_string_pretty(&recommendation)?);
        }
        Command::Contributions { recipe_file } => {
            let lines = read_recipe_file(&recipe_file).await?;
            let report = aggregator.analyze_ingredient_contribution(&lines)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Compare {
            recipe_file_a,
            recipe_file_b,
        } => {
            let version_a = read_recipe_file(&recipe_file_a).await?;
            let version_b = read_recipe_file(&recipe_file_b).await?;
            let comparison = aggregator.compare_snack_versions(&version_a, &version_b)?;
            println!("{}", serde_json::to_string_pretty(&comparison)?);
        }
        Command::Chat { message } => {
            let answer = engine.chat_about_nutrition(&message, None).await;
            println!("{}", answer);
        }
    }

    Ok(())
}
