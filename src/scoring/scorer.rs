use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::Path;

use crate::scoring::features::{vector_from_map, StandardScaler, FEATURE_COUNT, FEATURE_NAMES};
use crate::scoring::forest::{ForestConfig, RandomForest};
use crate::scoring::synthetic;

const MODEL_FILE: &str = "health_model.bin";
const SCALER_FILE: &str = "health_scaler.bin";

#[derive(Debug, Clone)]
pub struct TrainingConfig {
    pub n_samples: usize,
    pub forest: ForestConfig,
    pub seed: u64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            n_samples: 5000,
            forest: ForestConfig::default(),
            seed: 42,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HealthScorePrediction {
    pub health_score: f32,
    pub confidence: f32,
    pub explanation: String,
    pub feature_importance: HashMap<String, f32>,
}

/// Random-forest health scorer over per-100g nutrition features.
///
/// Trains on synthetic formula-labeled data, so scores track the documented
/// bonus/penalty semantics while staying smooth between the tier boundaries.
pub struct HealthScorer {
    forest: RandomForest,
    scaler: StandardScaler,
}

impl HealthScorer {
    /// Train a fresh model on synthetic data. Holds out 20% of the samples
    /// to report fit quality; the scaler is fitted on the training split only.
    pub fn train(config: &TrainingConfig) -> Result<Self> {
        tracing::info!(
            n_samples = config.n_samples,
            n_estimators = config.forest.n_estimators,
            "training health score model on synthetic data"
        );
        let dataset = synthetic::generate(config.n_samples, config.seed);

        let split = (dataset.features.len() * 4) / 5;
        let (train_x, test_x) = dataset.features.split_at(split);
        let (train_y, test_y) = dataset.labels.split_at(split);

        let scaler = StandardScaler::fit(train_x);
        let scaled_train = scaler.transform_all(train_x);
        let forest = RandomForest::fit(&scaled_train, train_y, config.forest.clone())?;

        if !test_x.is_empty() {
            let scaled_test = scaler.transform_all(test_x);
            let predictions: Vec<f32> =
                scaled_test.iter().map(|row| forest.predict(row)).collect();
            let mse: f32 = predictions
                .iter()
                .zip(test_y)
                .map(|(p, y)| (p - y).powi(2))
                .sum::<f32>()
                / test_y.len() as f32;
            let mean_y: f32 = test_y.iter().sum::<f32>() / test_y.len() as f32;
            let total_var: f32 = test_y.iter().map(|y| (y - mean_y).powi(2)).sum::<f32>()
                / test_y.len() as f32;
            let r_squared = if total_var > 0.0 {
                1.0 - mse / total_var
            } else {
                0.0
            };
            tracing::info!(mse, r_squared, "health score model trained");
        }

        Ok(Self { forest, scaler })
    }

    /// Load persisted model artifacts, retraining from scratch when they are
    /// missing or unreadable.
    pub fn load_or_train(model_dir: &Path, config: &TrainingConfig) -> Result<Self> {
        let model_path = model_dir.join(MODEL_FILE);
        let scaler_path = model_dir.join(SCALER_FILE);

        if model_path.exists() && scaler_path.exists() {
            match Self::load(&model_path, &scaler_path) {
                Ok(scorer) => {
                    tracing::info!(path = %model_path.display(), "loaded health score model");
                    return Ok(scorer);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "stored health model unreadable, retraining");
                }
            }
        }

        let scorer = Self::train(config)?;
        scorer.save(model_dir)?;
        Ok(scorer)
    }

    fn load(model_path: &Path, scaler_path: &Path) -> Result<Self> {
        let model_bytes = std::fs::read(model_path)
            .with_context(|| format!("Failed to read {}", model_path.display()))?;
        let scaler_bytes = std::fs::read(scaler_path)
            .with_context(|| format!("Failed to read {}", scaler_path.display()))?;
        let forest: RandomForest =
            bincode::deserialize(&model_bytes).context("Failed to decode forest model")?;
        let scaler: StandardScaler =
            bincode::deserialize(&scaler_bytes).context("Failed to decode feature scaler")?;
        if forest.n_features() != FEATURE_COUNT {
            anyhow::bail!(
                "Stored model expects {} features, this build uses {}",
                forest.n_features(),
                FEATURE_COUNT
            );
        }
        Ok(Self { forest, scaler })
    }

    pub fn save(&self, model_dir: &Path) -> Result<()> {
        std::fs::create_dir_all(model_dir)
            .with_context(|| format!("Failed to create {}", model_dir.display()))?;
        let model_bytes = bincode::serialize(&self.forest)?;
        let scaler_bytes = bincode::serialize(&self.scaler)?;
        std::fs::write(model_dir.join(MODEL_FILE), model_bytes)?;
        std::fs::write(model_dir.join(SCALER_FILE), scaler_bytes)?;
        tracing::info!(dir = %model_dir.display(), "saved health score model");
        Ok(())
    }

    /// Score a per-100g nutrition mapping. Missing quality features take
    /// their documented defaults; unknown keys are ignored.
    pub fn predict(&self, nutrition: &HashMap<String, f32>) -> HealthScorePrediction {
        let raw = vector_from_map(nutrition);
        let scaled = self.scaler.transform(&raw);

        let per_tree = self.forest.tree_predictions(&scaled);
        let n = per_tree.len() as f32;
        let mean = per_tree.iter().sum::<f32>() / n;
        let variance = per_tree.iter().map(|p| (p - mean).powi(2)).sum::<f32>() / n;

        let health_score = mean.clamp(0.0, 100.0);
        let confidence = (1.0 - variance / 100.0).clamp(0.0, 1.0);

        let feature_importance: HashMap<String, f32> = FEATURE_NAMES
            .iter()
            .zip(self.forest.feature_importances())
            .map(|(name, imp)| (name.to_string(), *imp))
            .collect();

        HealthScorePrediction {
            health_score,
            confidence,
            explanation: generate_explanation(health_score, &raw),
            feature_importance,
        }
    }
}

/// Plain-language reading of the score with per-nutrient callouts.
fn generate_explanation(score: f32, raw_features: &[f32]) -> String {
    let value = |name: &str| {
        FEATURE_NAMES
            .iter()
            .position(|n| *n == name)
            .map_or(0.0, |i| raw_features[i])
    };

    let mut clauses: Vec<&str> = Vec::new();

    let protein = value("protein_g");
    if protein > 15.0 {
        clauses.push("High protein content boosts the score");
    } else if protein < 3.0 {
        clauses.push("Low protein content reduces the score");
    }

    let sugars = value("sugars_g");
    if sugars > 20.0 {
        clauses.push("High sugar content significantly reduces the score");
    } else if sugars < 5.0 {
        clauses.push("Low sugar content improves the score");
    }

    let fiber = value("fiber_g");
    if fiber > 8.0 {
        clauses.push("High fiber content significantly boosts the score");
    } else if fiber < 2.0 {
        clauses.push("Low fiber content reduces the score");
    }

    let sodium = value("sodium_mg");
    if sodium > 800.0 {
        clauses.push("High sodium content reduces the score");
    } else if sodium < 100.0 {
        clauses.push("Low sodium content improves the score");
    }

    if value("saturated_fat_g") > 8.0 {
        clauses.push("High saturated fat content reduces the score");
    }

    let overall = if score >= 80.0 {
        "This snack is nutritionally excellent"
    } else if score >= 65.0 {
        "This snack is nutritionally good"
    } else if score >= 50.0 {
        "This snack is nutritionally moderate"
    } else if score >= 35.0 {
        "This snack could be more nutritious"
    } else {
        "This snack has poor nutritional value"
    };

    if clauses.is_empty() {
        format!("{}.", overall)
    } else {
        format!("{}. {}.", overall, clauses.join(". "))
    }
}

/// Small forest on fewer samples, shared by unit tests across modules to
/// exercise the full train/scale/predict path quickly.
#[cfg(test)]
pub(crate) fn test_training_config() -> TrainingConfig {
    TrainingConfig {
        n_samples: 800,
        forest: ForestConfig {
            n_estimators: 25,
            max_depth: 10,
            min_samples_split: 5,
            min_samples_leaf: 2,
            seed: 42,
        },
        seed: 42,
    }
}

/// Lazily trained scorer reused by unit tests so each test does not pay for
/// its own training run.
#[cfg(test)]
pub(crate) fn test_scorer() -> std::sync::Arc<HealthScorer> {
    use std::sync::{Arc, OnceLock};
    static SCORER: OnceLock<Arc<HealthScorer>> = OnceLock::new();
    SCORER
        .get_or_init(|| {
            Arc::new(HealthScorer::train(&test_training_config()).expect("training failed"))
        })
        .clone()
}
