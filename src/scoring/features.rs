use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const FEATURE_COUNT: usize = 20;

/// Model feature order. This is a wire-level contract: the scaler, the
/// forest, and the feature-importance map all key on these positions.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "calories_per_100g",
    "protein_g",
    "total_fat_g",
    "saturated_fat_g",
    "carbohydrates_g",
    "sugars_g",
    "fiber_g",
    "sodium_mg",
    "potassium_mg",
    "vitamin_c_mg",
    "calcium_mg",
    "iron_mg",
    "glycemic_index",
    "antioxidant_score",
    "processing_level",
    "artificial_additives",
    "preservatives",
    "allergen_count",
    "organic_score",
    "sustainability_score",
];

/// Default used when a quality feature is absent from the input. The 12 core
/// nutrition features default to 0 instead.
fn feature_default(name: &str) -> f32 {
    match name {
        "glycemic_index" => 50.0,
        "antioxidant_score" => 20.0,
        "processing_level" => 3.0,
        "artificial_additives" => 0.0,
        "preservatives" => 0.0,
        "allergen_count" => 0.0,
        "organic_score" => 0.5,
        "sustainability_score" => 0.5,
        _ => 0.0,
    }
}

/// Assemble the fixed-order feature vector from a sparse nutrition mapping.
pub fn vector_from_map(nutrition: &HashMap<String, f32>) -> Vec<f32> {
    FEATURE_NAMES
        .iter()
        .map(|name| {
            nutrition
                .get(*name)
                .copied()
                .unwrap_or_else(|| feature_default(name))
        })
        .collect()
}

/// Per-feature standardization (zero mean, unit variance), fitted on the
/// training split and persisted alongside the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandardScaler {
    means: Vec<f32>,
    stds: Vec<f32>,
}

impl StandardScaler {
    pub fn fit(rows: &[Vec<f32>]) -> Self {
        let n_features = rows.first().map_or(0, Vec::len);
        let n = rows.len().max(1) as f32;

        let mut means = vec![0.0f32; n_features];
        for row in rows {
            for (m, v) in means.iter_mut().zip(row) {
                *m += v;
            }
        }
        for m in &mut means {
            *m /= n;
        }

        let mut stds = vec![0.0f32; n_features];
        for row in rows {
            for ((s, v), m) in stds.iter_mut().zip(row).zip(&means) {
                *s += (v - m).powi(2);
            }
        }
        for s in &mut stds {
            *s = (*s / n).sqrt();
            // Constant features would otherwise divide by zero.
            if *s < 1e-8 {
                *s = 1.0;
            }
        }

        Self { means, stds }
    }

    pub fn transform(&self, row: &[f32]) -> Vec<f32> {
        row.iter()
            .zip(self.means.iter().zip(&self.stds))
            .map(|(v, (m, s))| (v - m) / s)
            .collect()
    }

    pub fn transform_all(&self, rows: &[Vec<f32>]) -> Vec<Vec<f32>> {
        rows.iter().map(|r| self.transform(r)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_quality_features_get_documented_defaults() {
        let mut nutrition = HashMap::new();
        nutrition.insert("protein_g".to_string(), 10.0);

        let vector = vector_from_map(&nutrition);
        assert_eq!(vector.len(), FEATURE_COUNT);
        assert_eq!(vector[1], 10.0); // protein_g
        assert_eq!(vector[0], 0.0); // calories default to zero
        assert_eq!(vector[12], 50.0); // glycemic_index
        assert_eq!(vector[13], 20.0); // antioxidant_score
        assert_eq!(vector[14], 3.0); // processing_level
        assert_eq!(vector[18], 0.5); // organic_score
        assert_eq!(vector[19], 0.5); // sustainability_score
    }

    #[test]
    fn test_scaler_standardizes_to_zero_mean_unit_variance() {
        let rows = vec![
            vec![1.0, 10.0],
            vec![2.0, 20.0],
            vec![3.0, 30.0],
            vec![4.0, 40.0],
        ];
        let scaler = StandardScaler::fit(&rows);
        let scaled = scaler.transform_all(&rows);

        for feature in 0..2 {
            let mean: f32 = scaled.iter().map(|r| r[feature]).sum::<f32>() / 4.0;
            let var: f32 = scaled.iter().map(|r| r[feature].powi(2)).sum::<f32>() / 4.0;
            assert!(mean.abs() < 1e-5, "mean was {}", mean);
            assert!((var - 1.0).abs() < 1e-4, "variance was {}", var);
        }
    }

    #[test]
    fn test_scaler_constant_feature_does_not_divide_by_zero() {
        let rows = vec![vec![5.0], vec![5.0], vec![5.0]];
        let scaler = StandardScaler::fit(&rows);
        let scaled = scaler.transform(&[5.0]);
        assert!(scaled[0].is_finite());
        assert_eq!(scaled[0], 0.0);
    }
}
