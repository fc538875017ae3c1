use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// One raw (unscaled) training sample in model feature order.
#[derive(Debug, Clone)]
pub struct RawSample {
    pub calories: f32,
    pub protein: f32,
    pub total_fat: f32,
    pub saturated_fat: f32,
    pub carbs: f32,
    pub sugars: f32,
    pub fiber: f32,
    pub sodium: f32,
    pub potassium: f32,
    pub vitamin_c: f32,
    pub calcium: f32,
    pub iron: f32,
    pub glycemic_index: f32,
    pub antioxidant_score: f32,
    pub processing_level: f32,
    pub artificial_additives: f32,
    pub preservatives: f32,
    pub allergen_count: f32,
    pub organic_score: f32,
    pub sustainability_score: f32,
}

impl RawSample {
    pub fn to_feature_vec(&self) -> Vec<f32> {
        vec![
            self.calories,
            self.protein,
            self.total_fat,
            self.saturated_fat,
            self.carbs,
            self.sugars,
            self.fiber,
            self.sodium,
            self.potassium,
            self.vitamin_c,
            self.calcium,
            self.iron,
            self.glycemic_index,
            self.antioxidant_score,
            self.processing_level,
            self.artificial_additives,
            self.preservatives,
            self.allergen_count,
            self.organic_score,
            self.sustainability_score,
        ]
    }

    /// Deterministic label formula (before noise). Reproduced exactly so the
    /// trained model's scores stay consistent with the documented semantics.
    pub fn formula_score(&self) -> f32 {
        let mut score = 50.0f32;

        // Protein bonus tiers
        if self.protein > 20.0 {
            score += 15.0;
        } else if self.protein > 10.0 {
            score += 10.0;
        } else if self.protein > 5.0 {
            score += 5.0;
        }

        // Fiber bonus tiers
        if self.fiber > 10.0 {
            score += 15.0;
        } else if self.fiber > 5.0 {
            score += 10.0;
        } else if self.fiber > 2.0 {
            score += 5.0;
        }

        // Sugar penalty tiers
        if self.sugars > 30.0 {
            score -= 20.0;
        } else if self.sugars > 15.0 {
            score -= 10.0;
        } else if self.sugars > 8.0 {
            score -= 5.0;
        }

        // Saturated fat penalty
        if self.saturated_fat > 10.0 {
            score -= 15.0;
        } else if self.saturated_fat > 5.0 {
            score -= 8.0;
        }

        // Sodium penalty
        if self.sodium > 1000.0 {
            score -= 15.0;
        } else if self.sodium > 500.0 {
            score -= 8.0;
        } else if self.sodium > 200.0 {
            score -= 3.0;
        }

        // Capped micronutrient bonuses
        score += (self.vitamin_c / 20.0).min(5.0);
        score += (self.potassium / 200.0).min(5.0);
        score += (self.iron / 5.0).min(3.0);

        score += self.antioxidant_score / 10.0;
        score -= (self.processing_level - 1.0) * 3.0;
        score -= self.artificial_additives * 1.5;
        score -= self.preservatives * 2.0;
        score -= self.allergen_count * 0.5;
        score += self.organic_score * 5.0;
        score += self.sustainability_score * 3.0;

        if self.glycemic_index < 35.0 {
            score += 5.0;
        } else if self.glycemic_index > 70.0 {
            score -= 8.0;
        }

        score.clamp(0.0, 100.0)
    }
}

#[derive(Debug)]
pub struct SyntheticDataset {
    pub features: Vec<Vec<f32>>,
    pub labels: Vec<f32>,
}

/// Standard-normal draw via the Box-Muller transform.
fn sample_standard_normal(rng: &mut StdRng) -> f32 {
    let u1: f32 = rng.gen_range(f32::EPSILON..1.0);
    let u2: f32 = rng.gen_range(0.0..1.0);
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f32::consts::PI * u2).cos()
}

fn draw_sample(rng: &mut StdRng) -> RawSample {
    let total_fat = rng.gen_range(0.0..40.0);
    let carbs = rng.gen_range(0.0..80.0);

    RawSample {
        calories: rng.gen_range(50.0..600.0),
        protein: rng.gen_range(0.0..30.0),
        total_fat,
        saturated_fat: (total_fat * 0.6).min(rng.gen_range(0.0..15.0)),
        carbs,
        sugars: (carbs * 0.8).min(rng.gen_range(0.0..50.0)),
        fiber: (carbs * 0.3).min(rng.gen_range(0.0..15.0)),
        sodium: rng.gen_range(0.0..2000.0),
        potassium: rng.gen_range(50.0..1000.0),
        vitamin_c: rng.gen_range(0.0..100.0),
        calcium: rng.gen_range(10.0..300.0),
        iron: rng.gen_range(0.0..20.0),
        glycemic_index: rng.gen_range(15.0..85.0),
        antioxidant_score: rng.gen_range(0.0..100.0),
        processing_level: rng.gen_range(1..6) as f32,
        artificial_additives: rng.gen_range(0..10) as f32,
        preservatives: rng.gen_range(0..5) as f32,
        allergen_count: rng.gen_range(0..8) as f32,
        organic_score: rng.gen_range(0.0..1.0),
        sustainability_score: rng.gen_range(0.0..1.0),
    }
}

/// Generate `n_samples` labeled samples from the documented ranges. Labels
/// are the formula score plus Gaussian noise (sigma 3), clipped to [0, 100].
pub fn generate(n_samples: usize, seed: u64) -> SyntheticDataset {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut features = Vec::with_capacity(n_samples);
    let mut labels = Vec::with_capacity(n_samples);

    for _ in 0..n_samples {
        let sample = draw_sample(&mut rng);
        let noise = sample_standard_normal(&mut rng) * 3.0;
        let label = (sample.formula_score() + noise).clamp(0.0, 100.0);

        features.push(sample.to_feature_vec());
        labels.push(label);
    }

    SyntheticDataset { features, labels }
}
