pub mod features;
pub mod forest;
pub mod scorer;
pub mod synthetic;

pub use scorer::{HealthScorePrediction, HealthScorer, TrainingConfig};
