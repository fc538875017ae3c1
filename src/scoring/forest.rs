use anyhow::Result;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForestConfig {
    pub n_estimators: usize,
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub seed: u64,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_estimators: 200,
            max_depth: 15,
            min_samples_split: 5,
            min_samples_leaf: 2,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
enum Node {
    Leaf {
        value: f32,
    },
    Split {
        feature: usize,
        threshold: f32,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RegressionTree {
    nodes: Vec<Node>,
}

impl RegressionTree {
    fn predict(&self, x: &[f32]) -> f32 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if x[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }
}

/// Grows one CART regression tree over a bootstrap sample, accumulating
/// per-feature impurity decrease for the importance map.
struct TreeBuilder<'a> {
    x: &'a [Vec<f32>],
    y: &'a [f32],
    config: &'a ForestConfig,
    features_per_split: usize,
    n_features: usize,
    nodes: Vec<Node>,
    importances: Vec<f32>,
}

impl<'a> TreeBuilder<'a> {
    fn new(x: &'a [Vec<f32>], y: &'a [f32], config: &'a ForestConfig, n_features: usize) -> Self {
        Self {
            x,
            y,
            config,
            // Standard regression-forest heuristic: a third of the features
            // are candidates at each split.
            features_per_split: (n_features / 3).max(1),
            n_features,
            nodes: Vec::new(),
            importances: vec![0.0; n_features],
        }
    }

    fn sums(&self, indices: &[usize]) -> (f32, f32) {
        let mut sum = 0.0;
        let mut sum_sq = 0.0;
        for &i in indices {
            sum += self.y[i];
            sum_sq += self.y[i] * self.y[i];
        }
        (sum, sum_sq)
    }

    fn candidate_features(&self, rng: &mut StdRng) -> Vec<usize> {
        let mut all: Vec<usize> = (0..self.n_features).collect();
        for i in 0..self.features_per_split.min(all.len()) {
            let j = rng.gen_range(i..all.len());
            all.swap(i, j);
        }
        all.truncate(self.features_per_split);
        all
    }

    fn grow(&mut self, indices: Vec<usize>, depth: usize, rng: &mut StdRng) -> usize {
        let n = indices.len() as f32;
        let (sum, sum_sq) = self.sums(&indices);
        let mean = sum / n;
        let node_sse = (sum_sq - sum * sum / n).max(0.0);

        if depth >= self.config.max_depth
            || indices.len() < self.config.min_samples_split
            || node_sse <= 1e-6
        {
            self.nodes.push(Node::Leaf { value: mean });
            return self.nodes.len() - 1;
        }

        // Best split: minimize the summed child SSE via sorted prefix sums.
        let mut best: Option<(usize, f32, f32)> = None;
        for feature in self.candidate_features(rng) {
            let mut order = indices.clone();
            order.sort_by(|&a, &b| {
                self.x[a][feature]
                    .partial_cmp(&self.x[b][feature])
                    .unwrap_or(std::cmp::Ordering::Equal)
            });

            let mut left_sum = 0.0f32;
            let mut left_sq = 0.0f32;
            for split_at in 1..order.len() {
                let yi = self.y[order[split_at - 1]];
                left_sum += yi;
                left_sq += yi * yi;

                let n_left = split_at;
                let n_right = order.len() - split_at;
                if n_left < self.config.min_samples_leaf || n_right < self.config.min_samples_leaf
                {
                    continue;
                }

                let v = self.x[order[split_at - 1]][feature];
                let v_next = self.x[order[split_at]][feature];
                if v_next <= v {
                    // Tied values cannot be separated by a threshold.
                    continue;
                }

                let right_sum = sum - left_sum;
                let right_sq = sum_sq - left_sq;
                let sse = (left_sq - left_sum * left_sum / n_left as f32).max(0.0)
                    + (right_sq - right_sum * right_sum / n_right as f32).max(0.0);

                if best.map_or(true, |(_, _, best_sse)| sse < best_sse) {
                    best = Some((feature, (v + v_next) / 2.0, sse));
                }
            }
        }

        let Some((feature, threshold, split_sse)) = best else {
            self.nodes.push(Node::Leaf { value: mean });
            return self.nodes.len() - 1;
        };

        self.importances[feature] += node_sse - split_sse;

        let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = indices
            .into_iter()
            .partition(|&i| self.x[i][feature] <= threshold);

        // Reserve this node's slot, then patch after the children exist.
        let node_idx = self.nodes.len();
        self.nodes.push(Node::Leaf { value: mean });
        let left = self.grow(left_indices, depth + 1, rng);
        let right = self.grow(right_indices, depth + 1, rng);
        self.nodes[node_idx] = Node::Split {
            feature,
            threshold,
            left,
            right,
        };
        node_idx
    }

    fn build(mut self, rng: &mut StdRng) -> (RegressionTree, Vec<f32>) {
        let n = self.y.len();
        let bootstrap: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
        self.grow(bootstrap, 0, rng);
        (RegressionTree { nodes: self.nodes }, self.importances)
    }
}

/// Random-forest regressor over standardized feature vectors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForest {
    config: ForestConfig,
    n_features: usize,
    trees: Vec<RegressionTree>,
    feature_importances: Vec<f32>,
}

impl RandomForest {
    pub fn fit(x: &[Vec<f32>], y: &[f32], config: ForestConfig) -> Result<Self> {
        if x.is_empty() || x.len() != y.len() {
            return Err(anyhow::anyhow!(
                "Training data is empty or inconsistent: {} rows, {} labels",
                x.len(),
                y.len()
            ));
        }
        let n_features = x[0].len();

        let built: Vec<(RegressionTree, Vec<f32>)> = (0..config.n_estimators)
            .into_par_iter()
            .map(|tree_idx| {
                // Per-tree seed keeps training deterministic under rayon.
                let mut rng = StdRng::seed_from_u64(
                    config.seed.wrapping_add((tree_idx as u64).wrapping_mul(0x9E37_79B9)),
                );
                TreeBuilder::new(x, y, &config, n_features).build(&mut rng)
            })
            .collect();

        let mut feature_importances = vec![0.0f32; n_features];
        let mut trees = Vec::with_capacity(built.len());
        for (tree, importances) in built {
            for (total, part) in feature_importances.iter_mut().zip(&importances) {
                *total += part;
            }
            trees.push(tree);
        }
        let total: f32 = feature_importances.iter().sum();
        if total > 0.0 {
            for v in &mut feature_importances {
                *v /= total;
            }
        }

        Ok(Self {
            config,
            n_features,
            trees,
            feature_importances,
        })
    }

    pub fn predict(&self, x: &[f32]) -> f32 {
        let sum: f32 = self.trees.iter().map(|t| t.predict(x)).sum();
        sum / self.trees.len() as f32
    }

    /// Individual estimator outputs, used for the variance-based confidence.
    pub fn tree_predictions(&self, x: &[f32]) -> Vec<f32> {
        self.trees.iter().map(|t| t.predict(x)).collect()
    }

    pub fn feature_importances(&self) -> &[f32] {
        &self.feature_importances
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn n_estimators(&self) -> usize {
        self.trees.len()
    }
}
