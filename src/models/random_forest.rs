//! Bootstrap-aggregated regression trees
//!
//! Variance-reduction CART trees over a bootstrap sample each, equally
//! weighted. The trained forest exposes per-member predictions (needed
//! for disagreement-based uncertainty) and impurity-based feature
//! importances, not just the aggregate.

use crate::error::{PipelineError, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Random forest regressor configuration
#[derive(Debug, Clone)]
pub struct RandomForestRegressor {
    /// Name of the model
    name: String,
    /// Number of trees in the ensemble
    n_trees: usize,
    /// Maximum tree depth; `None` grows until leaves are pure
    max_depth: Option<usize>,
    /// Minimum samples required to attempt a split
    min_samples_split: usize,
    /// Seed for deterministic bootstrap sampling
    seed: u64,
}

/// Trained random forest regressor
#[derive(Debug, Clone)]
pub struct TrainedForest {
    /// Name of the model
    name: String,
    /// Fitted trees
    trees: Vec<DecisionTree>,
    /// Number of input features the forest was fitted on
    n_features: usize,
    /// Normalized mean impurity decrease per feature
    importances: Vec<f64>,
}

/// A single fitted regression tree, stored as a node arena
#[derive(Debug, Clone)]
struct DecisionTree {
    nodes: Vec<Node>,
}

#[derive(Debug, Clone)]
enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

impl RandomForestRegressor {
    /// Create a new forest configuration
    pub fn new(n_trees: usize, max_depth: Option<usize>, seed: u64) -> Result<Self> {
        if n_trees == 0 {
            return Err(PipelineError::ValidationError(
                "Number of trees must be positive".to_string(),
            ));
        }

        Ok(Self {
            name: format!("Random Forest (trees={})", n_trees),
            n_trees,
            max_depth,
            min_samples_split: 2,
            seed,
        })
    }

    /// Fit the forest on row-major features `x` and targets `y`
    pub fn fit(&self, x: &[Vec<f64>], y: &[f64]) -> Result<TrainedForest> {
        if x.is_empty() || y.is_empty() {
            return Err(PipelineError::ModelError(
                "Cannot fit a forest on an empty training set".to_string(),
            ));
        }
        if x.len() != y.len() {
            return Err(PipelineError::ValidationError(format!(
                "Feature rows ({}) don't match targets ({})",
                x.len(),
                y.len()
            )));
        }

        let n_samples = x.len();
        let n_features = x[0].len();
        let mut rng = StdRng::seed_from_u64(self.seed);

        let mut trees = Vec::with_capacity(self.n_trees);
        let mut importances = vec![0.0; n_features];

        for _ in 0..self.n_trees {
            // bootstrap sample, same size as the training set
            let sample: Vec<usize> = (0..n_samples)
                .map(|_| rng.gen_range(0..n_samples))
                .collect();

            let mut builder = TreeBuilder {
                x,
                y,
                max_depth: self.max_depth,
                min_samples_split: self.min_samples_split,
                nodes: Vec::new(),
                importances: vec![0.0; n_features],
            };
            builder.build(sample, 0);

            let tree_total: f64 = builder.importances.iter().sum();
            if tree_total > 0.0 {
                for (acc, imp) in importances.iter_mut().zip(&builder.importances) {
                    *acc += imp / tree_total;
                }
            }

            trees.push(DecisionTree {
                nodes: builder.nodes,
            });
        }

        let total: f64 = importances.iter().sum();
        if total > 0.0 {
            for imp in importances.iter_mut() {
                *imp /= total;
            }
        }

        Ok(TrainedForest {
            name: self.name.clone(),
            trees,
            n_features,
            importances,
        })
    }

    /// Get the name of the model
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl TrainedForest {
    /// Predict the ensemble mean for each row
    pub fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<f64>> {
        self.check_width(x)?;

        let n_trees = self.trees.len() as f64;
        Ok(x.iter()
            .map(|row| {
                let sum: f64 = self.trees.iter().map(|t| t.predict_row(row)).sum();
                sum / n_trees
            })
            .collect())
    }

    /// Predict with every member independently; outer index is the tree
    pub fn predict_per_member(&self, x: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
        self.check_width(x)?;

        Ok(self
            .trees
            .iter()
            .map(|tree| x.iter().map(|row| tree.predict_row(row)).collect())
            .collect())
    }

    /// Normalized mean impurity decrease per feature
    pub fn feature_importances(&self) -> &[f64] {
        &self.importances
    }

    /// Number of trees in the fitted ensemble
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Number of features the forest was fitted on
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Get the name of the model
    pub fn name(&self) -> &str {
        &self.name
    }

    fn check_width(&self, x: &[Vec<f64>]) -> Result<()> {
        if let Some(row) = x.iter().find(|row| row.len() != self.n_features) {
            return Err(PipelineError::ValidationError(format!(
                "Input row has {} features, model expects {}",
                row.len(),
                self.n_features
            )));
        }
        Ok(())
    }
}

impl DecisionTree {
    fn predict_row(&self, row: &[f64]) -> f64 {
        let mut node = 0;
        loop {
            match &self.nodes[node] {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if row[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }
}

struct TreeBuilder<'a> {
    x: &'a [Vec<f64>],
    y: &'a [f64],
    max_depth: Option<usize>,
    min_samples_split: usize,
    nodes: Vec<Node>,
    importances: Vec<f64>,
}

impl TreeBuilder<'_> {
    /// Recursively grow a subtree over `samples`, returning its root id.
    fn build(&mut self, samples: Vec<usize>, depth: usize) -> usize {
        let n = samples.len() as f64;
        let sum: f64 = samples.iter().map(|&i| self.y[i]).sum();
        let mean = sum / n;
        let sse: f64 = samples.iter().map(|&i| (self.y[i] - mean).powi(2)).sum();

        let depth_reached = self.max_depth.map_or(false, |d| depth >= d);
        if samples.len() < self.min_samples_split || sse <= f64::EPSILON || depth_reached {
            return self.push(Node::Leaf { value: mean });
        }

        let split = match self.best_split(&samples, sse) {
            Some(s) => s,
            // all features constant on this sample
            None => return self.push(Node::Leaf { value: mean }),
        };

        self.importances[split.feature] += split.sse_decrease / self.y.len() as f64;

        let (left_samples, right_samples): (Vec<usize>, Vec<usize>) = samples
            .into_iter()
            .partition(|&i| self.x[i][split.feature] <= split.threshold);

        // reserve the split slot before recursing
        let id = self.push(Node::Leaf { value: mean });
        let left = self.build(left_samples, depth + 1);
        let right = self.build(right_samples, depth + 1);
        self.nodes[id] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };

        id
    }

    /// Exhaustive best split by summed-squared-error reduction.
    fn best_split(&self, samples: &[usize], parent_sse: f64) -> Option<BestSplit> {
        let n_features = self.x[samples[0]].len();
        let mut best: Option<BestSplit> = None;

        for feature in 0..n_features {
            let mut ordered: Vec<(f64, f64)> = samples
                .iter()
                .map(|&i| (self.x[i][feature], self.y[i]))
                .collect();
            ordered.sort_by(|a, b| a.0.total_cmp(&b.0));

            let total_sum: f64 = ordered.iter().map(|(_, y)| y).sum();
            let total_sq: f64 = ordered.iter().map(|(_, y)| y * y).sum();
            let n = ordered.len();

            let mut left_sum = 0.0;
            let mut left_sq = 0.0;

            for k in 1..n {
                left_sum += ordered[k - 1].1;
                left_sq += ordered[k - 1].1 * ordered[k - 1].1;

                // can't split between equal feature values
                if ordered[k].0 <= ordered[k - 1].0 {
                    continue;
                }

                let left_n = k as f64;
                let right_n = (n - k) as f64;
                let left_sse = left_sq - left_sum * left_sum / left_n;
                let right_sum = total_sum - left_sum;
                let right_sse = (total_sq - left_sq) - right_sum * right_sum / right_n;

                let decrease = parent_sse - left_sse - right_sse;
                if best.as_ref().map_or(true, |b| decrease > b.sse_decrease) {
                    best = Some(BestSplit {
                        feature,
                        threshold: (ordered[k - 1].0 + ordered[k].0) / 2.0,
                        sse_decrease: decrease,
                    });
                }
            }
        }

        best.filter(|b| b.sse_decrease > 0.0)
    }

    fn push(&mut self, node: Node) -> usize {
        self.nodes.push(node);
        self.nodes.len() - 1
    }
}

#[derive(Debug, Clone)]
struct BestSplit {
    feature: usize,
    threshold: f64,
    sse_decrease: f64,
}
