//! Bagged decision-tree ensemble.
//!
//! Each tree is fitted on a bootstrap sample drawn with its own seeded
//! generator, examining a random subset of features at every split. Class
//! probabilities are the mean of the trees' leaf distributions.

use super::tree::DecisionTree;
use crate::model::FEATURE_COUNT;
use rand::SeedableRng;
use rand::distributions::{Distribution, Uniform};
use rand::rngs::StdRng;

/// How training rows are weighted by class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassWeight {
    /// Every row counts the same.
    Uniform,
    /// Rows are weighted `n / (k * count_c)` so each present class carries
    /// equal total weight.
    Balanced,
}

/// Random forest classifier.
#[derive(Debug, Clone)]
pub struct RandomForest {
    trees: Vec<DecisionTree>,
    n_estimators: usize,
    n_classes: usize,
    max_depth: Option<usize>,
    max_features: Option<usize>,
    class_weight: ClassWeight,
    random_state: Option<u64>,
}

impl RandomForest {
    pub fn new(n_estimators: usize, n_classes: usize) -> Self {
        Self {
            trees: Vec::new(),
            n_estimators: n_estimators.max(1),
            n_classes,
            max_depth: None,
            max_features: None,
            class_weight: ClassWeight::Uniform,
            random_state: None,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = Some(max_depth);
        self
    }

    pub fn with_max_features(mut self, max_features: usize) -> Self {
        self.max_features = Some(max_features);
        self
    }

    pub fn with_class_weight(mut self, class_weight: ClassWeight) -> Self {
        self.class_weight = class_weight;
        self
    }

    /// Sets the random state for reproducibility.
    pub fn with_random_state(mut self, random_state: u64) -> Self {
        self.random_state = Some(random_state);
        self
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn is_fitted(&self) -> bool {
        !self.trees.is_empty()
    }

    /// Fits the forest. Tree `i` uses seed `random_state + i`.
    pub fn fit(&mut self, x: &[[f64; FEATURE_COUNT]], y: &[usize]) {
        let n_samples = x.len().min(y.len());
        self.trees = Vec::with_capacity(self.n_estimators);
        if n_samples == 0 {
            return;
        }

        let weights = match self.class_weight {
            ClassWeight::Uniform => vec![1.0; n_samples],
            ClassWeight::Balanced => {
                let per_class = balanced_class_weights(&y[..n_samples], self.n_classes);
                y[..n_samples]
                    .iter()
                    .map(|&c| per_class.get(c).copied().unwrap_or(0.0))
                    .collect()
            }
        };

        for i in 0..self.n_estimators {
            let mut rng = match self.random_state {
                Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(i as u64)),
                None => StdRng::from_entropy(),
            };
            let bootstrap_indices = bootstrap_sample(n_samples, &mut rng);

            let mut tree = DecisionTree::new(self.n_classes);
            if let Some(depth) = self.max_depth {
                tree = tree.with_max_depth(depth);
            }
            if let Some(max_features) = self.max_features {
                tree = tree.with_max_features(max_features);
            }
            tree.fit(x, y, &weights, &bootstrap_indices, &mut rng);
            self.trees.push(tree);
        }
    }

    /// Mean class distribution over all trees. Uniform if unfitted.
    pub fn predict_proba(&self, x: &[f64; FEATURE_COUNT]) -> Vec<f64> {
        if self.trees.is_empty() {
            return vec![1.0 / self.n_classes as f64; self.n_classes];
        }

        let mut proba = vec![0.0; self.n_classes];
        for tree in &self.trees {
            for (p, t) in proba.iter_mut().zip(tree.predict_proba(x)) {
                *p += t;
            }
        }
        let n_trees = self.trees.len() as f64;
        proba.iter_mut().for_each(|p| *p /= n_trees);
        proba
    }

    /// Most probable class; ties resolve to the lower class index.
    pub fn predict(&self, x: &[f64; FEATURE_COUNT]) -> usize {
        let proba = self.predict_proba(x);
        let mut best = 0;
        for (i, p) in proba.iter().enumerate() {
            if *p > proba[best] {
                best = i;
            }
        }
        best
    }

    /// Fraction of rows predicted correctly. `None` for an empty set.
    pub fn score(&self, x: &[[f64; FEATURE_COUNT]], y: &[usize]) -> Option<f64> {
        let n = x.len().min(y.len());
        if n == 0 {
            return None;
        }
        let correct = x
            .iter()
            .zip(y)
            .filter(|(row, label)| self.predict(row) == **label)
            .count();
        Some(correct as f64 / n as f64)
    }
}

/// Per-class weights `n / (k * count_c)`, where `k` is the number of classes
/// present. Absent classes get weight 0.
pub fn balanced_class_weights(y: &[usize], n_classes: usize) -> Vec<f64> {
    let mut counts = vec![0usize; n_classes];
    for &c in y {
        if c < n_classes {
            counts[c] += 1;
        }
    }
    let present = counts.iter().filter(|&&c| c > 0).count();
    let n: usize = counts.iter().sum();

    counts
        .iter()
        .map(|&c| {
            if c == 0 {
                0.0
            } else {
                n as f64 / (present as f64 * c as f64)
            }
        })
        .collect()
}

/// Creates a bootstrap sample (random sample with replacement).
///
/// Returns indices of samples to include in the bootstrap sample.
fn bootstrap_sample(n_samples: usize, rng: &mut StdRng) -> Vec<usize> {
    let dist = Uniform::from(0..n_samples);
    (0..n_samples).map(|_| dist.sample(rng)).collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
