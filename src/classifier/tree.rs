//! Weighted CART decision tree (Gini impurity).
//!
//! Each leaf stores the weighted class distribution of the training samples
//! that reached it, so a single tree already yields class probabilities.

use crate::model::FEATURE_COUNT;
use rand::Rng;
use rand::seq::SliceRandom;

/// Minimum impurity decrease for a split to be kept.
const MIN_GAIN: f64 = 1e-12;

/// Internal node: samples with `x[feature_idx] <= threshold` go left.
#[derive(Debug, Clone)]
pub struct Node {
    pub feature_idx: usize,
    pub threshold: f64,
    pub left: Box<TreeNode>,
    pub right: Box<TreeNode>,
}

/// Leaf node with the normalised weighted class distribution.
#[derive(Debug, Clone)]
pub struct Leaf {
    pub distribution: Vec<f64>,
    pub n_samples: usize,
}

#[derive(Debug, Clone)]
pub enum TreeNode {
    Node(Node),
    Leaf(Leaf),
}

impl TreeNode {
    /// Leaves have depth 0; internal nodes are 1 + the deeper child.
    pub fn depth(&self) -> usize {
        match self {
            TreeNode::Leaf(_) => 0,
            TreeNode::Node(node) => 1 + node.left.depth().max(node.right.depth()),
        }
    }

    fn leaf_for(&self, x: &[f64; FEATURE_COUNT]) -> &Leaf {
        let mut node = self;
        loop {
            match node {
                TreeNode::Leaf(leaf) => return leaf,
                TreeNode::Node(split) => {
                    node = if x[split.feature_idx] <= split.threshold {
                        &split.left
                    } else {
                        &split.right
                    };
                }
            }
        }
    }
}

/// Decision tree classifier over fixed-width feature rows.
#[derive(Debug, Clone)]
pub struct DecisionTree {
    root: Option<TreeNode>,
    n_classes: usize,
    max_depth: Option<usize>,
    /// Features examined per split before falling back to the rest.
    max_features: Option<usize>,
}

/// Borrowed training data for one fit.
struct FitData<'a> {
    x: &'a [[f64; FEATURE_COUNT]],
    y: &'a [usize],
    weights: &'a [f64],
}

impl DecisionTree {
    pub fn new(n_classes: usize) -> Self {
        Self {
            root: None,
            n_classes,
            max_depth: None,
            max_features: None,
        }
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    pub fn with_max_features(mut self, max_features: usize) -> Self {
        self.max_features = Some(max_features.clamp(1, FEATURE_COUNT));
        self
    }

    pub fn root(&self) -> Option<&TreeNode> {
        self.root.as_ref()
    }

    /// Fits the tree on the rows named by `indices` (repeats allowed, as in a
    /// bootstrap sample).
    ///
    /// `weights` holds one weight per row of `x`. Labels must be below
    /// `n_classes`; out-of-range labels are ignored.
    pub fn fit<R: Rng>(
        &mut self,
        x: &[[f64; FEATURE_COUNT]],
        y: &[usize],
        weights: &[f64],
        indices: &[usize],
        rng: &mut R,
    ) {
        let data = FitData { x, y, weights };
        let usable: Vec<usize> = indices
            .iter()
            .copied()
            .filter(|&i| i < x.len() && i < y.len() && i < weights.len() && y[i] < self.n_classes)
            .collect();
        self.root = Some(self.build(&data, &usable, 0, rng));
    }

    /// Class distribution for one row. Uniform if the tree is unfitted.
    pub fn predict_proba(&self, x: &[f64; FEATURE_COUNT]) -> Vec<f64> {
        match &self.root {
            Some(root) => root.leaf_for(x).distribution.clone(),
            None => vec![1.0 / self.n_classes as f64; self.n_classes],
        }
    }

    fn build<R: Rng>(
        &self,
        data: &FitData<'_>,
        indices: &[usize],
        depth: usize,
        rng: &mut R,
    ) -> TreeNode {
        let counts = weighted_counts(data, indices, self.n_classes);
        let total: f64 = counts.iter().sum();

        let make_leaf = || {
            TreeNode::Leaf(Leaf {
                distribution: normalise(&counts),
                n_samples: indices.len(),
            })
        };

        let pure = counts.iter().filter(|&&c| c > 0.0).count() <= 1;
        let at_max_depth = self.max_depth.is_some_and(|max| depth >= max);
        if indices.len() < 2 || pure || at_max_depth || total <= 0.0 {
            return make_leaf();
        }

        let Some((feature_idx, threshold)) = self.find_best_split(data, indices, &counts, rng)
        else {
            return make_leaf();
        };

        let (left, right): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .copied()
            .partition(|&i| data.x[i][feature_idx] <= threshold);
        if left.is_empty() || right.is_empty() {
            return make_leaf();
        }

        TreeNode::Node(Node {
            feature_idx,
            threshold,
            left: Box::new(self.build(data, &left, depth + 1, rng)),
            right: Box::new(self.build(data, &right, depth + 1, rng)),
        })
    }

    /// Examines a random subset of `max_features` features; if none of them
    /// yields a valid split, keeps examining the remaining ones.
    fn find_best_split<R: Rng>(
        &self,
        data: &FitData<'_>,
        indices: &[usize],
        parent_counts: &[f64],
        rng: &mut R,
    ) -> Option<(usize, f64)> {
        let mut features: Vec<usize> = (0..FEATURE_COUNT).collect();
        features.shuffle(rng);
        let budget = self.max_features.unwrap_or(FEATURE_COUNT);

        let parent_total: f64 = parent_counts.iter().sum();
        let parent_impurity = gini(parent_counts, parent_total) * parent_total;

        let mut best: Option<(usize, f64, f64)> = None;
        for (examined, &feature_idx) in features.iter().enumerate() {
            if examined >= budget && best.is_some() {
                break;
            }
            if let Some((threshold, impurity)) =
                best_threshold(data, indices, feature_idx, parent_counts, self.n_classes)
            {
                let gain = parent_impurity - impurity;
                if gain > MIN_GAIN && best.is_none_or(|(_, _, g)| gain > g) {
                    best = Some((feature_idx, threshold, gain));
                }
            }
        }

        best.map(|(feature_idx, threshold, _)| (feature_idx, threshold))
    }
}

/// Best midpoint threshold for one feature, scanning sorted values once.
///
/// Returns `(threshold, weighted child impurity)` where the impurity is
/// scaled by total weight so it is comparable with the parent's.
fn best_threshold(
    data: &FitData<'_>,
    indices: &[usize],
    feature_idx: usize,
    parent_counts: &[f64],
    n_classes: usize,
) -> Option<(f64, f64)> {
    let mut sorted: Vec<usize> = indices.to_vec();
    sorted.sort_by(|&a, &b| data.x[a][feature_idx].total_cmp(&data.x[b][feature_idx]));

    let mut left = vec![0.0; n_classes];
    let mut right = parent_counts.to_vec();
    let mut left_total = 0.0;
    let mut right_total: f64 = parent_counts.iter().sum();

    let mut best: Option<(f64, f64)> = None;
    for k in 0..sorted.len().saturating_sub(1) {
        let i = sorted[k];
        let w = data.weights[i];
        left[data.y[i]] += w;
        right[data.y[i]] -= w;
        left_total += w;
        right_total -= w;

        let here = data.x[i][feature_idx];
        let next = data.x[sorted[k + 1]][feature_idx];
        if here >= next {
            continue;
        }

        let impurity =
            gini(&left, left_total) * left_total + gini(&right, right_total) * right_total;
        if best.is_none_or(|(_, b)| impurity < b) {
            best = Some(((here + next) / 2.0, impurity));
        }
    }

    best
}

/// Gini impurity 1 - sum(p_k^2) of weighted class counts.
pub(crate) fn gini(counts: &[f64], total: f64) -> f64 {
    if total <= 0.0 {
        return 0.0;
    }
    1.0 - counts.iter().map(|c| (c / total).powi(2)).sum::<f64>()
}

fn weighted_counts(data: &FitData<'_>, indices: &[usize], n_classes: usize) -> Vec<f64> {
    let mut counts = vec![0.0; n_classes];
    for &i in indices {
        counts[data.y[i]] += data.weights[i];
    }
    counts
}

fn normalise(counts: &[f64]) -> Vec<f64> {
    let total: f64 = counts.iter().sum();
    if total <= 0.0 {
        return vec![1.0 / counts.len() as f64; counts.len()];
    }
    counts.iter().map(|c| c / total).collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
