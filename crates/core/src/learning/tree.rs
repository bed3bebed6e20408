//! CART regression tree
//!
//! Binary splits chosen by variance reduction, thresholds at the midpoint
//! between neighbouring sorted values (`x <= threshold` goes left). Every node
//! keeps its mean target value and its cover (number of training samples,
//! counting bootstrap repeats), which path-dependent attribution needs.
//!
//! A 0/1 target fitted this way yields leaf values that are positive-class
//! fractions; variance reduction on such a target picks the same splits as
//! Gini impurity.

use crate::learning::Samples;
use rand::rngs::StdRng;
use rand::seq::index;
use serde::{Deserialize, Serialize};

/// Internal-node split
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Split {
    /// Feature index
    pub feature: usize,
    /// Values `<=` threshold go left
    pub threshold: f64,
    /// Index of the left child
    pub left: usize,
    /// Index of the right child
    pub right: usize,
}

/// A node in the tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeNode {
    /// `None` for leaves
    pub split: Option<Split>,
    /// Mean target of the training samples reaching this node
    pub value: f64,
    /// Number of training samples reaching this node
    pub cover: f64,
}

impl TreeNode {
    /// Returns `true` if this node is a leaf
    pub const fn is_leaf(&self) -> bool {
        self.split.is_none()
    }
}

/// Growth limits for one tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeParams {
    /// Maximum depth (root at depth 0); `None` grows until leaves are pure
    pub max_depth: Option<usize>,
    /// Minimum samples on each side of a split
    pub min_samples_leaf: usize,
    /// Features examined per split (drawn without replacement when fewer than all)
    pub max_features: usize,
}

/// A fitted regression tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    nodes: Vec<TreeNode>,
    n_features: usize,
}

struct Builder<'a> {
    x: &'a Samples,
    y: &'a [f64],
    params: TreeParams,
    rng: &'a mut StdRng,
    nodes: Vec<TreeNode>,
}

impl RegressionTree {
    /// Fit on the rows of `x` listed in `rows` (repeats allowed)
    ///
    /// `rows` must be non-empty and index into `x` and `y`.
    pub fn fit(x: &Samples, y: &[f64], rows: Vec<usize>, params: TreeParams, rng: &mut StdRng) -> Self {
        let mut builder = Builder {
            x,
            y,
            params,
            rng,
            nodes: Vec::new(),
        };
        builder.grow(rows, 0);
        Self {
            nodes: builder.nodes,
            n_features: x.n_features(),
        }
    }

    /// Predict one row
    pub fn predict(&self, row: &[f64]) -> f64 {
        self.nodes[self.leaf_index(row)].value
    }

    /// Index of the leaf a row falls into
    pub fn leaf_index(&self, row: &[f64]) -> usize {
        let mut idx = 0;
        while let Some(split) = self.nodes[idx].split {
            idx = if row[split.feature] <= split.threshold {
                split.left
            } else {
                split.right
            };
        }
        idx
    }

    /// All nodes; index 0 is the root
    pub fn nodes(&self) -> &[TreeNode] {
        &self.nodes
    }

    /// Mean training target (root value)
    pub fn root_value(&self) -> f64 {
        self.nodes[0].value
    }

    /// Expected number of features
    pub const fn n_features(&self) -> usize {
        self.n_features
    }

    /// Number of leaves
    pub fn n_leaves(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_leaf()).count()
    }

    /// Longest root-to-leaf path
    pub fn depth(&self) -> usize {
        self.node_depth(0)
    }

    fn node_depth(&self, idx: usize) -> usize {
        match self.nodes[idx].split {
            None => 0,
            Some(s) => 1 + self.node_depth(s.left).max(self.node_depth(s.right)),
        }
    }
}

impl Builder<'_> {
    /// Grow the subtree for `rows`, returning its node index
    fn grow(&mut self, rows: Vec<usize>, depth: usize) -> usize {
        let n = rows.len();
        let sum: f64 = rows.iter().map(|&r| self.y[r]).sum();
        let value = sum / n as f64;
        let idx = self.nodes.len();
        self.nodes.push(TreeNode {
            split: None,
            value,
            cover: n as f64,
        });

        let depth_reached = self.params.max_depth.is_some_and(|d| depth >= d);
        let pure = rows.iter().all(|&r| self.y[r] == self.y[rows[0]]);
        if depth_reached || pure || n < 2 * self.params.min_samples_leaf {
            return idx;
        }

        let Some((feature, threshold)) = self.best_split(&rows) else {
            return idx;
        };
        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
            .into_iter()
            .partition(|&r| self.x.get(r, feature) <= threshold);

        let left = self.grow(left_rows, depth + 1);
        let right = self.grow(right_rows, depth + 1);
        self.nodes[idx].split = Some(Split {
            feature,
            threshold,
            left,
            right,
        });
        idx
    }

    /// Highest variance-reduction split over the candidate features
    fn best_split(&mut self, rows: &[usize]) -> Option<(usize, f64)> {
        let n_features = self.x.n_features();
        let features: Vec<usize> = if self.params.max_features >= n_features {
            (0..n_features).collect()
        } else {
            index::sample(&mut *self.rng, n_features, self.params.max_features).into_vec()
        };

        let n = rows.len();
        let min_leaf = self.params.min_samples_leaf.max(1);
        let total: f64 = rows.iter().map(|&r| self.y[r]).sum();
        let mut best: Option<(f64, usize, f64)> = None;
        let mut pairs: Vec<(f64, f64)> = Vec::with_capacity(n);

        for feature in features {
            pairs.clear();
            pairs.extend(rows.iter().map(|&r| (self.x.get(r, feature), self.y[r])));
            pairs.sort_by(|a, b| a.0.total_cmp(&b.0));

            let mut left_sum = 0.0;
            for i in 1..n {
                left_sum += pairs[i - 1].1;
                if i < min_leaf || n - i < min_leaf {
                    continue;
                }
                let (lo, hi) = (pairs[i - 1].0, pairs[i].0);
                if lo >= hi {
                    continue;
                }
                let right_sum = total - left_sum;
                let score = left_sum * left_sum / i as f64 + right_sum * right_sum / (n - i) as f64;
                if best.is_none_or(|(s, _, _)| score > s) {
                    let mid = 0.5 * (lo + hi);
                    let threshold = if mid >= hi { lo } else { mid };
                    best = Some((score, feature, threshold));
                }
            }
        }
        best.map(|(_, f, t)| (f, t))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn params(max_depth: Option<usize>, min_leaf: usize) -> TreeParams {
        TreeParams {
            max_depth,
            min_samples_leaf: min_leaf,
            max_features: usize::MAX,
        }
    }

    #[test]
    fn test_step_function_is_recovered() {
        let xs: Vec<f64> = (0..20).map(f64::from).collect();
        let y: Vec<f64> = xs.iter().map(|&v| if v < 10.0 { 1.0 } else { 5.0 }).collect();
        let x = Samples::new(xs, 1);
        let mut rng = StdRng::seed_from_u64(0);
        let tree = RegressionTree::fit(&x, &y, (0..20).collect(), params(None, 1), &mut rng);

        assert_eq!(tree.n_leaves(), 2);
        assert_eq!(tree.nodes()[0].split.map(|s| s.threshold), Some(9.5));
        assert_eq!(tree.predict(&[3.0]), 1.0);
        assert_eq!(tree.predict(&[9.5]), 1.0);
        assert_eq!(tree.predict(&[12.0]), 5.0);
        assert_eq!(tree.root_value(), 3.0);
    }

    #[test]
    fn test_depth_and_leaf_limits() {
        let xs: Vec<f64> = (0..64).map(f64::from).collect();
        let y: Vec<f64> = xs.iter().map(|v| v * v).collect();
        let x = Samples::new(xs, 1);
        let mut rng = StdRng::seed_from_u64(0);
        let tree = RegressionTree::fit(&x, &y, (0..64).collect(), params(Some(3), 5), &mut rng);
        assert!(tree.depth() <= 3);
        for node in tree.nodes().iter().filter(|n| n.is_leaf()) {
            assert!(node.cover >= 5.0);
        }
    }

    #[test]
    fn test_cover_counts_repeats() {
        let x = Samples::new(vec![0.0, 1.0], 1);
        let y = [0.0, 1.0];
        let mut rng = StdRng::seed_from_u64(0);
        let tree = RegressionTree::fit(&x, &y, vec![0, 0, 1], params(None, 1), &mut rng);
        assert_eq!(tree.nodes()[0].cover, 3.0);
        assert!((tree.root_value() - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_constant_feature_gives_leaf() {
        let x = Samples::new(vec![1.0; 8], 1);
        let y = [0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0];
        let mut rng = StdRng::seed_from_u64(0);
        let tree = RegressionTree::fit(&x, &y, (0..8).collect(), params(None, 1), &mut rng);
        assert_eq!(tree.nodes().len(), 1);
        assert_eq!(tree.predict(&[1.0]), 0.5);
    }
}
