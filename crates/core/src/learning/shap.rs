//! Exact path-dependent TreeSHAP and attribution summaries
//!
//! For one tree and one row, [`tree_shap`] adds each feature's Shapley
//! contribution to `phi` in `O(leaves · depth²)`, using node covers as the
//! background distribution. Contributions are additive: the tree's root
//! value plus the sum of contributions equals the tree's prediction.
//!
//! # References
//! - Lundberg, S.M., Erion, G.G., Lee, S.-I. (2018). "Consistent Individualized
//!   Feature Attribution for Tree Ensembles", arXiv:1802.03888, Algorithm 2

use crate::learning::tree::RegressionTree;
use crate::learning::{Ensemble, Samples};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy)]
struct PathElement {
    feature: Option<usize>,
    zero_fraction: f64,
    one_fraction: f64,
    pweight: f64,
}

/// Add the contributions of `tree` for `row` into `phi`
pub fn tree_shap(tree: &RegressionTree, row: &[f64], phi: &mut [f64]) {
    recurse(tree, row, phi, 0, &[], 1.0, 1.0, None);
}

#[allow(clippy::too_many_arguments)]
fn recurse(
    tree: &RegressionTree,
    row: &[f64],
    phi: &mut [f64],
    node_idx: usize,
    parent_path: &[PathElement],
    zero_fraction: f64,
    one_fraction: f64,
    feature: Option<usize>,
) {
    let mut path = parent_path.to_vec();
    extend_path(&mut path, zero_fraction, one_fraction, feature);

    let nodes = tree.nodes();
    let node = &nodes[node_idx];
    let Some(split) = node.split else {
        let depth = path.len() - 1;
        for i in 1..=depth {
            let weight = unwound_path_sum(&path, i);
            let el = path[i];
            if let Some(f) = el.feature {
                phi[f] += weight * (el.one_fraction - el.zero_fraction) * node.value;
            }
        }
        return;
    };

    let (hot, cold) = if row[split.feature] <= split.threshold {
        (split.left, split.right)
    } else {
        (split.right, split.left)
    };
    let hot_zero = nodes[hot].cover / node.cover;
    let cold_zero = nodes[cold].cover / node.cover;

    // A feature seen earlier on the path is undone before splitting on it again
    let mut incoming_zero = 1.0;
    let mut incoming_one = 1.0;
    if let Some(k) = path.iter().skip(1).position(|e| e.feature == Some(split.feature)) {
        let k = k + 1;
        incoming_zero = path[k].zero_fraction;
        incoming_one = path[k].one_fraction;
        unwind_path(&mut path, k);
    }

    recurse(
        tree,
        row,
        phi,
        hot,
        &path,
        hot_zero * incoming_zero,
        incoming_one,
        Some(split.feature),
    );
    recurse(
        tree,
        row,
        phi,
        cold,
        &path,
        cold_zero * incoming_zero,
        0.0,
        Some(split.feature),
    );
}

fn extend_path(path: &mut Vec<PathElement>, zero_fraction: f64, one_fraction: f64, feature: Option<usize>) {
    let d = path.len();
    path.push(PathElement {
        feature,
        zero_fraction,
        one_fraction,
        pweight: if d == 0 { 1.0 } else { 0.0 },
    });
    let denom = (d + 1) as f64;
    for i in (0..d).rev() {
        path[i + 1].pweight += one_fraction * path[i].pweight * (i + 1) as f64 / denom;
        path[i].pweight = zero_fraction * path[i].pweight * (d - i) as f64 / denom;
    }
}

fn unwind_path(path: &mut Vec<PathElement>, path_index: usize) {
    let d = path.len() - 1;
    let one = path[path_index].one_fraction;
    let zero = path[path_index].zero_fraction;
    let denom = (d + 1) as f64;
    let mut next_one = path[d].pweight;
    for i in (0..d).rev() {
        if one != 0.0 {
            let tmp = path[i].pweight;
            path[i].pweight = next_one * denom / ((i + 1) as f64 * one);
            next_one = tmp - path[i].pweight * zero * (d - i) as f64 / denom;
        } else {
            path[i].pweight = path[i].pweight * denom / (zero * (d - i) as f64);
        }
    }
    for i in path_index..d {
        path[i].feature = path[i + 1].feature;
        path[i].zero_fraction = path[i + 1].zero_fraction;
        path[i].one_fraction = path[i + 1].one_fraction;
    }
    path.pop();
}

fn unwound_path_sum(path: &[PathElement], path_index: usize) -> f64 {
    let d = path.len() - 1;
    let one = path[path_index].one_fraction;
    let zero = path[path_index].zero_fraction;
    let denom = (d + 1) as f64;
    let mut next_one = path[d].pweight;
    let mut total = 0.0;
    for i in (0..d).rev() {
        if one != 0.0 {
            let tmp = next_one * denom / ((i + 1) as f64 * one);
            total += tmp;
            next_one = path[i].pweight - tmp * zero * (d - i) as f64 / denom;
        } else if zero != 0.0 {
            total += path[i].pweight / zero / ((d - i) as f64 / denom);
        }
    }
    total
}

/// Per-row additive contributions of every feature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribution {
    /// Feature names, in column order
    pub features: Vec<String>,
    /// Expected model output
    pub baseline: f64,
    /// Row-major `rows x features` contributions
    pub values: Vec<f64>,
}

impl Attribution {
    /// Explain every row of `samples`
    pub fn explain<E: Ensemble + ?Sized>(model: &E, samples: &Samples, features: &[&str]) -> Self {
        let rows: Vec<Vec<f64>> = (0..samples.len())
            .into_par_iter()
            .map(|i| model.contributions(samples.row(i)))
            .collect();
        Self {
            features: features.iter().map(|f| (*f).to_string()).collect(),
            baseline: model.baseline(),
            values: rows.into_iter().flatten().collect(),
        }
    }

    /// Number of explained rows
    pub fn n_rows(&self) -> usize {
        if self.features.is_empty() {
            0
        } else {
            self.values.len() / self.features.len()
        }
    }

    /// Contributions of row `i`
    pub fn row(&self, i: usize) -> &[f64] {
        let k = self.features.len();
        &self.values[i * k..(i + 1) * k]
    }

    /// Features ranked by mean absolute contribution, largest first
    ///
    /// Ties keep column order.
    pub fn importance(&self) -> Vec<(String, f64)> {
        let n = self.n_rows();
        let k = self.features.len();
        let mut ranked: Vec<(String, f64)> = (0..k)
            .map(|f| {
                let total: f64 = (0..n).map(|r| self.values[r * k + f].abs()).sum();
                let mean = if n == 0 { 0.0 } else { total / n as f64 };
                (self.features[f].clone(), mean)
            })
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked
    }

    /// `(feature value, contribution)` pairs for one feature, sorted by value
    ///
    /// `feature_values` is the explained sample column for that feature.
    /// Returns `None` for an unknown feature name.
    pub fn dependence(&self, feature: &str, feature_values: &[f64]) -> Option<Vec<(f64, f64)>> {
        let f = self.features.iter().position(|name| name == feature)?;
        let k = self.features.len();
        let mut curve: Vec<(f64, f64)> = feature_values
            .iter()
            .take(self.n_rows())
            .enumerate()
            .map(|(r, &v)| (v, self.values[r * k + f]))
            .collect();
        curve.sort_by(|a, b| a.0.total_cmp(&b.0));
        Some(curve)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::learning::tree::TreeParams;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn xor_like() -> (Samples, Vec<f64>) {
        let mut data = Vec::new();
        let mut y = Vec::new();
        for i in 0..40 {
            let a = f64::from(i % 2);
            let b = f64::from((i / 2) % 2);
            let c = f64::from(i % 5);
            data.extend([a, b, c]);
            y.push(3.0 * a + b + 0.5 * a * b);
        }
        (Samples::new(data, 3), y)
    }

    fn fitted() -> (Samples, RegressionTree) {
        let (x, y) = xor_like();
        let mut rng = StdRng::seed_from_u64(1);
        let params = TreeParams {
            max_depth: None,
            min_samples_leaf: 1,
            max_features: 3,
        };
        let tree = RegressionTree::fit(&x, &y, (0..x.len()).collect(), params, &mut rng);
        (x, tree)
    }

    #[test]
    fn test_single_tree_additivity() {
        let (x, tree) = fitted();
        for i in 0..x.len() {
            let mut phi = vec![0.0; 3];
            tree_shap(&tree, x.row(i), &mut phi);
            assert_relative_eq!(
                tree.root_value() + phi.iter().sum::<f64>(),
                tree.predict(x.row(i)),
                epsilon = 1e-9
            );
        }
    }

    #[test]
    fn test_irrelevant_feature_gets_nothing() {
        let (x, tree) = fitted();
        let mut phi = vec![0.0; 3];
        tree_shap(&tree, x.row(3), &mut phi);
        assert_relative_eq!(phi[2], 0.0, epsilon = 1e-12);
        assert!(phi[0].abs() > phi[1].abs());
    }

    #[test]
    fn test_single_split_matches_closed_form() {
        // Stump on x0: left mean 0, right mean 10, equal covers
        let x = Samples::new(vec![0.0, 0.0, 1.0, 1.0], 1);
        let y = [0.0, 0.0, 10.0, 10.0];
        let mut rng = StdRng::seed_from_u64(0);
        let params = TreeParams {
            max_depth: None,
            min_samples_leaf: 1,
            max_features: 1,
        };
        let tree = RegressionTree::fit(&x, &y, vec![0, 1, 2, 3], params, &mut rng);
        let mut phi = vec![0.0];
        tree_shap(&tree, &[1.0], &mut phi);
        assert_relative_eq!(phi[0], 5.0, epsilon = 1e-12);
    }

    #[test]
    fn test_importance_ranking_and_dependence() {
        let attr = Attribution {
            features: vec!["a".into(), "b".into()],
            baseline: 0.0,
            values: vec![0.1, -0.5, -0.3, 0.5, 0.2, 0.2],
        };
        let ranked = attr.importance();
        assert_eq!(ranked[0].0, "b");
        assert_relative_eq!(ranked[0].1, 0.4, epsilon = 1e-12);
        assert_relative_eq!(ranked[1].1, 0.2, epsilon = 1e-12);

        let curve = attr.dependence("a", &[3.0, 1.0, 2.0]).unwrap();
        assert_eq!(curve, vec![(1.0, -0.3), (2.0, 0.2), (3.0, 0.1)]);
        assert!(attr.dependence("zzz", &[]).is_none());
    }
}
