//! Tree ensembles, attribution and scoring
//!
//! The refinement and uncertainty stages only need three things from a model:
//! fit on a sample matrix, predict a row, and explain a prediction as additive
//! per-feature contributions. [`Ensemble`] is that seam; [`RandomForest`] is the
//! implementation shipped with the crate.

pub mod forest;
pub mod metrics;
pub mod shap;
pub mod tree;

pub use forest::{ForestConfig, ForestKind, MaxFeatures, RandomForest};
pub use shap::Attribution;
pub use tree::RegressionTree;

use rayon::prelude::*;

/// Row-major sample matrix
#[derive(Debug, Clone, PartialEq)]
pub struct Samples {
    data: Vec<f64>,
    n_features: usize,
}

impl Samples {
    /// Wrap row-major `data` with `n_features` values per row
    ///
    /// A trailing partial row is ignored.
    pub fn new(data: Vec<f64>, n_features: usize) -> Self {
        Self { data, n_features }
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        if self.n_features == 0 {
            0
        } else {
            self.data.len() / self.n_features
        }
    }

    /// Whether there are no rows
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Values per row
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Row `i`
    #[inline]
    pub fn row(&self, i: usize) -> &[f64] {
        &self.data[i * self.n_features..(i + 1) * self.n_features]
    }

    /// Value of feature `k` in row `i`
    #[inline]
    pub fn get(&self, i: usize, k: usize) -> f64 {
        self.data[i * self.n_features + k]
    }

    /// One feature across all rows
    pub fn column(&self, k: usize) -> Vec<f64> {
        (0..self.len()).map(|i| self.get(i, k)).collect()
    }

    /// Rows at `indices`, repeated indices repeating the row
    pub fn subset(&self, indices: &[usize]) -> Self {
        let mut data = Vec::with_capacity(indices.len() * self.n_features);
        for &i in indices {
            data.extend_from_slice(self.row(i));
        }
        Self::new(data, self.n_features)
    }
}

/// A fitted model that predicts a scalar per row and explains it additively
pub trait Ensemble: Send + Sync {
    /// Number of input features
    fn n_features(&self) -> usize;

    /// Prediction for one row
    fn predict(&self, row: &[f64]) -> f64;

    /// Expected model output over the training distribution
    fn baseline(&self) -> f64;

    /// Per-feature contributions for one row; `baseline + sum == predict(row)`
    fn contributions(&self, row: &[f64]) -> Vec<f64>;

    /// Predictions for every row, in row order
    fn predict_batch(&self, samples: &Samples) -> Vec<f64> {
        (0..samples.len())
            .into_par_iter()
            .map(|i| self.predict(samples.row(i)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_samples_layout() {
        let s = Samples::new(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], 2);
        assert_eq!(s.len(), 3);
        assert_eq!(s.row(1), &[3.0, 4.0]);
        assert_eq!(s.column(1), vec![2.0, 4.0, 6.0]);
        assert_eq!(s.subset(&[2, 2]).row(1), &[5.0, 6.0]);
        assert!(Samples::new(Vec::new(), 0).is_empty());
    }
}
