//! Random forest regressor and probability classifier
//!
//! Each tree is fitted on its own bootstrap resample with an RNG seeded from
//! `derive_seed(config.seed, tree_index)`, so trees can be grown in parallel
//! and the forest is identical for any thread count.

use crate::core_types::seed::stream_rng;
use crate::error::{Result, TwinError};
use crate::learning::shap;
use crate::learning::tree::{RegressionTree, TreeParams};
use crate::learning::{Ensemble, Samples};
use rand::Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Number of features examined at each split
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaxFeatures {
    /// Every feature
    All,
    /// `max(1, floor(sqrt(n_features)))`
    Sqrt,
    /// `max(1, floor(log2(n_features)))`
    Log2,
}

impl MaxFeatures {
    /// Concrete feature count for `n_features` inputs
    pub fn resolve(self, n_features: usize) -> usize {
        let k = match self {
            Self::All => n_features,
            Self::Sqrt => (n_features as f64).sqrt() as usize,
            Self::Log2 => (n_features as f64).log2() as usize,
        };
        k.clamp(1, n_features.max(1))
    }
}

/// Forest hyper-parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestConfig {
    /// Number of trees
    pub n_estimators: usize,
    /// Maximum tree depth; `None` grows until leaves are pure
    pub max_depth: Option<usize>,
    /// Minimum samples on each side of a split
    pub min_samples_leaf: usize,
    /// Features examined per split
    pub max_features: MaxFeatures,
    /// Fit each tree on a bootstrap resample (otherwise on all rows)
    pub bootstrap: bool,
    /// Base seed; tree `t` uses stream `t`
    pub seed: u64,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self::regressor()
    }
}

impl ForestConfig {
    /// Defaults for the suitability regressor
    pub fn regressor() -> Self {
        Self {
            n_estimators: 300,
            max_depth: Some(10),
            min_samples_leaf: 3,
            max_features: MaxFeatures::All,
            bootstrap: true,
            seed: 42,
        }
    }

    /// Defaults for the suitability classifier
    pub fn classifier() -> Self {
        Self {
            n_estimators: 300,
            max_depth: Some(12),
            min_samples_leaf: 1,
            max_features: MaxFeatures::Sqrt,
            bootstrap: true,
            seed: 42,
        }
    }

    /// Same settings with a different base seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Reject settings that cannot grow a forest
    ///
    /// # Errors
    ///
    /// [`TwinError::InvalidConfig`] naming the offending value.
    pub fn validate(&self) -> Result<()> {
        if self.n_estimators == 0 {
            return Err(TwinError::InvalidConfig(
                "forest needs at least one estimator".into(),
            ));
        }
        if self.min_samples_leaf == 0 {
            return Err(TwinError::InvalidConfig(
                "min_samples_leaf must be at least 1".into(),
            ));
        }
        if self.max_depth == Some(0) {
            return Err(TwinError::InvalidConfig("max_depth must be positive".into()));
        }
        Ok(())
    }
}

/// Whether the forest was fitted on a continuous or a 0/1 target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ForestKind {
    /// Mean of tree outputs
    Regression,
    /// Mean positive-class fraction
    Classification,
}

/// A fitted random forest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    trees: Vec<RegressionTree>,
    n_features: usize,
    kind: ForestKind,
}

impl RandomForest {
    /// Fit a regression forest
    ///
    /// # Errors
    ///
    /// [`TwinError::EmptyTrainingSet`] when `x` has no rows, or an invalid config.
    pub fn fit_regressor(config: &ForestConfig, x: &Samples, y: &[f64]) -> Result<Self> {
        Self::fit(config, x, y, ForestKind::Regression, "regression")
    }

    /// Fit a probability classifier on boolean labels
    ///
    /// # Errors
    ///
    /// [`TwinError::EmptyTrainingSet`] when `x` has no rows, or an invalid config.
    pub fn fit_classifier(config: &ForestConfig, x: &Samples, labels: &[bool]) -> Result<Self> {
        let y: Vec<f64> = labels.iter().map(|&l| if l { 1.0 } else { 0.0 }).collect();
        Self::fit(config, x, &y, ForestKind::Classification, "classification")
    }

    fn fit(config: &ForestConfig, x: &Samples, y: &[f64], kind: ForestKind, model: &'static str) -> Result<Self> {
        config.validate()?;
        let n = x.len().min(y.len());
        if n == 0 || x.n_features() == 0 {
            return Err(TwinError::EmptyTrainingSet { model });
        }
        let params = TreeParams {
            max_depth: config.max_depth,
            min_samples_leaf: config.min_samples_leaf,
            max_features: config.max_features.resolve(x.n_features()),
        };

        let trees: Vec<RegressionTree> = (0..config.n_estimators)
            .into_par_iter()
            .map(|t| {
                let mut rng = stream_rng(config.seed, t as u64);
                let rows: Vec<usize> = if config.bootstrap {
                    (0..n).map(|_| rng.random_range(0..n)).collect()
                } else {
                    (0..n).collect()
                };
                RegressionTree::fit(x, y, rows, params, &mut rng)
            })
            .collect();

        debug!(
            "Fitted {:?} forest: {} trees on {} rows x {} features, mean depth {:.1}",
            kind,
            trees.len(),
            n,
            x.n_features(),
            trees.iter().map(|t| t.depth() as f64).sum::<f64>() / trees.len() as f64
        );

        Ok(Self {
            trees,
            n_features: x.n_features(),
            kind,
        })
    }

    /// Positive-class probability (classification) or prediction (regression)
    pub fn predict_proba(&self, row: &[f64]) -> f64 {
        self.predict(row)
    }

    /// Hard class: probability above one half
    pub fn predict_class(&self, row: &[f64]) -> bool {
        self.predict(row) > 0.5
    }

    /// Fitted trees
    pub fn trees(&self) -> &[RegressionTree] {
        &self.trees
    }

    /// Number of trees
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Regression or classification
    pub const fn kind(&self) -> ForestKind {
        self.kind
    }
}

impl Ensemble for RandomForest {
    fn n_features(&self) -> usize {
        self.n_features
    }

    fn predict(&self, row: &[f64]) -> f64 {
        self.trees.iter().map(|t| t.predict(row)).sum::<f64>() / self.trees.len() as f64
    }

    fn baseline(&self) -> f64 {
        self.trees.iter().map(RegressionTree::root_value).sum::<f64>() / self.trees.len() as f64
    }

    fn contributions(&self, row: &[f64]) -> Vec<f64> {
        let mut phi = vec![0.0; self.n_features];
        for tree in &self.trees {
            shap::tree_shap(tree, row, &mut phi);
        }
        let scale = 1.0 / self.trees.len() as f64;
        for p in &mut phi {
            *p *= scale;
        }
        phi
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn linear_data(n: usize) -> (Samples, Vec<f64>) {
        let mut data = Vec::with_capacity(n * 2);
        let mut y = Vec::with_capacity(n);
        for i in 0..n {
            let a = i as f64 / n as f64;
            let b = ((i * 7) % n) as f64 / n as f64;
            data.push(a);
            data.push(b);
            y.push(2.0 * a + 0.1 * b);
        }
        (Samples::new(data, 2), y)
    }

    fn small(seed: u64) -> ForestConfig {
        ForestConfig {
            n_estimators: 12,
            ..ForestConfig::regressor()
        }
        .with_seed(seed)
    }

    #[test]
    fn test_max_features_resolution() {
        assert_eq!(MaxFeatures::All.resolve(8), 8);
        assert_eq!(MaxFeatures::Sqrt.resolve(8), 2);
        assert_eq!(MaxFeatures::Sqrt.resolve(1), 1);
        assert_eq!(MaxFeatures::Log2.resolve(8), 3);
    }

    #[test]
    fn test_regressor_fits_linear_trend() {
        let (x, y) = linear_data(200);
        let forest = RandomForest::fit_regressor(&small(42), &x, &y).unwrap();
        let pred = forest.predict_batch(&x);
        let r2 = crate::learning::metrics::r2_score(&y, &pred);
        assert!(r2 > 0.95, "r2 = {r2}");
    }

    #[test]
    fn test_same_seed_same_forest() {
        let (x, y) = linear_data(100);
        let a = RandomForest::fit_regressor(&small(9), &x, &y).unwrap();
        let b = RandomForest::fit_regressor(&small(9), &x, &y).unwrap();
        assert_eq!(a, b);
        let c = RandomForest::fit_regressor(&small(10), &x, &y).unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn test_thread_count_does_not_matter() {
        let (x, y) = linear_data(100);
        let single = rayon::ThreadPoolBuilder::new()
            .num_threads(1)
            .build()
            .unwrap()
            .install(|| RandomForest::fit_regressor(&small(5), &x, &y).unwrap());
        let multi = rayon::ThreadPoolBuilder::new()
            .num_threads(4)
            .build()
            .unwrap()
            .install(|| RandomForest::fit_regressor(&small(5), &x, &y).unwrap());
        assert_eq!(single, multi);
    }

    #[test]
    fn test_classifier_probabilities() {
        let (x, y) = linear_data(120);
        let labels: Vec<bool> = y.iter().map(|&v| v > 1.0).collect();
        let config = ForestConfig {
            n_estimators: 16,
            ..ForestConfig::classifier()
        };
        let forest = RandomForest::fit_classifier(&config, &x, &labels).unwrap();
        assert_eq!(forest.kind(), ForestKind::Classification);
        for i in 0..x.len() {
            let p = forest.predict_proba(x.row(i));
            assert!((0.0..=1.0).contains(&p));
        }
        assert!(forest.predict_class(&[0.95, 0.5]));
        assert!(!forest.predict_class(&[0.05, 0.5]));
    }

    #[test]
    fn test_empty_training_set() {
        let x = Samples::new(Vec::new(), 4);
        let err = RandomForest::fit_regressor(&small(1), &x, &[]).unwrap_err();
        assert!(matches!(err, TwinError::EmptyTrainingSet { .. }));
    }

    #[test]
    fn test_contributions_are_additive() {
        let (x, y) = linear_data(80);
        let forest = RandomForest::fit_regressor(&small(3), &x, &y).unwrap();
        for i in [0, 17, 55, 79] {
            let row = x.row(i);
            let phi = forest.contributions(row);
            assert_relative_eq!(
                forest.baseline() + phi.iter().sum::<f64>(),
                forest.predict(row),
                epsilon = 1e-9
            );
        }
    }
}
