//! Shuffled K-fold cross-validation of the suitability classifier

use crate::core_types::seed::{stream_rng, streams};
use crate::error::Result;
use crate::learning::metrics::f1_score;
use crate::learning::{ForestConfig, RandomForest, Samples};
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Train/test index split for one fold
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fold {
    /// Training row indices
    pub train: Vec<usize>,
    /// Held-out row indices
    pub test: Vec<usize>,
}

/// Shuffled K-fold split of `n` rows
///
/// The first `n mod k` folds hold one extra row. Returns no folds when there
/// are fewer rows than folds.
pub fn kfold(n: usize, k: usize, seed: u64) -> Vec<Fold> {
    if k < 2 || n < k {
        return Vec::new();
    }
    let mut order: Vec<usize> = (0..n).collect();
    order.shuffle(&mut stream_rng(seed, streams::KFOLD));

    let base = n / k;
    let extra = n % k;
    let mut folds = Vec::with_capacity(k);
    let mut start = 0;
    for f in 0..k {
        let size = base + usize::from(f < extra);
        let test = order[start..start + size].to_vec();
        let train = order[..start]
            .iter()
            .chain(&order[start + size..])
            .copied()
            .collect();
        folds.push(Fold { train, test });
        start += size;
    }
    folds
}

/// Per-fold and mean F1 of the classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossValidation {
    /// F1 on each held-out fold
    pub fold_f1: Vec<f64>,
    /// Mean over folds (NaN when no fold could be formed)
    pub mean_f1: f64,
}

/// Fit one classifier per fold and score it on the held-out rows
///
/// # Errors
///
/// Forest configuration errors.
pub fn cross_validate(
    forest: &ForestConfig,
    x: &Samples,
    labels: &[bool],
    n_folds: usize,
    seed: u64,
) -> Result<CrossValidation> {
    let folds = kfold(x.len(), n_folds, seed);
    if folds.is_empty() {
        warn!(
            "Cross-validation skipped: {} rows for {} folds",
            x.len(),
            n_folds
        );
        return Ok(CrossValidation {
            fold_f1: Vec::new(),
            mean_f1: f64::NAN,
        });
    }

    let mut fold_f1 = Vec::with_capacity(folds.len());
    for (i, fold) in folds.iter().enumerate() {
        let train_x = x.subset(&fold.train);
        let train_y: Vec<bool> = fold.train.iter().map(|&r| labels[r]).collect();
        let model = RandomForest::fit_classifier(forest, &train_x, &train_y)?;

        let truth: Vec<bool> = fold.test.iter().map(|&r| labels[r]).collect();
        let pred: Vec<bool> = fold
            .test
            .iter()
            .map(|&r| model.predict_class(x.row(r)))
            .collect();
        let f1 = f1_score(&truth, &pred);
        debug!("Fold {}/{}: {} held out, F1 = {:.3}", i + 1, folds.len(), truth.len(), f1);
        fold_f1.push(f1);
    }
    let mean_f1 = fold_f1.iter().sum::<f64>() / fold_f1.len() as f64;
    Ok(CrossValidation { fold_f1, mean_f1 })
}
