//! Bootstrap ensemble disagreement
//!
//! `B` classifiers are fitted on independent same-size resamples (with
//! replacement) of the training rows. Each predicts the positive-class
//! probability for every original row; the per-row population standard
//! deviation across the `B` probabilities is the uncertainty.

use crate::core_types::seed::{derive_seed, streams};
use crate::error::Result;
use crate::learning::{Ensemble, ForestConfig, RandomForest, Samples};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

/// Same-size resample with replacement for round `round`
pub fn resample_indices(n: usize, seed: u64, round: usize) -> Vec<usize> {
    let mut rng = StdRng::seed_from_u64(derive_seed(derive_seed(seed, streams::BOOTSTRAP), round as u64));
    (0..n).map(|_| rng.random_range(0..n)).collect()
}

/// Per-row standard deviation (ddof 0) of bootstrap probabilities
///
/// Values lie in [0, 0.5] since every probability lies in [0, 1]. Empty input
/// gives an empty vector.
///
/// # Errors
///
/// Forest configuration errors.
pub fn bootstrap_uncertainty(
    forest: &ForestConfig,
    x: &Samples,
    labels: &[bool],
    rounds: usize,
    seed: u64,
) -> Result<Vec<f64>> {
    let n = x.len();
    if n == 0 || rounds == 0 {
        return Ok(vec![f64::NAN; n]);
    }

    let mut sum = vec![0.0; n];
    let mut sum_sq = vec![0.0; n];
    let mut probs: Vec<Vec<f64>> = Vec::with_capacity(rounds);
    for round in 0..rounds {
        let idx = resample_indices(n, seed, round);
        let bx = x.subset(&idx);
        let by: Vec<bool> = idx.iter().map(|&r| labels[r]).collect();
        let model = RandomForest::fit_classifier(forest, &bx, &by)?;
        let p = model.predict_batch(x);
        debug!(
            "Bootstrap round {}/{}: mean probability {:.3}",
            round + 1,
            rounds,
            p.iter().sum::<f64>() / n as f64
        );
        probs.push(p);
    }

    for p in &probs {
        for (i, &v) in p.iter().enumerate() {
            sum[i] += v;
        }
    }
    let b = rounds as f64;
    for p in &probs {
        for (i, &v) in p.iter().enumerate() {
            let d = v - sum[i] / b;
            sum_sq[i] += d * d;
        }
    }
    Ok(sum_sq.into_iter().map(|ss| (ss / b).sqrt()).collect())
}
