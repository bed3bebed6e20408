//! Goodness-of-fit scores

/// Coefficient of determination
///
/// A constant target scores 1.0 when predicted exactly and 0.0 otherwise.
/// Empty input gives NaN.
pub fn r2_score(truth: &[f64], pred: &[f64]) -> f64 {
    let n = truth.len().min(pred.len());
    if n == 0 {
        return f64::NAN;
    }
    let mean = truth[..n].iter().sum::<f64>() / n as f64;
    let ss_res: f64 = truth.iter().zip(pred).map(|(t, p)| (t - p) * (t - p)).sum();
    let ss_tot: f64 = truth[..n].iter().map(|t| (t - mean) * (t - mean)).sum();
    if ss_tot == 0.0 {
        return if ss_res == 0.0 { 1.0 } else { 0.0 };
    }
    1.0 - ss_res / ss_tot
}

/// Mean absolute error (NaN for empty input)
pub fn mean_absolute_error(truth: &[f64], pred: &[f64]) -> f64 {
    let n = truth.len().min(pred.len());
    if n == 0 {
        return f64::NAN;
    }
    truth.iter().zip(pred).map(|(t, p)| (t - p).abs()).sum::<f64>() / n as f64
}

/// Binary F1 of the positive class; 0.0 when there are no positives at all
pub fn f1_score(truth: &[bool], pred: &[bool]) -> f64 {
    let (mut tp, mut fp, mut fn_) = (0usize, 0usize, 0usize);
    for (&t, &p) in truth.iter().zip(pred) {
        match (t, p) {
            (true, true) => tp += 1,
            (false, true) => fp += 1,
            (true, false) => fn_ += 1,
            (false, false) => {}
        }
    }
    let denom = 2 * tp + fp + fn_;
    if denom == 0 {
        0.0
    } else {
        (2 * tp) as f64 / denom as f64
    }
}
