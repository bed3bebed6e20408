//! Descriptive statistics over NaN-bearing samples
//!
//! Grid fields mark missing cells with NaN, so every reduction here skips
//! non-finite values unless stated otherwise.

use serde::{Deserialize, Serialize};

/// Iterator over the finite values of a slice
#[inline]
pub fn finite(values: &[f64]) -> impl Iterator<Item = f64> + '_ {
    values.iter().copied().filter(|v| v.is_finite())
}

/// Minimum and maximum over finite values, `None` when there are none
///
/// Infinities are skipped along with NaN, so one infinite cell cannot collapse
/// a min-max normalization to NaN across the whole grid.
pub fn min_max(values: &[f64]) -> Option<(f64, f64)> {
    finite(values).fold(None, |acc, v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
    })
}

/// Mean of finite values (NaN when empty)
pub fn mean(values: &[f64]) -> f64 {
    let (sum, n) = finite(values).fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 {
        f64::NAN
    } else {
        sum / n as f64
    }
}

/// Standard deviation of finite values with `ddof` delta degrees of freedom
///
/// `ddof = 0` gives the population deviation, `ddof = 1` the sample deviation.
/// Returns NaN when fewer than `ddof + 1` values are available.
pub fn std_dev(values: &[f64], ddof: usize) -> f64 {
    let n = finite(values).count();
    if n <= ddof {
        return f64::NAN;
    }
    let m = mean(values);
    let ss: f64 = finite(values).map(|v| (v - m) * (v - m)).sum();
    (ss / (n - ddof) as f64).sqrt()
}

/// Quantile of already-sorted finite values with linear interpolation
fn sorted_quantile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

/// Quantile `q` in [0, 1] of finite values, linear interpolation between ranks
pub fn quantile(values: &[f64], q: f64) -> f64 {
    let mut sorted: Vec<f64> = finite(values).collect();
    sorted.sort_by(f64::total_cmp);
    sorted_quantile(&sorted, q)
}

/// Pearson correlation over pairs where both values are finite
pub fn pearson(a: &[f64], b: &[f64]) -> f64 {
    let pairs: Vec<(f64, f64)> = a
        .iter()
        .zip(b)
        .filter(|(x, y)| x.is_finite() && y.is_finite())
        .map(|(&x, &y)| (x, y))
        .collect();
    if pairs.len() < 2 {
        return f64::NAN;
    }
    let n = pairs.len() as f64;
    let ma = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let mb = pairs.iter().map(|p| p.1).sum::<f64>() / n;
    let (mut cov, mut va, mut vb) = (0.0, 0.0, 0.0);
    for (x, y) in &pairs {
        cov += (x - ma) * (y - mb);
        va += (x - ma) * (x - ma);
        vb += (y - mb) * (y - mb);
    }
    cov / (va.sqrt() * vb.sqrt())
}

/// Count / mean / std / quartiles summary of one column
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Describe {
    /// Number of finite values
    pub count: usize,
    /// Mean
    pub mean: f64,
    /// Sample standard deviation (ddof = 1)
    pub std: f64,
    /// Minimum
    pub min: f64,
    /// 25th percentile
    pub q25: f64,
    /// Median
    pub q50: f64,
    /// 75th percentile
    pub q75: f64,
    /// Maximum
    pub max: f64,
}

impl Describe {
    /// Row labels in the order [`Describe::values`] returns them
    pub const LABELS: [&'static str; 8] = ["count", "mean", "std", "min", "25%", "50%", "75%", "max"];

    /// Summarize the finite values of `values`
    pub fn of(values: &[f64]) -> Self {
        let mut sorted: Vec<f64> = finite(values).collect();
        sorted.sort_by(f64::total_cmp);
        let (min, max) = match (sorted.first(), sorted.last()) {
            (Some(&lo), Some(&hi)) => (lo, hi),
            _ => (f64::NAN, f64::NAN),
        };
        Self {
            count: sorted.len(),
            mean: mean(&sorted),
            std: std_dev(&sorted, 1),
            min,
            q25: sorted_quantile(&sorted, 0.25),
            q50: sorted_quantile(&sorted, 0.5),
            q75: sorted_quantile(&sorted, 0.75),
            max,
        }
    }

    /// Values in [`Describe::LABELS`] order
    pub fn values(&self) -> [f64; 8] {
        [
            self.count as f64,
            self.mean,
            self.std,
            self.min,
            self.q25,
            self.q50,
            self.q75,
            self.max,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_reductions_skip_nan() {
        let v = [1.0, f64::NAN, 3.0];
        assert_eq!(mean(&v), 2.0);
        assert_eq!(min_max(&v), Some((1.0, 3.0)));
        assert!(mean(&[f64::NAN]).is_nan());
        assert_eq!(min_max(&[]), None);
    }

    #[test]
    fn test_min_max_skips_infinities() {
        let v = [f64::NEG_INFINITY, 2.0, f64::NAN, 5.0, f64::INFINITY];
        assert_eq!(min_max(&v), Some((2.0, 5.0)));
        assert_eq!(min_max(&[f64::INFINITY]), None);
    }

    #[test]
    fn test_std_ddof() {
        let v = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_relative_eq!(std_dev(&v, 0), 2.0);
        assert_relative_eq!(std_dev(&v, 1), 2.138089935299395, epsilon = 1e-12);
        assert!(std_dev(&[1.0], 1).is_nan());
    }

    #[test]
    fn test_quantile_interpolates() {
        let v = [4.0, 1.0, 3.0, 2.0];
        assert_relative_eq!(quantile(&v, 0.25), 1.75);
        assert_relative_eq!(quantile(&v, 0.5), 2.5);
        assert_relative_eq!(quantile(&v, 1.0), 4.0);
    }

    #[test]
    fn test_pearson_perfect_and_anti() {
        let a = [1.0, 2.0, 3.0, 4.0];
        let b = [2.0, 4.0, 6.0, 8.0];
        let c = [4.0, 3.0, 2.0, 1.0];
        assert_relative_eq!(pearson(&a, &b), 1.0, epsilon = 1e-12);
        assert_relative_eq!(pearson(&a, &c), -1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_describe_empty_is_nan() {
        let d = Describe::of(&[]);
        assert_eq!(d.count, 0);
        assert!(d.mean.is_nan() && d.min.is_nan() && d.q50.is_nan());
    }

    #[test]
    fn test_describe_values() {
        let d = Describe::of(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(d.count, 5);
        assert_eq!(d.mean, 3.0);
        assert_eq!(d.min, 1.0);
        assert_eq!(d.q25, 2.0);
        assert_eq!(d.q50, 3.0);
        assert_eq!(d.max, 5.0);
    }
}
