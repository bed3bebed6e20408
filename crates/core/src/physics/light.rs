//! Underwater light attenuation and seagrass suitability
//!
//! Beer-Lambert attenuation of surface PAR down to the seabed, the 1% light
//! level as euphotic depth, and a weighted suitability index over globally
//! normalized layers.
//!
//! # Scientific References
//! - Kirk, J.T.O. (2011). "Light and Photosynthesis in Aquatic Ecosystems"
//!   Cambridge University Press, 3rd edition
//! - Duarte, C.M. (1991). "Seagrass depth limits"
//!   Aquatic Botany, 40(4), 363-377

use crate::core_types::stats;
use tracing::warn;

/// Ln(100): optical depth of the 1% light level
pub const ONE_PERCENT_OPTICAL_DEPTH: f64 = 4.6;

/// Upper bound on euphotic depth (m)
pub const MAX_EUPHOTIC_DEPTH: f64 = 30.0;

/// Weight of normalized seabed PAR in the suitability index
pub const W_PAR_BED: f64 = 0.5;
/// Weight of normalized euphotic depth in the suitability index
pub const W_ZEU: f64 = 0.3;
/// Weight of normalized absolute depth (a penalty)
pub const W_DEPTH: f64 = -0.2;

/// Euphotic depth from the diffuse attenuation coefficient
///
/// Zeu = 4.6 / KD490, clipped to [0, 30]. NaN input gives NaN; a zero
/// coefficient gives +inf before clipping and therefore 30.
///
/// # Arguments
/// * `kd` - Diffuse attenuation coefficient at 490 nm (m⁻¹)
///
/// # Returns
/// Euphotic depth (m)
///
/// # References
/// Kirk (2011)
#[inline]
pub fn euphotic_depth(kd: f64) -> f64 {
    clip(ONE_PERCENT_OPTICAL_DEPTH / kd, 0.0, MAX_EUPHOTIC_DEPTH)
}

/// PAR reaching the seabed
///
/// PAR_bed = PAR_surface × exp(KD490 × depth). `depth` is signed elevation,
/// negative underwater, so the exponent is negative for submerged cells.
///
/// # Arguments
/// * `par_surface` - Surface PAR (E m⁻² d⁻¹)
/// * `kd` - Diffuse attenuation coefficient (m⁻¹)
/// * `depth` - Signed seabed elevation (m)
///
/// # Returns
/// Seabed PAR (E m⁻² d⁻¹)
#[inline]
pub fn seabed_par(par_surface: f64, kd: f64, depth: f64) -> f64 {
    par_surface * (kd * depth).exp()
}

/// Min-max normalization over the whole field
///
/// Min and max skip NaN. A constant field has a zero range and normalizes
/// to all NaN; an all-NaN field stays all NaN.
pub fn normalize(values: &[f64]) -> Vec<f64> {
    let Some((lo, hi)) = stats::min_max(values) else {
        return vec![f64::NAN; values.len()];
    };
    let range = hi - lo;
    if range == 0.0 {
        warn!(
            "Normalizing a constant field (value {}); result is undefined",
            lo
        );
    }
    values.iter().map(|v| (v - lo) / range).collect()
}

/// Seagrass suitability index for one cell from normalized layers
///
/// SSI = clip(0.5·n(PAR_bed) + 0.3·n(Zeu) − 0.2·n(|depth|), 0, 1). NaN in any
/// term propagates.
#[inline]
pub fn suitability_index(n_par_bed: f64, n_zeu: f64, n_abs_depth: f64) -> f64 {
    clip(
        W_PAR_BED * n_par_bed + W_ZEU * n_zeu + W_DEPTH * n_abs_depth,
        0.0,
        1.0,
    )
}

/// Clamp that lets NaN through
#[inline]
pub(crate) fn clip(x: f64, lo: f64, hi: f64) -> f64 {
    if x.is_nan() {
        x
    } else {
        x.clamp(lo, hi)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_euphotic_depth_bounds() {
        assert_relative_eq!(euphotic_depth(0.2), 23.0, epsilon = 1e-12);
        assert_eq!(euphotic_depth(0.1), 30.0);
        assert_eq!(euphotic_depth(0.0), 30.0);
        assert!(euphotic_depth(f64::NAN).is_nan());
        for kd in [0.01, 0.05, 0.3, 1.0, 5.0] {
            let z = euphotic_depth(kd);
            assert!((0.0..=30.0).contains(&z));
        }
    }

    #[test]
    fn test_seabed_par_attenuates() {
        assert_eq!(seabed_par(20.0, 0.2, 0.0), 20.0);
        let shallow = seabed_par(20.0, 0.2, -2.0);
        let deep = seabed_par(20.0, 0.2, -10.0);
        assert!(deep < shallow && shallow < 20.0);
        assert_relative_eq!(deep, 20.0 * (-2.0f64).exp(), epsilon = 1e-12);
    }

    #[test]
    fn test_normalize_range() {
        let n = normalize(&[2.0, f64::NAN, 4.0, 3.0]);
        assert_eq!(n[0], 0.0);
        assert!(n[1].is_nan());
        assert_eq!(n[2], 1.0);
        assert_eq!(n[3], 0.5);
    }

    #[test]
    fn test_normalize_constant_is_nan() {
        let n = normalize(&[5.0, 5.0, 5.0]);
        assert!(n.iter().all(|v| v.is_nan()));
        assert!(normalize(&[f64::NAN]).iter().all(|v| v.is_nan()));
    }

    #[test]
    fn test_suitability_clipped() {
        assert_relative_eq!(suitability_index(1.0, 1.0, 0.0), 0.8, epsilon = 1e-12);
        assert_eq!(suitability_index(0.0, 0.0, 1.0), 0.0);
        assert!(suitability_index(f64::NAN, 1.0, 0.0).is_nan());
    }
}
