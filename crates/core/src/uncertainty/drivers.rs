//! Synthetic physical drivers
//!
//! Bottom temperature, nutrients and shear stress are not delivered by the
//! optical products. When the dataset lacks one, a seeded proxy field is
//! generated over the whole grid; a field already present is never replaced.

use crate::core_types::seed::{stream_rng, streams};
use crate::error::{Result, TwinError};
use crate::grid::{GridDataset, Variable};
use rand::Rng;
use rand_distr::{Distribution, Gamma, Normal};
use tracing::debug;

/// Mean of the shear-stress proxy (Pa)
pub const SHEAR_MEAN: f64 = 0.15;
/// Standard deviation of the shear-stress proxy (Pa)
pub const SHEAR_STD: f64 = 0.05;

/// `|N(0.15, 0.05)|` shear stress sampler
pub(crate) fn shear_distribution() -> Result<Normal<f64>> {
    Normal::new(SHEAR_MEAN, SHEAR_STD).map_err(|e| TwinError::InvalidConfig(e.to_string()))
}

/// One synthetic value per cell for a driver variable
///
/// # Errors
///
/// [`TwinError::InvalidConfig`] if `var` is not a driver.
pub fn synthesize(var: Variable, n_cells: usize, seed: u64) -> Result<Vec<f64>> {
    match var {
        Variable::TempBottom => {
            let mut rng = stream_rng(seed, streams::TEMP_BOTTOM);
            Ok((0..n_cells).map(|_| 10.0 + 5.0 * rng.random::<f64>()).collect())
        }
        Variable::Nutrients => {
            let mut rng = stream_rng(seed, streams::NUTRIENTS);
            let gamma = Gamma::new(2.0, 0.3).map_err(|e| TwinError::InvalidConfig(e.to_string()))?;
            Ok((0..n_cells).map(|_| gamma.sample(&mut rng)).collect())
        }
        Variable::ShearStress => {
            let mut rng = stream_rng(seed, streams::SHEAR_STRESS);
            let normal = shear_distribution()?;
            Ok((0..n_cells).map(|_| normal.sample(&mut rng).abs()).collect())
        }
        other => Err(TwinError::InvalidConfig(format!(
            "'{other}' is not a synthesizable driver"
        ))),
    }
}

/// Add every missing driver field; returns the variables that were synthesized
///
/// # Errors
///
/// Propagates shape errors from insertion (none for a well-formed dataset).
pub fn ensure_drivers(ds: &mut GridDataset, seed: u64) -> Result<Vec<Variable>> {
    let mut added = Vec::new();
    for var in Variable::DRIVERS {
        if ds.contains(var.name()) {
            continue;
        }
        let values = synthesize(var, ds.n_cells(), seed)?;
        ds.insert_values(var, values)?;
        debug!("Synthesized driver field '{}'", var);
        added.push(var);
    }
    Ok(added)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::synthetic::uniform_scenario;

    #[test]
    fn test_driver_ranges() {
        let temp = synthesize(Variable::TempBottom, 500, 42).unwrap();
        assert!(temp.iter().all(|t| (10.0..15.0).contains(t)));
        let nut = synthesize(Variable::Nutrients, 500, 42).unwrap();
        assert!(nut.iter().all(|n| *n > 0.0));
        let mean = nut.iter().sum::<f64>() / 500.0;
        assert!((mean - 0.6).abs() < 0.1, "gamma mean {mean}");
        let shear = synthesize(Variable::ShearStress, 500, 42).unwrap();
        assert!(shear.iter().all(|s| *s >= 0.0));
    }

    #[test]
    fn test_existing_driver_is_kept() {
        let mut ds = uniform_scenario().unwrap();
        ds.insert_scalar(Variable::TempBottom, 8.0);
        let added = ensure_drivers(&mut ds, 42).unwrap();
        assert_eq!(added, vec![Variable::Nutrients, Variable::ShearStress]);
        assert!(ds.values(Variable::TempBottom).unwrap().iter().all(|t| *t == 8.0));
    }

    #[test]
    fn test_not_a_driver() {
        assert!(synthesize(Variable::Ssi, 3, 1).is_err());
    }
}
