//! Suitability engine: physics layers over the whole grid

use crate::core_types::stats;
use crate::error::Result;
use crate::grid::schema::{self, Variable};
use crate::grid::{Field, FieldMeta, GridDataset};
use crate::physics::light::{euphotic_depth, normalize, seabed_par, suitability_index};
use rayon::prelude::*;
use tracing::info;

/// Derives `Zeu`, `PAR_bed` and `SSI` from `KD490`, `PAR_surface` and `depth`
///
/// Pure and idempotent: running it twice on the same inputs writes the same
/// three fields with the same values.
#[derive(Debug, Clone, Copy, Default)]
pub struct SuitabilityEngine;

impl SuitabilityEngine {
    /// Compute the physics layers and attach them to the dataset
    ///
    /// # Errors
    ///
    /// [`crate::TwinError::MissingField`] before anything is written if an
    /// input field is absent.
    pub fn apply(&self, mut ds: GridDataset) -> Result<GridDataset> {
        schema::SUITABILITY.validate(&ds)?;
        let kd = ds.require(schema::SUITABILITY.stage, Variable::Kd490)?;
        let par = ds.require(schema::SUITABILITY.stage, Variable::ParSurface)?;
        let depth = ds.require(schema::SUITABILITY.stage, Variable::Depth)?;

        let zeu: Vec<f64> = kd.par_iter().map(|&k| euphotic_depth(k)).collect();
        let par_bed: Vec<f64> = par
            .par_iter()
            .zip(kd)
            .zip(depth)
            .map(|((&p, &k), &d)| seabed_par(p, k, d))
            .collect();
        let abs_depth: Vec<f64> = depth.iter().map(|d| d.abs()).collect();

        let n_par = normalize(&par_bed);
        let n_zeu = normalize(&zeu);
        let n_depth = normalize(&abs_depth);
        let ssi: Vec<f64> = (0..ds.n_cells())
            .into_par_iter()
            .map(|c| suitability_index(n_par[c], n_zeu[c], n_depth[c]))
            .collect();

        let valid = stats::finite(&ssi).count();
        info!(
            "Suitability engine: {}x{} grid, {} valid SSI cells (mean {:.3})",
            ds.lat().len(),
            ds.lon().len(),
            valid,
            stats::mean(&ssi)
        );

        ds.insert_values(Variable::Zeu, zeu)?;
        ds.insert_values(Variable::ParBed, par_bed)?;
        ds.insert(
            Variable::Ssi.name(),
            Field::new(ssi).with_meta(
                FieldMeta::for_variable(Variable::Ssi).with_comment("0=unsuitable, 1=highly suitable"),
            ),
        )?;
        ds.set_attr("step", "Physics-based seagrass suitability");
        Ok(ds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::synthetic::{reference_bay, uniform_scenario};
    use crate::TwinError;

    #[test]
    fn test_missing_input_writes_nothing() {
        let mut ds = uniform_scenario().unwrap();
        ds.fields.remove("PAR_surface");
        let before = ds.clone();
        let err = SuitabilityEngine.apply(ds).unwrap_err();
        assert!(matches!(err, TwinError::MissingField { stage: "suitability", .. }));
        assert!(!before.contains("SSI"));
    }

    #[test]
    fn test_idempotent() {
        let ds = reference_bay(10, 10, 3).unwrap();
        let once = SuitabilityEngine.apply(ds).unwrap();
        let twice = SuitabilityEngine.apply(once.clone()).unwrap();
        assert_eq!(
            serde_json::to_string(&once).unwrap(),
            serde_json::to_string(&twice).unwrap()
        );
    }

    #[test]
    fn test_ssi_bounded() {
        let ds = SuitabilityEngine.apply(reference_bay(16, 16, 1).unwrap()).unwrap();
        let ssi = ds.values(Variable::Ssi).unwrap();
        assert!(stats::finite(ssi).count() > 0);
        assert!(stats::finite(ssi).all(|v| (0.0..=1.0).contains(&v)));
        let depth = ds.values(Variable::Depth).unwrap();
        for (s, d) in ssi.iter().zip(depth) {
            assert_eq!(s.is_nan(), d.is_nan());
        }
    }
}
