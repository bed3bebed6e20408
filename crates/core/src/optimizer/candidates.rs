//! Candidate restoration sites
//!
//! Every grid cell with `SSI`, `SSI_ML`, `depth` and `uncertainty` defined is
//! a potential site. Its carbon potential is `SSI * |depth| * co2_factor` and
//! its ALAN risk is `1 - SSI_ML`. Only cells inside the configured depth band
//! stay eligible.

use crate::config::OptimizerConfig;
use crate::core_types::seed::{stream_rng, streams};
use crate::error::Result;
use crate::grid::schema::{self, Variable};
use crate::grid::{FeatureRecord, GridDataset};
use crate::uncertainty::drivers::shear_distribution;
use rand_distr::Distribution;
use tracing::debug;

/// Column-oriented set of eligible sites
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CandidateSet {
    /// Flat grid cell index (row-major)
    pub cells: Vec<usize>,
    /// Latitude (degrees north)
    pub lat: Vec<f64>,
    /// Longitude (degrees east)
    pub lon: Vec<f64>,
    /// Elevation (m, negative below sea level)
    pub depth: Vec<f64>,
    /// Physics suitability index
    pub ssi: Vec<f64>,
    /// Learned suitability index
    pub ssi_ml: Vec<f64>,
    /// Bootstrap uncertainty
    pub uncertainty: Vec<f64>,
    /// Sequestration potential
    pub co2_potential: Vec<f64>,
    /// Artificial-light exposure risk
    pub alan_risk: Vec<f64>,
    /// Bottom shear stress (Pa)
    pub shear_stress: Vec<f64>,
}

impl CandidateSet {
    /// Derive the eligible sites of a fully processed dataset
    ///
    /// Shear stress comes from the dataset's `shear_stress` field when it is
    /// defined for the cell, otherwise from a seeded `|N(0.15, 0.05)|` draw.
    ///
    /// # Errors
    ///
    /// [`crate::TwinError::MissingField`] if a required field is absent.
    pub fn from_dataset(ds: &GridDataset, config: &OptimizerConfig) -> Result<Self> {
        schema::RESTORATION.validate(ds)?;
        let record = FeatureRecord::from_dataset(
            ds,
            &[Variable::Ssi, Variable::SsiMl, Variable::Depth, Variable::Uncertainty],
            schema::RESTORATION.stage,
        )?;

        let shear_field = ds.values(Variable::ShearStress);
        let normal = shear_distribution()?;
        let mut rng = stream_rng(config.seed, streams::CANDIDATE_SHEAR);

        let mut set = Self::default();
        for r in 0..record.len() {
            let row = record.row(r);
            let (ssi, ssi_ml, depth, unc) = (row[0], row[1], row[2], row[3]);
            let cell = record.cells()[r];
            // One draw per row keeps the stream aligned with the record
            let drawn = normal.sample(&mut rng).abs();
            if depth < config.min_depth || depth > config.max_depth {
                continue;
            }
            let shear = shear_field
                .map(|s| s[cell])
                .filter(|s| s.is_finite())
                .unwrap_or(drawn);

            set.cells.push(cell);
            set.lat.push(record.lat()[r]);
            set.lon.push(record.lon()[r]);
            set.depth.push(depth);
            set.ssi.push(ssi);
            set.ssi_ml.push(ssi_ml);
            set.uncertainty.push(unc);
            set.co2_potential.push(ssi * depth.abs() * config.co2_factor);
            set.alan_risk.push(1.0 - ssi_ml);
            set.shear_stress.push(shear);
        }
        debug!(
            "Candidates: {} of {} complete cells inside [{}, {}] m",
            set.len(),
            record.len(),
            config.min_depth,
            config.max_depth
        );
        Ok(set)
    }

    /// Build a set directly from per-site columns (cells numbered in order)
    #[expect(clippy::too_many_arguments)]
    pub fn from_columns(
        lat: Vec<f64>,
        lon: Vec<f64>,
        depth: Vec<f64>,
        ssi: Vec<f64>,
        ssi_ml: Vec<f64>,
        uncertainty: Vec<f64>,
        shear_stress: Vec<f64>,
        co2_factor: f64,
    ) -> Self {
        let co2_potential = ssi
            .iter()
            .zip(&depth)
            .map(|(s, d)| s * d.abs() * co2_factor)
            .collect();
        let alan_risk = ssi_ml.iter().map(|s| 1.0 - s).collect();
        Self {
            cells: (0..lat.len()).collect(),
            lat,
            lon,
            depth,
            ssi,
            ssi_ml,
            uncertainty,
            co2_potential,
            alan_risk,
            shear_stress,
        }
    }

    /// Number of eligible sites
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Whether no site is eligible
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::synthetic::uniform_scenario;
    use approx::assert_relative_eq;

    fn processed() -> GridDataset {
        let mut ds = uniform_scenario().unwrap();
        let n = ds.n_cells();
        let ssi: Vec<f64> = (0..n).map(|c| c as f64 / n as f64).collect();
        ds.insert_values(Variable::Ssi, ssi).unwrap();
        ds.insert_scalar(Variable::SsiMl, 0.4);
        ds.insert_scalar(Variable::Uncertainty, 0.1);
        ds
    }

    #[test]
    fn test_depth_band_and_derived_columns() {
        let ds = processed();
        let config = OptimizerConfig::default();
        let set = CandidateSet::from_dataset(&ds, &config).unwrap();
        assert!(!set.is_empty());
        assert!(set.depth.iter().all(|d| (-12.0..=-2.0).contains(d)));
        for i in 0..set.len() {
            assert_relative_eq!(set.co2_potential[i], set.ssi[i] * set.depth[i].abs() * 1.2);
            assert_relative_eq!(set.alan_risk[i], 0.6);
            assert!(set.shear_stress[i] >= 0.0);
        }
    }

    #[test]
    fn test_grid_shear_takes_precedence() {
        let mut ds = processed();
        ds.insert_scalar(Variable::ShearStress, 0.42);
        let set = CandidateSet::from_dataset(&ds, &OptimizerConfig::default()).unwrap();
        assert!(set.shear_stress.iter().all(|s| *s == 0.42));
    }

    #[test]
    fn test_missing_uncertainty_is_fatal() {
        let mut ds = uniform_scenario().unwrap();
        ds.insert_scalar(Variable::Ssi, 0.5);
        ds.insert_scalar(Variable::SsiMl, 0.5);
        assert!(CandidateSet::from_dataset(&ds, &OptimizerConfig::default()).is_err());
    }

    #[test]
    fn test_nan_ssi_gives_no_candidates() {
        let mut ds = processed();
        ds.insert_scalar(Variable::Ssi, f64::NAN);
        let set = CandidateSet::from_dataset(&ds, &OptimizerConfig::default()).unwrap();
        assert!(set.is_empty());
    }
}
