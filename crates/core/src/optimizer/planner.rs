//! Restoration planning stage
//!
//! Builds the candidate set from a fully processed dataset, searches the
//! CO2 / uncertainty / ALAN trade-off with NSGA-II, picks a compromise on the
//! front and returns the sites that compromise selects.

use crate::config::OptimizerConfig;
use crate::core_types::stats::{self, Describe};
use crate::error::Result;
use crate::grid::GridDataset;
use crate::optimizer::candidates::CandidateSet;
use crate::optimizer::compromise::compromise_index;
use crate::optimizer::nsga2::{Nsga2, ParetoFront};
use crate::optimizer::problem::RestorationProblem;
use nalgebra::{Point2, Vector3};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Columns of the restoration summary table
pub const SUMMARY_COLUMNS: [&str; 3] = ["CO2_potential", "uncertainty", "ALAN_risk"];

/// One selected restoration cell
#[derive(Debug, Clone, PartialEq)]
pub struct RestorationSite {
    /// Point geometry `(lon, lat)` in EPSG:4326
    pub position: Point2<f64>,
    /// Flat grid cell index
    pub cell: usize,
    /// Elevation (m)
    pub depth: f64,
    /// Physics suitability index
    pub ssi: f64,
    /// Learned suitability index
    pub ssi_ml: f64,
    /// Sequestration potential
    pub co2_potential: f64,
    /// Bootstrap uncertainty
    pub uncertainty: f64,
    /// Artificial-light exposure risk
    pub alan_risk: f64,
    /// Bottom shear stress (Pa)
    pub shear_stress: f64,
}

impl RestorationSite {
    /// Longitude (degrees east)
    #[must_use]
    pub fn lon(&self) -> f64 {
        self.position.x
    }

    /// Latitude (degrees north)
    #[must_use]
    pub fn lat(&self) -> f64 {
        self.position.y
    }
}

/// Thresholds for narrowing the selected sites
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SiteFilter {
    /// Minimum CO2 potential
    pub min_co2: f64,
    /// Maximum ALAN risk
    pub max_alan: f64,
    /// Maximum uncertainty
    pub max_uncertainty: f64,
}

impl Default for SiteFilter {
    fn default() -> Self {
        Self {
            min_co2: 0.0,
            max_alan: 1.0,
            max_uncertainty: 1.0,
        }
    }
}

/// Aggregates over a filtered set of sites
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SiteTotals {
    /// Sites passing the filter
    pub count: usize,
    /// Summed CO2 potential
    pub total_co2: f64,
    /// Mean ALAN risk (NaN when empty)
    pub mean_alan: f64,
    /// Mean uncertainty (NaN when empty)
    pub mean_uncertainty: f64,
}

/// Sites passing `filter`, with their totals
pub fn filter_sites<'a>(
    sites: &'a [RestorationSite],
    filter: &SiteFilter,
) -> (Vec<&'a RestorationSite>, SiteTotals) {
    let kept: Vec<&RestorationSite> = sites
        .iter()
        .filter(|s| {
            s.co2_potential >= filter.min_co2
                && s.alan_risk <= filter.max_alan
                && s.uncertainty <= filter.max_uncertainty
        })
        .collect();
    let alan: Vec<f64> = kept.iter().map(|s| s.alan_risk).collect();
    let unc: Vec<f64> = kept.iter().map(|s| s.uncertainty).collect();
    let totals = SiteTotals {
        count: kept.len(),
        total_co2: kept.iter().map(|s| s.co2_potential).sum(),
        mean_alan: stats::mean(&alan),
        mean_uncertainty: stats::mean(&unc),
    };
    (kept, totals)
}

/// Diagnostics of a planning run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestorationReport {
    /// Eligible candidate sites
    pub n_candidates: usize,
    /// Solutions on the Pareto front
    pub front_size: usize,
    /// Index of the compromise solution on the front
    pub chosen_index: Option<usize>,
    /// Sites the compromise selects
    pub n_selected: usize,
}

/// Everything the restoration planner produces
#[derive(Debug, Clone)]
pub struct RestorationOutcome {
    /// Eligible sites
    pub candidates: CandidateSet,
    /// First front of the final population
    pub front: ParetoFront,
    /// Front rows as `(CO2, uncertainty, ALAN)` with the CO2 sign restored
    pub front_table: Vec<Vector3<f64>>,
    /// Sites selected by the compromise solution
    pub sites: Vec<RestorationSite>,
    /// Descriptive statistics per [`SUMMARY_COLUMNS`] entry
    pub summary: Vec<(String, Describe)>,
    /// Diagnostics
    pub report: RestorationReport,
}

/// NSGA-II restoration planner
#[derive(Debug, Clone, Default)]
pub struct RestorationPlanner {
    config: OptimizerConfig,
}

impl RestorationPlanner {
    /// Create the stage
    pub fn new(config: OptimizerConfig) -> Self {
        Self { config }
    }

    /// Plan restoration sites on a fully processed dataset
    ///
    /// # Errors
    ///
    /// [`crate::TwinError::MissingField`] if `SSI`, `SSI_ML`, `depth` or
    /// `uncertainty` is absent.
    pub fn run(&self, ds: &GridDataset) -> Result<RestorationOutcome> {
        let cfg = &self.config;
        let candidates = CandidateSet::from_dataset(ds, cfg)?;
        if candidates.is_empty() {
            warn!(
                "Restoration: no candidates inside [{}, {}] m; front holds only the sentinel",
                cfg.min_depth, cfg.max_depth
            );
        } else {
            info!("Restoration: {} feasible candidates", candidates.len());
        }

        let problem = RestorationProblem::new(&candidates, cfg.selection_threshold);
        let front = Nsga2::new(cfg).run(&problem);

        let front_table: Vec<Vector3<f64>> = front
            .objectives()
            .iter()
            .map(|f| Vector3::new(-f.x, f.y, f.z))
            .collect();
        let chosen = compromise_index(&front_table);

        let sites: Vec<RestorationSite> = chosen
            .map(|i| problem.selected(&front.solutions()[i].genes))
            .unwrap_or_default()
            .into_iter()
            .map(|k| site(&candidates, k))
            .collect();

        let summary = summarize(&sites);
        let report = RestorationReport {
            n_candidates: candidates.len(),
            front_size: front.len(),
            chosen_index: chosen,
            n_selected: sites.len(),
        };
        info!(
            "Restoration: front of {}, compromise {:?}, {} sites selected",
            report.front_size, report.chosen_index, report.n_selected
        );

        Ok(RestorationOutcome {
            candidates,
            front,
            front_table,
            sites,
            summary,
            report,
        })
    }
}

fn site(c: &CandidateSet, k: usize) -> RestorationSite {
    RestorationSite {
        position: Point2::new(c.lon[k], c.lat[k]),
        cell: c.cells[k],
        depth: c.depth[k],
        ssi: c.ssi[k],
        ssi_ml: c.ssi_ml[k],
        co2_potential: c.co2_potential[k],
        uncertainty: c.uncertainty[k],
        alan_risk: c.alan_risk[k],
        shear_stress: c.shear_stress[k],
    }
}

/// Describe table over the summary columns of `sites`
pub fn summarize(sites: &[RestorationSite]) -> Vec<(String, Describe)> {
    let co2: Vec<f64> = sites.iter().map(|s| s.co2_potential).collect();
    let unc: Vec<f64> = sites.iter().map(|s| s.uncertainty).collect();
    let alan: Vec<f64> = sites.iter().map(|s| s.alan_risk).collect();
    SUMMARY_COLUMNS
        .iter()
        .zip([co2, unc, alan])
        .map(|(name, v)| ((*name).to_string(), Describe::of(&v)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::synthetic::uniform_scenario;
    use crate::grid::Variable;
    use crate::optimizer::problem::SENTINEL;

    fn config() -> OptimizerConfig {
        OptimizerConfig {
            population_size: 24,
            generations: 10,
            ..OptimizerConfig::default()
        }
    }

    fn processed() -> GridDataset {
        let mut ds = uniform_scenario().unwrap();
        let n = ds.n_cells();
        let ssi: Vec<f64> = (0..n).map(|c| 0.2 + 0.6 * c as f64 / n as f64).collect();
        let unc: Vec<f64> = (0..n).map(|c| 0.05 + 0.1 * ((c * 7) % 10) as f64 / 10.0).collect();
        ds.insert_values(Variable::Ssi, ssi.clone()).unwrap();
        ds.insert_values(Variable::SsiMl, ssi).unwrap();
        ds.insert_values(Variable::Uncertainty, unc).unwrap();
        ds
    }

    #[test]
    fn test_selected_sites_lie_in_depth_band() {
        let out = RestorationPlanner::new(config()).run(&processed()).unwrap();
        assert!(out.report.n_candidates > 0);
        assert!(out.report.front_size > 0);
        assert!(out.report.chosen_index.is_some());
        assert!(out.sites.iter().all(|s| (-12.0..=-2.0).contains(&s.depth)));
        assert_eq!(out.summary.len(), 3);
        assert_eq!(out.summary[0].1.count, out.sites.len());
    }

    #[test]
    fn test_zero_candidates_yield_sentinel_front() {
        let mut ds = processed();
        ds.insert_scalar(Variable::Ssi, f64::NAN);
        let out = RestorationPlanner::new(config()).run(&ds).unwrap();
        assert_eq!(out.report.n_candidates, 0);
        assert!(out.sites.is_empty());
        for row in &out.front_table {
            assert_eq!(*row, Vector3::new(-SENTINEL, SENTINEL, SENTINEL));
        }
    }

    #[test]
    fn test_filter_totals() {
        let mk = |co2: f64, alan: f64, unc: f64| RestorationSite {
            position: Point2::new(13.5, 54.2),
            cell: 0,
            depth: -5.0,
            ssi: 0.5,
            ssi_ml: 1.0 - alan,
            co2_potential: co2,
            uncertainty: unc,
            alan_risk: alan,
            shear_stress: 0.15,
        };
        let sites = vec![mk(3.0, 0.2, 0.1), mk(1.0, 0.2, 0.1), mk(4.0, 0.9, 0.1), mk(5.0, 0.4, 0.3)];
        let filter = SiteFilter {
            min_co2: 2.0,
            max_alan: 0.5,
            max_uncertainty: 0.3,
        };
        let (kept, totals) = filter_sites(&sites, &filter);
        assert_eq!(kept.len(), 2);
        assert_eq!(totals.count, 2);
        assert!((totals.total_co2 - 8.0).abs() < 1e-12);
        assert!((totals.mean_alan - 0.3).abs() < 1e-12);
        assert!((totals.mean_uncertainty - 0.2).abs() < 1e-12);

        let (none, empty) = filter_sites(&sites, &SiteFilter { min_co2: 100.0, ..filter });
        assert!(none.is_empty());
        assert_eq!(empty.total_co2, 0.0);
        assert!(empty.mean_alan.is_nan());
    }
}
