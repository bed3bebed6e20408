//! End-to-end twin run
//!
//! Stages run strictly in order, each consuming the dataset the previous one
//! produced:
//!
//! 1. ingestion (schema harmonization with time collapse, land mask)
//! 2. [`SuitabilityEngine`]
//! 3. [`RefinementStage`]
//! 4. [`UncertaintyStage`]
//! 5. [`RestorationPlanner`]
//!
//! With an [`ArtifactStore`], each stage's dataset is persisted as soon as the
//! stage returns. A failed stage aborts the run before anything downstream is
//! computed or written; datasets of stages that already finished stay on disk.

use crate::config::PipelineConfig;
use crate::core_types::stats;
use crate::error::Result;
use crate::export::{self, files, ArtifactStore};
use crate::grid::synthetic::mask_land;
use crate::grid::{harmonize, GridDataset, Variable};
use crate::optimizer::{RestorationOutcome, RestorationPlanner, RestorationReport};
use crate::physics::SuitabilityEngine;
use crate::refinement::{RefinementOutcome, RefinementReport, RefinementStage};
use crate::uncertainty::{UncertaintyOutcome, UncertaintyReport, UncertaintyStage};
use serde::Serialize;
use std::path::Path;
use std::time::Instant;
use tracing::info;

/// Headline numbers of a run, serialized as `run_report.json`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    /// Latitude cells
    pub n_lat: usize,
    /// Longitude cells
    pub n_lon: usize,
    /// Cells with a defined `SSI`
    pub ssi_cells: usize,
    /// Pearson correlation of `SSI` and `SSI_ML` over cells where both exist
    pub ssi_ml_correlation: f64,
    /// Predictive refinement diagnostics
    pub refinement: RefinementReport,
    /// Uncertainty estimator diagnostics
    pub uncertainty: UncertaintyReport,
    /// Restoration optimizer diagnostics
    pub restoration: RestorationReport,
    /// Wall-clock duration (s)
    pub elapsed_seconds: f64,
}

/// Every stage output of one run
#[derive(Debug, Clone)]
pub struct PipelineRun {
    /// Dataset after the suitability engine
    pub physics: GridDataset,
    /// Refinement outputs (dataset adds `SSI_ML`)
    pub refinement: RefinementOutcome,
    /// Uncertainty outputs (dataset adds drivers and `uncertainty`)
    pub uncertainty: UncertaintyOutcome,
    /// Optimizer outputs
    pub restoration: RestorationOutcome,
    /// Headline numbers
    pub report: RunReport,
}

impl PipelineRun {
    /// The fully enriched dataset
    #[must_use]
    pub fn dataset(&self) -> &GridDataset {
        &self.uncertainty.dataset
    }
}

/// Sequential driver over the four stages
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    /// Create a pipeline
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Configuration in use
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Bring a source dataset onto the canonical schema
    ///
    /// # Errors
    ///
    /// [`crate::TwinError::SchemaConflict`] when two source fields map to one name.
    pub fn ingest(ds: GridDataset) -> Result<GridDataset> {
        let mut ds = harmonize(ds)?;
        mask_land(&mut ds);
        Ok(ds)
    }

    /// Run every stage in memory
    ///
    /// # Errors
    ///
    /// Invalid configuration, missing stage inputs, or schema conflicts.
    pub fn run(&self, ds: GridDataset) -> Result<PipelineRun> {
        self.execute(ds, None)
    }

    /// Run every stage and write all artifacts into `dir`
    ///
    /// # Errors
    ///
    /// Anything [`Pipeline::run`] reports, plus I/O failures.
    pub fn run_to_dir<P: AsRef<Path>>(&self, ds: GridDataset, dir: P) -> Result<PipelineRun> {
        let store = ArtifactStore::create(dir)?;
        let run = self.execute(ds, Some(&store))?;
        write_tables(&store, &run)?;
        info!("Pipeline: artifacts written to {}", store.root().display());
        Ok(run)
    }

    fn execute(&self, ds: GridDataset, store: Option<&ArtifactStore>) -> Result<PipelineRun> {
        self.config.validate()?;
        let start = Instant::now();
        let (n_lat, n_lon) = ds.shape();
        info!("Pipeline: {}x{} grid", n_lat, n_lon);

        let ds = Self::ingest(ds)?;
        let physics = SuitabilityEngine.apply(ds)?;
        persist(store, files::PHYSICS, &physics)?;

        let refinement = RefinementStage::new(self.config.refinement.clone()).run(physics.clone())?;
        persist(store, files::REFINED, &refinement.dataset)?;

        let uncertainty =
            UncertaintyStage::new(self.config.uncertainty.clone()).run(refinement.dataset.clone())?;
        persist(store, files::UNCERTAINTY, &uncertainty.dataset)?;

        let restoration = RestorationPlanner::new(self.config.optimizer.clone()).run(&uncertainty.dataset)?;

        let ssi = physics.values(Variable::Ssi).unwrap_or_default();
        let ssi_ml = refinement.dataset.values(Variable::SsiMl).unwrap_or_default();
        let report = RunReport {
            n_lat,
            n_lon,
            ssi_cells: stats::finite(ssi).count(),
            ssi_ml_correlation: stats::pearson(ssi, ssi_ml),
            refinement: refinement.report.clone(),
            uncertainty: uncertainty.report.clone(),
            restoration: restoration.report.clone(),
            elapsed_seconds: start.elapsed().as_secs_f64(),
        };
        info!(
            "Pipeline finished in {:.2}s: R2 {:.3}, F1 {:.3}, {} sites selected",
            report.elapsed_seconds,
            report.refinement.r2,
            report.uncertainty.cross_validation.mean_f1,
            report.restoration.n_selected
        );

        Ok(PipelineRun {
            physics,
            refinement,
            uncertainty,
            restoration,
            report,
        })
    }
}

fn persist(store: Option<&ArtifactStore>, name: &str, ds: &GridDataset) -> Result<()> {
    if let Some(store) = store {
        store.write_dataset(name, ds)?;
    }
    Ok(())
}

/// Write every artifact of a finished run
///
/// # Errors
///
/// I/O or serialization failure.
pub fn write_artifacts(store: &ArtifactStore, run: &PipelineRun) -> Result<()> {
    store.write_dataset(files::PHYSICS, &run.physics)?;
    store.write_dataset(files::REFINED, &run.refinement.dataset)?;
    store.write_dataset(files::UNCERTAINTY, &run.uncertainty.dataset)?;
    write_tables(store, run)
}

/// Tables, GeoJSON and the run report of a finished run
fn write_tables(store: &ArtifactStore, run: &PipelineRun) -> Result<()> {
    store.write_csv(
        files::FEATURE_IMPORTANCE,
        &export::importance_table(&run.refinement.report),
    )?;
    if let Some(explanation) = &run.refinement.explanation {
        store.write_csv(files::ATTRIBUTION, &export::attribution_table(explanation))?;
    }
    store.write_csv(
        files::UNCERTAINTY_TABLE,
        &export::record_table(&run.uncertainty.table),
    )?;

    store.write_csv(
        files::PARETO_FRONT,
        &export::front_table(&run.restoration.front_table),
    )?;
    store.write_json(files::SITES, &export::sites_geojson(&run.restoration.sites))?;
    store.write_csv(files::SUMMARY, &export::describe_table(&run.restoration.summary))?;
    store.write_json(files::REPORT, &run.report)?;
    Ok(())
}
