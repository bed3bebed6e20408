//! Uncertainty estimator
//!
//! Labels each valid cell as suitable when `SSI` exceeds the threshold, checks
//! how well optics, depth and physical drivers predict that label with K-fold
//! cross-validation, and measures per-cell model disagreement with a bootstrap
//! ensemble. The disagreement is written back onto the grid as `uncertainty`.

pub mod bootstrap;
pub mod drivers;
pub mod validation;

pub use bootstrap::bootstrap_uncertainty;
pub use drivers::ensure_drivers;
pub use validation::{cross_validate, kfold, CrossValidation, Fold};

use crate::config::UncertaintyConfig;
use crate::core_types::stats;
use crate::error::Result;
use crate::grid::schema::{self, Variable};
use crate::grid::{embed_rows, FeatureRecord, Field, FieldMeta, GridDataset};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Model inputs of the classifier, in column order
pub const FEATURES: [Variable; 8] = [
    Variable::Kd490,
    Variable::Adg443,
    Variable::Aph443,
    Variable::Bbp443,
    Variable::Depth,
    Variable::TempBottom,
    Variable::Nutrients,
    Variable::ShearStress,
];

/// Column holding the 0/1 suitability label in the enriched table
pub const TARGET_COLUMN: &str = "target";

/// Diagnostics of an uncertainty run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UncertaintyReport {
    /// Rows with every feature and `SSI` valid
    pub n_rows: usize,
    /// Fraction of rows labelled suitable
    pub positive_fraction: f64,
    /// Cross-validation scores
    pub cross_validation: CrossValidation,
    /// Mean uncertainty over the rows
    pub mean_uncertainty: f64,
    /// Rows that found no grid cell on re-embedding
    pub skipped_rows: usize,
    /// Driver fields that were synthesized for this run
    pub synthesized_drivers: Vec<String>,
}

/// Everything the uncertainty stage produces
#[derive(Debug, Clone)]
pub struct UncertaintyOutcome {
    /// Input dataset plus drivers and `uncertainty`
    pub dataset: GridDataset,
    /// Diagnostics
    pub report: UncertaintyReport,
    /// Enriched table: features, `SSI`, `target`, `uncertainty` per row
    pub table: FeatureRecord,
}

/// Cross-validated, bootstrapped suitability classifier
#[derive(Debug, Clone, Default)]
pub struct UncertaintyStage {
    config: UncertaintyConfig,
}

impl UncertaintyStage {
    /// Create the stage
    pub fn new(config: UncertaintyConfig) -> Self {
        Self { config }
    }

    /// Add drivers, score the classifier, and attach `uncertainty`
    ///
    /// # Errors
    ///
    /// [`crate::TwinError::MissingField`] before anything is written if an input
    /// field is absent; forest configuration errors.
    pub fn run(&self, mut ds: GridDataset) -> Result<UncertaintyOutcome> {
        let stage = schema::UNCERTAINTY.stage;
        schema::UNCERTAINTY.validate(&ds)?;
        let cfg = &self.config;

        let synthesized = ensure_drivers(&mut ds, cfg.seed)?;

        let mut columns = FEATURES.to_vec();
        columns.push(Variable::Ssi);
        let record = FeatureRecord::from_dataset(&ds, &columns, stage)?;
        let names: Vec<&str> = FEATURES.iter().map(|v| v.name()).collect();
        let x = record.matrix(&names)?;
        let labels: Vec<bool> = record
            .column(Variable::Ssi.name())?
            .into_iter()
            .map(|s| s > cfg.threshold)
            .collect();
        let positives = labels.iter().filter(|&&l| l).count();

        if record.is_empty() {
            warn!("Uncertainty: no complete rows; uncertainty left undefined");
        } else {
            info!(
                "Uncertainty: {} rows, {} suitable (SSI > {}), {} folds, {} bootstrap rounds",
                record.len(),
                positives,
                cfg.threshold,
                cfg.n_folds,
                cfg.n_bootstrap
            );
        }

        let cv = if record.is_empty() {
            CrossValidation {
                fold_f1: Vec::new(),
                mean_f1: f64::NAN,
            }
        } else {
            cross_validate(&cfg.forest, &x, &labels, cfg.n_folds, cfg.seed)?
        };
        let unc = bootstrap_uncertainty(&cfg.forest, &x, &labels, cfg.n_bootstrap, cfg.seed)?;

        let (grid, skipped) = embed_rows(
            ds.lat(),
            ds.lon(),
            record.lat(),
            record.lon(),
            &unc,
            cfg.coordinate_match,
        );
        ds.insert(
            Variable::Uncertainty.name(),
            Field::new(grid).with_meta(FieldMeta::for_variable(Variable::Uncertainty)),
        )?;
        ds.set_attr("step", "Physics drivers and bootstrap uncertainty");

        let report = UncertaintyReport {
            n_rows: record.len(),
            positive_fraction: if record.is_empty() {
                f64::NAN
            } else {
                positives as f64 / record.len() as f64
            },
            mean_uncertainty: stats::mean(&unc),
            cross_validation: cv,
            skipped_rows: skipped,
            synthesized_drivers: synthesized.iter().map(|v| v.name().to_string()).collect(),
        };
        info!(
            "Uncertainty: mean F1 = {:.3}, mean uncertainty = {:.3}",
            report.cross_validation.mean_f1, report.mean_uncertainty
        );

        let target: Vec<f64> = labels.iter().map(|&l| if l { 1.0 } else { 0.0 }).collect();
        let table = record
            .with_column(TARGET_COLUMN, target)?
            .with_column(Variable::Uncertainty.name(), unc)?;

        Ok(UncertaintyOutcome {
            dataset: ds,
            report,
            table,
        })
    }
}
