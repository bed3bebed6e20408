//! Predictive refinement: learn SSI from the optical features
//!
//! A regression forest maps `KD490, ADG443, APH443, BBP443` to the physics
//! suitability index on every cell where all five are valid, then predicts
//! `SSI_ML` on every cell where the four features are valid. Fit quality is
//! reported in-sample and never gates the stage. TreeSHAP attributions explain
//! the training rows.

use crate::config::RefinementConfig;
use crate::core_types::stats;
use crate::error::Result;
use crate::grid::schema::{self, Variable};
use crate::grid::{FeatureRecord, Field, FieldMeta, GridDataset};
use crate::learning::metrics::{mean_absolute_error, r2_score};
use crate::learning::{Attribution, Ensemble, RandomForest, Samples};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Column names of the optical features, in model input order
pub const FEATURES: [&str; 4] = ["KD490", "ADG443", "APH443", "BBP443"];

/// Mean absolute contribution of one feature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    /// Feature name
    pub feature: String,
    /// Mean |SHAP value| over the explained rows
    pub mean_abs_contribution: f64,
}

/// Diagnostics of a refinement run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefinementReport {
    /// Rows the forest was fitted on
    pub n_train: usize,
    /// In-sample coefficient of determination
    pub r2: f64,
    /// In-sample mean absolute error
    pub mae: f64,
    /// Cells that received an `SSI_ML` value
    pub n_predicted: usize,
    /// Features ranked by attribution magnitude
    pub importance: Vec<FeatureImportance>,
}

/// Attributions of the explained training rows, with their inputs and positions
#[derive(Debug, Clone)]
pub struct Explanation {
    /// Per-row contributions
    pub attribution: Attribution,
    /// Feature values of the explained rows
    pub samples: Samples,
    /// Row latitudes
    pub lat: Vec<f64>,
    /// Row longitudes
    pub lon: Vec<f64>,
}

impl Explanation {
    /// `(feature value, contribution)` curve for one feature, sorted by value
    pub fn dependence(&self, feature: &str) -> Option<Vec<(f64, f64)>> {
        let k = self.attribution.features.iter().position(|f| f == feature)?;
        self.attribution.dependence(feature, &self.samples.column(k))
    }
}

/// Everything the refinement stage produces
#[derive(Debug, Clone)]
pub struct RefinementOutcome {
    /// Input dataset plus `SSI_ML`
    pub dataset: GridDataset,
    /// Fit diagnostics
    pub report: RefinementReport,
    /// The fitted forest; `None` when there was nothing to train on
    pub model: Option<RandomForest>,
    /// Training-row attributions; `None` when there was nothing to train on
    pub explanation: Option<Explanation>,
}

/// Random-forest refinement of the suitability index
#[derive(Debug, Clone, Default)]
pub struct RefinementStage {
    config: RefinementConfig,
}

impl RefinementStage {
    /// Create the stage
    pub fn new(config: RefinementConfig) -> Self {
        Self { config }
    }

    /// Fit, predict `SSI_ML` over the grid and explain the training rows
    ///
    /// A dataset without a single complete training row is degenerate, not an
    /// error: `SSI_ML` is written as all NaN and the metrics are NaN.
    ///
    /// # Errors
    ///
    /// [`crate::TwinError::MissingField`] before anything is written if an input
    /// field is absent; configuration errors from the forest.
    pub fn run(&self, mut ds: GridDataset) -> Result<RefinementOutcome> {
        let stage = schema::REFINEMENT.stage;
        schema::REFINEMENT.validate(&ds)?;

        let mut columns = Variable::OPTICS.to_vec();
        columns.push(Variable::Ssi);
        let train = FeatureRecord::from_dataset(&ds, &columns, stage)?;

        if train.is_empty() {
            warn!("Refinement: no cell has all optical features and SSI; SSI_ML left undefined");
            let n_cells = ds.n_cells();
            insert_ssi_ml(&mut ds, vec![f64::NAN; n_cells])?;
            return Ok(RefinementOutcome {
                dataset: ds,
                report: RefinementReport {
                    n_train: 0,
                    r2: f64::NAN,
                    mae: f64::NAN,
                    n_predicted: 0,
                    importance: Vec::new(),
                },
                model: None,
                explanation: None,
            });
        }

        let x = train.matrix(&FEATURES)?;
        let y = train.column(Variable::Ssi.name())?;
        info!(
            "Refinement: fitting {} trees on {} samples",
            self.config.forest.n_estimators,
            x.len()
        );
        let forest = RandomForest::fit_regressor(&self.config.forest, &x, &y)?;

        let fitted = forest.predict_batch(&x);
        let r2 = r2_score(&y, &fitted);
        let mae = mean_absolute_error(&y, &fitted);

        let grid_rows = FeatureRecord::from_dataset(&ds, &Variable::OPTICS, stage)?;
        let grid_x = grid_rows.matrix(&FEATURES)?;
        let mut ssi_ml = vec![f64::NAN; ds.n_cells()];
        for (&cell, p) in grid_rows.cells().iter().zip(forest.predict_batch(&grid_x)) {
            ssi_ml[cell] = p;
        }
        let n_predicted = grid_rows.len();

        let explained = self.explained_rows(train.len());
        let samples = x.subset(&explained);
        let attribution = Attribution::explain(&forest, &samples, &FEATURES);
        let importance = attribution
            .importance()
            .into_iter()
            .map(|(feature, mean_abs_contribution)| FeatureImportance {
                feature,
                mean_abs_contribution,
            })
            .collect();
        let explanation = Explanation {
            attribution,
            lat: explained.iter().map(|&r| train.lat()[r]).collect(),
            lon: explained.iter().map(|&r| train.lon()[r]).collect(),
            samples,
        };

        info!(
            "Refinement: R2 = {:.3}, MAE = {:.3}, SSI_ML on {} cells (corr with SSI {:.3})",
            r2,
            mae,
            n_predicted,
            ds.values(Variable::Ssi)
                .map_or(f64::NAN, |ssi| stats::pearson(ssi, &ssi_ml))
        );

        insert_ssi_ml(&mut ds, ssi_ml)?;
        ds.set_attr("step", "Random forest refinement of SSI");

        Ok(RefinementOutcome {
            dataset: ds,
            report: RefinementReport {
                n_train: x.len(),
                r2,
                mae,
                n_predicted,
                importance,
            },
            model: Some(forest),
            explanation: Some(explanation),
        })
    }

    /// Training rows to explain, evenly strided when capped
    fn explained_rows(&self, n: usize) -> Vec<usize> {
        match self.config.attribution_max_rows {
            Some(cap) if cap < n => (0..cap).map(|i| i * n / cap).collect(),
            _ => (0..n).collect(),
        }
    }
}

fn insert_ssi_ml(ds: &mut GridDataset, values: Vec<f64>) -> Result<()> {
    ds.insert(
        Variable::SsiMl.name(),
        Field::new(values).with_meta(
            FieldMeta::for_variable(Variable::SsiMl)
                .with_comment("Predicted via Random Forest from OLCI optical features"),
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use crate::grid::synthetic::{reference_bay, uniform_scenario};
    use crate::physics::SuitabilityEngine;
    use crate::TwinError;

    fn stage() -> RefinementStage {
        RefinementStage::new(PipelineConfig::quick().refinement)
    }

    #[test]
    fn test_requires_ssi() {
        let ds = reference_bay(8, 8, 1).unwrap();
        let err = stage().run(ds).unwrap_err();
        assert!(matches!(err, TwinError::MissingField { stage: "refinement", .. }));
    }

    #[test]
    fn test_ssi_ml_defined_where_optics_valid() {
        let ds = SuitabilityEngine.apply(reference_bay(14, 14, 5).unwrap()).unwrap();
        let out = stage().run(ds).unwrap();
        let ds = &out.dataset;
        let ssi_ml = ds.values(Variable::SsiMl).unwrap();
        let kd = ds.values(Variable::Kd490).unwrap();
        for (p, k) in ssi_ml.iter().zip(kd) {
            assert_eq!(p.is_finite(), k.is_finite());
        }
        assert!(out.report.r2 > 0.5);
        assert_eq!(out.report.importance.len(), 4);
    }

    #[test]
    fn test_explanation_is_additive() {
        let ds = SuitabilityEngine.apply(reference_bay(10, 10, 2).unwrap()).unwrap();
        let out = stage().run(ds).unwrap();
        let model = out.model.unwrap();
        let exp = out.explanation.unwrap();
        for i in 0..exp.samples.len().min(10) {
            let total = exp.attribution.baseline + exp.attribution.row(i).iter().sum::<f64>();
            assert!((total - model.predict(exp.samples.row(i))).abs() < 1e-9);
        }
        let curve = exp.dependence("KD490").unwrap();
        assert!(curve.windows(2).all(|w| w[0].0 <= w[1].0));
    }

    #[test]
    fn test_degenerate_ssi_gives_undefined_prediction() {
        let ds = SuitabilityEngine.apply(uniform_scenario().unwrap()).unwrap();
        let out = stage().run(ds).unwrap();
        assert_eq!(out.report.n_train, 0);
        assert!(out.report.r2.is_nan());
        assert!(out
            .dataset
            .values(Variable::SsiMl)
            .unwrap()
            .iter()
            .all(|v| v.is_nan()));
    }
}
