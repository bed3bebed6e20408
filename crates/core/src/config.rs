//! Pipeline configuration
//!
//! Every stage reads its settings from a plain struct whose `Default` holds the
//! design constants. Configurations load from TOML where any omitted key keeps
//! its default:
//!
//! ```toml
//! [refinement.forest]
//! n_estimators = 100
//!
//! [uncertainty]
//! n_bootstrap = 10
//!
//! [optimizer]
//! generations = 80
//! ```

use crate::error::{Result, TwinError};
use crate::grid::CoordinateMatch;
use crate::learning::{ForestConfig, MaxFeatures};
use serde::{Deserialize, Deserializer, Serialize};
use std::fs;
use std::path::Path;

/// Settings of the predictive refinement stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefinementConfig {
    /// Regression forest hyper-parameters
    #[serde(deserialize_with = "regressor_forest")]
    pub forest: ForestConfig,
    /// Explain at most this many training rows (evenly strided); `None` explains all
    pub attribution_max_rows: Option<usize>,
}

impl Default for RefinementConfig {
    fn default() -> Self {
        Self {
            forest: ForestConfig::regressor(),
            attribution_max_rows: None,
        }
    }
}

/// Settings of the uncertainty estimator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UncertaintyConfig {
    /// Classification forest hyper-parameters
    #[serde(deserialize_with = "classifier_forest")]
    pub forest: ForestConfig,
    /// Suitability above which a cell counts as suitable
    pub threshold: f64,
    /// Cross-validation folds
    pub n_folds: usize,
    /// Bootstrap ensemble size
    pub n_bootstrap: usize,
    /// Seed for driver synthesis, fold shuffling and resampling
    pub seed: u64,
    /// How table rows are matched back to grid cells
    pub coordinate_match: CoordinateMatch,
}

impl Default for UncertaintyConfig {
    fn default() -> Self {
        Self {
            forest: ForestConfig::classifier(),
            threshold: 0.15,
            n_folds: 5,
            n_bootstrap: 20,
            seed: 42,
            coordinate_match: CoordinateMatch::default(),
        }
    }
}

/// Settings of the restoration optimizer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    /// Individuals per generation
    pub population_size: usize,
    /// Number of generations after the initial population
    pub generations: usize,
    /// Probability that a mating pair undergoes crossover
    pub crossover_prob: f64,
    /// SBX distribution index
    pub crossover_eta: f64,
    /// Polynomial mutation distribution index
    pub mutation_eta: f64,
    /// Drop offspring identical to an existing individual
    pub eliminate_duplicates: bool,
    /// Decision value above which a site counts as selected
    pub selection_threshold: f64,
    /// Deepest eligible elevation (m)
    pub min_depth: f64,
    /// Shallowest eligible elevation (m)
    pub max_depth: f64,
    /// CO2 potential per unit of `SSI x |depth|`
    pub co2_factor: f64,
    /// Seed for the search and for synthetic shear stress
    pub seed: u64,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            population_size: 100,
            generations: 50,
            crossover_prob: 0.9,
            crossover_eta: 15.0,
            mutation_eta: 20.0,
            eliminate_duplicates: true,
            selection_threshold: 0.8,
            min_depth: -12.0,
            max_depth: -2.0,
            co2_factor: 1.2,
            seed: 42,
        }
    }
}

/// Configuration of a full pipeline run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Predictive refinement
    pub refinement: RefinementConfig,
    /// Uncertainty estimator
    pub uncertainty: UncertaintyConfig,
    /// Restoration optimizer
    pub optimizer: OptimizerConfig,
}

impl PipelineConfig {
    /// Small forests and a short search, for tests and quick looks
    pub fn quick() -> Self {
        let mut config = Self::default();
        config.refinement.forest.n_estimators = 20;
        config.refinement.attribution_max_rows = Some(200);
        config.uncertainty.forest.n_estimators = 15;
        config.uncertainty.n_bootstrap = 8;
        config.optimizer.population_size = 40;
        config.optimizer.generations = 15;
        config
    }

    /// Use one base seed for every stochastic stage
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.refinement.forest.seed = seed;
        self.uncertainty.forest.seed = seed;
        self.uncertainty.seed = seed;
        self.optimizer.seed = seed;
        self
    }

    /// Parse and validate a TOML document
    ///
    /// # Errors
    ///
    /// [`TwinError::Toml`] on malformed input, [`TwinError::InvalidConfig`] on
    /// out-of-range values.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file
    ///
    /// # Errors
    ///
    /// I/O failure, or the errors of [`PipelineConfig::from_toml_str`].
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| TwinError::io(path, e))?;
        Self::from_toml_str(&text)
    }

    /// Reject values no stage can run with
    ///
    /// # Errors
    ///
    /// [`TwinError::InvalidConfig`] describing the first offending value.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(TwinError::InvalidConfig(msg));

        self.refinement.forest.validate()?;
        self.uncertainty.forest.validate()?;
        if self.refinement.attribution_max_rows == Some(0) {
            return invalid("refinement.attribution_max_rows must be positive".into());
        }

        let u = &self.uncertainty;
        if u.n_folds < 2 {
            return invalid(format!("uncertainty.n_folds must be at least 2, got {}", u.n_folds));
        }
        if u.n_bootstrap == 0 {
            return invalid("uncertainty.n_bootstrap must be at least 1".into());
        }
        if !u.threshold.is_finite() {
            return invalid("uncertainty.threshold must be finite".into());
        }
        if let CoordinateMatch::Nearest { tolerance } = u.coordinate_match {
            if tolerance.is_nan() || tolerance <= 0.0 {
                return invalid(format!("coordinate tolerance must be positive, got {tolerance}"));
            }
        }

        let o = &self.optimizer;
        if o.population_size < 2 {
            return invalid(format!(
                "optimizer.population_size must be at least 2, got {}",
                o.population_size
            ));
        }
        if !(0.0..=1.0).contains(&o.crossover_prob) {
            return invalid("optimizer.crossover_prob must lie in [0, 1]".into());
        }
        if o.crossover_eta.is_nan() || o.crossover_eta <= 0.0 || o.mutation_eta.is_nan() || o.mutation_eta <= 0.0 {
            return invalid("optimizer distribution indices must be positive".into());
        }
        if !(0.0..1.0).contains(&o.selection_threshold) {
            return invalid("optimizer.selection_threshold must lie in [0, 1)".into());
        }
        if o.min_depth > o.max_depth {
            return invalid(format!(
                "optimizer depth band is inverted: [{}, {}]",
                o.min_depth, o.max_depth
            ));
        }
        Ok(())
    }
}

/// Forest keys given in a configuration file; absent keys keep the stage default
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ForestOverrides {
    n_estimators: Option<usize>,
    max_depth: Option<usize>,
    min_samples_leaf: Option<usize>,
    max_features: Option<MaxFeatures>,
    bootstrap: Option<bool>,
    seed: Option<u64>,
}

impl ForestOverrides {
    fn apply(self, mut base: ForestConfig) -> ForestConfig {
        if let Some(v) = self.n_estimators {
            base.n_estimators = v;
        }
        if let Some(v) = self.max_depth {
            base.max_depth = Some(v);
        }
        if let Some(v) = self.min_samples_leaf {
            base.min_samples_leaf = v;
        }
        if let Some(v) = self.max_features {
            base.max_features = v;
        }
        if let Some(v) = self.bootstrap {
            base.bootstrap = v;
        }
        if let Some(v) = self.seed {
            base.seed = v;
        }
        base
    }
}

fn regressor_forest<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<ForestConfig, D::Error> {
    Ok(ForestOverrides::deserialize(deserializer)?.apply(ForestConfig::regressor()))
}

fn classifier_forest<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<ForestConfig, D::Error> {
    Ok(ForestOverrides::deserialize(deserializer)?.apply(ForestConfig::classifier()))
}
