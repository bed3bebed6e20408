//! Seagrass Light Twin Core Library
//!
//! A gridded digital twin of the underwater light climate of a coastal bay,
//! used to judge where seagrass can grow and where restoration pays off.
//!
//! ## Pipeline
//!
//! - Suitability engine: euphotic depth, seabed PAR and a physics-based
//!   suitability index (SSI) from Beer-Lambert attenuation
//! - Predictive refinement: random-forest regression of SSI on ocean optics,
//!   explained with exact TreeSHAP attributions
//! - Uncertainty estimator: K-fold F1 of a suitability classifier plus
//!   per-cell bootstrap disagreement
//! - Restoration optimizer: NSGA-II over CO2 potential, uncertainty and
//!   artificial-light risk, reduced to one compromise plan
//!
//! Every stochastic step takes an explicit seed; a run is reproducible from
//! its [`PipelineConfig`].

// Shared numerics and seeding
pub mod core_types;
pub mod error;
pub mod config;

// Data model
pub mod grid;

// Stages
pub mod physics;
pub mod learning;
pub mod refinement;
pub mod uncertainty;
pub mod optimizer;

// Orchestration and persistence
pub mod export;
pub mod pipeline;

pub use config::{OptimizerConfig, PipelineConfig, RefinementConfig, UncertaintyConfig};
pub use error::{Result, TwinError};

pub use grid::{Axis, CoordinateMatch, FeatureRecord, Field, FieldMeta, GridDataset, Variable};
pub use learning::{Attribution, Ensemble, ForestConfig, RandomForest, Samples};
pub use physics::SuitabilityEngine;
pub use refinement::{RefinementOutcome, RefinementReport, RefinementStage};
pub use uncertainty::{UncertaintyOutcome, UncertaintyReport, UncertaintyStage};
pub use optimizer::{
    ParetoFront, RestorationOutcome, RestorationPlanner, RestorationReport, RestorationSite,
    SiteFilter,
};
pub use export::ArtifactStore;
pub use pipeline::{Pipeline, PipelineRun, RunReport};
