//! Restoration optimizer
//!
//! Multi-objective site selection: maximise sequestration potential while
//! minimising model uncertainty and artificial-light exposure, solved with a
//! seeded NSGA-II and reduced to one compromise plan.

pub mod candidates;
pub mod compromise;
pub mod nsga2;
pub mod operators;
pub mod planner;
pub mod population;
pub mod problem;

pub use candidates::CandidateSet;
pub use compromise::compromise_index;
pub use nsga2::{Nsga2, ParetoFront, Solution};
pub use planner::{
    filter_sites, summarize, RestorationOutcome, RestorationPlanner, RestorationReport,
    RestorationSite, SiteFilter, SiteTotals, SUMMARY_COLUMNS,
};
pub use population::{dominates, Individual};
pub use problem::{MultiObjectiveProblem, Objectives, RestorationProblem, SENTINEL};
