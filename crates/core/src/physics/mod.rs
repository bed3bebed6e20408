//! Light physics and the suitability engine

pub mod light;
pub mod suitability;

pub use light::{euphotic_depth, normalize, seabed_par, suitability_index};
pub use suitability::SuitabilityEngine;
