//! Core types and utilities

pub mod seed;
pub mod stats;

pub use seed::{derive_seed, stream_rng};
pub use stats::Describe;
