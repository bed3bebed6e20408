//! Shared setup for the integration tests

use seagrass_twin_core::grid::synthetic::uniform_scenario;
use seagrass_twin_core::{GridDataset, Variable};

/// Route `tracing` output through the test harness, filtered by `RUST_LOG`
#[ctor::ctor]
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// The 10 x 10 scenario with `KD490` rising linearly with water depth
#[allow(dead_code)]
pub fn sloped_scenario() -> GridDataset {
    let mut ds = uniform_scenario().expect("fixed axes are valid");
    let kd: Vec<f64> = ds
        .values(Variable::Depth)
        .expect("scenario has depth")
        .iter()
        .map(|d| 0.1 + 0.02 * d.abs())
        .collect();
    ds.insert_values(Variable::Kd490, kd).expect("shape matches");
    ds
}
