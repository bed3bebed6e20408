//! Suitability engine behaviour on hand-built scenarios

mod common;

use approx::assert_relative_eq;
use seagrass_twin_core::core_types::stats;
use seagrass_twin_core::grid::synthetic::{reference_bay, uniform_scenario};
use seagrass_twin_core::{GridDataset, SuitabilityEngine, TwinError, Variable};

#[test]
fn test_uniform_scenario_layers() {
    let ds = SuitabilityEngine.apply(uniform_scenario().unwrap()).unwrap();

    // KD490 = 0.2 everywhere: Zeu = 4.6 / 0.2
    for &z in ds.values(Variable::Zeu).unwrap() {
        assert_relative_eq!(z, 23.0, epsilon = 1e-9);
    }

    // Seabed PAR follows Beer-Lambert from 20 at the surface
    let depth = ds.values(Variable::Depth).unwrap();
    let par_bed = ds.values(Variable::ParBed).unwrap();
    for (d, p) in depth.iter().zip(par_bed) {
        assert_relative_eq!(*p, 20.0 * (0.2 * d).exp(), epsilon = 1e-9);
        assert!(*p < 20.0);
    }

    // A constant Zeu layer has no normalized value, so SSI is undefined everywhere
    assert!(ds.values(Variable::Ssi).unwrap().iter().all(|s| s.is_nan()));
}

#[test]
fn test_clearer_shallows_rank_higher() {
    let ds = SuitabilityEngine.apply(common::sloped_scenario()).unwrap();
    let depth = ds.values(Variable::Depth).unwrap();
    let ssi = ds.values(Variable::Ssi).unwrap();

    let mut pairs: Vec<(f64, f64)> = depth.iter().map(|d| d.abs()).zip(ssi.iter().copied()).collect();
    pairs.sort_by(|a, b| a.0.total_cmp(&b.0));
    assert!(pairs.iter().all(|(_, s)| (0.0..=1.0).contains(s)));
    for w in pairs.windows(2) {
        assert!(w[1].1 <= w[0].1 + 1e-12, "SSI rose from {:?} to {:?}", w[0], w[1]);
    }
    // Shallowest cell maximises every term
    assert_relative_eq!(pairs[0].1, 0.8, epsilon = 1e-9);
}

#[test]
fn test_reference_bay_ranges() {
    let ds = SuitabilityEngine.apply(reference_bay(24, 24, 42).unwrap()).unwrap();
    let ssi = ds.values(Variable::Ssi).unwrap();
    let depth = ds.values(Variable::Depth).unwrap();

    for (s, d) in ssi.iter().zip(depth) {
        // Land stays undefined, every water cell gets a bounded index
        assert_eq!(s.is_nan(), d.is_nan());
        if s.is_finite() {
            assert!((0.0..=1.0).contains(s));
        }
    }
    let zeu = ds.values(Variable::Zeu).unwrap();
    assert!(stats::finite(zeu).all(|z| (0.0..=30.0).contains(&z)));
}

#[test]
fn test_missing_depth_aborts() {
    let source = uniform_scenario().unwrap();
    let mut ds = GridDataset::new(source.lat().clone(), source.lon().clone());
    for var in [Variable::Kd490, Variable::ParSurface] {
        ds.insert_values(var, source.values(var).unwrap().to_vec())
            .unwrap();
    }
    match SuitabilityEngine.apply(ds) {
        Err(TwinError::MissingField { field, .. }) => assert_eq!(field, "depth"),
        other => panic!("expected a missing depth error, got {other:?}"),
    }
}

#[test]
fn test_engine_is_idempotent() {
    let once = SuitabilityEngine.apply(common::sloped_scenario()).unwrap();
    let twice = SuitabilityEngine.apply(once.clone()).unwrap();
    for var in [Variable::Zeu, Variable::ParBed, Variable::Ssi] {
        assert_eq!(once.values(var), twice.values(var));
    }
}
