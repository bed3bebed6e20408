//! Configuration files and fatal-error behaviour of the pipeline

mod common;

use seagrass_twin_core::grid::synthetic::reference_bay;
use seagrass_twin_core::{GridDataset, Pipeline, PipelineConfig, TwinError, Variable};
use std::fs;

fn scratch(name: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!("twin-{name}-{}", std::process::id()))
}

#[test]
fn test_load_config_from_file() {
    let path = scratch("config.toml");
    fs::write(
        &path,
        r#"
        [refinement]
        attribution_max_rows = 64

        [uncertainty]
        threshold = 0.2
        n_bootstrap = 4

        [optimizer]
        population_size = 30
        seed = 9
        "#,
    )
    .unwrap();

    let config = PipelineConfig::load_from_file(&path).unwrap();
    assert_eq!(config.refinement.attribution_max_rows, Some(64));
    assert_eq!(config.refinement.forest.n_estimators, 300);
    assert_eq!(config.uncertainty.threshold, 0.2);
    assert_eq!(config.uncertainty.n_bootstrap, 4);
    assert_eq!(config.optimizer.population_size, 30);
    assert_eq!(config.optimizer.seed, 9);
    assert_eq!(config.optimizer.generations, 50);
    fs::remove_file(&path).unwrap();
}

#[test]
fn test_missing_config_file_is_io_error() {
    let err = PipelineConfig::load_from_file(scratch("absent.toml")).unwrap_err();
    assert!(matches!(err, TwinError::Io { .. }));
}

#[test]
fn test_invalid_config_value_is_rejected() {
    let err = PipelineConfig::from_toml_str("[optimizer]\npopulation_size = 0\n").unwrap_err();
    assert!(matches!(err, TwinError::InvalidConfig(_)));
}

#[test]
fn test_missing_input_writes_no_artifacts() {
    let bay = reference_bay(8, 8, 1).unwrap();
    let mut ds = GridDataset::new(bay.lat().clone(), bay.lon().clone());
    for var in [Variable::Kd490, Variable::Depth] {
        ds.insert_values(var, bay.values(var).unwrap().to_vec()).unwrap();
    }

    let dir = scratch("missing-input");
    let err = Pipeline::new(PipelineConfig::quick())
        .run_to_dir(ds, &dir)
        .unwrap_err();
    match err {
        TwinError::MissingField { stage, field } => {
            assert_eq!(stage, "suitability");
            assert_eq!(field, "PAR_surface");
        }
        other => panic!("unexpected error {other}"),
    }
    assert_eq!(fs::read_dir(&dir).unwrap().count(), 0);
    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_provider_names_are_harmonized() {
    let bay = reference_bay(8, 8, 2).unwrap();
    let mut ds = GridDataset::new(bay.lat().clone(), bay.lon().clone());
    for (alias, var) in [
        ("kd490", Variable::Kd490),
        ("adg443", Variable::Adg443),
        ("aph443", Variable::Aph443),
        ("bbp443", Variable::Bbp443),
        ("par", Variable::ParSurface),
        ("elevation", Variable::Depth),
    ] {
        let field = bay.get(var.name()).unwrap().clone();
        ds.insert(alias, field).unwrap();
    }

    let run = Pipeline::new(PipelineConfig::quick()).run(ds).unwrap();
    assert!(run.dataset().contains("SSI_ML"));
    assert!(run.dataset().contains("uncertainty"));
}
