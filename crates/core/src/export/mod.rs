//! Run artifacts on disk
//!
//! An [`ArtifactStore`] owns one output directory. Each stage's dataset is
//! persisted as JSON for hand-off, and the tabular results go out as CSV and
//! GeoJSON for the dashboard and GIS tools.

pub mod csv;

pub use csv::CsvTable;

use crate::core_types::Describe;
use crate::error::{Result, TwinError};
use crate::grid::{FeatureRecord, GridDataset};
use crate::optimizer::RestorationSite;
use crate::refinement::{Explanation, RefinementReport};
use nalgebra::Vector3;
use serde::Serialize;
use serde_json::{json, Value};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::debug;

/// File names written by a full pipeline run
pub mod files {
    /// Dataset after the suitability engine
    pub const PHYSICS: &str = "step2_physics.json";
    /// Dataset after predictive refinement
    pub const REFINED: &str = "step3_ml.json";
    /// Dataset after the uncertainty estimator
    pub const UNCERTAINTY: &str = "step4_uncertainty.json";
    /// Ranked feature attribution magnitudes
    pub const FEATURE_IMPORTANCE: &str = "feature_importance.csv";
    /// Per-row feature attributions
    pub const ATTRIBUTION: &str = "attribution.csv";
    /// Enriched uncertainty table
    pub const UNCERTAINTY_TABLE: &str = "uncertainty_table.csv";
    /// Pareto front objectives
    pub const PARETO_FRONT: &str = "pareto_front.csv";
    /// Selected sites as points
    pub const SITES: &str = "restoration_sites.geojson";
    /// Descriptive statistics of the selected sites
    pub const SUMMARY: &str = "restoration_summary.csv";
    /// Run diagnostics
    pub const REPORT: &str = "run_report.json";
}

/// Output directory for one run
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    /// Open (creating if needed) an output directory
    ///
    /// # Errors
    ///
    /// [`TwinError::Io`] if the directory cannot be created.
    pub fn create<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).map_err(|e| TwinError::io(&root, e))?;
        Ok(Self { root })
    }

    /// Directory the store writes into
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Full path of an artifact
    pub fn path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Persist a dataset
    ///
    /// # Errors
    ///
    /// I/O or serialization failure.
    pub fn write_dataset(&self, name: &str, ds: &GridDataset) -> Result<PathBuf> {
        let path = self.path(name);
        ds.save(&path)?;
        debug!("Wrote {}", path.display());
        Ok(path)
    }

    /// Write a CSV table
    ///
    /// # Errors
    ///
    /// [`TwinError::Io`] on write failure.
    pub fn write_csv(&self, name: &str, table: &CsvTable) -> Result<PathBuf> {
        let path = self.path(name);
        let file = File::create(&path).map_err(|e| TwinError::io(&path, e))?;
        table
            .write_to(BufWriter::new(file))
            .map_err(|e| TwinError::io(&path, e))?;
        debug!("Wrote {} ({} rows)", path.display(), table.len());
        Ok(path)
    }

    /// Write any serializable value as pretty JSON
    ///
    /// # Errors
    ///
    /// I/O or serialization failure.
    pub fn write_json<T: Serialize + ?Sized>(&self, name: &str, value: &T) -> Result<PathBuf> {
        let path = self.path(name);
        let file = File::create(&path).map_err(|e| TwinError::io(&path, e))?;
        serde_json::to_writer_pretty(BufWriter::new(file), value)?;
        debug!("Wrote {}", path.display());
        Ok(path)
    }
}

/// `feature,mean_abs_contribution` rows, largest first
pub fn importance_table(report: &RefinementReport) -> CsvTable {
    let mut t = CsvTable::new(&["feature", "mean_abs_contribution"]);
    for f in &report.importance {
        t.push_labeled(&f.feature, &[f.mean_abs_contribution]);
    }
    t
}

/// Explained rows: position, feature values, then one `shap_<feature>` column each
pub fn attribution_table(explanation: &Explanation) -> CsvTable {
    let features = &explanation.attribution.features;
    let mut header = vec!["lat".to_string(), "lon".to_string()];
    header.extend(features.iter().cloned());
    header.extend(features.iter().map(|f| format!("shap_{f}")));
    let mut t = CsvTable::new(&header);
    for r in 0..explanation.attribution.n_rows() {
        let mut row = vec![explanation.lat[r], explanation.lon[r]];
        row.extend_from_slice(explanation.samples.row(r));
        row.extend_from_slice(explanation.attribution.row(r));
        t.push_numbers(&row);
    }
    t
}

/// `lat,lon` followed by every record column
pub fn record_table(record: &FeatureRecord) -> CsvTable {
    let mut header = vec!["lat".to_string(), "lon".to_string()];
    header.extend(record.columns().iter().cloned());
    let mut t = CsvTable::new(&header);
    for r in 0..record.len() {
        let mut row = vec![record.lat()[r], record.lon()[r]];
        row.extend_from_slice(record.row(r));
        t.push_numbers(&row);
    }
    t
}

/// Front rows as `-CO2,Uncertainty,ALAN,CO2` from `(CO2, U, ALAN)` vectors
pub fn front_table(rows: &[Vector3<f64>]) -> CsvTable {
    let mut t = CsvTable::new(&["-CO2", "Uncertainty", "ALAN", "CO2"]);
    for r in rows {
        t.push_numbers(&[-r.x, r.y, r.z, r.x]);
    }
    t
}

/// Describe table: one labelled row per statistic, one column per field
pub fn describe_table(columns: &[(String, Describe)]) -> CsvTable {
    let mut header = vec![String::new()];
    header.extend(columns.iter().map(|(name, _)| name.clone()));
    let mut t = CsvTable::new(&header);
    let values: Vec<[f64; 8]> = columns.iter().map(|(_, d)| d.values()).collect();
    for (k, label) in Describe::LABELS.iter().enumerate() {
        let row: Vec<f64> = values.iter().map(|v| v[k]).collect();
        t.push_labeled(label, &row);
    }
    t
}

/// Selected sites as a GeoJSON point `FeatureCollection` in EPSG:4326
pub fn sites_geojson(sites: &[RestorationSite]) -> Value {
    let features: Vec<Value> = sites
        .iter()
        .map(|s| {
            json!({
                "type": "Feature",
                "geometry": {
                    "type": "Point",
                    "coordinates": [s.lon(), s.lat()],
                },
                "properties": {
                    "cell": s.cell,
                    "lat": s.lat(),
                    "lon": s.lon(),
                    "depth": s.depth,
                    "SSI": s.ssi,
                    "SSI_ML": s.ssi_ml,
                    "uncertainty": s.uncertainty,
                    "CO2_potential": s.co2_potential,
                    "ALAN_risk": s.alan_risk,
                    "shear_stress": s.shear_stress,
                },
            })
        })
        .collect();
    json!({
        "type": "FeatureCollection",
        "crs": {
            "type": "name",
            "properties": { "name": "urn:ogc:def:crs:EPSG::4326" },
        },
        "features": features,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimizer::summarize;
    use nalgebra::Point2;

    fn site(co2: f64) -> RestorationSite {
        RestorationSite {
            position: Point2::new(13.45, 54.21),
            cell: 7,
            depth: -4.0,
            ssi: 0.5,
            ssi_ml: 0.6,
            co2_potential: co2,
            uncertainty: 0.1,
            alan_risk: 0.4,
            shear_stress: 0.15,
        }
    }

    #[test]
    fn test_geojson_points_are_lon_lat() {
        let gj = sites_geojson(&[site(2.4)]);
        assert_eq!(gj["type"], "FeatureCollection");
        assert_eq!(gj["features"][0]["geometry"]["coordinates"][0], 13.45);
        assert_eq!(gj["features"][0]["geometry"]["coordinates"][1], 54.21);
        assert_eq!(gj["features"][0]["properties"]["CO2_potential"], 2.4);
    }

    #[test]
    fn test_summary_layout() {
        let t = describe_table(&summarize(&[site(1.0), site(3.0)]));
        assert_eq!(t.header(), ["", "CO2_potential", "uncertainty", "ALAN_risk"]);
        assert_eq!(t.len(), 8);
        assert!(t.to_csv_string().contains("\nmean,2,0.1,0.4\n"));
    }

    #[test]
    fn test_front_restores_co2_sign() {
        let t = front_table(&[Vector3::new(2.5, 0.1, 0.3)]);
        assert_eq!(t.to_csv_string(), "-CO2,Uncertainty,ALAN,CO2\n-2.5,0.1,0.3,2.5\n");
    }

    #[test]
    fn test_store_writes_files() {
        let dir = std::env::temp_dir().join(format!("twin-export-{}", std::process::id()));
        let store = ArtifactStore::create(&dir).unwrap();
        let path = store.write_csv(files::PARETO_FRONT, &front_table(&[])).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "-CO2,Uncertainty,ALAN,CO2\n");
        store.write_json(files::SITES, &sites_geojson(&[])).unwrap();
        assert!(store.path(files::SITES).exists());
        fs::remove_dir_all(&dir).unwrap();
    }
}
