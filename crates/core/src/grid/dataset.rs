//! Labeled grid dataset shared by every pipeline stage
//!
//! A [`GridDataset`] holds named fields over a rectangular `lat x lon` grid,
//! optionally with a leading time dimension. Values are stored row-major with
//! latitude as the outer index (`i * n_lon + j`), and time outermost for
//! temporal fields. Missing data is NaN, never an absent entry.

use crate::core_types::stats::{self, Describe};
use crate::error::{Result, TwinError};
use crate::grid::coords::Axis;
use crate::grid::schema::Variable;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Units and description carried with a field
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMeta {
    /// Physical units
    #[serde(default)]
    pub units: String,
    /// Human-readable description
    #[serde(default)]
    pub long_name: String,
    /// Free-form remark (provenance, masking, caveats)
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub comment: String,
}

impl FieldMeta {
    /// Default metadata for a known variable
    pub fn for_variable(var: Variable) -> Self {
        Self {
            units: var.units().to_string(),
            long_name: var.long_name().to_string(),
            comment: String::new(),
        }
    }

    /// Attach a comment
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = comment.into();
        self
    }
}

/// One named array attached to the grid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    #[serde(with = "nan_as_null")]
    values: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    time_steps: Option<usize>,
    #[serde(default)]
    meta: FieldMeta,
}

impl Field {
    /// 2-D field from row-major `lat x lon` values
    pub fn new(values: Vec<f64>) -> Self {
        Self {
            values,
            time_steps: None,
            meta: FieldMeta::default(),
        }
    }

    /// 3-D field from `time x lat x lon` values
    pub fn temporal(values: Vec<f64>, time_steps: usize) -> Self {
        Self {
            values,
            time_steps: Some(time_steps),
            meta: FieldMeta::default(),
        }
    }

    /// Replace the metadata
    pub fn with_meta(mut self, meta: FieldMeta) -> Self {
        self.meta = meta;
        self
    }

    /// Raw values
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Metadata
    pub fn meta(&self) -> &FieldMeta {
        &self.meta
    }

    pub(crate) fn values_mut(&mut self) -> &mut [f64] {
        &mut self.values
    }

    pub(crate) fn set_meta(&mut self, meta: FieldMeta) {
        self.meta = meta;
    }

    /// Whether the field still carries a time dimension
    pub fn is_temporal(&self) -> bool {
        self.time_steps.is_some()
    }

    /// Number of finite values
    pub fn valid_count(&self) -> usize {
        stats::finite(&self.values).count()
    }
}

/// Collection of named fields over shared coordinate axes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridDataset {
    pub(crate) lat: Axis,
    pub(crate) lon: Axis,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) time: Option<Axis>,
    pub(crate) fields: BTreeMap<String, Field>,
    #[serde(default)]
    pub(crate) attrs: BTreeMap<String, String>,
}

impl GridDataset {
    /// Empty dataset over the given axes
    pub fn new(lat: Axis, lon: Axis) -> Self {
        Self {
            lat,
            lon,
            time: None,
            fields: BTreeMap::new(),
            attrs: BTreeMap::new(),
        }
    }

    /// Attach a time axis for temporal fields
    pub fn with_time(mut self, time: Axis) -> Self {
        self.time = Some(time);
        self
    }

    /// Latitude axis
    pub fn lat(&self) -> &Axis {
        &self.lat
    }

    /// Longitude axis
    pub fn lon(&self) -> &Axis {
        &self.lon
    }

    /// Time axis, if any
    pub fn time(&self) -> Option<&Axis> {
        self.time.as_ref()
    }

    /// `(n_lat, n_lon)`
    pub fn shape(&self) -> (usize, usize) {
        (self.lat.len(), self.lon.len())
    }

    /// Number of spatial cells
    pub fn n_cells(&self) -> usize {
        self.lat.len() * self.lon.len()
    }

    /// Flat index of cell `(i, j)`
    #[inline]
    pub fn flat_index(&self, i: usize, j: usize) -> usize {
        i * self.lon.len() + j
    }

    /// `(lat, lon)` of a flat cell index
    #[inline]
    pub fn cell_coordinates(&self, cell: usize) -> (f64, f64) {
        let n_lon = self.lon.len();
        (self.lat.values()[cell / n_lon], self.lon.values()[cell % n_lon])
    }

    /// Attach a field, validating that it fits the axes
    ///
    /// Inserting under an existing name replaces the previous field.
    ///
    /// # Errors
    ///
    /// [`TwinError::ShapeMismatch`] if the value count does not match the grid (and
    /// the time axis for temporal fields).
    pub fn insert(&mut self, name: impl Into<String>, field: Field) -> Result<()> {
        let name = name.into();
        let expected = match field.time_steps {
            None => self.n_cells(),
            Some(t) => {
                let axis_len = self.time.as_ref().map_or(0, Axis::len);
                if axis_len != t {
                    return Err(TwinError::ShapeMismatch {
                        field: name,
                        expected: axis_len * self.n_cells(),
                        got: field.values.len(),
                    });
                }
                t * self.n_cells()
            }
        };
        if field.values.len() != expected {
            return Err(TwinError::ShapeMismatch {
                field: name,
                expected,
                got: field.values.len(),
            });
        }
        self.fields.insert(name, field);
        Ok(())
    }

    /// Attach a 2-D field for a known variable with its default metadata
    ///
    /// # Errors
    ///
    /// [`TwinError::ShapeMismatch`] if `values` does not cover the grid.
    pub fn insert_values(&mut self, var: Variable, values: Vec<f64>) -> Result<()> {
        self.insert(
            var.name(),
            Field::new(values).with_meta(FieldMeta::for_variable(var)),
        )
    }

    /// Broadcast a scalar onto every cell
    pub fn insert_scalar(&mut self, var: Variable, value: f64) {
        let field = Field::new(vec![value; self.n_cells()]).with_meta(FieldMeta::for_variable(var));
        self.fields.insert(var.name().to_string(), field);
    }

    /// Field by name
    pub fn get(&self, name: &str) -> Option<&Field> {
        self.fields.get(name)
    }

    /// Values of a known variable, if present and 2-D
    pub fn values(&self, var: Variable) -> Option<&[f64]> {
        self.fields
            .get(var.name())
            .filter(|f| !f.is_temporal())
            .map(Field::values)
    }

    /// Values of a field a stage cannot run without
    ///
    /// # Errors
    ///
    /// [`TwinError::MissingField`] if absent, [`TwinError::ShapeMismatch`] if the
    /// field still has a time dimension.
    pub fn require(&self, stage: &'static str, var: Variable) -> Result<&[f64]> {
        let field = self
            .fields
            .get(var.name())
            .ok_or_else(|| TwinError::missing(stage, var.name()))?;
        if field.is_temporal() {
            return Err(TwinError::ShapeMismatch {
                field: var.name().to_string(),
                expected: self.n_cells(),
                got: field.values.len(),
            });
        }
        Ok(field.values())
    }

    /// Whether a field of that name exists
    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Field names in sorted order
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Dataset-level attribute
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).map(String::as_str)
    }

    /// Set a dataset-level attribute
    pub fn set_attr(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.attrs.insert(key.into(), value.into());
    }

    /// Replace every temporal field by its NaN-skipping mean over time
    ///
    /// Drops the time axis afterwards, since no field depends on it any more.
    pub fn collapse_time(&mut self) {
        let cells = self.n_cells();
        for field in self.fields.values_mut() {
            let Some(steps) = field.time_steps else {
                continue;
            };
            let mut collapsed = Vec::with_capacity(cells);
            for cell in 0..cells {
                let series: Vec<f64> = (0..steps).map(|t| field.values[t * cells + cell]).collect();
                collapsed.push(stats::mean(&series));
            }
            field.values = collapsed;
            field.time_steps = None;
        }
        self.time = None;
    }

    /// Values of `name` along the latitude row nearest to `lat`, as `(lon, value)` pairs
    ///
    /// # Errors
    ///
    /// [`TwinError::UnknownField`] if the field is absent or temporal.
    pub fn cross_section(&self, name: &str, lat: f64) -> Result<Vec<(f64, f64)>> {
        let field = self
            .fields
            .get(name)
            .filter(|f| !f.is_temporal())
            .ok_or_else(|| TwinError::UnknownField(name.to_string()))?;
        let Some(i) = self.lat.nearest_unbounded(lat) else {
            return Ok(Vec::new());
        };
        Ok(self
            .lon
            .values()
            .iter()
            .enumerate()
            .map(|(j, &lon)| (lon, field.values[self.flat_index(i, j)]))
            .collect())
    }

    /// Descriptive statistics of every 2-D field
    pub fn describe(&self) -> Vec<(String, Describe)> {
        self.fields
            .iter()
            .filter(|(_, f)| !f.is_temporal())
            .map(|(name, f)| (name.clone(), Describe::of(&f.values)))
            .collect()
    }

    /// Pearson correlation matrix over cells where all named fields are finite
    ///
    /// # Errors
    ///
    /// [`TwinError::UnknownField`] if any name is absent.
    pub fn correlation_matrix(&self, names: &[&str]) -> Result<Vec<Vec<f64>>> {
        let columns: Vec<&[f64]> = names
            .iter()
            .map(|n| {
                self.fields
                    .get(*n)
                    .filter(|f| !f.is_temporal())
                    .map(Field::values)
                    .ok_or_else(|| TwinError::UnknownField((*n).to_string()))
            })
            .collect::<Result<_>>()?;
        let complete: Vec<usize> = (0..self.n_cells())
            .filter(|&c| columns.iter().all(|col| col[c].is_finite()))
            .collect();
        let gathered: Vec<Vec<f64>> = columns
            .iter()
            .map(|col| complete.iter().map(|&c| col[c]).collect())
            .collect();
        Ok(gathered
            .iter()
            .map(|a| gathered.iter().map(|b| stats::pearson(a, b)).collect())
            .collect())
    }

    /// Load a dataset persisted with [`GridDataset::save`]
    ///
    /// # Errors
    ///
    /// I/O failure, malformed JSON, or invalid axes in the file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| TwinError::io(path, e))?;
        let ds: Self = serde_json::from_str(&contents)?;
        ds.validate_fields()?;
        Ok(ds)
    }

    /// Persist the dataset as self-describing JSON (NaN encoded as `null`)
    ///
    /// # Errors
    ///
    /// I/O or serialization failure.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let contents = serde_json::to_string(self)?;
        fs::write(path, contents).map_err(|e| TwinError::io(path, e))
    }

    /// Re-check every field against the axes (used after deserialization)
    fn validate_fields(&self) -> Result<()> {
        let cells = self.n_cells();
        for (name, field) in &self.fields {
            let expected = match field.time_steps {
                None => cells,
                Some(t) => t * cells,
            };
            if field.values.len() != expected {
                return Err(TwinError::ShapeMismatch {
                    field: name.clone(),
                    expected,
                    got: field.values.len(),
                });
            }
        }
        Ok(())
    }
}

/// Encode non-finite values as JSON `null` and decode `null` back to NaN
mod nan_as_null {
    use serde::ser::SerializeSeq;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(values: &[f64], serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(values.len()))?;
        for v in values {
            if v.is_finite() {
                seq.serialize_element(&Some(*v))?;
            } else {
                seq.serialize_element(&None::<f64>)?;
            }
        }
        seq.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<f64>, D::Error> {
        let raw: Vec<Option<f64>> = Vec::deserialize(deserializer)?;
        Ok(raw.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid_2x3() -> GridDataset {
        GridDataset::new(
            Axis::new("lat", vec![54.0, 54.1]).unwrap(),
            Axis::new("lon", vec![13.3, 13.4, 13.5]).unwrap(),
        )
    }

    #[test]
    fn test_insert_rejects_wrong_shape() {
        let mut ds = grid_2x3();
        let err = ds.insert("depth", Field::new(vec![0.0; 5])).unwrap_err();
        assert!(matches!(err, TwinError::ShapeMismatch { expected: 6, got: 5, .. }));
    }

    #[test]
    fn test_temporal_requires_time_axis() {
        let mut ds = grid_2x3();
        assert!(ds.insert("KD490", Field::temporal(vec![0.2; 12], 2)).is_err());

        let mut ds = grid_2x3().with_time(Axis::new("time", vec![0.0, 1.0]).unwrap());
        ds.insert("KD490", Field::temporal(vec![0.2; 12], 2)).unwrap();
        assert!(ds.require("test", Variable::Kd490).is_err());
    }

    #[test]
    fn test_collapse_time_skips_nan() {
        let mut ds = grid_2x3().with_time(Axis::new("time", vec![0.0, 1.0]).unwrap());
        let mut values = vec![1.0; 6];
        values.extend([3.0, f64::NAN, 3.0, 3.0, 3.0, 3.0]);
        ds.insert("KD490", Field::temporal(values, 2)).unwrap();
        ds.collapse_time();
        let kd = ds.require("test", Variable::Kd490).unwrap();
        assert_eq!(kd[0], 2.0);
        assert_eq!(kd[1], 1.0);
        assert!(ds.time().is_none());
    }

    #[test]
    fn test_cell_coordinates_row_major() {
        let ds = grid_2x3();
        assert_eq!(ds.flat_index(1, 2), 5);
        assert_eq!(ds.cell_coordinates(5), (54.1, 13.5));
        assert_eq!(ds.cell_coordinates(1), (54.0, 13.4));
    }

    #[test]
    fn test_cross_section_nearest_row() {
        let mut ds = grid_2x3();
        ds.insert_values(Variable::Ssi, vec![0.1, 0.2, 0.3, 0.4, 0.5, 0.6])
            .unwrap();
        let row = ds.cross_section("SSI", 54.09).unwrap();
        assert_eq!(row, vec![(13.3, 0.4), (13.4, 0.5), (13.5, 0.6)]);
        assert!(ds.cross_section("nope", 54.0).is_err());
    }

    #[test]
    fn test_json_round_trip_keeps_nan() {
        let mut ds = grid_2x3();
        ds.insert_values(Variable::Depth, vec![-1.0, f64::NAN, -3.0, -4.0, -5.0, -6.0])
            .unwrap();
        ds.set_attr("AOI", "Greifswalder Bodden");
        let json = serde_json::to_string(&ds).unwrap();
        let back: GridDataset = serde_json::from_str(&json).unwrap();
        let depth = back.values(Variable::Depth).unwrap();
        assert!(depth[1].is_nan());
        assert_eq!(depth[2], -3.0);
        assert_eq!(back.attr("AOI"), Some("Greifswalder Bodden"));
        assert_eq!(back.get("depth").unwrap().meta().units, "m");
    }

    #[test]
    fn test_correlation_matrix_diagonal() {
        let mut ds = grid_2x3();
        ds.insert_values(Variable::Ssi, vec![0.1, 0.2, 0.3, 0.4, 0.5, f64::NAN])
            .unwrap();
        ds.insert_values(Variable::Zeu, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0])
            .unwrap();
        let m = ds.correlation_matrix(&["SSI", "Zeu"]).unwrap();
        assert!((m[0][0] - 1.0).abs() < 1e-12);
        assert!((m[0][1] - 1.0).abs() < 1e-12);
    }
}
