//! Tabular projection of grid fields
//!
//! A [`FeatureRecord`] is the flattened, NaN-free view the learning stages
//! train on: one row per grid cell where every selected field is valid, each
//! row carrying its `lat`, `lon` and flat cell index so results can be
//! written back onto the grid.

use crate::error::{Result, TwinError};
use crate::grid::dataset::GridDataset;
use crate::grid::schema::Variable;
use crate::learning::Samples;

/// Row-major table of selected fields over the valid cells of a dataset
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRecord {
    columns: Vec<String>,
    data: Vec<f64>,
    lat: Vec<f64>,
    lon: Vec<f64>,
    cells: Vec<usize>,
}

impl FeatureRecord {
    /// Project `vars` of `ds`, dropping every cell where any of them is NaN
    ///
    /// # Errors
    ///
    /// [`TwinError::MissingField`] if a variable is absent (attributed to `stage`).
    pub fn from_dataset(ds: &GridDataset, vars: &[Variable], stage: &'static str) -> Result<Self> {
        let sources: Vec<&[f64]> = vars
            .iter()
            .map(|v| ds.require(stage, *v))
            .collect::<Result<_>>()?;

        let mut record = Self {
            columns: vars.iter().map(|v| v.name().to_string()).collect(),
            data: Vec::new(),
            lat: Vec::new(),
            lon: Vec::new(),
            cells: Vec::new(),
        };
        for cell in 0..ds.n_cells() {
            if sources.iter().any(|s| !s[cell].is_finite()) {
                continue;
            }
            let (la, lo) = ds.cell_coordinates(cell);
            record.data.extend(sources.iter().map(|s| s[cell]));
            record.lat.push(la);
            record.lon.push(lo);
            record.cells.push(cell);
        }
        Ok(record)
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Whether no cell survived the projection
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Number of columns
    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    /// Column names in storage order
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Position of a column by name
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Copy of one column
    ///
    /// # Errors
    ///
    /// [`TwinError::UnknownField`] if no column has that name.
    pub fn column(&self, name: &str) -> Result<Vec<f64>> {
        let k = self
            .column_index(name)
            .ok_or_else(|| TwinError::UnknownField(name.to_string()))?;
        let n = self.n_cols();
        Ok((0..self.len()).map(|r| self.data[r * n + k]).collect())
    }

    /// Values of row `i` in column order
    pub fn row(&self, i: usize) -> &[f64] {
        let n = self.n_cols();
        &self.data[i * n..(i + 1) * n]
    }

    /// Row latitudes
    pub fn lat(&self) -> &[f64] {
        &self.lat
    }

    /// Row longitudes
    pub fn lon(&self) -> &[f64] {
        &self.lon
    }

    /// Flat grid index each row came from
    pub fn cells(&self) -> &[usize] {
        &self.cells
    }

    /// Sample matrix restricted to `names`, in the order given
    ///
    /// # Errors
    ///
    /// [`TwinError::UnknownField`] if a name is not a column.
    pub fn matrix(&self, names: &[&str]) -> Result<Samples> {
        let idx: Vec<usize> = names
            .iter()
            .map(|n| {
                self.column_index(n)
                    .ok_or_else(|| TwinError::UnknownField((*n).to_string()))
            })
            .collect::<Result<_>>()?;
        let mut data = Vec::with_capacity(self.len() * idx.len());
        for r in 0..self.len() {
            let row = self.row(r);
            data.extend(idx.iter().map(|&k| row[k]));
        }
        Ok(Samples::new(data, idx.len()))
    }

    /// Append a derived column
    ///
    /// # Errors
    ///
    /// [`TwinError::ShapeMismatch`] if `values` does not have one entry per row.
    pub fn with_column(mut self, name: impl Into<String>, values: Vec<f64>) -> Result<Self> {
        let name = name.into();
        if values.len() != self.len() {
            return Err(TwinError::ShapeMismatch {
                field: name,
                expected: self.len(),
                got: values.len(),
            });
        }
        let n = self.n_cols();
        let mut data = Vec::with_capacity(self.len() * (n + 1));
        for (r, v) in values.into_iter().enumerate() {
            data.extend_from_slice(&self.data[r * n..(r + 1) * n]);
            data.push(v);
        }
        self.data = data;
        self.columns.push(name);
        Ok(self)
    }

    /// Keep the rows for which `keep(row)` holds
    pub fn filter_by<F>(&self, keep: F) -> Self
    where
        F: Fn(&[f64]) -> bool,
    {
        let rows: Vec<usize> = (0..self.len()).filter(|&r| keep(self.row(r))).collect();
        self.subset(&rows)
    }

    /// Rows at `indices`, in that order; repeated indices repeat the row
    pub fn subset(&self, indices: &[usize]) -> Self {
        let n = self.n_cols();
        let mut out = Self {
            columns: self.columns.clone(),
            data: Vec::with_capacity(indices.len() * n),
            lat: Vec::with_capacity(indices.len()),
            lon: Vec::with_capacity(indices.len()),
            cells: Vec::with_capacity(indices.len()),
        };
        for &r in indices {
            out.data.extend_from_slice(self.row(r));
            out.lat.push(self.lat[r]);
            out.lon.push(self.lon[r]);
            out.cells.push(self.cells[r]);
        }
        out
    }
}
