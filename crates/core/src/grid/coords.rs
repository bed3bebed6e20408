//! Coordinate axes and re-embedding of tabular values onto the grid
//!
//! Axes are ordered, strictly monotonic sequences. Row values coming back from
//! the learning stages are written into a 2-D field by looking up each row's
//! latitude and longitude on the axes, either by exact bit pattern or by
//! nearest value within a tolerance.

use crate::error::{Result, TwinError};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A strictly monotonic coordinate axis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "AxisRepr", into = "AxisRepr")]
pub struct Axis {
    name: String,
    values: Vec<f64>,
    ascending: bool,
}

#[derive(Serialize, Deserialize)]
struct AxisRepr {
    name: String,
    values: Vec<f64>,
}

impl TryFrom<AxisRepr> for Axis {
    type Error = TwinError;

    fn try_from(repr: AxisRepr) -> Result<Self> {
        Axis::new(repr.name, repr.values)
    }
}

impl From<Axis> for AxisRepr {
    fn from(axis: Axis) -> Self {
        Self {
            name: axis.name,
            values: axis.values,
        }
    }
}

impl Axis {
    /// Create an axis, validating that it is non-empty, finite and strictly monotonic
    ///
    /// # Errors
    ///
    /// Returns [`TwinError::InvalidAxis`] when any of those conditions fails.
    pub fn new(name: impl Into<String>, values: Vec<f64>) -> Result<Self> {
        let name = name.into();
        let invalid = |reason: &str| TwinError::InvalidAxis {
            axis: name.clone(),
            reason: reason.to_string(),
        };

        if values.is_empty() {
            return Err(invalid("axis has no values"));
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(invalid("axis contains non-finite values"));
        }
        let ascending = values.len() < 2 || values[1] > values[0];
        let monotonic = values.windows(2).all(|w| {
            if ascending {
                w[1] > w[0]
            } else {
                w[1] < w[0]
            }
        });
        if !monotonic {
            return Err(invalid("axis is not strictly monotonic"));
        }

        Ok(Self {
            name,
            values,
            ascending,
        })
    }

    /// Evenly spaced axis from `start` to `end` inclusive
    ///
    /// # Errors
    ///
    /// Returns [`TwinError::InvalidAxis`] if `count` is zero or the endpoints coincide
    /// while `count > 1`.
    pub fn linspace(name: impl Into<String>, start: f64, end: f64, count: usize) -> Result<Self> {
        let values = match count {
            0 => Vec::new(),
            1 => vec![start],
            _ => {
                let step = (end - start) / (count - 1) as f64;
                (0..count).map(|i| start + step * i as f64).collect()
            }
        };
        Self::new(name, values)
    }

    /// Axis name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Coordinate values
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Number of coordinates
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Axes are never empty; provided for API symmetry
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Rename the axis (used by schema harmonization)
    pub(crate) fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
    }

    /// Map from coordinate bit pattern to index, for exact-match joins
    pub fn exact_index(&self) -> FxHashMap<u64, usize> {
        let mut map = FxHashMap::with_capacity_and_hasher(self.values.len(), Default::default());
        for (i, v) in self.values.iter().enumerate() {
            map.insert(v.to_bits(), i);
        }
        map
    }

    /// Index of the coordinate nearest to `value`, if within `tolerance`
    pub fn nearest(&self, value: f64, tolerance: f64) -> Option<usize> {
        if !value.is_finite() {
            return None;
        }
        let pos = if self.ascending {
            self.values.partition_point(|&v| v < value)
        } else {
            self.values.partition_point(|&v| v > value)
        };
        let mut best: Option<(usize, f64)> = None;
        for idx in [pos.wrapping_sub(1), pos] {
            if let Some(&v) = self.values.get(idx) {
                let dist = (v - value).abs();
                if best.is_none_or(|(_, d)| dist < d) {
                    best = Some((idx, dist));
                }
            }
        }
        best.filter(|&(_, d)| d <= tolerance).map(|(i, _)| i)
    }

    /// Index of the coordinate nearest to `value` with no tolerance limit
    pub fn nearest_unbounded(&self, value: f64) -> Option<usize> {
        self.nearest(value, f64::INFINITY)
    }

    /// Smallest spacing between neighbouring coordinates (infinite for a single value)
    pub fn min_spacing(&self) -> f64 {
        self.values
            .windows(2)
            .map(|w| (w[1] - w[0]).abs())
            .fold(f64::INFINITY, f64::min)
    }
}

/// How row coordinates are matched to grid cells on re-embedding
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum CoordinateMatch {
    /// Bit-for-bit equality with an axis value
    Exact,
    /// Nearest axis value within `tolerance` (in axis units)
    Nearest {
        /// Maximum accepted distance
        tolerance: f64,
    },
}

impl Default for CoordinateMatch {
    fn default() -> Self {
        Self::Nearest { tolerance: 1e-6 }
    }
}

/// Write per-row `values` into a NaN-initialised `lat x lon` grid
///
/// Rows whose coordinates find no cell under `mode` are skipped. Returns the
/// grid and the number of skipped rows.
pub fn embed_rows(
    lat_axis: &Axis,
    lon_axis: &Axis,
    lats: &[f64],
    lons: &[f64],
    values: &[f64],
    mode: CoordinateMatch,
) -> (Vec<f64>, usize) {
    let n_lon = lon_axis.len();
    let mut grid = vec![f64::NAN; lat_axis.len() * n_lon];
    let mut skipped = 0usize;

    let locate: Box<dyn Fn(f64, f64) -> Option<(usize, usize)> + '_> = match mode {
        CoordinateMatch::Exact => {
            let lat_index = lat_axis.exact_index();
            let lon_index = lon_axis.exact_index();
            Box::new(move |la: f64, lo: f64| {
                Some((*lat_index.get(&la.to_bits())?, *lon_index.get(&lo.to_bits())?))
            })
        }
        CoordinateMatch::Nearest { tolerance } => Box::new(move |la: f64, lo: f64| {
            Some((
                lat_axis.nearest(la, tolerance)?,
                lon_axis.nearest(lo, tolerance)?,
            ))
        }),
    };

    for ((&la, &lo), &val) in lats.iter().zip(lons).zip(values) {
        match locate(la, lo) {
            Some((i, j)) => grid[i * n_lon + j] = val,
            None => skipped += 1,
        }
    }

    if skipped > 0 {
        debug!(
            "Re-embedding skipped {} of {} rows with no matching cell ({:?})",
            skipped,
            values.len(),
            mode
        );
    }

    (grid, skipped)
}
