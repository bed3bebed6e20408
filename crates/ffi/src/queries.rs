use seagrass_twin_core::core_types::stats::Describe;
use seagrass_twin_core::{Field, TwinError};
use std::os::raw::c_char;

use crate::error::{DefaultTwinError, TwinErrorCode};
use crate::helpers::{
    copy_to_buffer, dataset_from_ptr, handle_ffi_result_error, str_from_ptr, track_error,
};
use crate::instance::TwinDataset;

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
/// Descriptive statistics of one field over its finite cells.
/// Keep this layout stable for dashboard consumers.
pub struct FieldStats {
    /// Number of finite values.
    pub count: usize,
    /// Mean.
    pub mean: f64,
    /// Sample standard deviation.
    pub std: f64,
    /// Minimum.
    pub min: f64,
    /// 25th percentile.
    pub q25: f64,
    /// Median.
    pub median: f64,
    /// 75th percentile.
    pub q75: f64,
    /// Maximum.
    pub max: f64,
}

impl From<Describe> for FieldStats {
    fn from(d: Describe) -> Self {
        Self {
            count: d.count,
            mean: d.mean,
            std: d.std,
            min: d.min,
            q25: d.q25,
            median: d.q50,
            q75: d.q75,
            max: d.max,
        }
    }
}

fn lookup<'a>(dataset: &'a TwinDataset, name: &str) -> Result<&'a Field, DefaultTwinError> {
    dataset
        .dataset
        .get(name)
        .ok_or_else(|| TwinError::UnknownField(name.to_string()).into())
}

#[no_mangle]
/// Report the grid shape of an open dataset.
///
/// Returns
/// - `TwinErrorCode::Ok` (0) on success
/// - `TwinErrorCode::NullPointer` if any pointer is null
///
/// # Safety
///
/// - `ptr` must be a live handle from `twin_dataset_open` or null.
/// - `out_n_lat`, `out_n_lon` and `out_n_fields` must be valid for writes.
pub unsafe extern "C" fn twin_dataset_dimensions(
    ptr: *const TwinDataset,
    out_n_lat: *mut usize,
    out_n_lon: *mut usize,
    out_n_fields: *mut usize,
) -> TwinErrorCode {
    if out_n_lat.is_null() {
        return track_error(&DefaultTwinError::null_pointer("out_n_lat"));
    }
    if out_n_lon.is_null() {
        return track_error(&DefaultTwinError::null_pointer("out_n_lon"));
    }
    if out_n_fields.is_null() {
        return track_error(&DefaultTwinError::null_pointer("out_n_fields"));
    }

    handle_ffi_result_error(|| {
        let handle = unsafe { dataset_from_ptr(ptr) }?;
        let (n_lat, n_lon) = handle.dataset.shape();
        unsafe {
            *out_n_lat = n_lat;
            *out_n_lon = n_lon;
            *out_n_fields = handle.dataset.field_names().count();
        }
        Ok(())
    })
}

#[no_mangle]
/// Copy the values of field `name` into a caller buffer.
///
/// Values are row-major `lat x lon` (latitude outer); missing cells are NaN.
/// The required length is always written to `out_len`. Passing a null
/// `out_values` only queries that length.
///
/// Returns
/// - `TwinErrorCode::Ok` (0) on success
/// - `TwinErrorCode::NullPointer` if `ptr`, `name` or `out_len` is null
/// - `TwinErrorCode::UnknownField` if the dataset has no such field
/// - `TwinErrorCode::BufferTooSmall` if `capacity` is below `*out_len`
///
/// # Safety
///
/// - `ptr` must be a live handle from `twin_dataset_open` or null.
/// - `name` must be a null-terminated string.
/// - `out_values`, if non-null, must be valid for `capacity` writes.
/// - `out_len` must be valid for writes.
///
/// # Example Usage (C++)
/// ```cpp
/// size_t len = 0;
/// twin_field_read(ds, "SSI_ML", nullptr, 0, &len);
/// std::vector<double> ssi(len);
/// twin_field_read(ds, "SSI_ML", ssi.data(), ssi.size(), &len);
/// ```
pub unsafe extern "C" fn twin_field_read(
    ptr: *const TwinDataset,
    name: *const c_char,
    out_values: *mut f64,
    capacity: usize,
    out_len: *mut usize,
) -> TwinErrorCode {
    if out_len.is_null() {
        return track_error(&DefaultTwinError::null_pointer("out_len"));
    }

    handle_ffi_result_error(|| {
        let handle = unsafe { dataset_from_ptr(ptr) }?;
        let name = unsafe { str_from_ptr(name, "name") }?;
        let field = lookup(handle, name)?;
        unsafe { copy_to_buffer(field.values(), out_values, capacity, out_len) }
    })
}

#[no_mangle]
/// Fill `out_stats` with descriptive statistics of field `name`.
///
/// A field without finite values reports `count = 0` and NaN elsewhere.
///
/// Returns
/// - `TwinErrorCode::Ok` (0) on success
/// - `TwinErrorCode::NullPointer` if `ptr`, `name` or `out_stats` is null
/// - `TwinErrorCode::UnknownField` if the dataset has no such field
///
/// # Safety
///
/// - `ptr` must be a live handle from `twin_dataset_open` or null.
/// - `name` must be a null-terminated string.
/// - `out_stats` must be valid for writes.
pub unsafe extern "C" fn twin_field_stats(
    ptr: *const TwinDataset,
    name: *const c_char,
    out_stats: *mut FieldStats,
) -> TwinErrorCode {
    if out_stats.is_null() {
        return track_error(&DefaultTwinError::null_pointer("out_stats"));
    }

    handle_ffi_result_error(|| {
        let handle = unsafe { dataset_from_ptr(ptr) }?;
        let name = unsafe { str_from_ptr(name, "name") }?;
        let stats = FieldStats::from(Describe::of(lookup(handle, name)?.values()));
        unsafe {
            *out_stats = stats;
        }
        Ok(())
    })
}

#[no_mangle]
/// Sample field `name` along the latitude row nearest to `lat`.
///
/// Writes longitudes to `out_lon` and the matching values to `out_values`,
/// one entry per longitude cell. Both buffers share `capacity`; passing null
/// for both only queries the length.
///
/// Returns
/// - `TwinErrorCode::Ok` (0) on success
/// - `TwinErrorCode::NullPointer` if `ptr`, `name` or `out_len` is null, or
///   exactly one of the output buffers is null
/// - `TwinErrorCode::UnknownField` if the field is absent or still temporal
/// - `TwinErrorCode::BufferTooSmall` if `capacity` is below `*out_len`
///
/// # Safety
///
/// - `ptr` must be a live handle from `twin_dataset_open` or null.
/// - `name` must be a null-terminated string.
/// - `out_lon` and `out_values`, if non-null, must each be valid for `capacity` writes.
/// - `out_len` must be valid for writes.
pub unsafe extern "C" fn twin_cross_section(
    ptr: *const TwinDataset,
    name: *const c_char,
    lat: f64,
    out_lon: *mut f64,
    out_values: *mut f64,
    capacity: usize,
    out_len: *mut usize,
) -> TwinErrorCode {
    if out_len.is_null() {
        return track_error(&DefaultTwinError::null_pointer("out_len"));
    }
    if out_lon.is_null() != out_values.is_null() {
        let missing = if out_lon.is_null() { "out_lon" } else { "out_values" };
        return track_error(&DefaultTwinError::null_pointer(missing));
    }

    handle_ffi_result_error(|| {
        let handle = unsafe { dataset_from_ptr(ptr) }?;
        let name = unsafe { str_from_ptr(name, "name") }?;
        let section = handle.dataset.cross_section(name, lat)?;
        let (lons, values): (Vec<f64>, Vec<f64>) = section.into_iter().unzip();
        unsafe {
            copy_to_buffer(&lons, out_lon, capacity, out_len)?;
            copy_to_buffer(&values, out_values, capacity, out_len)
        }
    })
}
