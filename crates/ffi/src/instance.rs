use seagrass_twin_core::GridDataset;
use std::os::raw::c_char;
use std::ptr;

use crate::error::{DefaultTwinError, TwinErrorCode};
use crate::helpers::{clear_last_error, str_from_ptr, track_error, track_result};

/// A pipeline dataset opened for dashboard queries.
///
/// # Thread Safety
/// The dataset is never mutated after `twin_dataset_open`, so every query takes
/// a shared borrow and a handle may be used from any number of threads at once
/// without locking.
pub struct TwinDataset {
    pub(crate) dataset: GridDataset,
}

impl TwinDataset {
    /// Load a dataset written by the pipeline (`step2_physics.json` and later).
    ///
    /// # Errors
    ///
    /// Returns `TwinErrorCode::DatasetLoad` if the file cannot be read or parsed.
    pub(crate) fn open(path: &str) -> Result<Box<Self>, DefaultTwinError> {
        let dataset = GridDataset::load(path)?;
        Ok(Box::new(Self { dataset }))
    }
}

/// Open a persisted dataset and return a handle via out-parameter.
///
/// Returns
/// - `TwinErrorCode::Ok` (0) on success, `out_dataset` holds the handle
/// - `TwinErrorCode::NullPointer` if `path` or `out_dataset` is null
/// - `TwinErrorCode::InvalidString` if `path` is not UTF-8
/// - `TwinErrorCode::DatasetLoad` if the file cannot be read or parsed
///
/// On failure `out_dataset` is set to null and `twin_get_last_error()` describes why.
///
/// # Safety
///
/// - `path` must be a null-terminated string.
/// - `out_dataset` must be a valid pointer to writable memory.
/// - The caller owns the handle and MUST release it with `twin_dataset_destroy` exactly once.
///
/// Example (C++)
/// ```cpp
/// TwinDataset* ds = nullptr;
/// if (twin_dataset_open("out/step4_uncertainty.json", &ds) != TwinErrorCode::Ok) {
///     fprintf(stderr, "%s\n", twin_get_last_error());
///     return;
/// }
/// // ... query ds ...
/// twin_dataset_destroy(ds);
/// ```
#[no_mangle]
pub unsafe extern "C" fn twin_dataset_open(
    path: *const c_char,
    out_dataset: *mut *mut TwinDataset,
) -> TwinErrorCode {
    if out_dataset.is_null() {
        return track_error(&DefaultTwinError::null_pointer("out_dataset"));
    }

    let opened = unsafe { str_from_ptr(path, "path") }.and_then(TwinDataset::open);
    match track_result(opened) {
        Ok(dataset) => {
            unsafe {
                *out_dataset = Box::into_raw(dataset);
            }
            clear_last_error();
            TwinErrorCode::Ok
        }
        Err(code) => {
            unsafe {
                *out_dataset = ptr::null_mut();
            }
            code
        }
    }
}

/// Release a handle returned by `twin_dataset_open`.
///
/// A null `ptr` is a no-op.
///
/// # Safety
///
/// - The pointer MUST have been created by `twin_dataset_open` and not freed already.
/// - The caller must not use the pointer afterwards.
#[no_mangle]
pub unsafe extern "C" fn twin_dataset_destroy(ptr: *mut TwinDataset) {
    if ptr.is_null() {
        return;
    }

    // SAFETY: created by Box::into_raw in twin_dataset_open and not yet freed
    unsafe {
        drop(Box::from_raw(ptr));
    }
}
