use crate::error::{with_last_error_mut, DefaultTwinError, FfiError, TwinErrorCode};
use crate::instance::TwinDataset;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;

/// Set the thread-local error message and code.
/// Accepts any type implementing the `FfiError` trait.
pub(crate) fn set_last_error(error: &impl FfiError) {
    with_last_error_mut(|(cstring, code)| {
        *cstring = CString::new(error.msg()).ok();
        *code = error.code();
    });
}

/// Track an error by setting it in thread-local storage and returning its code.
#[inline]
pub(crate) fn track_error(error: &impl FfiError) -> TwinErrorCode {
    set_last_error(error);
    error.code()
}

/// Record the error of a failed result and hand back its code.
pub(crate) fn track_result<T>(result: Result<T, DefaultTwinError>) -> Result<T, TwinErrorCode> {
    result.map_err(|error| track_error(&error))
}

/// Clear the thread-local error message and code.
/// Called on successful operations.
pub(crate) fn clear_last_error() {
    with_last_error_mut(|(cstring, code)| {
        *cstring = None;
        *code = TwinErrorCode::Ok;
    });
}

/// Run an FFI body, translating its outcome into an error code.
///
/// Success clears the last error; failure records it.
pub(crate) fn handle_ffi_result_error<F>(body: F) -> TwinErrorCode
where
    F: FnOnce() -> Result<(), DefaultTwinError>,
{
    match body() {
        Ok(()) => {
            clear_last_error();
            TwinErrorCode::Ok
        }
        Err(error) => track_error(&error),
    }
}

/// Borrow the dataset behind an opaque handle.
///
/// # Safety
///
/// `ptr` must be null or a live pointer returned by `twin_dataset_open`.
pub(crate) unsafe fn dataset_from_ptr<'a>(
    ptr: *const TwinDataset,
) -> Result<&'a TwinDataset, DefaultTwinError> {
    // SAFETY: non-null handles come from Box::into_raw in twin_dataset_open
    unsafe { ptr.as_ref() }.ok_or_else(|| DefaultTwinError::null_pointer("ptr"))
}

/// Borrow a UTF-8 string argument.
///
/// # Safety
///
/// `ptr` must be null or point to a null-terminated string that outlives the call.
pub(crate) unsafe fn str_from_ptr<'a>(
    ptr: *const c_char,
    param_name: &str,
) -> Result<&'a str, DefaultTwinError> {
    if ptr.is_null() {
        return Err(DefaultTwinError::null_pointer(param_name));
    }
    // SAFETY: checked non-null above, termination is the caller's contract
    unsafe { CStr::from_ptr(ptr) }
        .to_str()
        .map_err(|_| DefaultTwinError::invalid_string(param_name))
}

/// Copy `values` into a caller buffer of `capacity` elements.
///
/// The required length is always written to `out_len`. A null `out_values`
/// is a length query and succeeds without copying.
///
/// # Safety
///
/// `out_len` must be valid for writes. `out_values`, if non-null, must be
/// valid for `capacity` writes.
pub(crate) unsafe fn copy_to_buffer(
    values: &[f64],
    out_values: *mut f64,
    capacity: usize,
    out_len: *mut usize,
) -> Result<(), DefaultTwinError> {
    unsafe {
        *out_len = values.len();
    }
    if out_values.is_null() {
        return Ok(());
    }
    if capacity < values.len() {
        return Err(DefaultTwinError::buffer_too_small(values.len(), capacity));
    }
    // SAFETY: the caller guarantees `capacity` writable slots and we write fewer
    unsafe {
        std::ptr::copy_nonoverlapping(values.as_ptr(), out_values, values.len());
    }
    Ok(())
}
