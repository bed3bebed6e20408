use seagrass_twin_core::TwinError;
use std::cell::RefCell;
use std::ffi::CString;
use std::os::raw::c_char;
use std::ptr;

/// Common interface for errors crossing the FFI boundary.
///
/// - `code()` - the error code handed back to the caller
/// - `msg()` - the diagnostic message stored for `twin_get_last_error`
pub(crate) trait FfiError {
    /// Returns the error code to be returned across the FFI boundary.
    fn code(&self) -> TwinErrorCode;

    /// Returns the human-readable error message.
    fn msg(&self) -> &str;
}

/// Default implementation of `FfiError` for the dashboard query surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DefaultTwinError {
    code: TwinErrorCode,
    msg: String,
}

impl DefaultTwinError {
    /// Create error for null pointer passed where non-null required.
    ///
    /// # Arguments
    /// * `param_name` - The name of the parameter that was null (e.g., `"out_dataset"`, `"name"`)
    pub fn null_pointer(param_name: &str) -> Self {
        Self {
            code: TwinErrorCode::NullPointer,
            msg: format!("Parameter '{param_name}' cannot be null"),
        }
    }

    /// Create error for a C string argument that is not valid UTF-8.
    pub fn invalid_string(param_name: &str) -> Self {
        Self {
            code: TwinErrorCode::InvalidString,
            msg: format!("Parameter '{param_name}' is not valid UTF-8"),
        }
    }

    /// Create error for a caller buffer that cannot hold the result.
    ///
    /// # Arguments
    /// * `required` - Number of elements the caller must provide
    /// * `capacity` - Number of elements the caller provided
    pub fn buffer_too_small(required: usize, capacity: usize) -> Self {
        Self {
            code: TwinErrorCode::BufferTooSmall,
            msg: format!("Buffer holds {capacity} values, {required} required"),
        }
    }
}

impl From<TwinError> for DefaultTwinError {
    fn from(error: TwinError) -> Self {
        let code = match &error {
            TwinError::Io { .. } | TwinError::Json(_) => TwinErrorCode::DatasetLoad,
            TwinError::UnknownField(_) | TwinError::MissingField { .. } => {
                TwinErrorCode::UnknownField
            }
            TwinError::InvalidAxis { .. } | TwinError::ShapeMismatch { .. } => {
                TwinErrorCode::InvalidDataset
            }
            _ => TwinErrorCode::InvalidParameter,
        };
        Self {
            code,
            msg: error.to_string(),
        }
    }
}

impl FfiError for DefaultTwinError {
    fn code(&self) -> TwinErrorCode {
        self.code
    }

    fn msg(&self) -> &str {
        &self.msg
    }
}

/// FFI error codes returned by the twin query functions.
/// Follows standard C convention: 0 = success, non-zero = error.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TwinErrorCode {
    /// Operation completed successfully.
    Ok = 0,

    /// Invalid pointer: null pointer passed where non-null required.
    NullPointer = 1,

    /// A string argument is not valid UTF-8.
    InvalidString = 2,

    /// The dataset file could not be read or parsed.
    DatasetLoad = 3,

    /// The dataset file parsed but its axes or fields are inconsistent.
    InvalidDataset = 4,

    /// The named field does not exist in the dataset.
    UnknownField = 5,

    /// The caller-provided buffer is too small; the required length is reported.
    BufferTooSmall = 6,

    /// Invalid parameter passed to function.
    InvalidParameter = 7,
}

impl From<DefaultTwinError> for TwinErrorCode {
    fn from(error: DefaultTwinError) -> Self {
        error.code
    }
}

thread_local! {
    /// Thread-local storage for the most recent FFI error (C string, error code).
    /// The CString is owned here so the pointer handed out stays valid until the next error.
    static LAST_ERROR: RefCell<(Option<CString>, TwinErrorCode)> = const { RefCell::new((None, TwinErrorCode::Ok)) };
}

/// Internal helper to read `LAST_ERROR` thread-local storage (cstring, code).
pub(crate) fn with_last_error<F, R>(f: F) -> R
where
    F: FnOnce(&(Option<CString>, TwinErrorCode)) -> R,
{
    LAST_ERROR.with_borrow(f)
}

/// Internal helper to mutate `LAST_ERROR` thread-local storage (cstring, code).
pub(crate) fn with_last_error_mut<F, R>(f: F) -> R
where
    F: FnOnce(&mut (Option<CString>, TwinErrorCode)) -> R,
{
    LAST_ERROR.with_borrow_mut(f)
}

/// Retrieve the most recent FFI error message as a null-terminated C string.
///
/// Returns:
/// - A borrowed pointer to the error message if an error occurred.
/// - `null` if no error has occurred on this thread.
///
/// # Thread Safety
/// Error messages are stored per-thread, so each thread has its own independent error state.
///
/// # Lifetime
/// The returned pointer is valid until the next FFI call on this thread that sets
/// or clears the error.
///
/// **DO NOT FREE THIS POINTER** - it is managed internally.
///
/// Example:
/// ```cpp
/// TwinDataset* ds = nullptr;
/// if (twin_dataset_open("out/step4_uncertainty.json", &ds) != TwinErrorCode::Ok) {
///     const char* error = twin_get_last_error();
///     if (error) {
///         printf("Could not open dataset: %s\n", error);
///     }
/// }
/// ```
#[no_mangle]
pub extern "C" fn twin_get_last_error() -> *const c_char {
    with_last_error(|(cstring, _code)| cstring.as_ref().map_or(ptr::null(), |cs| cs.as_ptr()))
}

/// Retrieve the most recent FFI error code.
///
/// Returns `TwinErrorCode::Ok` (0) if no error has occurred, otherwise the code
/// of the last failed operation on this thread.
#[no_mangle]
pub extern "C" fn twin_get_last_error_code() -> TwinErrorCode {
    with_last_error(|(_cstring, code)| *code)
}
