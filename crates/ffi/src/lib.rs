//! C ABI over persisted twin datasets
//!
//! Read-only queries for the dashboard: open a dataset written by the pipeline,
//! read whole fields, summary statistics and latitude cross-sections. Every
//! function returns a [`TwinErrorCode`]; details of the last failure on the
//! calling thread are available from [`twin_get_last_error`].

mod error;
mod helpers;
mod instance;
mod queries;

pub use error::{twin_get_last_error, twin_get_last_error_code, TwinErrorCode};
pub use instance::{twin_dataset_destroy, twin_dataset_open, TwinDataset};
pub use queries::{
    twin_cross_section, twin_dataset_dimensions, twin_field_read, twin_field_stats, FieldStats,
};

#[cfg(test)]
mod tests {
    use super::*;
    use seagrass_twin_core::grid::synthetic::reference_bay;
    use seagrass_twin_core::Variable;
    use std::ffi::{CStr, CString};
    use std::path::PathBuf;
    use std::ptr;

    struct Opened {
        handle: *mut TwinDataset,
        path: PathBuf,
    }

    impl Drop for Opened {
        fn drop(&mut self) {
            unsafe { twin_dataset_destroy(self.handle) };
            let _ = std::fs::remove_file(&self.path);
        }
    }

    fn open_bay(tag: &str) -> Opened {
        let path = std::env::temp_dir().join(format!("twin-ffi-{tag}-{}.json", std::process::id()));
        reference_bay(6, 8, 11).unwrap().save(&path).unwrap();
        let c_path = CString::new(path.to_str().unwrap()).unwrap();
        let mut handle = ptr::null_mut();
        let code = unsafe { twin_dataset_open(c_path.as_ptr(), &mut handle) };
        assert_eq!(code, TwinErrorCode::Ok);
        assert!(!handle.is_null());
        Opened { handle, path }
    }

    #[test]
    fn test_dimensions() {
        let ds = open_bay("dims");
        let (mut n_lat, mut n_lon, mut n_fields) = (0, 0, 0);
        let code =
            unsafe { twin_dataset_dimensions(ds.handle, &mut n_lat, &mut n_lon, &mut n_fields) };
        assert_eq!(code, TwinErrorCode::Ok);
        assert_eq!((n_lat, n_lon), (6, 8));
        assert!(n_fields >= 6);
    }

    #[test]
    fn test_field_read_with_length_query() {
        let ds = open_bay("read");
        let name = CString::new(Variable::Depth.name()).unwrap();

        let mut len = 0;
        let code =
            unsafe { twin_field_read(ds.handle, name.as_ptr(), ptr::null_mut(), 0, &mut len) };
        assert_eq!(code, TwinErrorCode::Ok);
        assert_eq!(len, 48);

        let mut values = vec![0.0; len];
        let code = unsafe {
            twin_field_read(ds.handle, name.as_ptr(), values.as_mut_ptr(), values.len(), &mut len)
        };
        assert_eq!(code, TwinErrorCode::Ok);
        let expected = reference_bay(6, 8, 11).unwrap();
        let expected = expected.values(Variable::Depth).unwrap();
        for (a, b) in values.iter().zip(expected) {
            assert_eq!(a.is_nan(), b.is_nan());
            if b.is_finite() {
                assert!((a - b).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn test_short_buffer_reports_required_length() {
        let ds = open_bay("short");
        let name = CString::new(Variable::Kd490.name()).unwrap();
        let mut values = [0.0; 4];
        let mut len = 0;
        let code = unsafe {
            twin_field_read(ds.handle, name.as_ptr(), values.as_mut_ptr(), values.len(), &mut len)
        };
        assert_eq!(code, TwinErrorCode::BufferTooSmall);
        assert_eq!(len, 48);
        assert_eq!(twin_get_last_error_code(), TwinErrorCode::BufferTooSmall);
    }

    #[test]
    fn test_field_stats_match_core() {
        let ds = open_bay("stats");
        let name = CString::new(Variable::Kd490.name()).unwrap();
        let mut stats = FieldStats::from(seagrass_twin_core::core_types::stats::Describe::of(&[]));
        let code = unsafe { twin_field_stats(ds.handle, name.as_ptr(), &mut stats) };
        assert_eq!(code, TwinErrorCode::Ok);
        assert!(stats.count > 0);
        assert!(stats.min <= stats.median && stats.median <= stats.max);
    }

    #[test]
    fn test_cross_section() {
        let ds = open_bay("section");
        let name = CString::new(Variable::Depth.name()).unwrap();
        let mut lon = [0.0; 8];
        let mut values = [0.0; 8];
        let mut len = 0;
        let code = unsafe {
            twin_cross_section(
                ds.handle,
                name.as_ptr(),
                0.0,
                lon.as_mut_ptr(),
                values.as_mut_ptr(),
                8,
                &mut len,
            )
        };
        assert_eq!(code, TwinErrorCode::Ok);
        assert_eq!(len, 8);
        assert!(lon.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_unknown_field_sets_last_error() {
        let ds = open_bay("unknown");
        let name = CString::new("salinity").unwrap();
        let mut len = 0;
        let code =
            unsafe { twin_field_read(ds.handle, name.as_ptr(), ptr::null_mut(), 0, &mut len) };
        assert_eq!(code, TwinErrorCode::UnknownField);
        let msg = unsafe { CStr::from_ptr(twin_get_last_error()) };
        assert!(msg.to_str().unwrap().contains("salinity"));
    }

    #[test]
    fn test_open_missing_file() {
        let path = CString::new("/nonexistent/twin.json").unwrap();
        let mut handle = ptr::null_mut();
        let code = unsafe { twin_dataset_open(path.as_ptr(), &mut handle) };
        assert_eq!(code, TwinErrorCode::DatasetLoad);
        assert!(handle.is_null());
        assert!(!twin_get_last_error().is_null());
    }

    #[test]
    fn test_null_arguments() {
        let mut len = 0;
        let code = unsafe { twin_field_read(ptr::null(), ptr::null(), ptr::null_mut(), 0, &mut len) };
        assert_eq!(code, TwinErrorCode::NullPointer);

        let code = unsafe { twin_dataset_open(ptr::null(), ptr::null_mut()) };
        assert_eq!(code, TwinErrorCode::NullPointer);

        // Destroying null is a no-op
        unsafe { twin_dataset_destroy(ptr::null_mut()) };
    }
}
