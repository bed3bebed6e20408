//! Deterministic synthetic data sources
//!
//! Stand-ins for the remote optical, radiation and bathymetry products. The
//! reference bay is a bowl-shaped lagoon over the Greifswalder Bodden
//! bounding box with land in the corners, water turbidity falling off with
//! depth, and secondary optical coefficients tied to `KD490`.

use crate::core_types::seed::{stream_rng, streams};
use crate::error::{Result, TwinError};
use crate::grid::coords::Axis;
use crate::grid::dataset::{FieldMeta, GridDataset};
use crate::grid::schema::Variable;
use rand_distr::{Distribution, Normal};

/// Latitude bounds of the reference area of interest
pub const AOI_LAT: (f64, f64) = (54.0, 54.4);
/// Longitude bounds of the reference area of interest
pub const AOI_LON: (f64, f64) = (13.3, 13.7);

/// Surface PAR used by the reference bay (E m-2 d-1)
const REFERENCE_PAR: f64 = 42.0;

/// Synthetic bay over the reference bounding box
///
/// Land cells (elevation >= 0) are already masked to NaN in `depth` and in every
/// optical field, as a retrieval step would deliver them.
///
/// # Errors
///
/// [`TwinError::InvalidAxis`] if either dimension is zero.
pub fn reference_bay(n_lat: usize, n_lon: usize, seed: u64) -> Result<GridDataset> {
    let lat = Axis::linspace("lat", AOI_LAT.0, AOI_LAT.1, n_lat)?;
    let lon = Axis::linspace("lon", AOI_LON.0, AOI_LON.1, n_lon)?;
    let mut ds = GridDataset::new(lat, lon);

    let mut rng = stream_rng(seed, streams::SYNTHETIC);
    let depth_noise = Normal::new(0.0, 0.3).map_err(|e| TwinError::InvalidConfig(e.to_string()))?;
    let optic_noise = Normal::new(0.0, 0.01).map_err(|e| TwinError::InvalidConfig(e.to_string()))?;

    let lat_mid = 0.5 * (AOI_LAT.0 + AOI_LAT.1);
    let lon_mid = 0.5 * (AOI_LON.0 + AOI_LON.1);
    let half = 0.5 * (AOI_LAT.1 - AOI_LAT.0);

    let n = ds.n_cells();
    let mut elevation = Vec::with_capacity(n);
    for cell in 0..n {
        let (la, lo) = ds.cell_coordinates(cell);
        let u = (la - lat_mid) / half;
        let v = (lo - lon_mid) / half;
        let r2 = (u * u + v * v) / 1.6;
        let z = if r2 > 1.0 {
            0.5 + 2.0 * (r2 - 1.0)
        } else {
            (-(0.5 + 15.0 * (1.0 - r2)) + depth_noise.sample(&mut rng)).min(-0.1)
        };
        elevation.push(z);
    }

    let mut kd = Vec::with_capacity(n);
    let mut adg = Vec::with_capacity(n);
    let mut aph = Vec::with_capacity(n);
    let mut bbp = Vec::with_capacity(n);
    for &z in &elevation {
        if z >= 0.0 {
            kd.push(f64::NAN);
            adg.push(f64::NAN);
            aph.push(f64::NAN);
            bbp.push(f64::NAN);
            continue;
        }
        let k = (0.6 + 0.025 * z + optic_noise.sample(&mut rng)).max(0.05);
        kd.push(k);
        adg.push(0.3 * k + 0.5 * optic_noise.sample(&mut rng));
        aph.push(0.05 + 0.2 * k + 0.2 * optic_noise.sample(&mut rng));
        bbp.push(0.01 + 0.04 * k + 0.05 * optic_noise.sample(&mut rng));
    }

    ds.insert_values(Variable::Kd490, kd)?;
    ds.insert_values(Variable::Adg443, adg)?;
    ds.insert_values(Variable::Aph443, aph)?;
    ds.insert_values(Variable::Bbp443, bbp)?;
    ds.insert_scalar(Variable::ParSurface, REFERENCE_PAR);
    ds.insert_values(Variable::Depth, elevation)?;
    mask_land(&mut ds);

    ds.set_attr("AOI", "Greifswalder Bodden");
    ds.set_attr("source", "synthetic reference bay");
    ds.set_attr("seed", seed.to_string());
    Ok(ds)
}

/// The uniform 10 x 10 scenario grid
///
/// `KD490` is 0.2 and `PAR_surface` 20 everywhere; `depth` runs linearly from
/// -1 to -20 over the cells in row-major order. The remaining optical fields are
/// uniform so the learning stages have their inputs.
///
/// # Errors
///
/// Never in practice; the axes are fixed and valid.
pub fn uniform_scenario() -> Result<GridDataset> {
    let lat = Axis::linspace("lat", AOI_LAT.0, AOI_LAT.1, 10)?;
    let lon = Axis::linspace("lon", AOI_LON.0, AOI_LON.1, 10)?;
    let mut ds = GridDataset::new(lat, lon);
    let n = ds.n_cells();

    let depth: Vec<f64> = (0..n)
        .map(|i| -1.0 - 19.0 * i as f64 / (n - 1) as f64)
        .collect();
    ds.insert_scalar(Variable::Kd490, 0.2);
    ds.insert_scalar(Variable::Adg443, 0.06);
    ds.insert_scalar(Variable::Aph443, 0.09);
    ds.insert_scalar(Variable::Bbp443, 0.018);
    ds.insert_scalar(Variable::ParSurface, 20.0);
    ds.insert_values(Variable::Depth, depth)?;
    ds.set_attr("source", "uniform scenario");
    Ok(ds)
}

/// Mask land: `depth >= 0` becomes NaN, with a comment on the field
pub fn mask_land(ds: &mut GridDataset) {
    let Some(field) = ds.fields.get_mut(Variable::Depth.name()) else {
        return;
    };
    let mut masked = 0usize;
    for v in field.values_mut() {
        if *v >= 0.0 {
            *v = f64::NAN;
            masked += 1;
        }
    }
    field.set_meta(FieldMeta::for_variable(Variable::Depth).with_comment("Positive values masked (land)"));
    tracing::debug!("Masked {} land cells", masked);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_bay_is_deterministic() {
        let a = reference_bay(12, 12, 7).unwrap();
        let b = reference_bay(12, 12, 7).unwrap();
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }

    #[test]
    fn test_reference_bay_masks_corners() {
        let ds = reference_bay(12, 12, 42).unwrap();
        let depth = ds.values(Variable::Depth).unwrap();
        let kd = ds.values(Variable::Kd490).unwrap();
        assert!(depth[0].is_nan());
        assert!(kd[0].is_nan());
        let centre = ds.flat_index(6, 6);
        assert!(depth[centre] < -10.0);
        assert!(depth.iter().all(|d| d.is_nan() || *d < 0.0));
    }

    #[test]
    fn test_uniform_scenario_depth_range() {
        let ds = uniform_scenario().unwrap();
        let depth = ds.values(Variable::Depth).unwrap();
        assert_eq!(depth.len(), 100);
        assert_eq!(depth[0], -1.0);
        assert!((depth[99] + 20.0).abs() < 1e-12);
    }

    #[test]
    fn test_mask_land_comment() {
        let mut ds = uniform_scenario().unwrap();
        mask_land(&mut ds);
        let meta = ds.get("depth").unwrap().meta();
        assert!(meta.comment.contains("land"));
    }
}
