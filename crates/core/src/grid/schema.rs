//! Typed field schema and stage-boundary validation
//!
//! Source datasets arrive with whatever names the provider uses (`latitude`,
//! `elevation`, lower-case optical codes). [`harmonize`] maps them onto the
//! canonical names once, at ingestion, and each stage then checks its declared
//! requirements with [`StageSchema::validate`] before touching any data.

use crate::error::{Result, TwinError};
use crate::grid::GridDataset;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Every field the pipeline reads or writes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Variable {
    /// Diffuse attenuation coefficient at 490 nm
    Kd490,
    /// Absorption by detritus and gelbstoff at 443 nm
    Adg443,
    /// Phytoplankton absorption at 443 nm
    Aph443,
    /// Particulate backscattering at 443 nm
    Bbp443,
    /// Photosynthetically active radiation at the surface
    ParSurface,
    /// Signed seabed elevation, negative underwater
    Depth,
    /// Euphotic depth
    Zeu,
    /// PAR reaching the seabed
    ParBed,
    /// Physics-based seagrass suitability index
    Ssi,
    /// Model-predicted suitability index
    SsiMl,
    /// Bootstrapped classifier disagreement
    Uncertainty,
    /// Bottom water temperature driver
    TempBottom,
    /// Nutrient concentration proxy
    Nutrients,
    /// Bottom shear stress proxy
    ShearStress,
}

impl Variable {
    /// All known variables
    pub const ALL: [Variable; 14] = [
        Variable::Kd490,
        Variable::Adg443,
        Variable::Aph443,
        Variable::Bbp443,
        Variable::ParSurface,
        Variable::Depth,
        Variable::Zeu,
        Variable::ParBed,
        Variable::Ssi,
        Variable::SsiMl,
        Variable::Uncertainty,
        Variable::TempBottom,
        Variable::Nutrients,
        Variable::ShearStress,
    ];

    /// The four optical features the learning stages train on
    pub const OPTICS: [Variable; 4] = [
        Variable::Kd490,
        Variable::Adg443,
        Variable::Aph443,
        Variable::Bbp443,
    ];

    /// Auxiliary physical drivers synthesized when absent
    pub const DRIVERS: [Variable; 3] = [
        Variable::TempBottom,
        Variable::Nutrients,
        Variable::ShearStress,
    ];

    /// Canonical field name
    pub const fn name(self) -> &'static str {
        match self {
            Self::Kd490 => "KD490",
            Self::Adg443 => "ADG443",
            Self::Aph443 => "APH443",
            Self::Bbp443 => "BBP443",
            Self::ParSurface => "PAR_surface",
            Self::Depth => "depth",
            Self::Zeu => "Zeu",
            Self::ParBed => "PAR_bed",
            Self::Ssi => "SSI",
            Self::SsiMl => "SSI_ML",
            Self::Uncertainty => "uncertainty",
            Self::TempBottom => "temp_bottom",
            Self::Nutrients => "nutrients",
            Self::ShearStress => "shear_stress",
        }
    }

    /// Units attached as field metadata
    pub const fn units(self) -> &'static str {
        match self {
            Self::Kd490 | Self::Adg443 | Self::Aph443 | Self::Bbp443 => "m-1",
            Self::ParSurface | Self::ParBed => "E m-2 d-1",
            Self::Depth | Self::Zeu => "m",
            Self::Ssi | Self::SsiMl | Self::Uncertainty => "0-1",
            Self::TempBottom => "degC",
            Self::Nutrients => "mmol m-3",
            Self::ShearStress => "Pa",
        }
    }

    /// Human-readable description attached as field metadata
    pub const fn long_name(self) -> &'static str {
        match self {
            Self::Kd490 => "Diffuse attenuation coefficient at 490 nm",
            Self::Adg443 => "Detrital and CDOM absorption at 443 nm",
            Self::Aph443 => "Phytoplankton absorption at 443 nm",
            Self::Bbp443 => "Particulate backscattering at 443 nm",
            Self::ParSurface => "Surface photosynthetically active radiation",
            Self::Depth => "Seafloor elevation",
            Self::Zeu => "Euphotic depth (1% light level)",
            Self::ParBed => "Photosynthetically active radiation at seabed",
            Self::Ssi => "Seagrass Suitability Index (0-1)",
            Self::SsiMl => "Model-predicted Seagrass Suitability Index",
            Self::Uncertainty => "Model uncertainty (bootstrapped std)",
            Self::TempBottom => "Bottom temperature",
            Self::Nutrients => "Nutrient concentration proxy",
            Self::ShearStress => "Bottom shear stress proxy",
        }
    }

    /// Resolve a canonical name or a known provider alias (case-insensitive)
    pub fn from_name(name: &str) -> Option<Self> {
        let lower = name.to_ascii_lowercase();
        let by_alias = match lower.as_str() {
            "kd_490" | "kd490_mean" => Some(Self::Kd490),
            "par" | "par_surf" | "surface_par" => Some(Self::ParSurface),
            "elevation" | "bathymetry" | "seabed_elevation" => Some(Self::Depth),
            "euphotic_depth" => Some(Self::Zeu),
            "ssi_ml" | "ssi_rf" => Some(Self::SsiMl),
            "temperature_bottom" | "bottom_temperature" => Some(Self::TempBottom),
            _ => None,
        };
        by_alias.or_else(|| {
            Self::ALL
                .into_iter()
                .find(|v| v.name().eq_ignore_ascii_case(&lower))
        })
    }
}

impl std::fmt::Display for Variable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Canonical name of a coordinate axis, if `name` is a known alias
fn canonical_axis(name: &str) -> Option<&'static str> {
    match name.to_ascii_lowercase().as_str() {
        "lat" | "latitude" | "y" => Some("lat"),
        "lon" | "longitude" | "x" => Some("lon"),
        "time" | "t" | "date" => Some("time"),
        _ => None,
    }
}

/// Normalize axis and field names once, and collapse any time dimension
///
/// Unknown field names are kept verbatim. Auxiliary fields that are not part
/// of the grid model (such as a `crs` placeholder) are dropped.
///
/// # Errors
///
/// Returns [`TwinError::SchemaConflict`] when two source fields resolve to the same
/// canonical name.
pub fn harmonize(mut ds: GridDataset) -> Result<GridDataset> {
    if let Some(canonical) = canonical_axis(ds.lat.name()) {
        ds.lat.set_name(canonical);
    }
    if let Some(canonical) = canonical_axis(ds.lon.name()) {
        ds.lon.set_name(canonical);
    }
    if let Some(time) = ds.time.as_mut() {
        time.set_name("time");
    }

    let mut renamed = BTreeMap::new();
    let mut origin: BTreeMap<String, String> = BTreeMap::new();
    for (name, field) in std::mem::take(&mut ds.fields) {
        if name.eq_ignore_ascii_case("crs") {
            debug!("Dropping auxiliary field '{}'", name);
            continue;
        }
        let canonical = Variable::from_name(&name).map_or_else(|| name.clone(), |v| v.name().to_string());
        if let Some(first) = origin.get(&canonical) {
            return Err(TwinError::SchemaConflict {
                first: first.clone(),
                second: name,
                canonical,
            });
        }
        if canonical != name {
            debug!("Harmonized field '{}' -> '{}'", name, canonical);
        }
        origin.insert(canonical.clone(), name);
        renamed.insert(canonical, field);
    }
    ds.fields = renamed;
    ds.collapse_time();
    Ok(ds)
}

/// Declared inputs of one pipeline stage
#[derive(Debug, Clone, Copy)]
pub struct StageSchema {
    /// Stage name used in errors and logs
    pub stage: &'static str,
    /// Fields that must be present before the stage runs
    pub required: &'static [Variable],
}

impl StageSchema {
    /// Fail fast if any required field is missing or still temporal
    ///
    /// # Errors
    ///
    /// [`TwinError::MissingField`] for the first absent field,
    /// [`TwinError::ShapeMismatch`] for a field that still carries a time axis.
    pub fn validate(&self, ds: &GridDataset) -> Result<()> {
        for var in self.required {
            ds.require(self.stage, *var)?;
        }
        Ok(())
    }
}

/// Inputs of the suitability engine
pub const SUITABILITY: StageSchema = StageSchema {
    stage: "suitability",
    required: &[Variable::Kd490, Variable::ParSurface, Variable::Depth],
};

/// Inputs of the predictive refinement stage
pub const REFINEMENT: StageSchema = StageSchema {
    stage: "refinement",
    required: &[
        Variable::Kd490,
        Variable::Adg443,
        Variable::Aph443,
        Variable::Bbp443,
        Variable::Ssi,
    ],
};

/// Inputs of the uncertainty estimator (drivers are synthesized when absent)
pub const UNCERTAINTY: StageSchema = StageSchema {
    stage: "uncertainty",
    required: &[
        Variable::Kd490,
        Variable::Adg443,
        Variable::Aph443,
        Variable::Bbp443,
        Variable::Depth,
        Variable::Ssi,
    ],
};

/// Inputs of the restoration optimizer
pub const RESTORATION: StageSchema = StageSchema {
    stage: "restoration",
    required: &[
        Variable::Ssi,
        Variable::SsiMl,
        Variable::Depth,
        Variable::Uncertainty,
    ],
};
