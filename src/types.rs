use chrono::{DateTime, Utc};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// Real-valued gate measurement (reflectivity, velocity, ...)
pub type GateValue = f32;

/// 2D gate-value array (ray x gate), one ray's gates contiguous
pub type GateField = Array2<GateValue>;

/// 2D coordinate array (ray x gate) in meters or degrees
pub type CoordField = Array2<f64>;

/// Mean earth radius in meters
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Standard-atmosphere effective earth radius factor (4/3 model)
pub const STANDARD_REFRACTION_FACTOR: f64 = 4.0 / 3.0;

/// Earth model and radar origin for georeferencing
///
/// Immutable once constructed; one instance per radar site/volume, shared
/// read-only across all sweeps of that volume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EarthModel {
    effective_radius_factor: f64,
    earth_radius_m: f64,
    origin_longitude: f64, // degrees
    origin_latitude: f64,  // degrees
    origin_altitude_m: f64,
}

impl EarthModel {
    /// Create an earth model with the standard 4/3 refraction factor
    pub fn new(
        origin_longitude: f64,
        origin_latitude: f64,
        origin_altitude_m: f64,
    ) -> RadarResult<Self> {
        Self::with_refraction(
            origin_longitude,
            origin_latitude,
            origin_altitude_m,
            STANDARD_REFRACTION_FACTOR,
            EARTH_RADIUS_M,
        )
    }

    /// Create an earth model with explicit refraction factor and earth radius
    pub fn with_refraction(
        origin_longitude: f64,
        origin_latitude: f64,
        origin_altitude_m: f64,
        effective_radius_factor: f64,
        earth_radius_m: f64,
    ) -> RadarResult<Self> {
        if !effective_radius_factor.is_finite() || effective_radius_factor <= 0.0 {
            return Err(RadarError::Configuration(format!(
                "effective_radius_factor must be positive, got {}",
                effective_radius_factor
            )));
        }
        if !earth_radius_m.is_finite() || earth_radius_m <= 0.0 {
            return Err(RadarError::Configuration(format!(
                "earth_radius_m must be positive, got {}",
                earth_radius_m
            )));
        }
        if !origin_latitude.is_finite() || !(-90.0..=90.0).contains(&origin_latitude) {
            return Err(RadarError::Configuration(format!(
                "origin_latitude must be in [-90, 90], got {}",
                origin_latitude
            )));
        }
        if !origin_longitude.is_finite() || !(-180.0..=180.0).contains(&origin_longitude) {
            return Err(RadarError::Configuration(format!(
                "origin_longitude must be in [-180, 180], got {}",
                origin_longitude
            )));
        }
        if !origin_altitude_m.is_finite() {
            return Err(RadarError::Configuration(format!(
                "origin_altitude_m must be finite, got {}",
                origin_altitude_m
            )));
        }

        Ok(Self {
            effective_radius_factor,
            earth_radius_m,
            origin_longitude,
            origin_latitude,
            origin_altitude_m,
        })
    }

    /// Effective earth radius in meters (earth radius scaled by the refraction factor)
    pub fn effective_radius(&self) -> f64 {
        self.earth_radius_m * self.effective_radius_factor
    }

    pub fn effective_radius_factor(&self) -> f64 {
        self.effective_radius_factor
    }

    pub fn earth_radius_m(&self) -> f64 {
        self.earth_radius_m
    }

    /// Radar origin longitude in degrees
    pub fn origin_longitude(&self) -> f64 {
        self.origin_longitude
    }

    /// Radar origin latitude in degrees
    pub fn origin_latitude(&self) -> f64 {
        self.origin_latitude
    }

    /// Radar feed altitude in meters above the reference surface
    pub fn origin_altitude_m(&self) -> f64 {
        self.origin_altitude_m
    }
}

/// Antenna elevation for a sweep: fixed per sweep or recorded per ray
#[derive(Debug, Clone, PartialEq)]
pub enum Elevation {
    /// Single elevation angle in degrees for every ray
    Fixed(f64),
    /// Per-ray elevation angles in degrees, one entry per azimuth
    PerRay(Array1<f64>),
}

/// One antenna sweep in spherical radar coordinates
///
/// Azimuths are kept in scan order: not necessarily sorted, not
/// necessarily unique. The range axis is shared by every ray.
#[derive(Debug, Clone, PartialEq)]
pub struct Sweep {
    azimuth: Array1<f64>, // degrees, one entry per ray
    elevation: Elevation, // degrees
    range: Array1<f64>,   // meters, strictly increasing
}

impl Sweep {
    /// Create a sweep, validating every axis
    pub fn new(azimuth: Array1<f64>, elevation: Elevation, range: Array1<f64>) -> RadarResult<Self> {
        if azimuth.is_empty() {
            return Err(RadarError::InvalidValue(
                "sweep must contain at least one ray".to_string(),
            ));
        }
        if azimuth.iter().any(|a| !a.is_finite()) {
            return Err(RadarError::InvalidValue(
                "azimuth angles must be finite".to_string(),
            ));
        }

        match &elevation {
            Elevation::Fixed(el) => Self::check_elevation(*el)?,
            Elevation::PerRay(els) => {
                if els.len() != azimuth.len() {
                    return Err(RadarError::ShapeMismatch(format!(
                        "per-ray elevation length {} does not match {} azimuths",
                        els.len(),
                        azimuth.len()
                    )));
                }
                for el in els.iter() {
                    Self::check_elevation(*el)?;
                }
            }
        }

        if range.is_empty() {
            return Err(RadarError::InvalidValue(
                "range axis must contain at least one gate".to_string(),
            ));
        }
        for r in range.iter() {
            if !r.is_finite() || *r < 0.0 {
                return Err(RadarError::InvalidValue(format!(
                    "gate ranges must be finite and non-negative, got {}",
                    r
                )));
            }
        }
        for gate in 1..range.len() {
            if range[gate] <= range[gate - 1] {
                return Err(RadarError::InvalidValue(
                    "range axis must be strictly increasing".to_string(),
                ));
            }
        }

        Ok(Self {
            azimuth,
            elevation,
            range,
        })
    }

    fn check_elevation(el: f64) -> RadarResult<()> {
        if !el.is_finite() || !(-90.0..=90.0).contains(&el) {
            return Err(RadarError::InvalidValue(format!(
                "elevation angle must be in [-90, 90], got {}",
                el
            )));
        }
        Ok(())
    }

    /// Azimuth angles in degrees, scan order
    pub fn azimuth(&self) -> &Array1<f64> {
        &self.azimuth
    }

    pub fn elevation(&self) -> &Elevation {
        &self.elevation
    }

    /// Gate center distances in meters
    pub fn range(&self) -> &Array1<f64> {
        &self.range
    }

    /// Elevation angle in degrees for a single ray
    pub fn ray_elevation(&self, ray: usize) -> f64 {
        match &self.elevation {
            Elevation::Fixed(el) => *el,
            Elevation::PerRay(els) => els[ray],
        }
    }

    pub fn num_rays(&self) -> usize {
        self.azimuth.len()
    }

    pub fn num_gates(&self) -> usize {
        self.range.len()
    }
}

/// An azimuth-indexed collection of per-gate value vectors
///
/// Source material for regridding: one elevation cut's worth of rays,
/// possibly overlapping other cuts at the same elevation (split cuts).
#[derive(Debug, Clone, PartialEq)]
pub struct RaySequence {
    azimuth: Array1<f64>, // degrees, scan order
    data: GateField,      // (ray, gate)
    timestamps: Option<Vec<DateTime<Utc>>>,
}

impl RaySequence {
    /// Create a ray sequence, validating array shapes
    pub fn new(
        azimuth: Array1<f64>,
        data: GateField,
        timestamps: Option<Vec<DateTime<Utc>>>,
    ) -> RadarResult<Self> {
        if azimuth.len() != data.nrows() {
            return Err(RadarError::ShapeMismatch(format!(
                "{} azimuths for {} data rows",
                azimuth.len(),
                data.nrows()
            )));
        }
        if azimuth.iter().any(|a| !a.is_finite()) {
            return Err(RadarError::InvalidValue(
                "azimuth angles must be finite".to_string(),
            ));
        }
        if let Some(times) = &timestamps {
            if times.len() != azimuth.len() {
                return Err(RadarError::ShapeMismatch(format!(
                    "{} timestamps for {} rays",
                    times.len(),
                    azimuth.len()
                )));
            }
        }

        Ok(Self {
            azimuth,
            data,
            timestamps,
        })
    }

    /// Azimuth angles in degrees, scan order
    pub fn azimuth(&self) -> &Array1<f64> {
        &self.azimuth
    }

    /// Gate values, shape (ray, gate)
    pub fn data(&self) -> &GateField {
        &self.data
    }

    /// Per-ray acquisition times, if the source format recorded them
    pub fn timestamps(&self) -> Option<&[DateTime<Utc>]> {
        self.timestamps.as_deref()
    }

    pub fn num_rays(&self) -> usize {
        self.azimuth.len()
    }

    pub fn num_gates(&self) -> usize {
        self.data.ncols()
    }
}

/// Error types for radar sweep processing
#[derive(Debug, thiserror::Error)]
pub enum RadarError {
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),
}

/// Result type for radar sweep operations
pub type RadarResult<T> = Result<T, RadarError>;
