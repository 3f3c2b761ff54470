//! RaySweep: A Fast, Modular Weather-Radar Sweep Georeferencing and Regridding Core
//!
//! This library converts radar gate locations from antenna coordinates
//! (range, azimuth, elevation) into earth-relative Cartesian and geographic
//! coordinates, and aligns irregular or split sweeps onto uniform azimuth
//! grids with gap-aware circular interpolation.

use numpy::{IntoPyArray, PyArray1, PyArray2, PyReadonlyArray1, PyReadonlyArray2};
use pyo3::prelude::*;

pub mod core;
pub mod types;

// Re-export main types and functions for easier access
pub use types::{
    CoordField, EarthModel, Elevation, GateField, GateValue, RadarError, RadarResult, RaySequence,
    Sweep, EARTH_RADIUS_M, STANDARD_REFRACTION_FACTOR,
};

pub use crate::core::{
    circular_distance_deg, georeference_sweep, regrid_sweep, CartesianCoords, GeographicCoords,
    GeoreferenceEngine, MergeTieBreak, RegridMetadata, RegridParams, RegriddedSweep, SlotFill,
    SweepRegridder,
};

use chrono::{DateTime, Utc};
use ndarray::Array1;

/// Python module definition
#[pymodule]
fn _core(_py: Python, m: &PyModule) -> PyResult<()> {
    m.add_class::<PyEarthModel>()?;
    m.add_function(wrap_pyfunction!(georeference, m)?)?;
    m.add_function(wrap_pyfunction!(regrid, m)?)?;
    Ok(())
}

/// Python wrapper for EarthModel
#[pyclass(name = "EarthModel")]
#[derive(Clone)]
struct PyEarthModel {
    inner: EarthModel,
}

#[pymethods]
impl PyEarthModel {
    #[new]
    #[pyo3(signature = (longitude, latitude, altitude_m, effective_radius_factor=None, earth_radius_m=None))]
    fn new(
        longitude: f64,
        latitude: f64,
        altitude_m: f64,
        effective_radius_factor: Option<f64>,
        earth_radius_m: Option<f64>,
    ) -> PyResult<Self> {
        let model = EarthModel::with_refraction(
            longitude,
            latitude,
            altitude_m,
            effective_radius_factor.unwrap_or(STANDARD_REFRACTION_FACTOR),
            earth_radius_m.unwrap_or(EARTH_RADIUS_M),
        )
        .map_err(|e| PyErr::new::<pyo3::exceptions::PyValueError, _>(format!("{}", e)))?;

        Ok(PyEarthModel { inner: model })
    }

    #[getter]
    fn longitude(&self) -> f64 {
        self.inner.origin_longitude()
    }

    #[getter]
    fn latitude(&self) -> f64 {
        self.inner.origin_latitude()
    }

    #[getter]
    fn altitude_m(&self) -> f64 {
        self.inner.origin_altitude_m()
    }

    #[getter]
    fn effective_radius_factor(&self) -> f64 {
        self.inner.effective_radius_factor()
    }

    #[getter]
    fn effective_radius(&self) -> f64 {
        self.inner.effective_radius()
    }

    fn __repr__(&self) -> String {
        format!(
            "EarthModel(longitude={}, latitude={}, altitude_m={}, effective_radius_factor={})",
            self.inner.origin_longitude(),
            self.inner.origin_latitude(),
            self.inner.origin_altitude_m(),
            self.inner.effective_radius_factor()
        )
    }
}

/// Georeference one sweep: antenna coordinates in, six (ray, gate) arrays out
///
/// `elevations` may be a single-element array for a fixed-elevation sweep,
/// or one entry per azimuth. Returns (x, y, z, longitude, latitude,
/// altitude).
#[pyfunction]
fn georeference<'py>(
    py: Python<'py>,
    azimuths: PyReadonlyArray1<'py, f64>,
    elevations: PyReadonlyArray1<'py, f64>,
    ranges: PyReadonlyArray1<'py, f64>,
    model: PyEarthModel,
) -> PyResult<(
    &'py PyArray2<f64>,
    &'py PyArray2<f64>,
    &'py PyArray2<f64>,
    &'py PyArray2<f64>,
    &'py PyArray2<f64>,
    &'py PyArray2<f64>,
)> {
    let azimuth = azimuths.as_array().to_owned();
    let elevation_view = elevations.as_array();
    let elevation = if elevation_view.len() == 1 {
        Elevation::Fixed(elevation_view[0])
    } else {
        Elevation::PerRay(elevation_view.to_owned())
    };

    let sweep = Sweep::new(azimuth, elevation, ranges.as_array().to_owned())
        .map_err(|e| PyErr::new::<pyo3::exceptions::PyValueError, _>(format!("{}", e)))?;

    let engine = GeoreferenceEngine::new(model.inner);
    let (cartesian, geographic) = engine
        .georeference(&sweep)
        .map_err(|e| PyErr::new::<pyo3::exceptions::PyValueError, _>(format!("{}", e)))?;

    Ok((
        cartesian.x.into_pyarray(py),
        cartesian.y.into_pyarray(py),
        cartesian.z.into_pyarray(py),
        geographic.longitude.into_pyarray(py),
        geographic.latitude.into_pyarray(py),
        geographic.altitude.into_pyarray(py),
    ))
}

/// Regrid one or more (azimuths, data, timestamps) cuts onto a uniform grid
///
/// Timestamps are optional per-ray POSIX seconds. Returns (grid azimuths,
/// regridded data, gap mask).
#[pyfunction]
#[pyo3(signature = (
    sequences,
    target_azimuth_count = 360,
    azimuth_tolerance_deg = 0.1,
    max_search_window_deg = 5.0,
    missing_value = f32::NAN,
    keep_first_on_tie = true,
))]
fn regrid<'py>(
    py: Python<'py>,
    sequences: Vec<(
        PyReadonlyArray1<'py, f64>,
        PyReadonlyArray2<'py, f32>,
        Option<PyReadonlyArray1<'py, f64>>,
    )>,
    target_azimuth_count: usize,
    azimuth_tolerance_deg: f64,
    max_search_window_deg: f64,
    missing_value: f32,
    keep_first_on_tie: bool,
) -> PyResult<(&'py PyArray1<f64>, &'py PyArray2<f32>, &'py PyArray1<bool>)> {
    let mut sources = Vec::with_capacity(sequences.len());
    for (azimuths, data, timestamps) in &sequences {
        let times = match timestamps {
            Some(seconds) => Some(
                seconds
                    .as_array()
                    .iter()
                    .map(|s| datetime_from_epoch(*s))
                    .collect::<PyResult<Vec<DateTime<Utc>>>>()?,
            ),
            None => None,
        };
        let source = RaySequence::new(
            azimuths.as_array().to_owned(),
            data.as_array().to_owned(),
            times,
        )
        .map_err(|e| PyErr::new::<pyo3::exceptions::PyValueError, _>(format!("{}", e)))?;
        sources.push(source);
    }

    let params = RegridParams {
        azimuth_tolerance_deg,
        max_search_window_deg,
        target_azimuth_count,
        missing_value,
        tie_break: if keep_first_on_tie {
            MergeTieBreak::First
        } else {
            MergeTieBreak::Last
        },
    };

    let regridded = regrid_sweep(&sources, params)
        .map_err(|e| PyErr::new::<pyo3::exceptions::PyValueError, _>(format!("{}", e)))?;

    let gap_mask: Array1<bool> = regridded.gap_mask;
    Ok((
        regridded.azimuth.into_pyarray(py),
        regridded.data.into_pyarray(py),
        gap_mask.into_pyarray(py),
    ))
}

/// Convert POSIX seconds (with fraction) to a UTC timestamp
fn datetime_from_epoch(seconds: f64) -> PyResult<DateTime<Utc>> {
    if !seconds.is_finite() {
        return Err(PyErr::new::<pyo3::exceptions::PyValueError, _>(format!(
            "timestamp must be finite, got {}",
            seconds
        )));
    }
    let whole = seconds.floor();
    let nanos = ((seconds - whole) * 1e9).round() as u32;
    DateTime::<Utc>::from_timestamp(whole as i64, nanos.min(999_999_999)).ok_or_else(|| {
        PyErr::new::<pyo3::exceptions::PyValueError, _>(format!(
            "timestamp {} out of range",
            seconds
        ))
    })
}
