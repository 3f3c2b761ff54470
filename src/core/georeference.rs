use crate::types::{CoordField, EarthModel, RadarError, RadarResult, Sweep};
use ndarray::{Array1, Array2, ArrayViewMut1, Zip};

/// Per-gate Cartesian offsets from the radar, shape (ray, gate)
#[derive(Debug, Clone)]
pub struct CartesianCoords {
    /// East-west distance from the radar in meters
    pub x: CoordField,
    /// North-south distance from the radar in meters
    pub y: CoordField,
    /// Height above the radar in meters
    pub z: CoordField,
}

impl CartesianCoords {
    /// Array shape as (num_rays, num_gates)
    pub fn dim(&self) -> (usize, usize) {
        self.x.dim()
    }
}

/// Per-gate geographic coordinates, shape (ray, gate)
#[derive(Debug, Clone)]
pub struct GeographicCoords {
    /// Gate longitude in degrees
    pub longitude: CoordField,
    /// Gate latitude in degrees
    pub latitude: CoordField,
    /// Gate altitude in meters above the reference surface
    pub altitude: CoordField,
}

/// Georeferencing engine for antenna-coordinate sweeps
///
/// Maps (range, azimuth, elevation) gate locations to earth-relative
/// Cartesian offsets and geographic coordinates under the effective
/// earth radius beam-propagation model of Doviak and Zrnic (1993),
/// eqs. 2.28(b) and 2.28(c).
pub struct GeoreferenceEngine {
    model: EarthModel,
}

impl GeoreferenceEngine {
    /// Create a georeferencing engine for one radar site
    pub fn new(model: EarthModel) -> Self {
        Self { model }
    }

    pub fn model(&self) -> &EarthModel {
        &self.model
    }

    /// Compute Cartesian gate offsets (x, y, z) from antenna coordinates
    ///
    /// For a ray at azimuth theta_a and elevation theta_e, each gate at
    /// slant range r maps to
    ///
    /// ```text
    /// z = sqrt(r^2 + R^2 + 2 r R sin(theta_e)) - R
    /// s = R asin(r cos(theta_e) / (R + z))
    /// x = s sin(theta_a)
    /// y = s cos(theta_a)
    /// ```
    ///
    /// where R is the effective earth radius. Output shape is
    /// (num_rays, num_gates) for each coordinate.
    pub fn compute_xyz(&self, sweep: &Sweep) -> RadarResult<CartesianCoords> {
        let n_rays = sweep.num_rays();
        let n_gates = sweep.num_gates();
        log::debug!("Georeferencing sweep: {} rays x {} gates", n_rays, n_gates);

        let effective_radius = self.model.effective_radius();
        let range = sweep.range();
        let azimuths = sweep.azimuth();
        let elevations: Array1<f64> = (0..n_rays).map(|i| sweep.ray_elevation(i)).collect();

        let mut x = Array2::<f64>::zeros((n_rays, n_gates));
        let mut y = Array2::<f64>::zeros((n_rays, n_gates));
        let mut z = Array2::<f64>::zeros((n_rays, n_gates));

        let fill_ray = |mut x_row: ArrayViewMut1<f64>,
                        mut y_row: ArrayViewMut1<f64>,
                        mut z_row: ArrayViewMut1<f64>,
                        azimuth: &f64,
                        elevation: &f64| {
            // Azimuths accept any real angle; fold onto [0, 360) first
            let theta_a = azimuth.rem_euclid(360.0).to_radians();
            let theta_e = elevation.to_radians();
            let (sin_az, cos_az) = theta_a.sin_cos();
            let (sin_el, cos_el) = theta_e.sin_cos();

            for (gate, r) in range.iter().enumerate() {
                let height = (r * r
                    + effective_radius * effective_radius
                    + 2.0 * r * effective_radius * sin_el)
                    .sqrt()
                    - effective_radius;
                let arc = effective_radius * (r * cos_el / (effective_radius + height)).asin();
                x_row[gate] = arc * sin_az;
                y_row[gate] = arc * cos_az;
                z_row[gate] = height;
            }
        };

        let zip = Zip::from(x.rows_mut())
            .and(y.rows_mut())
            .and(z.rows_mut())
            .and(azimuths)
            .and(&elevations);

        #[cfg(feature = "parallel")]
        zip.par_for_each(fill_ray);

        #[cfg(not(feature = "parallel"))]
        zip.for_each(fill_ray);

        Ok(CartesianCoords { x, y, z })
    }

    /// Project Cartesian gate offsets onto geographic coordinates
    ///
    /// Uses the inverse azimuthal-equidistant projection on the sphere of
    /// the model's (unscaled) earth radius, anchored at the radar origin.
    /// Altitude is the origin altitude plus the gate height.
    pub fn compute_lon_lat_alt(&self, coords: &CartesianCoords) -> RadarResult<GeographicCoords> {
        let dim = coords.x.dim();
        if coords.y.dim() != dim || coords.z.dim() != dim {
            return Err(RadarError::ShapeMismatch(format!(
                "x {:?}, y {:?} and z {:?} must share one shape",
                coords.x.dim(),
                coords.y.dim(),
                coords.z.dim()
            )));
        }

        log::debug!("Projecting {} x {} gates to lon/lat/alt", dim.0, dim.1);

        let earth_radius = self.model.earth_radius_m();
        let lat0 = self.model.origin_latitude().to_radians();
        let lon0 = self.model.origin_longitude().to_radians();
        let (sin_lat0, cos_lat0) = lat0.sin_cos();

        let mut longitude = Array2::<f64>::zeros(dim);
        let mut latitude = Array2::<f64>::zeros(dim);

        let project = |lon_out: &mut f64, lat_out: &mut f64, x: &f64, y: &f64| {
            let rho = (x * x + y * y).sqrt();
            if rho < f64::EPSILON {
                *lon_out = self.model.origin_longitude();
                *lat_out = self.model.origin_latitude();
                return;
            }
            let c = rho / earth_radius;
            let (sin_c, cos_c) = c.sin_cos();
            let lat = (cos_c * sin_lat0 + y * sin_c * cos_lat0 / rho).asin();
            let lon = lon0 + (x * sin_c).atan2(rho * cos_lat0 * cos_c - y * sin_lat0 * sin_c);
            *lat_out = lat.to_degrees();
            // Keep longitudes on [-180, 180] across the antimeridian
            *lon_out = (lon.to_degrees() + 180.0).rem_euclid(360.0) - 180.0;
        };

        let zip = Zip::from(&mut longitude)
            .and(&mut latitude)
            .and(&coords.x)
            .and(&coords.y);

        #[cfg(feature = "parallel")]
        zip.par_for_each(project);

        #[cfg(not(feature = "parallel"))]
        zip.for_each(project);

        let origin_altitude = self.model.origin_altitude_m();
        let altitude = coords.z.mapv(|z| origin_altitude + z);

        Ok(GeographicCoords {
            longitude,
            latitude,
            altitude,
        })
    }

    /// Compute both Cartesian and geographic gate coordinates in one call
    pub fn georeference(&self, sweep: &Sweep) -> RadarResult<(CartesianCoords, GeographicCoords)> {
        let cartesian = self.compute_xyz(sweep)?;
        let geographic = self.compute_lon_lat_alt(&cartesian)?;
        Ok((cartesian, geographic))
    }
}

/// Convenience function georeferencing one sweep with default wiring
pub fn georeference_sweep(
    sweep: &Sweep,
    model: &EarthModel,
) -> RadarResult<(CartesianCoords, GeographicCoords)> {
    log::info!(
        "🧭 Georeferencing sweep: {} rays x {} gates",
        sweep.num_rays(),
        sweep.num_gates()
    );

    let engine = GeoreferenceEngine::new(model.clone());
    engine.georeference(sweep)
}
