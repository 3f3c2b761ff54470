use approx::{assert_abs_diff_eq, assert_relative_eq};
use ndarray::arr1;
use raysweep::{georeference_sweep, EarthModel, Elevation, GeoreferenceEngine, Sweep, EARTH_RADIUS_M};

fn kvnx_model() -> EarthModel {
    // KVNX Vance AFB, Oklahoma
    EarthModel::new(-98.1279, 36.7407, 369.0).expect("valid earth model")
}

#[test]
fn test_beam_height_matches_doviak_zrnic() {
    // Initialize logging to see processing messages
    let _ = env_logger::builder().is_test(true).try_init();

    let model = kvnx_model();
    let engine = GeoreferenceEngine::new(model);

    let ranges: Vec<f64> = (1..=100).map(|i| i as f64 * 2_500.0).collect();
    let sweep = Sweep::new(
        arr1(&[45.0]),
        Elevation::Fixed(0.0),
        arr1(&ranges),
    )
    .expect("valid sweep");

    let coords = engine.compute_xyz(&sweep).expect("georeference");

    let effective_radius = EARTH_RADIUS_M * 4.0 / 3.0;
    for (gate, r) in ranges.iter().enumerate() {
        let expected = (r * r + effective_radius * effective_radius).sqrt() - effective_radius;
        assert_relative_eq!(coords.z[[0, gate]], expected, max_relative = 1e-9);
    }
}

#[test]
fn test_small_angle_beam_height_approximation() {
    // At short range and zero elevation, z is close to r^2 / (2 Re)
    let model = EarthModel::new(0.0, 0.0, 0.0).expect("valid earth model");
    let engine = GeoreferenceEngine::new(model);

    let sweep = Sweep::new(
        arr1(&[0.0]),
        Elevation::Fixed(0.0),
        arr1(&[1_000.0, 2_000.0]),
    )
    .expect("valid sweep");

    let coords = engine.compute_xyz(&sweep).expect("georeference");
    let effective_radius = EARTH_RADIUS_M * 4.0 / 3.0;

    for (gate, r) in [1_000.0_f64, 2_000.0].iter().enumerate() {
        let approximate = r * r / (2.0 * effective_radius);
        assert_relative_eq!(coords.z[[0, gate]], approximate, max_relative = 1e-6);
    }
}

#[test]
fn test_continuity_across_azimuth_wrap() {
    let model = kvnx_model();
    let engine = GeoreferenceEngine::new(model);
    let range = arr1(&[50_000.0]);

    let just_below = Sweep::new(arr1(&[359.999]), Elevation::Fixed(0.5), range.clone())
        .expect("valid sweep");
    let just_above =
        Sweep::new(arr1(&[0.001]), Elevation::Fixed(0.5), range).expect("valid sweep");

    let a = engine.compute_xyz(&just_below).expect("georeference");
    let b = engine.compute_xyz(&just_above).expect("georeference");

    // 0.002 degrees at 50 km is under 2 meters of arc
    assert_abs_diff_eq!(a.x[[0, 0]], b.x[[0, 0]], epsilon = 2.0);
    assert_abs_diff_eq!(a.y[[0, 0]], b.y[[0, 0]], epsilon = 2.0);
    assert_abs_diff_eq!(a.z[[0, 0]], b.z[[0, 0]], epsilon = 1e-6);
}

#[test]
fn test_perturbation_produces_proportional_offsets() {
    let model = kvnx_model();
    let engine = GeoreferenceEngine::new(model);
    let range = arr1(&[100_000.0]);

    let base = Sweep::new(arr1(&[120.0]), Elevation::Fixed(1.0), range.clone())
        .expect("valid sweep");
    let nudged = Sweep::new(arr1(&[120.01]), Elevation::Fixed(1.0), range)
        .expect("valid sweep");

    let a = engine.compute_xyz(&base).expect("georeference");
    let b = engine.compute_xyz(&nudged).expect("georeference");

    let dx = (a.x[[0, 0]] - b.x[[0, 0]]).abs();
    let dy = (a.y[[0, 0]] - b.y[[0, 0]]).abs();
    let shift = (dx * dx + dy * dy).sqrt();

    // 0.01 degrees of azimuth at 100 km moves the gate by roughly 17 m
    assert!(shift > 10.0 && shift < 25.0, "gate moved {} m", shift);
}

#[test]
fn test_cartesian_quadrants_follow_compass_azimuths() {
    let model = kvnx_model();
    let engine = GeoreferenceEngine::new(model);

    let sweep = Sweep::new(
        arr1(&[0.0, 90.0, 180.0, 270.0]),
        Elevation::Fixed(0.0),
        arr1(&[30_000.0]),
    )
    .expect("valid sweep");

    let coords = engine.compute_xyz(&sweep).expect("georeference");

    // North
    assert_abs_diff_eq!(coords.x[[0, 0]], 0.0, epsilon = 1e-6);
    assert!(coords.y[[0, 0]] > 29_000.0);
    // East
    assert!(coords.x[[1, 0]] > 29_000.0);
    assert_abs_diff_eq!(coords.y[[1, 0]], 0.0, epsilon = 1e-6);
    // South
    assert!(coords.y[[2, 0]] < -29_000.0);
    // West
    assert!(coords.x[[3, 0]] < -29_000.0);
}

#[test]
fn test_per_ray_elevation_changes_height() {
    let model = kvnx_model();
    let engine = GeoreferenceEngine::new(model);

    let sweep = Sweep::new(
        arr1(&[10.0, 10.0]),
        Elevation::PerRay(arr1(&[0.5, 4.5])),
        arr1(&[60_000.0]),
    )
    .expect("valid sweep");

    let coords = engine.compute_xyz(&sweep).expect("georeference");
    assert!(coords.z[[1, 0]] > coords.z[[0, 0]] + 3_000.0);
}

#[test]
fn test_geographic_coordinates_track_cartesian_offsets() {
    let model = kvnx_model();
    let (cartesian, geographic) = georeference_sweep(
        &Sweep::new(
            arr1(&[0.0, 90.0]),
            Elevation::Fixed(0.5),
            arr1(&[10_000.0, 50_000.0]),
        )
        .expect("valid sweep"),
        &model,
    )
    .expect("georeference");

    // Ray 0 points north: latitude grows, longitude stays put
    assert!(geographic.latitude[[0, 1]] > 36.7407 + 0.3);
    assert_abs_diff_eq!(geographic.longitude[[0, 1]], -98.1279, epsilon = 1e-6);

    // Ray 1 points east: longitude grows, latitude barely moves
    assert!(geographic.longitude[[1, 1]] > -98.1279 + 0.3);
    assert_abs_diff_eq!(geographic.latitude[[1, 1]], 36.7407, epsilon = 0.02);

    // Altitude is origin altitude plus beam height
    assert_abs_diff_eq!(
        geographic.altitude[[1, 1]],
        369.0 + cartesian.z[[1, 1]],
        epsilon = 1e-9
    );
}

#[test]
fn test_shared_model_across_sweeps() {
    // One EarthModel serves a whole volume of sweeps
    let model = kvnx_model();
    let engine = GeoreferenceEngine::new(model.clone());

    for elevation in [0.5, 1.5, 2.4, 3.4] {
        let sweep = Sweep::new(
            arr1(&[0.0, 120.0, 240.0]),
            Elevation::Fixed(elevation),
            arr1(&[250.0, 500.0, 750.0]),
        )
        .expect("valid sweep");

        let coords = engine.compute_xyz(&sweep).expect("georeference");
        assert_eq!(coords.dim(), (3, 3));
    }

    assert_abs_diff_eq!(
        model.effective_radius(),
        EARTH_RADIUS_M * 4.0 / 3.0,
        epsilon = 1e-6
    );
}
