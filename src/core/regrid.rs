use crate::types::{GateField, GateValue, RadarError, RadarResult, RaySequence};
use chrono::{DateTime, Utc};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// Circular distance between two azimuth angles in degrees
///
/// Symmetric, always in [0, 180]; wraps through 0/360.
pub fn circular_distance_deg(a: f64, b: f64) -> f64 {
    let d = (a - b).rem_euclid(360.0);
    d.min(360.0 - d)
}

/// Tie-break for overlapping rays without usable timestamps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MergeTieBreak {
    /// Keep the first ray encountered in scan order
    First,
    /// Keep the last ray encountered in scan order
    Last,
}

/// Configuration for regridding rays onto a uniform azimuth grid
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegridParams {
    /// Angular tolerance for treating a source ray as sitting on a slot (degrees)
    pub azimuth_tolerance_deg: f64,
    /// Widest angular gap bridged by interpolation or nearest fill (degrees)
    pub max_search_window_deg: f64,
    /// Number of uniform azimuth slots spanning 360 degrees
    pub target_azimuth_count: usize,
    /// Sentinel marking a gate with no data
    pub missing_value: GateValue,
    /// Split-cut resolution when timestamps are absent or equal
    pub tie_break: MergeTieBreak,
}

impl Default for RegridParams {
    fn default() -> Self {
        Self {
            azimuth_tolerance_deg: 0.1,
            max_search_window_deg: 5.0,     // Wider gaps stay gaps
            target_azimuth_count: 360,      // WSR-88D legacy resolution
            missing_value: GateValue::NAN,
            tie_break: MergeTieBreak::First,
        }
    }
}

/// How one output slot was filled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SlotFill {
    /// A single source ray sat within tolerance of the slot azimuth
    Exact,
    /// Several source rays overlapped the slot; one was selected
    Merged,
    /// Linear circular-azimuth interpolation between bracketing rays
    Interpolated,
    /// Only one side had a ray inside the search window; it was copied
    Nearest,
    /// No source ray inside the search window on either side
    Missing,
}

/// Aggregate fill statistics for one regrid invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegridMetadata {
    /// Total source rays across all input sequences
    pub source_rays: usize,
    pub exact: usize,
    pub merged: usize,
    pub interpolated: usize,
    pub nearest: usize,
    pub missing: usize,
}

impl RegridMetadata {
    /// Fraction of slots carrying data, in percent
    pub fn coverage_percent(&self) -> f64 {
        let total = self.exact + self.merged + self.interpolated + self.nearest + self.missing;
        if total == 0 {
            return 0.0;
        }
        ((total - self.missing) as f64 / total as f64) * 100.0
    }
}

/// A ray sequence aligned to a uniform azimuth grid
#[derive(Debug, Clone)]
pub struct RegriddedSweep {
    /// Slot azimuths in degrees, uniform over [0, 360)
    pub azimuth: Array1<f64>,
    /// Gate values, shape (slot, gate)
    pub data: GateField,
    /// True where a slot carries only the missing sentinel
    pub gap_mask: Array1<bool>,
    /// Per-slot fill classification
    pub fill: Vec<SlotFill>,
    /// Aggregate statistics
    pub metadata: RegridMetadata,
}

/// One source ray flattened out of its sequence, sorted by azimuth
#[derive(Debug, Clone, Copy)]
struct SourceRay {
    azimuth: f64, // normalized to [0, 360)
    seq: usize,
    row: usize,
    order: usize, // global encounter order across sequences
    time: Option<DateTime<Utc>>,
}

/// Regridding processor for irregular or split radar scans
///
/// Collects the rays of one or more sequences, sorts them by azimuth
/// once, and resolves each uniform grid slot with a binary search.
pub struct SweepRegridder {
    params: RegridParams,
}

impl SweepRegridder {
    /// Create a regridder, validating the configuration
    pub fn new(params: RegridParams) -> RadarResult<Self> {
        if params.target_azimuth_count == 0 {
            return Err(RadarError::InvalidValue(
                "target_azimuth_count must be positive".to_string(),
            ));
        }
        if !params.azimuth_tolerance_deg.is_finite() || params.azimuth_tolerance_deg < 0.0 {
            return Err(RadarError::InvalidValue(format!(
                "azimuth_tolerance_deg must be non-negative, got {}",
                params.azimuth_tolerance_deg
            )));
        }
        if !params.max_search_window_deg.is_finite()
            || params.max_search_window_deg < params.azimuth_tolerance_deg
        {
            return Err(RadarError::InvalidValue(format!(
                "max_search_window_deg must be at least the tolerance, got {}",
                params.max_search_window_deg
            )));
        }

        Ok(Self { params })
    }

    pub fn params(&self) -> &RegridParams {
        &self.params
    }

    /// Regrid one or more ray sequences onto the uniform azimuth grid
    ///
    /// Sources are typically the split cuts of one elevation. Inputs are
    /// never mutated; the output allocates fresh arrays. An input whose
    /// gates are all missing regrids to an all-sentinel sweep, which is a
    /// legitimate result, not an error.
    pub fn regrid(&self, sources: &[RaySequence]) -> RadarResult<RegriddedSweep> {
        if sources.is_empty() {
            return Err(RadarError::ShapeMismatch(
                "at least one source ray sequence is required".to_string(),
            ));
        }

        let n_gates = sources[0].num_gates();
        for (i, source) in sources.iter().enumerate() {
            if source.num_gates() != n_gates {
                return Err(RadarError::ShapeMismatch(format!(
                    "source {} has {} gates, expected {}",
                    i,
                    source.num_gates(),
                    n_gates
                )));
            }
        }

        let n_slots = self.params.target_azimuth_count;
        let rays = Self::collect_rays(sources);

        log::info!(
            "🎯 Regridding {} rays from {} sequence(s) onto {} slots x {} gates",
            rays.len(),
            sources.len(),
            n_slots,
            n_gates
        );

        let grid_step = 360.0 / n_slots as f64;

        let fill_one = |slot: usize| self.fill_slot(slot as f64 * grid_step, &rays, sources, n_gates);

        #[cfg(feature = "parallel")]
        let slots: Vec<(Vec<GateValue>, SlotFill)> = {
            use rayon::prelude::*;
            (0..n_slots).into_par_iter().map(fill_one).collect()
        };

        #[cfg(not(feature = "parallel"))]
        let slots: Vec<(Vec<GateValue>, SlotFill)> = (0..n_slots).map(fill_one).collect();

        let mut metadata = RegridMetadata {
            source_rays: rays.len(),
            exact: 0,
            merged: 0,
            interpolated: 0,
            nearest: 0,
            missing: 0,
        };

        let mut flat = Vec::with_capacity(n_slots * n_gates);
        let mut fill = Vec::with_capacity(n_slots);
        let mut gap_mask = Vec::with_capacity(n_slots);
        for (gates, state) in slots {
            flat.extend_from_slice(&gates);
            gap_mask.push(state == SlotFill::Missing);
            match state {
                SlotFill::Exact => metadata.exact += 1,
                SlotFill::Merged => metadata.merged += 1,
                SlotFill::Interpolated => metadata.interpolated += 1,
                SlotFill::Nearest => metadata.nearest += 1,
                SlotFill::Missing => metadata.missing += 1,
            }
            fill.push(state);
        }

        let data = Array2::from_shape_vec((n_slots, n_gates), flat).map_err(|e| {
            RadarError::ShapeMismatch(format!("failed to assemble regridded data: {}", e))
        })?;
        let azimuth = Array1::from_iter((0..n_slots).map(|k| k as f64 * grid_step));

        let coverage = metadata.coverage_percent();
        log::info!("✅ Regrid completed: {:.1}% coverage", coverage);
        log::debug!(
            "Slot fill: {} exact, {} merged, {} interpolated, {} nearest, {} missing",
            metadata.exact,
            metadata.merged,
            metadata.interpolated,
            metadata.nearest,
            metadata.missing
        );
        if coverage < 50.0 {
            log::warn!("Low azimuth coverage ({:.1}%), output is mostly gaps", coverage);
        }

        Ok(RegriddedSweep {
            azimuth,
            data,
            gap_mask: Array1::from_vec(gap_mask),
            fill,
            metadata,
        })
    }

    /// Flatten all sequences into one azimuth-sorted ray index
    fn collect_rays(sources: &[RaySequence]) -> Vec<SourceRay> {
        let mut rays = Vec::with_capacity(sources.iter().map(|s| s.num_rays()).sum());
        let mut order = 0;
        for (seq, source) in sources.iter().enumerate() {
            let times = source.timestamps();
            for (row, az) in source.azimuth().iter().enumerate() {
                rays.push(SourceRay {
                    azimuth: az.rem_euclid(360.0),
                    seq,
                    row,
                    order,
                    time: times.map(|t| t[row]),
                });
                order += 1;
            }
        }
        rays.sort_by(|a, b| a.azimuth.total_cmp(&b.azimuth));
        rays
    }

    /// Resolve a single output slot
    fn fill_slot(
        &self,
        target: f64,
        rays: &[SourceRay],
        sources: &[RaySequence],
        n_gates: usize,
    ) -> (Vec<GateValue>, SlotFill) {
        let missing = self.params.missing_value;

        let candidates = self.candidates_within_tolerance(rays, target);
        if !candidates.is_empty() {
            let state = if candidates.len() == 1 {
                SlotFill::Exact
            } else {
                SlotFill::Merged
            };
            let chosen = self.select_ray(&candidates, rays);
            return (self.copy_ray(rays[chosen], sources), state);
        }

        match self.bracketing_rays(rays, target) {
            Some((below, dist_below, above, dist_above)) => {
                let window = self.params.max_search_window_deg;
                let below_ok = dist_below <= window;
                let above_ok = dist_above <= window;

                if below_ok && above_ok {
                    let weight_above = (dist_below / (dist_below + dist_above)) as GateValue;
                    let below_row = sources[rays[below].seq].data().row(rays[below].row);
                    let above_row = sources[rays[above].seq].data().row(rays[above].row);

                    let mut gates = Vec::with_capacity(n_gates);
                    for (vb, va) in below_row.iter().zip(above_row.iter()) {
                        let below_valid = !is_missing(*vb, missing);
                        let above_valid = !is_missing(*va, missing);
                        // A missing neighbor drops out instead of dragging
                        // the interpolated value toward the sentinel
                        let value = match (below_valid, above_valid) {
                            (true, true) => vb * (1.0 - weight_above) + va * weight_above,
                            (true, false) => *vb,
                            (false, true) => *va,
                            (false, false) => missing,
                        };
                        gates.push(value);
                    }
                    (gates, SlotFill::Interpolated)
                } else if below_ok {
                    (self.copy_ray(rays[below], sources), SlotFill::Nearest)
                } else if above_ok {
                    (self.copy_ray(rays[above], sources), SlotFill::Nearest)
                } else {
                    (vec![missing; n_gates], SlotFill::Missing)
                }
            }
            None => (vec![missing; n_gates], SlotFill::Missing),
        }
    }

    /// Indices of all rays within tolerance of the target azimuth
    ///
    /// The sorted order makes the in-tolerance set contiguous around the
    /// target (modulo wrap); walk outward from the insertion point.
    fn candidates_within_tolerance(&self, rays: &[SourceRay], target: f64) -> Vec<usize> {
        let total = rays.len();
        if total == 0 {
            return Vec::new();
        }
        let tolerance = self.params.azimuth_tolerance_deg;
        let start = rays.partition_point(|r| r.azimuth < target);

        let mut found = Vec::new();
        let mut taken = 0;
        let mut i = start % total;
        while taken < total && circular_distance_deg(rays[i].azimuth, target) <= tolerance {
            found.push(i);
            i = (i + 1) % total;
            taken += 1;
        }
        let mut j = (start + total - 1) % total;
        let mut taken_back = 0;
        while taken_back < total - taken
            && circular_distance_deg(rays[j].azimuth, target) <= tolerance
        {
            found.push(j);
            j = (j + total - 1) % total;
            taken_back += 1;
        }
        found
    }

    /// Nearest rays strictly below and above the target azimuth, wrapping
    /// through 0/360, with their circular distances
    fn bracketing_rays(
        &self,
        rays: &[SourceRay],
        target: f64,
    ) -> Option<(usize, f64, usize, f64)> {
        let total = rays.len();
        if total == 0 {
            return None;
        }
        let start = rays.partition_point(|r| r.azimuth < target);
        let above = start % total;
        let below = (start + total - 1) % total;
        let dist_above = (rays[above].azimuth - target).rem_euclid(360.0);
        let dist_below = (target - rays[below].azimuth).rem_euclid(360.0);
        Some((below, dist_below, above, dist_above))
    }

    /// Split-cut resolution: latest timestamp wins; the configured
    /// tie-break decides when timestamps are absent or equal
    fn select_ray(&self, candidates: &[usize], rays: &[SourceRay]) -> usize {
        let mut best = candidates[0];
        for &candidate in &candidates[1..] {
            best = self.prefer(best, candidate, rays);
        }
        best
    }

    fn prefer(&self, current: usize, challenger: usize, rays: &[SourceRay]) -> usize {
        let a = &rays[current];
        let b = &rays[challenger];
        match (a.time, b.time) {
            (Some(ta), Some(tb)) => {
                if tb > ta {
                    challenger
                } else if tb < ta {
                    current
                } else {
                    self.prefer_by_order(current, challenger, rays)
                }
            }
            // A timestamped ray outranks an undated one
            (Some(_), None) => current,
            (None, Some(_)) => challenger,
            (None, None) => self.prefer_by_order(current, challenger, rays),
        }
    }

    fn prefer_by_order(&self, current: usize, challenger: usize, rays: &[SourceRay]) -> usize {
        let keep_first = rays[current].order < rays[challenger].order;
        match self.params.tie_break {
            MergeTieBreak::First => {
                if keep_first {
                    current
                } else {
                    challenger
                }
            }
            MergeTieBreak::Last => {
                if keep_first {
                    challenger
                } else {
                    current
                }
            }
        }
    }

    fn copy_ray(&self, ray: SourceRay, sources: &[RaySequence]) -> Vec<GateValue> {
        sources[ray.seq].data().row(ray.row).to_vec()
    }
}

/// True when a gate value carries no data
fn is_missing(value: GateValue, sentinel: GateValue) -> bool {
    value.is_nan() || value == sentinel
}

/// Convenience function regridding split cuts with explicit parameters
pub fn regrid_sweep(
    sources: &[RaySequence],
    params: RegridParams,
) -> RadarResult<RegriddedSweep> {
    let regridder = SweepRegridder::new(params)?;
    regridder.regrid(sources)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr1;

    fn sequence(azimuths: &[f64], value: GateValue) -> RaySequence {
        let data = Array2::from_elem((azimuths.len(), 3), value);
        RaySequence::new(arr1(azimuths), data, None).unwrap()
    }

    #[test]
    fn circular_distance_is_symmetric_and_bounded() {
        assert!((circular_distance_deg(0.0, 359.0) - 1.0).abs() < 1e-12);
        assert!((circular_distance_deg(359.0, 0.0) - 1.0).abs() < 1e-12);
        assert!((circular_distance_deg(10.0, 190.0) - 180.0).abs() < 1e-12);
        for (a, b) in [(12.3, 250.7), (0.0, 0.0), (359.9, 0.1), (45.0, 44.0)] {
            let d = circular_distance_deg(a, b);
            assert!((0.0..=180.0).contains(&d));
            assert!((d - circular_distance_deg(b, a)).abs() < 1e-12);
        }
    }

    #[test]
    fn params_validation() {
        assert!(SweepRegridder::new(RegridParams::default()).is_ok());

        let zero_slots = RegridParams {
            target_azimuth_count: 0,
            ..Default::default()
        };
        assert!(SweepRegridder::new(zero_slots).is_err());

        let negative_tolerance = RegridParams {
            azimuth_tolerance_deg: -0.5,
            ..Default::default()
        };
        assert!(SweepRegridder::new(negative_tolerance).is_err());

        let window_below_tolerance = RegridParams {
            azimuth_tolerance_deg: 2.0,
            max_search_window_deg: 1.0,
            ..Default::default()
        };
        assert!(SweepRegridder::new(window_below_tolerance).is_err());
    }

    #[test]
    fn gate_dimension_mismatch_is_rejected() {
        let a = RaySequence::new(arr1(&[0.0]), Array2::zeros((1, 3)), None).unwrap();
        let b = RaySequence::new(arr1(&[180.0]), Array2::zeros((1, 4)), None).unwrap();
        let regridder = SweepRegridder::new(RegridParams::default()).unwrap();
        let result = regridder.regrid(&[a, b]);
        assert!(matches!(result, Err(RadarError::ShapeMismatch(_))));
    }

    #[test]
    fn empty_source_list_is_rejected() {
        let regridder = SweepRegridder::new(RegridParams::default()).unwrap();
        assert!(regridder.regrid(&[]).is_err());
    }

    #[test]
    fn nearest_fill_copies_without_extrapolating() {
        // One ray at 0 degrees, nothing else: the 1-degree slot is inside
        // the window on one side only
        let source = sequence(&[0.0], 7.0);
        let params = RegridParams {
            target_azimuth_count: 360,
            ..Default::default()
        };
        let out = regrid_sweep(&[source], params).unwrap();

        assert_eq!(out.fill[0], SlotFill::Exact);
        assert_eq!(out.fill[1], SlotFill::Nearest);
        assert_eq!(out.data[[1, 0]], 7.0);
        assert_eq!(out.fill[180], SlotFill::Missing);
        assert!(out.gap_mask[180]);
    }

    #[test]
    fn sentinel_neighbor_is_excluded_from_interpolation() {
        let azimuths = arr1(&[350.0, 10.0]);
        let mut data = Array2::from_elem((2, 2), 4.0_f32);
        data[[1, 0]] = f32::NAN; // missing gate in the "above" ray
        let source = RaySequence::new(azimuths, data, None).unwrap();

        let params = RegridParams {
            target_azimuth_count: 360,
            max_search_window_deg: 15.0,
            ..Default::default()
        };
        let out = regrid_sweep(&[source], params).unwrap();

        // Slot 0 sits between 350 and 10: gate 0 keeps the valid neighbor,
        // gate 1 interpolates both
        assert_eq!(out.fill[0], SlotFill::Interpolated);
        assert_eq!(out.data[[0, 0]], 4.0);
        assert_eq!(out.data[[0, 1]], 4.0);
    }

    #[test]
    fn all_missing_input_yields_all_sentinel_output() {
        let source = sequence(&[0.0, 90.0, 180.0, 270.0], f32::NAN);
        let out = regrid_sweep(&[source], RegridParams::default()).unwrap();

        assert!(out.data.iter().all(|v| v.is_nan()));
        // Slots carry rays, so they are not gaps, just empty measurements
        assert!(!out.gap_mask[0]);
        assert_eq!(out.metadata.missing, out.gap_mask.iter().filter(|&&g| g).count());
    }

    #[test]
    fn metadata_counts_sum_to_slot_count() {
        let source = sequence(&[0.0, 90.0, 180.0, 270.0], 1.0);
        let out = regrid_sweep(&[source], RegridParams::default()).unwrap();
        let m = &out.metadata;
        assert_eq!(
            m.exact + m.merged + m.interpolated + m.nearest + m.missing,
            360
        );
        assert_eq!(m.source_rays, 4);
    }
}
