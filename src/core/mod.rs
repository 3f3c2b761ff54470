//! Core sweep processing modules

pub mod georeference;
pub mod regrid;

// Re-export main types
pub use georeference::{georeference_sweep, CartesianCoords, GeographicCoords, GeoreferenceEngine};
pub use regrid::{
    circular_distance_deg, regrid_sweep, MergeTieBreak, RegridMetadata, RegridParams,
    RegriddedSweep, SlotFill, SweepRegridder,
};
