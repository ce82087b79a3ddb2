//! Exchange pipelines between MH rasters and SM meshes.
//!
//! [`Exchanger`] drives both directions and the round-trip audit: read,
//! align, map (through its mapping cache), aggregate, write. The
//! [`compare`](compare::compare) module scores a rebuilt raster against its
//! reference.

pub mod aggregate;
pub mod compare;
pub mod pipeline;
pub mod preview;

pub use aggregate::{aggregate_to_pixels, aggregate_to_triangles, reduce_pixel};
pub use compare::{
    compare, compare_files, comparison_paths, write_comparison_grids, ComparisonResult,
    ComparisonSummary,
};
pub use pipeline::{Exchanger, MhToSmOutput, MhToSmReport, SmToMhOutput, SmToMhReport};
pub use preview::{MeshPreviewer, NoopPreviewer, TracingPreviewer};
