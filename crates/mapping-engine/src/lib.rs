//! Mapping engine.
//!
//! Relates the triangles of an SM mesh to the pixels of an MH grid:
//!
//! - [`align`]: translation placing the mesh over the grid
//! - [`geometry`]: polygon clipping and areas
//! - [`mapping`]: the sparse triangle/pixel relation, surface or barycenter
//! - [`cache`]: LRU of built mappings keyed by input fingerprint

pub mod align;
pub mod cache;
pub mod geometry;
pub mod mapping;

pub use align::{apply_offset, compute_offset, offset_for_mode, AlignmentOffset};
pub use cache::{CacheStats, MappingCache, MappingKey};
pub use geometry::{clip_to_rect, overlap_area, polygon_area};
pub use mapping::{
    build_barycenter, build_mapping, build_surface, Mapping, MappingSummary, PixelOverlap,
    TriangleOverlap,
};
