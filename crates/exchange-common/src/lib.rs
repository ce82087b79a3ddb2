//! Common types shared by every crate of the MH/SM field exchange.
//!
//! MH is the raster representation of a field (one value per grid cell), SM
//! the triangulated surface mesh representation (one value per triangle).

pub mod bbox;
pub mod config;
pub mod error;
pub mod grid;
pub mod nodata;

pub use bbox::BoundingBox;
pub use config::{
    AggregationConfig, AlignmentMode, CompareConfig, ExchangeConfig, MappingConfig,
    MappingMethod, MissingValuePolicy, PixelReducer, TriangleWeighting, ValConfig,
};
pub use error::{ExchangeError, ExchangeResult};
pub use grid::{GridGeometry, RasterGrid};
pub use nodata::{NodataConfig, NodataMismatchPolicy, DEFAULT_NODATA};
