//! MH raster codec.
//!
//! Reads and writes ESRI ASCII grids into [`RasterGrid`]s. The NODATA
//! sentinel is always supplied by the caller through a [`NodataConfig`];
//! cells equal to it become invalid (`NaN`) and are written back as the
//! sentinel.
//!
//! [`RasterGrid`]: exchange_common::RasterGrid
//! [`NodataConfig`]: exchange_common::NodataConfig

pub mod ascii;
pub mod filter;
pub mod summary;

pub use ascii::{
    format_ascii_grid, parse_ascii_grid, read_ascii_grid, stage_ascii_grid_file, write_ascii_grid,
    write_ascii_grid_file, StagedGridFile,
};
pub use filter::{sigma_filter, SigmaStats};
pub use summary::{summarize, GridSummary};
