//! Regular raster grid geometry and values.
//!
//! Rows are numbered from the north: row 0 is the northernmost row, matching
//! the order in which ESRI ASCII grids store their data lines.

use crate::{BoundingBox, ExchangeError, ExchangeResult};
use serde::{Deserialize, Serialize};

/// Geometry of a regular grid of square cells.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridGeometry {
    /// Number of columns (west to east)
    pub ncols: usize,
    /// Number of rows (north to south)
    pub nrows: usize,
    /// X of the lower-left corner of the grid
    pub xllcorner: f64,
    /// Y of the lower-left corner of the grid
    pub yllcorner: f64,
    /// Side length of a cell
    pub cellsize: f64,
}

impl GridGeometry {
    /// Create a grid geometry, rejecting empty grids and non-positive cell sizes.
    pub fn new(
        ncols: usize,
        nrows: usize,
        xllcorner: f64,
        yllcorner: f64,
        cellsize: f64,
    ) -> ExchangeResult<Self> {
        if ncols == 0 || nrows == 0 {
            return Err(ExchangeError::InvalidConfig(format!(
                "grid must have at least one cell, got {}x{}",
                ncols, nrows
            )));
        }
        if ncols.checked_mul(nrows).is_none() {
            return Err(ExchangeError::InvalidConfig(format!(
                "grid of {}x{} cells is too large",
                ncols, nrows
            )));
        }
        if !(cellsize.is_finite() && cellsize > 0.0) {
            return Err(ExchangeError::InvalidConfig(format!(
                "cellsize must be a positive number, got {}",
                cellsize
            )));
        }
        if !xllcorner.is_finite() || !yllcorner.is_finite() {
            return Err(ExchangeError::InvalidConfig(
                "grid corner coordinates must be finite".to_string(),
            ));
        }

        Ok(Self {
            ncols,
            nrows,
            xllcorner,
            yllcorner,
            cellsize,
        })
    }

    /// Eastern edge of the grid.
    pub fn x_max(&self) -> f64 {
        self.xllcorner + self.ncols as f64 * self.cellsize
    }

    /// Northern edge of the grid.
    pub fn y_max(&self) -> f64 {
        self.yllcorner + self.nrows as f64 * self.cellsize
    }

    /// Bounding box of all cell corners.
    pub fn bbox(&self) -> BoundingBox {
        BoundingBox::new(self.xllcorner, self.yllcorner, self.x_max(), self.y_max())
    }

    /// Total number of cells.
    pub fn len(&self) -> usize {
        self.ncols * self.nrows
    }

    /// Always false for a geometry built through [`GridGeometry::new`].
    pub fn is_empty(&self) -> bool {
        self.ncols == 0 || self.nrows == 0
    }

    /// Area of a single cell.
    pub fn cell_area(&self) -> f64 {
        self.cellsize * self.cellsize
    }

    /// Row-major index of a cell.
    #[inline]
    pub fn flat_index(&self, row: usize, col: usize) -> usize {
        row * self.ncols + col
    }

    /// Inverse of [`GridGeometry::flat_index`].
    #[inline]
    pub fn row_col(&self, index: usize) -> (usize, usize) {
        (index / self.ncols, index % self.ncols)
    }

    /// Continuous column coordinate of a world X (0.0 at the western edge).
    #[inline]
    pub fn col_coord(&self, x: f64) -> f64 {
        (x - self.xllcorner) / self.cellsize
    }

    /// Continuous row coordinate of a world Y (0.0 at the northern edge).
    #[inline]
    pub fn row_coord(&self, y: f64) -> f64 {
        (self.y_max() - y) / self.cellsize
    }

    /// Footprint of a cell in world coordinates.
    pub fn cell_bounds(&self, row: usize, col: usize) -> BoundingBox {
        let min_x = self.xllcorner + col as f64 * self.cellsize;
        let max_y = self.y_max() - row as f64 * self.cellsize;
        BoundingBox::new(min_x, max_y - self.cellsize, min_x + self.cellsize, max_y)
    }

    /// Cell containing a world point.
    ///
    /// Cells are half-open: a point on the shared edge of two cells belongs to
    /// the cell to its east / south. The eastern and southern grid edges
    /// belong to the last column and row.
    pub fn locate(&self, x: f64, y: f64) -> Option<(usize, usize)> {
        let c = closed_floor(self.col_coord(x), self.ncols);
        let r = closed_floor(self.row_coord(y), self.nrows);

        if !c.is_finite() || !r.is_finite() {
            return None;
        }
        if c < 0.0 || r < 0.0 || c >= self.ncols as f64 || r >= self.nrows as f64 {
            return None;
        }

        Some((r as usize, c as usize))
    }

    /// Check that two geometries describe the same cells.
    ///
    /// `ncols`/`nrows` must be equal, cell sizes equal to a relative 1e-9 and
    /// corners within `corner_tolerance * cellsize`.
    pub fn ensure_matches(&self, other: &GridGeometry, corner_tolerance: f64) -> ExchangeResult<()> {
        if self.ncols != other.ncols || self.nrows != other.nrows {
            return Err(ExchangeError::GeometryMismatch(format!(
                "grid shapes differ: {}x{} vs {}x{}",
                self.ncols, self.nrows, other.ncols, other.nrows
            )));
        }

        let size_tol = 1e-9 * self.cellsize.abs().max(other.cellsize.abs());
        if (self.cellsize - other.cellsize).abs() > size_tol {
            return Err(ExchangeError::GeometryMismatch(format!(
                "cell sizes differ: {} vs {}",
                self.cellsize, other.cellsize
            )));
        }

        let corner_tol = corner_tolerance * self.cellsize;
        let dx = (self.xllcorner - other.xllcorner).abs();
        let dy = (self.yllcorner - other.yllcorner).abs();
        if dx > corner_tol || dy > corner_tol {
            return Err(ExchangeError::GeometryMismatch(format!(
                "lower-left corners differ by ({}, {}), tolerance {}",
                dx, dy, corner_tol
            )));
        }

        Ok(())
    }
}

/// `floor(coord)`, except that the far edge `coord == n` maps to `n - 1`.
fn closed_floor(coord: f64, n: usize) -> f64 {
    if coord == n as f64 {
        coord - 1.0
    } else {
        coord.floor()
    }
}

/// A raster of scalar values over a [`GridGeometry`].
///
/// Invalid cells are stored as `NaN`; `nodata` is only the sentinel used by
/// the external representation.
#[derive(Debug, Clone)]
pub struct RasterGrid {
    geometry: GridGeometry,
    nodata: f64,
    cells: Vec<f64>,
}

impl RasterGrid {
    /// Build a grid from internal cell values (`NaN` = invalid).
    pub fn new(geometry: GridGeometry, nodata: f64, cells: Vec<f64>) -> ExchangeResult<Self> {
        if cells.len() != geometry.len() {
            return Err(ExchangeError::StructuralMismatch(format!(
                "grid of {}x{} needs {} cells, got {}",
                geometry.ncols,
                geometry.nrows,
                geometry.len(),
                cells.len()
            )));
        }
        Ok(Self {
            geometry,
            nodata,
            cells,
        })
    }

    /// Build a grid from external values, turning the sentinel into `NaN`.
    pub fn from_external(geometry: GridGeometry, nodata: f64, raw: Vec<f64>) -> ExchangeResult<Self> {
        let cells = raw
            .into_iter()
            .map(|v| if v == nodata || v.is_nan() { f64::NAN } else { v })
            .collect();
        Self::new(geometry, nodata, cells)
    }

    /// A grid where every cell is invalid.
    pub fn invalid(geometry: GridGeometry, nodata: f64) -> Self {
        Self {
            geometry,
            nodata,
            cells: vec![f64::NAN; geometry.len()],
        }
    }

    /// Same header, new cell values.
    pub fn with_cells(&self, cells: Vec<f64>) -> ExchangeResult<Self> {
        Self::new(self.geometry, self.nodata, cells)
    }

    pub fn geometry(&self) -> &GridGeometry {
        &self.geometry
    }

    pub fn nodata(&self) -> f64 {
        self.nodata
    }

    pub fn ncols(&self) -> usize {
        self.geometry.ncols
    }

    pub fn nrows(&self) -> usize {
        self.geometry.nrows
    }

    /// Internal values in row-major order.
    pub fn cells(&self) -> &[f64] {
        &self.cells
    }

    /// Value at a cell, `None` when out of range or invalid.
    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        if row >= self.geometry.nrows || col >= self.geometry.ncols {
            return None;
        }
        let v = self.cells[self.geometry.flat_index(row, col)];
        if v.is_nan() {
            None
        } else {
            Some(v)
        }
    }

    /// Number of valid cells.
    pub fn valid_count(&self) -> usize {
        self.cells.iter().filter(|v| !v.is_nan()).count()
    }

    /// Values as they appear in the external representation.
    pub fn external_cells(&self) -> impl Iterator<Item = f64> + '_ {
        let nodata = self.nodata;
        self.cells
            .iter()
            .map(move |&v| if v.is_nan() { nodata } else { v })
    }
}
