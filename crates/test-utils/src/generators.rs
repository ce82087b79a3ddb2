//! Synthetic rasters and meshes with known pixel/triangle correspondences.
//!
//! The meshes generated here are laid over a grid so that the expected
//! mapping can be written down by hand: [`inset_triangle_mesh`] puts exactly
//! one triangle strictly inside every cell, [`split_cell_mesh`] cuts every
//! cell along its diagonal into two triangles.

/// Three `x y z` vertices.
pub type TriangleXyz = [[f64; 3]; 3];

/// Creates a test grid with predictable values.
///
/// Each cell value is calculated as: `col * 1000 + row`, rows north to south.
///
/// # Example
///
/// ```
/// use test_utils::create_test_grid;
///
/// let grid = create_test_grid(10, 5);
/// assert_eq!(grid.len(), 50);
/// assert_eq!(grid[1], 1000.0);  // col=1, row=0
/// assert_eq!(grid[10], 1.0);    // col=0, row=1
/// ```
pub fn create_test_grid(width: usize, height: usize) -> Vec<f64> {
    let mut data = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            data.push((col * 1000 + row) as f64);
        }
    }
    data
}

/// A raster described by its header fields and row-major values.
#[derive(Debug, Clone)]
pub struct SyntheticGrid {
    pub ncols: usize,
    pub nrows: usize,
    pub xllcorner: f64,
    pub yllcorner: f64,
    pub cellsize: f64,
    /// Row-major, row 0 north. `NaN` is written as the sentinel.
    pub values: Vec<f64>,
}

impl SyntheticGrid {
    /// Grid filled with [`create_test_grid`] values.
    pub fn patterned(ncols: usize, nrows: usize, xllcorner: f64, yllcorner: f64, cellsize: f64) -> Self {
        Self {
            ncols,
            nrows,
            xllcorner,
            yllcorner,
            cellsize,
            values: create_test_grid(ncols, nrows),
        }
    }

    /// Bounds of cell `(row, col)` as `(min_x, min_y, max_x, max_y)`.
    pub fn cell_bounds(&self, row: usize, col: usize) -> (f64, f64, f64, f64) {
        let y_max = self.yllcorner + self.nrows as f64 * self.cellsize;
        let x0 = self.xllcorner + col as f64 * self.cellsize;
        let y1 = y_max - row as f64 * self.cellsize;
        (x0, y1 - self.cellsize, x0 + self.cellsize, y1)
    }

    /// ESRI ASCII grid text using `nodata` for `NaN` cells.
    pub fn to_ascii(&self, nodata: f64) -> String {
        let mut out = format!(
            "ncols         {}\nnrows         {}\nxllcorner     {}\nyllcorner     {}\ncellsize      {}\nNODATA_value  {}\n",
            self.ncols, self.nrows, self.xllcorner, self.yllcorner, self.cellsize, nodata
        );
        for row in self.values.chunks(self.ncols) {
            let line: Vec<String> = row
                .iter()
                .map(|v| if v.is_nan() { nodata.to_string() } else { v.to_string() })
                .collect();
            out.push_str(&line.join(" "));
            out.push('\n');
        }
        out
    }
}

/// A mesh as an ordered list of facets of triangles.
#[derive(Debug, Clone, Default)]
pub struct SyntheticMesh {
    pub facets: Vec<Vec<TriangleXyz>>,
}

impl SyntheticMesh {
    /// Group triangles into facets of at most `facet_size` triangles.
    pub fn from_triangles(triangles: Vec<TriangleXyz>, facet_size: usize) -> Self {
        let facet_size = facet_size.max(1);
        let facets = triangles.chunks(facet_size).map(|c| c.to_vec()).collect();
        Self { facets }
    }

    pub fn triangle_count(&self) -> usize {
        self.facets.iter().map(Vec::len).sum()
    }

    pub fn facet_sizes(&self) -> Vec<usize> {
        self.facets.iter().map(Vec::len).collect()
    }

    /// Same mesh moved by `(dx, dy)`.
    pub fn translated(&self, dx: f64, dy: f64) -> Self {
        let facets = self
            .facets
            .iter()
            .map(|facet| {
                facet
                    .iter()
                    .map(|tri| tri.map(|[x, y, z]| [x + dx, y + dy, z]))
                    .collect()
            })
            .collect();
        Self { facets }
    }

    /// `.cir` text: facet headers with an attribute line, each triangle as a
    /// closed four-point contour.
    pub fn to_cir(&self) -> String {
        let mut out = String::from("scene synthetic\n");
        let mut contour = 1;
        for (i, facet) in self.facets.iter().enumerate() {
            out.push_str(&format!("f{} {}\n", i + 1, facet.len()));
            out.push_str("0 0 1\n");
            for tri in facet {
                out.push_str(&format!("c{}\n4\n", contour));
                for v in tri.iter().chain(std::iter::once(&tri[0])) {
                    out.push_str(&format!("{} {} {}\n", v[0], v[1], v[2]));
                }
                contour += 1;
            }
        }
        out
    }
}

/// One triangle strictly inside every cell, in row-major cell order.
///
/// Triangle `row * ncols + col` lies inside cell `(row, col)`. The insets are
/// symmetric, so the mesh and grid bounding boxes share their center.
pub fn inset_triangle_mesh(grid: &SyntheticGrid, facet_size: usize) -> SyntheticMesh {
    let inset = 0.1 * grid.cellsize;
    let mut triangles = Vec::with_capacity(grid.ncols * grid.nrows);
    for row in 0..grid.nrows {
        for col in 0..grid.ncols {
            let (x0, y0, x1, y1) = grid.cell_bounds(row, col);
            triangles.push([
                [x0 + inset, y0 + inset, 0.0],
                [x1 - inset, y0 + inset, 0.0],
                [x0 + inset, y1 - inset, 0.0],
            ]);
        }
    }
    SyntheticMesh::from_triangles(triangles, facet_size)
}

/// Two triangles per cell covering it exactly; triangles `2k` and `2k + 1`
/// belong to cell `k` in row-major order.
pub fn split_cell_mesh(grid: &SyntheticGrid, facet_size: usize) -> SyntheticMesh {
    let mut triangles = Vec::with_capacity(2 * grid.ncols * grid.nrows);
    for row in 0..grid.nrows {
        for col in 0..grid.ncols {
            let (x0, y0, x1, y1) = grid.cell_bounds(row, col);
            triangles.push([[x0, y0, 0.0], [x1, y0, 0.0], [x0, y1, 0.0]]);
            triangles.push([[x1, y0, 0.0], [x1, y1, 0.0], [x0, y1, 0.0]]);
        }
    }
    SyntheticMesh::from_triangles(triangles, facet_size)
}

/// `.val` text for per-facet values, header included.
pub fn val_text(facets: &[Vec<f64>]) -> String {
    let all: Vec<f64> = facets.iter().flatten().copied().collect();
    let vmin = all.iter().copied().fold(f64::INFINITY, f64::min);
    let vmax = all.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let (vmin, vmax) = if all.is_empty() { (0.0, 0.0) } else { (vmin, vmax) };

    let mut out = format!("{} {}\t {:.2} {:.2}\n", facets.len(), facets.len(), vmin, vmax);
    for (i, facet) in facets.iter().enumerate() {
        out.push_str(&format!("f{} {}\n", i + 1, facet.len()));
        for v in facet {
            out.push_str(&format!("\t{}\n", v));
        }
    }
    out
}
