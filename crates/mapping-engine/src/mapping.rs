//! Sparse triangle/pixel mapping.
//!
//! A [`Mapping`] is built from geometry alone and stored twice in compressed
//! row form: per triangle the pixels it overlaps, per pixel the triangles
//! overlapping it. Both sides are ordered (pixel side by triangle index), so
//! the result does not depend on whether it was built in parallel.

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info};

use crate::geometry::{overlap_area, polygon_area};
use exchange_common::{GridGeometry, MappingMethod};
use mesh_codec::{Mesh, Triangle};

/// Overlaps below `NOISE_FLOOR · cellsize²` are clipping round-off.
const NOISE_FLOOR: f64 = 1e-12;

/// A pixel overlapped by a triangle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PixelOverlap {
    pub row: usize,
    pub col: usize,
    /// Overlap area in world units.
    pub area: f64,
    /// Fraction of the triangle's area inside the pixel.
    pub weight: f64,
}

/// A triangle overlapping a pixel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TriangleOverlap {
    pub triangle: usize,
    pub area: f64,
    pub weight: f64,
}

/// Triangle/pixel relation for one mesh placement over one grid.
#[derive(Debug, Clone, PartialEq)]
pub struct Mapping {
    method: MappingMethod,
    geometry: GridGeometry,
    triangle_offsets: Vec<usize>,
    triangle_entries: Vec<PixelOverlap>,
    pixel_offsets: Vec<usize>,
    pixel_entries: Vec<TriangleOverlap>,
}

/// Counts describing a mapping.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MappingSummary {
    pub method: MappingMethod,
    pub triangles: usize,
    pub pixels: usize,
    pub entries: usize,
    /// Triangles without any pixel.
    pub unmapped_triangles: usize,
    /// Pixels with at least one triangle.
    pub covered_pixels: usize,
}

impl Mapping {
    /// Assemble a mapping from per-triangle entries, in global triangle order.
    pub fn from_triangle_entries(
        method: MappingMethod,
        geometry: GridGeometry,
        per_triangle: Vec<Vec<PixelOverlap>>,
    ) -> Self {
        let mut triangle_offsets = Vec::with_capacity(per_triangle.len() + 1);
        let total: usize = per_triangle.iter().map(Vec::len).sum();
        let mut triangle_entries = Vec::with_capacity(total);

        triangle_offsets.push(0);
        for entries in &per_triangle {
            triangle_entries.extend_from_slice(entries);
            triangle_offsets.push(triangle_entries.len());
        }

        // Counting sort into the pixel side; triangles are visited in order
        let mut pixel_offsets = vec![0usize; geometry.len() + 1];
        for e in &triangle_entries {
            pixel_offsets[geometry.flat_index(e.row, e.col) + 1] += 1;
        }
        for i in 1..pixel_offsets.len() {
            pixel_offsets[i] += pixel_offsets[i - 1];
        }

        let mut cursor = pixel_offsets.clone();
        let mut pixel_entries = vec![
            TriangleOverlap {
                triangle: 0,
                area: 0.0,
                weight: 0.0,
            };
            total
        ];
        for (triangle, entries) in per_triangle.iter().enumerate() {
            for e in entries {
                let slot = &mut cursor[geometry.flat_index(e.row, e.col)];
                pixel_entries[*slot] = TriangleOverlap {
                    triangle,
                    area: e.area,
                    weight: e.weight,
                };
                *slot += 1;
            }
        }

        Self {
            method,
            geometry,
            triangle_offsets,
            triangle_entries,
            pixel_offsets,
            pixel_entries,
        }
    }

    pub fn method(&self) -> MappingMethod {
        self.method
    }

    pub fn geometry(&self) -> &GridGeometry {
        &self.geometry
    }

    pub fn triangle_count(&self) -> usize {
        self.triangle_offsets.len() - 1
    }

    pub fn pixel_count(&self) -> usize {
        self.pixel_offsets.len() - 1
    }

    /// Number of (triangle, pixel) pairs.
    pub fn entry_count(&self) -> usize {
        self.triangle_entries.len()
    }

    /// Pixels overlapped by a triangle, in row-major order.
    pub fn pixels_of(&self, triangle: usize) -> &[PixelOverlap] {
        &self.triangle_entries[self.triangle_offsets[triangle]..self.triangle_offsets[triangle + 1]]
    }

    /// Triangles overlapping the pixel at flat index `index`, in triangle order.
    pub fn triangles_of_index(&self, index: usize) -> &[TriangleOverlap] {
        &self.pixel_entries[self.pixel_offsets[index]..self.pixel_offsets[index + 1]]
    }

    pub fn triangles_of(&self, row: usize, col: usize) -> &[TriangleOverlap] {
        self.triangles_of_index(self.geometry.flat_index(row, col))
    }

    pub fn summary(&self) -> MappingSummary {
        let unmapped_triangles = self
            .triangle_offsets
            .windows(2)
            .filter(|w| w[0] == w[1])
            .count();
        let covered_pixels = self
            .pixel_offsets
            .windows(2)
            .filter(|w| w[0] != w[1])
            .count();

        MappingSummary {
            method: self.method,
            triangles: self.triangle_count(),
            pixels: self.pixel_count(),
            entries: self.entry_count(),
            unmapped_triangles,
            covered_pixels,
        }
    }
}

/// Build a mapping with the chosen method. The mesh must already be aligned.
pub fn build_mapping(
    mesh: &Mesh,
    geometry: &GridGeometry,
    method: MappingMethod,
    parallel: bool,
) -> Mapping {
    let per_triangle = match method {
        MappingMethod::Surface => {
            collect_entries(mesh, parallel, |t| surface_entries(t, geometry))
        }
        MappingMethod::Barycenter => {
            collect_entries(mesh, parallel, |t| barycenter_entries(t, geometry))
        }
    };
    let mapping = Mapping::from_triangle_entries(method, *geometry, per_triangle);

    let summary = mapping.summary();
    info!(
        method = %method,
        triangles = summary.triangles,
        entries = summary.entries,
        unmapped_triangles = summary.unmapped_triangles,
        covered_pixels = summary.covered_pixels,
        "Built triangle/pixel mapping"
    );
    mapping
}

/// Exact overlap mapping.
pub fn build_surface(mesh: &Mesh, geometry: &GridGeometry, parallel: bool) -> Mapping {
    build_mapping(mesh, geometry, MappingMethod::Surface, parallel)
}

/// Centroid mapping.
pub fn build_barycenter(mesh: &Mesh, geometry: &GridGeometry, parallel: bool) -> Mapping {
    build_mapping(mesh, geometry, MappingMethod::Barycenter, parallel)
}

fn collect_entries<F>(mesh: &Mesh, parallel: bool, f: F) -> Vec<Vec<PixelOverlap>>
where
    F: Fn(&Triangle) -> Vec<PixelOverlap> + Sync + Send,
{
    if parallel {
        mesh.triangles().par_iter().map(f).collect()
    } else {
        mesh.triangles().iter().map(f).collect()
    }
}

fn surface_entries(triangle: &Triangle, geometry: &GridGeometry) -> Vec<PixelOverlap> {
    let points = triangle.xy();
    let area = polygon_area(&points);
    if !(area > 0.0) {
        debug!(triangle = triangle.global_index, "Skipping degenerate triangle");
        return Vec::new();
    }

    let (min_x, max_x) = min_max(points.iter().map(|p| p.x));
    let (min_y, max_y) = min_max(points.iter().map(|p| p.y));

    let (Some(cols), Some(rows)) = (
        candidate_range(geometry.col_coord(min_x), geometry.col_coord(max_x), geometry.ncols),
        // Rows count down from the north edge
        candidate_range(geometry.row_coord(max_y), geometry.row_coord(min_y), geometry.nrows),
    ) else {
        return Vec::new();
    };

    let floor = NOISE_FLOOR * geometry.cell_area();
    let mut entries = Vec::new();
    for row in rows {
        for col in cols.clone() {
            let overlap = overlap_area(&points, &geometry.cell_bounds(row, col));
            if overlap > floor {
                entries.push(PixelOverlap {
                    row,
                    col,
                    area: overlap,
                    weight: overlap / area,
                });
            }
        }
    }
    entries
}

fn barycenter_entries(triangle: &Triangle, geometry: &GridGeometry) -> Vec<PixelOverlap> {
    let c = triangle.centroid_xy();
    match geometry.locate(c.x, c.y) {
        Some((row, col)) => vec![PixelOverlap {
            row,
            col,
            area: triangle.area_xy(),
            weight: 1.0,
        }],
        None => Vec::new(),
    }
}

fn min_max(values: impl Iterator<Item = f64>) -> (f64, f64) {
    values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    })
}

/// Cells `floor(lo)..=floor(hi)` clamped to `0..n`, `None` when disjoint.
fn candidate_range(lo: f64, hi: f64, n: usize) -> Option<std::ops::RangeInclusive<usize>> {
    let first = lo.floor();
    let last = hi.floor();
    if !(last >= 0.0 && first < n as f64) {
        return None;
    }
    Some(first.max(0.0) as usize..=last.min((n - 1) as f64) as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point3;

    fn tri(a: (f64, f64), b: (f64, f64), c: (f64, f64)) -> [Point3<f64>; 3] {
        [
            Point3::new(a.0, a.1, 0.0),
            Point3::new(b.0, b.1, 0.0),
            Point3::new(c.0, c.1, 0.0),
        ]
    }

    fn unit_grid(ncols: usize, nrows: usize) -> GridGeometry {
        GridGeometry::new(ncols, nrows, 0.0, 0.0, 1.0).unwrap()
    }

    #[test]
    fn test_lower_left_triangle_has_full_weight() {
        let mesh = Mesh::from_facets(vec![vec![tri((0.0, 0.0), (1.0, 0.0), (0.0, 1.0))]]);
        let mapping = build_surface(&mesh, &unit_grid(2, 2), false);

        let pixels = mapping.pixels_of(0);
        assert_eq!(pixels.len(), 1);
        assert_eq!((pixels[0].row, pixels[0].col), (1, 0));
        assert_eq!(pixels[0].weight, 1.0);
        assert_eq!(pixels[0].area, 0.5);
        assert_eq!(mapping.triangles_of(1, 0)[0].triangle, 0);
        assert!(mapping.triangles_of(0, 0).is_empty());
    }

    #[test]
    fn test_outside_triangle_has_no_entries() {
        let mesh = Mesh::from_facets(vec![vec![
            tri((0.2, 0.2), (0.8, 0.2), (0.2, 0.8)),
            tri((10.0, 10.0), (11.0, 10.0), (10.0, 11.0)),
            tri((-3.0, 0.5), (-2.0, 0.5), (-3.0, 1.5)),
        ]]);
        for method in [MappingMethod::Surface, MappingMethod::Barycenter] {
            let mapping = build_mapping(&mesh, &unit_grid(2, 2), method, false);
            assert!(mapping.pixels_of(1).is_empty());
            assert!(mapping.pixels_of(2).is_empty());
            assert_eq!(mapping.summary().unmapped_triangles, 2);
        }
    }

    #[test]
    fn test_degenerate_triangle_has_no_surface_entries() {
        let mesh = Mesh::from_facets(vec![vec![tri((0.1, 0.1), (0.5, 0.5), (0.9, 0.9))]]);
        let mapping = build_surface(&mesh, &unit_grid(1, 1), false);
        assert_eq!(mapping.entry_count(), 0);
    }

    #[test]
    fn test_weights_of_straddling_triangle_sum_to_one() {
        let mesh = Mesh::from_facets(vec![vec![tri((0.5, 0.5), (2.5, 0.5), (0.5, 2.5))]]);
        let mapping = build_surface(&mesh, &unit_grid(3, 3), false);

        let total: f64 = mapping.pixels_of(0).iter().map(|p| p.weight).sum();
        assert!((total - 1.0).abs() < 1e-12);
        let area: f64 = mapping.pixels_of(0).iter().map(|p| p.area).sum();
        assert!((area - 2.0).abs() < 1e-12);
        // (0.5,0.5)-(1,1) quarter, plus the rest of the covered cells
        assert!(mapping.pixels_of(0).len() >= 5);
    }

    #[test]
    fn test_pixel_side_is_in_triangle_order() {
        let mesh = Mesh::from_facets(vec![
            vec![tri((0.1, 0.1), (0.4, 0.1), (0.1, 0.4))],
            vec![
                tri((0.5, 0.5), (0.9, 0.5), (0.5, 0.9)),
                tri((0.6, 0.1), (0.9, 0.1), (0.9, 0.4)),
            ],
        ]);
        let mapping = build_surface(&mesh, &unit_grid(1, 1), true);
        let order: Vec<usize> = mapping.triangles_of(0, 0).iter().map(|t| t.triangle).collect();
        assert_eq!(order, vec![0, 1, 2]);
    }

    #[test]
    fn test_barycenter_on_cell_edge_uses_floor() {
        // Centroid at (1.0, 0.5): on the edge between col 0 and col 1
        let mesh = Mesh::from_facets(vec![vec![tri((0.5, 0.0), (1.0, 1.5), (1.5, 0.0))]]);
        let mapping = build_barycenter(&mesh, &unit_grid(2, 1), false);
        let pixels = mapping.pixels_of(0);
        assert_eq!(pixels.len(), 1);
        assert_eq!(pixels[0].col, 1);
        assert_eq!(pixels[0].weight, 1.0);
    }

    #[test]
    fn test_barycenter_on_eastern_grid_edge_maps_to_last_column() {
        // Centroid at (2.0, 0.5): on the eastern edge of a 2x1 grid
        let mesh = Mesh::from_facets(vec![vec![tri((1.5, 0.0), (2.0, 1.5), (2.5, 0.0))]]);
        let mapping = build_barycenter(&mesh, &unit_grid(2, 1), false);
        let pixels = mapping.pixels_of(0);
        assert_eq!(pixels.len(), 1);
        assert_eq!((pixels[0].row, pixels[0].col), (0, 1));
    }

    #[test]
    fn test_candidate_range() {
        assert_eq!(candidate_range(-1.5, 0.5, 3), Some(0..=0));
        assert_eq!(candidate_range(1.2, 7.0, 3), Some(1..=2));
        assert_eq!(candidate_range(3.0, 4.0, 3), None);
        assert_eq!(candidate_range(-2.0, -0.5, 3), None);
    }
}
