//! Grid summaries for inspection output.

use exchange_common::{GridGeometry, RasterGrid};
use serde::Serialize;

/// Shape, extent and value range of a grid.
#[derive(Debug, Clone, Serialize)]
pub struct GridSummary {
    pub geometry: GridGeometry,
    pub nodata: f64,
    pub valid_cells: usize,
    pub invalid_cells: usize,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub mean: Option<f64>,
}

/// Summarize a grid.
pub fn summarize(grid: &RasterGrid) -> GridSummary {
    let mut count = 0usize;
    let mut sum = 0.0;
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;

    for &v in grid.cells().iter().filter(|v| !v.is_nan()) {
        count += 1;
        sum += v;
        min = min.min(v);
        max = max.max(v);
    }

    let has_values = count > 0;
    GridSummary {
        geometry: *grid.geometry(),
        nodata: grid.nodata(),
        valid_cells: count,
        invalid_cells: grid.geometry().len() - count,
        min: has_values.then_some(min),
        max: has_values.then_some(max),
        mean: has_values.then(|| sum / count as f64),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary() {
        let geometry = GridGeometry::new(2, 2, 0.0, 0.0, 1.0).unwrap();
        let grid = RasterGrid::new(geometry, 9999.0, vec![1.0, f64::NAN, 3.0, 8.0]).unwrap();
        let summary = summarize(&grid);
        assert_eq!(summary.valid_cells, 3);
        assert_eq!(summary.invalid_cells, 1);
        assert_eq!(summary.min, Some(1.0));
        assert_eq!(summary.max, Some(8.0));
        assert_eq!(summary.mean, Some(4.0));
    }
}
