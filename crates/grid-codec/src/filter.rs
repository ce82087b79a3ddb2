//! Simple raster cleaning before conversion.

use exchange_common::{ExchangeResult, RasterGrid};
use serde::Serialize;
use tracing::debug;

/// Statistics of a k-sigma pass.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct SigmaStats {
    pub mean: f64,
    pub std: f64,
    pub low: f64,
    pub high: f64,
    /// Cells turned invalid by the filter.
    pub removed: usize,
}

/// Invalidate cells outside `mean ± k·std` of the valid cells.
///
/// Uses the population standard deviation. A grid without valid cells is
/// returned unchanged with `NaN` statistics.
pub fn sigma_filter(grid: &RasterGrid, k: f64) -> ExchangeResult<(RasterGrid, SigmaStats)> {
    let valid: Vec<f64> = grid.cells().iter().copied().filter(|v| !v.is_nan()).collect();

    if valid.is_empty() {
        let stats = SigmaStats {
            mean: f64::NAN,
            std: f64::NAN,
            low: f64::NAN,
            high: f64::NAN,
            removed: 0,
        };
        return Ok((grid.clone(), stats));
    }

    let n = valid.len() as f64;
    let mean = valid.iter().sum::<f64>() / n;
    let std = (valid.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n).sqrt();
    let low = mean - k * std;
    let high = mean + k * std;

    let mut removed = 0;
    let cells = grid
        .cells()
        .iter()
        .map(|&v| {
            if !v.is_nan() && (v < low || v > high) {
                removed += 1;
                f64::NAN
            } else {
                v
            }
        })
        .collect();

    debug!(mean, std, k, removed, "Applied sigma filter");

    Ok((
        grid.with_cells(cells)?,
        SigmaStats {
            mean,
            std,
            low,
            high,
            removed,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use exchange_common::GridGeometry;

    #[test]
    fn test_outlier_is_removed() {
        let geometry = GridGeometry::new(10, 1, 0.0, 0.0, 1.0).unwrap();
        let mut values = vec![10.0; 9];
        values.push(1000.0);
        let grid = RasterGrid::new(geometry, 9999.0, values).unwrap();

        let (filtered, stats) = sigma_filter(&grid, 2.0).unwrap();
        assert_eq!(stats.removed, 1);
        assert_eq!(filtered.valid_count(), 9);
        assert_eq!(filtered.get(0, 9), None);
        assert_eq!(filtered.get(0, 0), Some(10.0));
    }

    #[test]
    fn test_all_invalid_grid_is_unchanged() {
        let geometry = GridGeometry::new(2, 2, 0.0, 0.0, 1.0).unwrap();
        let grid = RasterGrid::invalid(geometry, 9999.0);
        let (filtered, stats) = sigma_filter(&grid, 3.0).unwrap();
        assert_eq!(filtered.valid_count(), 0);
        assert!(stats.mean.is_nan());
        assert_eq!(stats.removed, 0);
    }
}
