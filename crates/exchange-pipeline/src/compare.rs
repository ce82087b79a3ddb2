//! Reference vs reconstructed grid comparison.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::info;

use exchange_common::{
    CompareConfig, ExchangeResult, GridGeometry, NodataConfig, RasterGrid,
};
use grid_codec::{read_ascii_grid, stage_ascii_grid_file};

/// Error statistics plus the three grids they were computed from.
#[derive(Debug, Clone)]
pub struct ComparisonResult {
    /// Cells valid in both grids.
    pub n_valid: usize,
    pub mae: f64,
    pub rmse: f64,
    /// Pearson correlation; `NaN` with fewer than two cells or no variance.
    pub corr: f64,
    pub reference: RasterGrid,
    pub reconstructed: RasterGrid,
    /// `reconstructed - reference` where both are valid.
    pub error: RasterGrid,
}

impl ComparisonResult {
    pub fn summary(&self) -> ComparisonSummary {
        ComparisonSummary {
            n_valid: self.n_valid,
            mae: self.mae,
            rmse: self.rmse,
            corr: self.corr,
            geometry: *self.reference.geometry(),
            reference_valid: self.reference.valid_count(),
            reconstructed_valid: self.reconstructed.valid_count(),
        }
    }
}

/// Serializable view of a [`ComparisonResult`]. `NaN` statistics serialize
/// as `null`.
#[derive(Debug, Clone, Serialize)]
pub struct ComparisonSummary {
    pub n_valid: usize,
    pub mae: f64,
    pub rmse: f64,
    pub corr: f64,
    pub geometry: GridGeometry,
    pub reference_valid: usize,
    pub reconstructed_valid: usize,
}

/// Compare two grids cell by cell.
///
/// Fails with a geometry mismatch unless both grids describe the same cells,
/// and with a configuration inconsistency when their sentinels differ (subject
/// to `nodata.mismatch_policy`).
pub fn compare(
    reference: &RasterGrid,
    reconstructed: &RasterGrid,
    nodata: &NodataConfig,
    config: &CompareConfig,
) -> ExchangeResult<ComparisonResult> {
    reference
        .geometry()
        .ensure_matches(reconstructed.geometry(), config.corner_tolerance)?;
    NodataConfig::new(reference.nodata())
        .with_policy(nodata.mismatch_policy)
        .check_declared(reconstructed.nodata(), "reconstructed grid")?;

    let error: Vec<f64> = reference
        .cells()
        .iter()
        .zip(reconstructed.cells())
        .map(|(r, c)| c - r)
        .collect();

    let pairs: Vec<(f64, f64)> = reference
        .cells()
        .iter()
        .zip(reconstructed.cells())
        .filter(|(r, c)| !r.is_nan() && !c.is_nan())
        .map(|(&r, &c)| (r, c))
        .collect();

    let n_valid = pairs.len();
    let (mae, rmse) = if n_valid == 0 {
        (f64::NAN, f64::NAN)
    } else {
        let n = n_valid as f64;
        let abs: f64 = pairs.iter().map(|(r, c)| (c - r).abs()).sum();
        let sq: f64 = pairs.iter().map(|(r, c)| (c - r).powi(2)).sum();
        (abs / n, (sq / n).sqrt())
    };
    let corr = pearson(&pairs);

    info!(n_valid, mae, rmse, corr, "Compared grids");

    Ok(ComparisonResult {
        n_valid,
        mae,
        rmse,
        corr,
        reference: reference.clone(),
        reconstructed: reconstructed.clone(),
        // NaN - x and x - NaN stay NaN, so invalid cells stay invalid
        error: reference.with_cells(error)?,
    })
}

/// Read two grid files and compare them. With `output_base`, the three
/// grids are written as `<base>_mh_ref.asc`, `<base>_mh_reconstructed.asc`
/// and `<base>_mh_error.asc`.
pub fn compare_files(
    reference_path: &Path,
    reconstructed_path: &Path,
    output_base: Option<&Path>,
    nodata: &NodataConfig,
    config: &CompareConfig,
) -> ExchangeResult<ComparisonResult> {
    let reference = read_ascii_grid(reference_path, nodata)?;
    let reconstructed = read_ascii_grid(reconstructed_path, nodata)?;
    let result = compare(&reference, &reconstructed, nodata, config)?;

    if let Some(base) = output_base {
        write_comparison_grids(&result, base)?;
    }
    Ok(result)
}

/// Write the reference, reconstructed and error grids next to `base`.
///
/// All three are staged before any is moved into place, so a failed write
/// leaves none of them behind.
pub fn write_comparison_grids(result: &ComparisonResult, base: &Path) -> ExchangeResult<[PathBuf; 3]> {
    let paths = comparison_paths(base);
    let staged = [
        stage_ascii_grid_file(&result.reference, &paths[0])?,
        stage_ascii_grid_file(&result.reconstructed, &paths[1])?,
        stage_ascii_grid_file(&result.error, &paths[2])?,
    ];
    for file in staged {
        file.persist()?;
    }
    Ok(paths)
}

/// `<base>_mh_ref.asc`, `<base>_mh_reconstructed.asc`, `<base>_mh_error.asc`.
pub fn comparison_paths(base: &Path) -> [PathBuf; 3] {
    let stem = base
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    ["ref", "reconstructed", "error"].map(|kind| base.with_file_name(format!("{}_mh_{}.asc", stem, kind)))
}

fn pearson(pairs: &[(f64, f64)]) -> f64 {
    if pairs.len() < 2 {
        return f64::NAN;
    }

    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|p| p.1).sum::<f64>() / n;

    let (mut cov, mut var_x, mut var_y) = (0.0, 0.0, 0.0);
    for &(x, y) in pairs {
        let dx = x - mean_x;
        let dy = y - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_x == 0.0 || var_y == 0.0 {
        return f64::NAN;
    }
    cov / (var_x.sqrt() * var_y.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use exchange_common::{ExchangeError, NodataMismatchPolicy};

    fn grid(cells: Vec<f64>) -> RasterGrid {
        let geometry = GridGeometry::new(2, 2, 0.0, 0.0, 1.0).unwrap();
        RasterGrid::new(geometry, 9999.0, cells).unwrap()
    }

    #[test]
    fn test_self_comparison() {
        let a = grid(vec![1.0, 2.0, f64::NAN, 4.0]);
        let result = compare(&a, &a, &NodataConfig::default(), &CompareConfig::default()).unwrap();
        assert_eq!(result.n_valid, 3);
        assert_eq!(result.mae, 0.0);
        assert_eq!(result.rmse, 0.0);
        assert!((result.corr - 1.0).abs() < 1e-12);
        assert_eq!(result.error.valid_count(), 3);
    }

    #[test]
    fn test_known_errors() {
        let reference = grid(vec![1.0, 2.0, 3.0, 4.0]);
        let reconstructed = grid(vec![2.0, 2.0, 3.0, f64::NAN]);
        let result = compare(&reference, &reconstructed, &NodataConfig::default(), &CompareConfig::default())
            .unwrap();

        assert_eq!(result.n_valid, 3);
        assert!((result.mae - 1.0 / 3.0).abs() < 1e-12);
        assert!((result.rmse - (1.0f64 / 3.0).sqrt()).abs() < 1e-12);
        assert!(result.mae <= result.rmse);
        assert_eq!(result.error.get(0, 0), Some(1.0));
        assert_eq!(result.error.get(1, 1), None);
    }

    #[test]
    fn test_constant_grid_has_no_correlation() {
        let a = grid(vec![5.0; 4]);
        let result = compare(&a, &a, &NodataConfig::default(), &CompareConfig::default()).unwrap();
        assert!(result.corr.is_nan());
        assert_eq!(result.mae, 0.0);
    }

    #[test]
    fn test_no_common_valid_cells() {
        let a = grid(vec![1.0, f64::NAN, f64::NAN, f64::NAN]);
        let b = grid(vec![f64::NAN, 1.0, f64::NAN, f64::NAN]);
        let result = compare(&a, &b, &NodataConfig::default(), &CompareConfig::default()).unwrap();
        assert_eq!(result.n_valid, 0);
        assert!(result.mae.is_nan());
        assert!(result.rmse.is_nan());
        assert!(result.corr.is_nan());
    }

    #[test]
    fn test_shape_mismatch() {
        let a = grid(vec![1.0; 4]);
        let b = RasterGrid::new(GridGeometry::new(4, 1, 0.0, 0.0, 1.0).unwrap(), 9999.0, vec![1.0; 4])
            .unwrap();
        let err = compare(&a, &b, &NodataConfig::default(), &CompareConfig::default()).unwrap_err();
        assert!(matches!(err, ExchangeError::GeometryMismatch(_)));
    }

    #[test]
    fn test_corner_drift_within_tolerance() {
        let a = grid(vec![1.0; 4]);
        let shifted = GridGeometry::new(2, 2, 1e-9, 0.0, 1.0).unwrap();
        let b = RasterGrid::new(shifted, 9999.0, vec![1.0; 4]).unwrap();
        assert!(compare(&a, &b, &NodataConfig::default(), &CompareConfig::default()).is_ok());

        let far = GridGeometry::new(2, 2, 0.5, 0.0, 1.0).unwrap();
        let c = RasterGrid::new(far, 9999.0, vec![1.0; 4]).unwrap();
        assert!(compare(&a, &c, &NodataConfig::default(), &CompareConfig::default()).is_err());
    }

    #[test]
    fn test_sentinel_mismatch() {
        let a = grid(vec![1.0; 4]);
        let b = RasterGrid::new(*a.geometry(), -9999.0, vec![1.0; 4]).unwrap();

        let err = compare(&a, &b, &NodataConfig::default(), &CompareConfig::default()).unwrap_err();
        assert!(matches!(err, ExchangeError::ConfigurationInconsistency(_)));

        let lenient = NodataConfig::default().with_policy(NodataMismatchPolicy::Warn);
        assert!(compare(&a, &b, &lenient, &CompareConfig::default()).is_ok());
    }

    #[test]
    fn test_comparison_paths() {
        let paths = comparison_paths(Path::new("out/run1"));
        assert_eq!(paths[0], PathBuf::from("out/run1_mh_ref.asc"));
        assert_eq!(paths[1], PathBuf::from("out/run1_mh_reconstructed.asc"));
        assert_eq!(paths[2], PathBuf::from("out/run1_mh_error.asc"));
    }
}
