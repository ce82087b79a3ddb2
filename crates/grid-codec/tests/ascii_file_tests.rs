//! File-level tests for the ASCII grid codec.

use exchange_common::{ExchangeError, NodataConfig, NodataMismatchPolicy};
use grid_codec::{read_ascii_grid, stage_ascii_grid_file, write_ascii_grid_file};
use test_utils::{fixtures, SyntheticGrid, TestDir};

#[test]
fn test_read_fixture_file() {
    let dir = TestDir::new();
    let path = dir.write("mh.asc", fixtures::GRID_3X2);

    let grid = read_ascii_grid(&path, &NodataConfig::default()).unwrap();
    assert_eq!(grid.ncols(), 3);
    assert_eq!(grid.nrows(), 2);
    assert_eq!(grid.geometry().y_max(), 220.0);
    assert_eq!(grid.get(0, 0), Some(1.5));
    assert_eq!(grid.get(1, 1), None);
}

#[test]
fn test_write_read_reproduces_header_exactly() {
    let dir = TestDir::new();
    let synthetic = SyntheticGrid::patterned(7, 5, 612_345.123_456_789, 4_765_432.987_654_3, 0.1);
    let path = dir.write("in.asc", &synthetic.to_ascii(9999.0));

    let nodata = NodataConfig::default();
    let grid = read_ascii_grid(&path, &nodata).unwrap();

    let out = dir.join("out.asc");
    write_ascii_grid_file(&grid, &out).unwrap();
    let again = read_ascii_grid(&out, &nodata).unwrap();

    assert_eq!(again.geometry(), grid.geometry());
    assert_eq!(again.cells(), grid.cells());
}

#[test]
fn test_invalid_cells_round_trip_as_sentinel() {
    let dir = TestDir::new();
    let mut synthetic = SyntheticGrid::patterned(2, 2, 0.0, 0.0, 1.0);
    synthetic.values[3] = f64::NAN;
    let path = dir.write("in.asc", &synthetic.to_ascii(-9999.0));

    let nodata = NodataConfig::new(-9999.0);
    let grid = read_ascii_grid(&path, &nodata).unwrap();
    assert_eq!(grid.valid_count(), 3);

    let out = dir.join("out.asc");
    write_ascii_grid_file(&grid, &out).unwrap();
    let text = std::fs::read_to_string(&out).unwrap();
    assert!(text.contains("NODATA_value  -9999"));
    assert!(text.trim_end().ends_with("-9999"));
}

#[test]
fn test_warn_policy_keeps_configured_sentinel() {
    let dir = TestDir::new();
    let path = dir.write("mh.asc", fixtures::GRID_3X2);

    let nodata = NodataConfig::new(-9999.0).with_policy(NodataMismatchPolicy::Warn);
    let grid = read_ascii_grid(&path, &nodata).unwrap();

    // The file's own 9999 is not treated as missing under the configured -9999
    assert_eq!(grid.valid_count(), 6);
    assert_eq!(grid.nodata(), -9999.0);
}

#[test]
fn test_missing_file() {
    let dir = TestDir::new();
    let err = read_ascii_grid(dir.join("absent.asc"), &NodataConfig::default()).unwrap_err();
    assert!(matches!(err, ExchangeError::Io { .. }));
}

#[test]
fn test_failed_write_leaves_no_file() {
    let dir = TestDir::new();
    let path = dir.write("mh.asc", fixtures::GRID_3X2);
    let grid = read_ascii_grid(&path, &NodataConfig::default()).unwrap();

    let target = dir.join("missing_dir").join("out.asc");
    assert!(write_ascii_grid_file(&grid, &target).is_err());
    assert_eq!(dir.file_names(), vec!["mh.asc"]);
}

#[test]
fn test_staged_grid_appears_only_on_persist() {
    let dir = TestDir::new();
    let path = dir.write("mh.asc", fixtures::GRID_3X2);
    let grid = read_ascii_grid(&path, &NodataConfig::default()).unwrap();

    let target = dir.join("staged.asc");
    let staged = stage_ascii_grid_file(&grid, &target).unwrap();
    assert!(!target.exists());

    assert_eq!(staged.persist().unwrap(), target);
    let again = read_ascii_grid(&target, &NodataConfig::default()).unwrap();
    assert_eq!(again.geometry(), grid.geometry());
    assert_eq!(dir.file_names(), vec!["mh.asc", "staged.asc"]);
}

#[test]
fn test_dropped_stage_leaves_no_file() {
    let dir = TestDir::new();
    let path = dir.write("mh.asc", fixtures::GRID_3X2);
    let grid = read_ascii_grid(&path, &NodataConfig::default()).unwrap();

    drop(stage_ascii_grid_file(&grid, dir.join("dropped.asc")).unwrap());
    assert_eq!(dir.file_names(), vec!["mh.asc"]);
}
