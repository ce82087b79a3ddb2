//! ESRI ASCII grid format.
//!
//! ```text
//! ncols         4
//! nrows         3
//! xllcorner     1000.0
//! yllcorner     2000.0
//! cellsize      25.0
//! NODATA_value  9999
//! 1 2 3 4
//! 5 6 7 9999
//! ...
//! ```
//!
//! Data lines are written north to south. `xllcenter`/`yllcenter` are
//! accepted in place of the corner keys.

use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use exchange_common::{ExchangeError, ExchangeResult, GridGeometry, NodataConfig, RasterGrid};
use tracing::debug;

/// Upper bound on the cell buffer reserved from the header before any row is read.
const MAX_PREALLOCATED_CELLS: usize = 1 << 20;

#[derive(Default)]
struct Header {
    ncols: Option<usize>,
    nrows: Option<usize>,
    xll: Option<Anchor>,
    yll: Option<Anchor>,
    cellsize: Option<f64>,
    nodata: Option<f64>,
}

/// A lower-left coordinate given either as a cell corner or a cell center.
#[derive(Clone, Copy)]
enum Anchor {
    Corner(f64),
    Center(f64),
}

impl Anchor {
    fn corner(self, cellsize: f64) -> f64 {
        match self {
            Anchor::Corner(v) => v,
            Anchor::Center(v) => v - 0.5 * cellsize,
        }
    }
}

/// Read an ASCII grid file.
pub fn read_ascii_grid<P: AsRef<Path>>(path: P, nodata: &NodataConfig) -> ExchangeResult<RasterGrid> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|e| ExchangeError::io(path, e))?;
    parse_ascii_grid(&text, &path.display().to_string(), nodata)
}

/// Parse ASCII grid text. `source_name` labels errors.
pub fn parse_ascii_grid(
    text: &str,
    source_name: &str,
    nodata: &NodataConfig,
) -> ExchangeResult<RasterGrid> {
    let mut header = Header::default();
    let mut lines = text
        .lines()
        .enumerate()
        .map(|(i, l)| (i + 1, l.trim()))
        .filter(|(_, l)| !l.is_empty())
        .peekable();

    // Header: every leading line whose first token is not a number
    while let Some(&(line_no, line)) = lines.peek() {
        let mut tokens = line.split_whitespace();
        let key = match tokens.next() {
            Some(k) => k,
            None => break,
        };
        if key.parse::<f64>().is_ok() {
            break;
        }
        lines.next();

        let value = tokens.next().ok_or_else(|| {
            ExchangeError::format(source_name, line_no, format!("header field '{}' has no value", key))
        })?;
        parse_header_field(&mut header, key, value, source_name, line_no)?;
    }

    let geometry = finish_header(&header, source_name)?;
    let declared_nodata = header
        .nodata
        .ok_or_else(|| ExchangeError::format_at_end(source_name, "missing header field 'NODATA_value'"))?;
    nodata.check_declared(declared_nodata, source_name)?;

    let mut cells = Vec::with_capacity(geometry.len().min(MAX_PREALLOCATED_CELLS));
    let mut rows_read = 0usize;

    for (line_no, line) in lines {
        if rows_read == geometry.nrows {
            return Err(ExchangeError::format(
                source_name,
                line_no,
                format!("more than {} data rows", geometry.nrows),
            ));
        }

        let before = cells.len();
        for token in line.split_whitespace() {
            let v: f64 = token.parse().map_err(|_| {
                ExchangeError::format(source_name, line_no, format!("'{}' is not a number", token))
            })?;
            cells.push(if nodata.is_sentinel(v) || v.is_nan() { f64::NAN } else { v });
        }

        let found = cells.len() - before;
        if found != geometry.ncols {
            return Err(ExchangeError::format(
                source_name,
                line_no,
                format!("expected {} cells, found {}", geometry.ncols, found),
            ));
        }
        rows_read += 1;
    }

    if rows_read != geometry.nrows {
        return Err(ExchangeError::format_at_end(
            source_name,
            format!("expected {} data rows, found {}", geometry.nrows, rows_read),
        ));
    }

    debug!(
        source = source_name,
        ncols = geometry.ncols,
        nrows = geometry.nrows,
        cellsize = geometry.cellsize,
        "Parsed ASCII grid"
    );

    RasterGrid::new(geometry, nodata.value, cells)
}

fn parse_header_field(
    header: &mut Header,
    key: &str,
    value: &str,
    source_name: &str,
    line_no: usize,
) -> ExchangeResult<()> {
    let number = |v: &str| -> ExchangeResult<f64> {
        v.parse::<f64>().map_err(|_| {
            ExchangeError::format(
                source_name,
                line_no,
                format!("header field '{}' has non-numeric value '{}'", key, v),
            )
        })
    };
    let count = |v: &str| -> ExchangeResult<usize> {
        let n = number(v)?;
        if n.fract() != 0.0 || n < 1.0 || n > usize::MAX as f64 {
            return Err(ExchangeError::format(
                source_name,
                line_no,
                format!("header field '{}' must be a positive integer, got '{}'", key, v),
            ));
        }
        Ok(n as usize)
    };
    let duplicate = || {
        ExchangeError::format(source_name, line_no, format!("duplicate header field '{}'", key))
    };

    match key.to_lowercase().as_str() {
        "ncols" => {
            if header.ncols.replace(count(value)?).is_some() {
                return Err(duplicate());
            }
        }
        "nrows" => {
            if header.nrows.replace(count(value)?).is_some() {
                return Err(duplicate());
            }
        }
        "xllcorner" => {
            if header.xll.replace(Anchor::Corner(number(value)?)).is_some() {
                return Err(duplicate());
            }
        }
        "xllcenter" => {
            if header.xll.replace(Anchor::Center(number(value)?)).is_some() {
                return Err(duplicate());
            }
        }
        "yllcorner" => {
            if header.yll.replace(Anchor::Corner(number(value)?)).is_some() {
                return Err(duplicate());
            }
        }
        "yllcenter" => {
            if header.yll.replace(Anchor::Center(number(value)?)).is_some() {
                return Err(duplicate());
            }
        }
        "cellsize" => {
            let cellsize = number(value)?;
            if !(cellsize.is_finite() && cellsize > 0.0) {
                return Err(ExchangeError::format(
                    source_name,
                    line_no,
                    format!("cellsize must be positive, got '{}'", value),
                ));
            }
            if header.cellsize.replace(cellsize).is_some() {
                return Err(duplicate());
            }
        }
        "nodata_value" => {
            if header.nodata.replace(number(value)?).is_some() {
                return Err(duplicate());
            }
        }
        _ => {
            return Err(ExchangeError::format(
                source_name,
                line_no,
                format!("unknown header field '{}'", key),
            ))
        }
    }

    Ok(())
}

fn finish_header(header: &Header, source_name: &str) -> ExchangeResult<GridGeometry> {
    let missing = |field: &str| {
        ExchangeError::format_at_end(source_name, format!("missing header field '{}'", field))
    };

    let ncols = header.ncols.ok_or_else(|| missing("ncols"))?;
    let nrows = header.nrows.ok_or_else(|| missing("nrows"))?;
    let cellsize = header.cellsize.ok_or_else(|| missing("cellsize"))?;
    let xll = header.xll.ok_or_else(|| missing("xllcorner"))?;
    let yll = header.yll.ok_or_else(|| missing("yllcorner"))?;

    GridGeometry::new(
        ncols,
        nrows,
        xll.corner(cellsize),
        yll.corner(cellsize),
        cellsize,
    )
    .map_err(|e| ExchangeError::format_at_end(source_name, e.to_string()))
}

/// Serialize a grid as ASCII grid text.
pub fn write_ascii_grid<W: Write>(grid: &RasterGrid, mut writer: W) -> std::io::Result<()> {
    let geometry = grid.geometry();
    writeln!(writer, "ncols         {}", geometry.ncols)?;
    writeln!(writer, "nrows         {}", geometry.nrows)?;
    writeln!(writer, "xllcorner     {}", geometry.xllcorner)?;
    writeln!(writer, "yllcorner     {}", geometry.yllcorner)?;
    writeln!(writer, "cellsize      {}", geometry.cellsize)?;
    writeln!(writer, "NODATA_value  {}", grid.nodata())?;

    let mut values = grid.external_cells();
    for _ in 0..geometry.nrows {
        let mut first = true;
        for v in values.by_ref().take(geometry.ncols) {
            if !first {
                writer.write_all(b" ")?;
            }
            write!(writer, "{}", v)?;
            first = false;
        }
        writer.write_all(b"\n")?;
    }

    writer.flush()
}

/// Serialize a grid to a `String`.
pub fn format_ascii_grid(grid: &RasterGrid) -> String {
    let mut buffer = Vec::new();
    // Writing into a Vec cannot fail
    let _ = write_ascii_grid(grid, &mut buffer);
    String::from_utf8_lossy(&buffer).into_owned()
}

/// Write a grid file atomically: the destination either receives the complete
/// grid or is left untouched.
pub fn write_ascii_grid_file<P: AsRef<Path>>(grid: &RasterGrid, path: P) -> ExchangeResult<()> {
    stage_ascii_grid_file(grid, path)?.persist()?;
    Ok(())
}

/// A grid fully written to a temporary file in its destination directory.
///
/// Nothing appears at the destination until [`StagedGridFile::persist`];
/// dropping it removes the temporary file.
pub struct StagedGridFile {
    tmp: tempfile::NamedTempFile,
    path: PathBuf,
    cells: usize,
}

impl StagedGridFile {
    /// Move the staged file to its destination.
    pub fn persist(self) -> ExchangeResult<PathBuf> {
        let Self { tmp, path, cells } = self;
        tmp.persist(&path).map_err(|e| ExchangeError::io(&path, e.error))?;
        debug!(path = %path.display(), cells, "Wrote ASCII grid");
        Ok(path)
    }
}

/// Write `grid` next to `path` without making it visible yet.
pub fn stage_ascii_grid_file<P: AsRef<Path>>(
    grid: &RasterGrid,
    path: P,
) -> ExchangeResult<StagedGridFile> {
    let path = path.as_ref();
    if path.is_dir() {
        return Err(ExchangeError::io(
            path,
            std::io::Error::new(std::io::ErrorKind::Other, "destination is a directory"),
        ));
    }
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| ExchangeError::io(dir, e))?;
    {
        let mut writer = BufWriter::new(tmp.as_file_mut());
        write_ascii_grid(grid, &mut writer)
            .and_then(|_| writer.flush())
            .map_err(|e| ExchangeError::io(path, e))?;
    }

    Ok(StagedGridFile {
        tmp,
        path: path.to_path_buf(),
        cells: grid.geometry().len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "ncols 3\nnrows 2\nxllcorner 10.5\nyllcorner -4\ncellsize 0.5\nNODATA_value 9999\n1 2 3\n4 9999 6\n";

    #[test]
    fn test_parse_sample() {
        let grid = parse_ascii_grid(SAMPLE, "sample", &NodataConfig::default()).unwrap();
        let g = grid.geometry();
        assert_eq!((g.ncols, g.nrows), (3, 2));
        assert_eq!(g.xllcorner, 10.5);
        assert_eq!(g.yllcorner, -4.0);
        assert_eq!(g.cellsize, 0.5);
        assert_eq!(grid.get(0, 2), Some(3.0));
        assert_eq!(grid.get(1, 1), None);
        assert_eq!(grid.valid_count(), 5);
    }

    #[test]
    fn test_keys_are_case_insensitive() {
        let text = SAMPLE.replace("ncols", "NCOLS").replace("cellsize", "CellSize");
        assert!(parse_ascii_grid(&text, "sample", &NodataConfig::default()).is_ok());
    }

    #[test]
    fn test_center_anchor_is_converted() {
        let text = SAMPLE
            .replace("xllcorner 10.5", "xllcenter 10.75")
            .replace("yllcorner -4", "yllcenter -3.75");
        let grid = parse_ascii_grid(&text, "sample", &NodataConfig::default()).unwrap();
        assert_eq!(grid.geometry().xllcorner, 10.5);
        assert_eq!(grid.geometry().yllcorner, -4.0);
    }

    #[test]
    fn test_missing_header_field() {
        let text = SAMPLE.replace("cellsize 0.5\n", "");
        let err = parse_ascii_grid(&text, "sample", &NodataConfig::default()).unwrap_err();
        assert!(err.to_string().contains("cellsize"), "{}", err);
    }

    #[test]
    fn test_non_numeric_header_value() {
        let text = SAMPLE.replace("nrows 2", "nrows two");
        let err = parse_ascii_grid(&text, "sample", &NodataConfig::default()).unwrap_err();
        match err {
            ExchangeError::Format { line, .. } => assert_eq!(line, Some(2)),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_short_row_reports_line() {
        let text = SAMPLE.replace("4 9999 6", "4 9999");
        let err = parse_ascii_grid(&text, "sample", &NodataConfig::default()).unwrap_err();
        match err {
            ExchangeError::Format { line, message, .. } => {
                assert_eq!(line, Some(8));
                assert!(message.contains("expected 3 cells, found 2"));
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_missing_rows() {
        let text = SAMPLE.replace("4 9999 6\n", "");
        let err = parse_ascii_grid(&text, "sample", &NodataConfig::default()).unwrap_err();
        assert!(err.to_string().contains("expected 2 data rows, found 1"));
    }

    #[test]
    fn test_extra_rows() {
        let text = format!("{}7 8 9\n", SAMPLE);
        assert!(parse_ascii_grid(&text, "sample", &NodataConfig::default()).is_err());
    }

    #[test]
    fn test_overflowing_shape_is_a_format_error() {
        let text = SAMPLE
            .replace("ncols 3", "ncols 5000000000")
            .replace("nrows 2", "nrows 5000000000");
        let err = parse_ascii_grid(&text, "huge", &NodataConfig::default()).unwrap_err();
        assert!(matches!(err, ExchangeError::Format { .. }), "{}", err);
        assert!(err.to_string().contains("too large"), "{}", err);
    }

    #[test]
    fn test_huge_declared_shape_fails_on_first_row() {
        let text = SAMPLE
            .replace("ncols 3", "ncols 1000000000")
            .replace("nrows 2", "nrows 1000000000");
        match parse_ascii_grid(&text, "huge", &NodataConfig::default()).unwrap_err() {
            ExchangeError::Format { line, message, .. } => {
                assert_eq!(line, Some(7));
                assert!(message.contains("found 3"), "{}", message);
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_sentinel_mismatch_is_refused() {
        let err = parse_ascii_grid(SAMPLE, "sample", &NodataConfig::new(-9999.0)).unwrap_err();
        assert!(matches!(err, ExchangeError::ConfigurationInconsistency(_)));
    }

    #[test]
    fn test_write_then_parse_keeps_geometry() {
        let grid = parse_ascii_grid(SAMPLE, "sample", &NodataConfig::default()).unwrap();
        let text = format_ascii_grid(&grid);
        assert!(text.contains("4 9999 6"));

        let again = parse_ascii_grid(&text, "again", &NodataConfig::default()).unwrap();
        assert_eq!(again.geometry(), grid.geometry());
        assert_eq!(again.valid_count(), grid.valid_count());
    }
}
