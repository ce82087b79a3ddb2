//! `.val` per-triangle value format.
//!
//! ```text
//! 2 2	 1.00 3.00          facet count (twice), value range
//! f1 2
//! 	1.000000
//! 	2.000000
//! f2 1
//! 	3.000000
//! ```

use std::fmt::Write as _;
use std::io::Write as _;
use std::path::Path;

use tracing::debug;

use crate::cir::parse_facet_header;
use crate::values::ValueArray;
use exchange_common::{
    ExchangeError, ExchangeResult, MissingValuePolicy, NodataConfig, ValConfig,
};

/// Contents of a `.val` file: facet grouping plus values in file order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValFile {
    pub facet_sizes: Vec<usize>,
    pub values: ValueArray,
}

impl ValFile {
    pub fn facet_count(&self) -> usize {
        self.facet_sizes.len()
    }
}

/// Read a `.val` file. Values equal to the sentinel come back invalid.
pub fn read_val<P: AsRef<Path>>(path: P, nodata: &NodataConfig) -> ExchangeResult<ValFile> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|e| ExchangeError::io(path, e))?;
    parse_val(&text, &path.display().to_string(), nodata)
}

/// Parse `.val` text. `source_name` labels errors.
pub fn parse_val(text: &str, source_name: &str, nodata: &NodataConfig) -> ExchangeResult<ValFile> {
    let mut lines = text
        .lines()
        .enumerate()
        .map(|(i, l)| (i + 1, l.trim()))
        .filter(|(_, l)| !l.is_empty())
        .peekable();

    // Summary header
    if lines
        .peek()
        .is_some_and(|&(_, line)| parse_facet_header(line).is_none())
    {
        lines.next();
    }

    let mut facet_sizes = Vec::new();
    let mut values = Vec::new();

    while let Some((line_no, line)) = lines.next() {
        let (label, declared) = parse_facet_header(line).ok_or_else(|| {
            ExchangeError::format(
                source_name,
                line_no,
                format!("expected a facet header, found '{}'", line),
            )
        })?;

        for read in 0..declared {
            let truncated = || {
                ExchangeError::StructuralMismatch(format!(
                    "{}: facet f{} declares {} values but contains {}",
                    source_name, label, declared, read
                ))
            };
            let (value_line, value_text) = match lines.peek() {
                Some(&(_, next)) if parse_facet_header(next).is_some() => return Err(truncated()),
                Some(_) => lines.next().ok_or_else(truncated)?,
                None => return Err(truncated()),
            };

            let token = value_text.split_whitespace().next().unwrap_or_default();
            let v: f64 = token.parse().map_err(|_| {
                ExchangeError::format(
                    source_name,
                    value_line,
                    format!("'{}' is not a number", value_text),
                )
            })?;
            values.push(if nodata.is_sentinel(v) { f64::NAN } else { v });
        }
        facet_sizes.push(declared);
    }

    debug!(
        source = source_name,
        facets = facet_sizes.len(),
        values = values.len(),
        "Parsed value file"
    );

    Ok(ValFile {
        facet_sizes,
        values: ValueArray::new(values),
    })
}

/// Serialize values grouped by `facet_sizes`.
///
/// Invalid values are written according to `config.missing_values`; with
/// [`MissingValuePolicy::Reject`] any invalid value fails the call.
pub fn format_val(
    facet_sizes: &[usize],
    values: &ValueArray,
    config: &ValConfig,
    nodata: &NodataConfig,
) -> ExchangeResult<String> {
    let expected: usize = facet_sizes.iter().sum();
    if expected != values.len() {
        return Err(ExchangeError::StructuralMismatch(format!(
            "{} values for {} facets holding {} triangles",
            values.len(),
            facet_sizes.len(),
            expected
        )));
    }

    let missing = values.invalid_count();
    let placeholder = match config.missing_values {
        MissingValuePolicy::Nodata => nodata.value,
        MissingValuePolicy::Zero => 0.0,
        MissingValuePolicy::Reject if missing > 0 => {
            return Err(ExchangeError::MissingValues(missing))
        }
        MissingValuePolicy::Reject => f64::NAN,
    };

    let (vmin, vmax) = values.valid_range().unwrap_or((0.0, 0.0));
    let decimals = config.decimals;
    let mut out = String::with_capacity(16 * (values.len() + facet_sizes.len() + 1));

    // Writing into a String cannot fail
    let _ = writeln!(
        out,
        "{} {}\t {:.2} {:.2}",
        facet_sizes.len(),
        facet_sizes.len(),
        vmin,
        vmax
    );
    let mut next = values.as_slice().iter();
    for (i, &size) in facet_sizes.iter().enumerate() {
        let _ = writeln!(out, "f{} {}", i + 1, size);
        for &v in next.by_ref().take(size) {
            let v = if v.is_nan() { placeholder } else { v };
            let _ = writeln!(out, "\t{:.*}", decimals, v);
        }
    }

    Ok(out)
}

/// Write a `.val` file atomically. Nothing is written when validation fails.
pub fn write_val_file<P: AsRef<Path>>(
    path: P,
    facet_sizes: &[usize],
    values: &ValueArray,
    config: &ValConfig,
    nodata: &NodataConfig,
) -> ExchangeResult<()> {
    let path = path.as_ref();
    let text = format_val(facet_sizes, values, config, nodata)?;

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| ExchangeError::io(dir, e))?;
    tmp.write_all(text.as_bytes())
        .and_then(|_| tmp.flush())
        .map_err(|e| ExchangeError::io(path, e))?;
    tmp.persist(path).map_err(|e| ExchangeError::io(path, e.error))?;

    debug!(
        path = %path.display(),
        facets = facet_sizes.len(),
        values = values.len(),
        "Wrote value file"
    );
    Ok(())
}
