//! Subcommand handlers.

use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Serialize;
use tracing::info;

use crate::report::{emit, stat};
use crate::OutputFormat;
use exchange_common::ExchangeConfig;
use exchange_pipeline::{
    compare_files, ComparisonSummary, Exchanger, SmToMhReport, TracingPreviewer,
};
use grid_codec::{read_ascii_grid, summarize};
use mesh_codec::{check_val_against_mesh, read_cir, read_val, ValueStats};

fn exchanger(config: ExchangeConfig, preview: bool) -> Result<Exchanger> {
    let exchanger = Exchanger::new(config).context("invalid configuration")?;
    Ok(if preview {
        exchanger.with_previewer(TracingPreviewer)
    } else {
        exchanger
    })
}

pub fn to_sm(
    config: ExchangeConfig,
    preview: bool,
    grid: &Path,
    mesh: &Path,
    out: &Path,
    format: OutputFormat,
) -> Result<()> {
    info!(grid = %grid.display(), mesh = %mesh.display(), "Starting MH to SM exchange");
    let mut exchanger = exchanger(config, preview)?;
    let report = exchanger
        .mh_to_sm_files(grid, mesh, out)
        .with_context(|| format!("MH to SM exchange of {}", grid.display()))?;

    emit("to-sm", &report, format, |r| {
        format!(
            "Wrote {} values ({} facets) to {}\n  offset: ({:.6}, {:.6})\n  triangles without value: {}\n  mapping entries: {}",
            r.triangles,
            r.facets,
            out.display(),
            r.offset.dx,
            r.offset.dy,
            r.invalid_triangles,
            r.mapping_entries
        )
    })
}

pub fn to_mh(
    config: ExchangeConfig,
    preview: bool,
    reference: &Path,
    mesh: &Path,
    values: &Path,
    out: &Path,
    format: OutputFormat,
) -> Result<()> {
    info!(mesh = %mesh.display(), values = %values.display(), "Starting SM to MH exchange");
    let mut exchanger = exchanger(config, preview)?;
    let report = exchanger
        .sm_to_mh_files(reference, mesh, values, out)
        .with_context(|| format!("SM to MH exchange of {}", values.display()))?;

    emit("to-mh", &report, format, |r| to_mh_text(r, reference, out))
}

fn to_mh_text(r: &SmToMhReport, reference: &Path, out: &Path) -> String {
    format!(
        "Wrote {} (geometry from {})\n  valid pixels: {}\n  pixels without triangle value: {}\n  offset: ({:.6}, {:.6})",
        out.display(),
        reference.display(),
        r.valid_pixels,
        r.invalid_pixels,
        r.offset.dx,
        r.offset.dy
    )
}

pub fn compare(
    config: &ExchangeConfig,
    reference: &Path,
    reconstructed: &Path,
    out_base: Option<&Path>,
    format: OutputFormat,
) -> Result<()> {
    let result = compare_files(
        reference,
        reconstructed,
        out_base,
        &config.nodata,
        &config.compare,
    )
    .with_context(|| {
        format!(
            "comparing {} with {}",
            reconstructed.display(),
            reference.display()
        )
    })?;

    emit("compare", &result.summary(), format, comparison_text)
}

pub fn audit(
    config: ExchangeConfig,
    preview: bool,
    reference: &Path,
    mesh: &Path,
    values: &Path,
    out_base: Option<&Path>,
    format: OutputFormat,
) -> Result<()> {
    let mut exchanger = exchanger(config, preview)?;
    let result = exchanger
        .audit_files(reference, mesh, values, out_base)
        .with_context(|| format!("auditing {} against {}", values.display(), reference.display()))?;

    emit("audit", &result.summary(), format, comparison_text)
}

pub fn verify(config: &ExchangeConfig, mesh: &Path, values: &Path, format: OutputFormat) -> Result<()> {
    let mesh = read_cir(mesh)?;
    let val = read_val(values, &config.nodata)?;
    let report = check_val_against_mesh(&mesh.facet_sizes(), &val);

    emit("verify", &report, format, |r| {
        format!(
            "mesh: {} facets, {} triangles\nvalues: {} facets, {} values\nfacets match: {}\ncount match: {}\n{}",
            r.mesh_facets,
            r.mesh_triangles,
            r.val_facets,
            r.val_values,
            r.facets_match,
            r.count_match,
            stats_text(&r.stats)
        )
    })?;

    if !report.is_consistent() {
        bail!("{} does not match {} triangles", values.display(), report.mesh_triangles);
    }
    Ok(())
}

/// File kinds `inspect` understands, by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InspectKind {
    Grid,
    Mesh,
    Values,
}

impl InspectKind {
    fn of(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_string_lossy().to_lowercase();
        match extension.as_str() {
            "asc" | "txt" => Some(Self::Grid),
            "cir" => Some(Self::Mesh),
            "val" => Some(Self::Values),
            _ => None,
        }
    }
}

#[derive(Debug, Serialize)]
struct ValInspection {
    facets: usize,
    stats: ValueStats,
}

pub fn inspect(config: &ExchangeConfig, file: &Path, format: OutputFormat) -> Result<()> {
    let kind = InspectKind::of(file).with_context(|| {
        format!(
            "cannot inspect {} (expected an .asc, .txt, .cir or .val file)",
            file.display()
        )
    })?;

    match kind {
        InspectKind::Grid => {
            let grid = read_ascii_grid(file, &config.nodata)?;
            emit("inspect", &summarize(&grid), format, |s| {
                let opt = |v: Option<f64>| v.map_or("n/a".to_string(), stat);
                format!(
                    "{} x {} cells of {} at ({}, {})\n  NODATA {}\n  valid: {}  invalid: {}\n  min: {}  max: {}  mean: {}",
                    s.geometry.ncols,
                    s.geometry.nrows,
                    s.geometry.cellsize,
                    s.geometry.xllcorner,
                    s.geometry.yllcorner,
                    s.nodata,
                    s.valid_cells,
                    s.invalid_cells,
                    opt(s.min),
                    opt(s.max),
                    opt(s.mean)
                )
            })
        }
        InspectKind::Mesh => {
            let mesh = read_cir(file)?;
            emit("inspect", &mesh.summary(), format, |s| {
                let extent = s.bbox.map_or("empty".to_string(), |b| {
                    format!("[{}, {}] x [{}, {}]", b.min_x, b.max_x, b.min_y, b.max_y)
                });
                format!(
                    "{} facets, {} triangles ({} degenerate)\n  area: {}\n  extent: {}",
                    s.facets,
                    s.triangles,
                    s.degenerate_triangles,
                    stat(s.area_xy),
                    extent
                )
            })
        }
        InspectKind::Values => {
            let val = read_val(file, &config.nodata)?;
            let inspection = ValInspection {
                facets: val.facet_count(),
                stats: val.values.stats(),
            };
            emit("inspect", &inspection, format, |i| {
                format!("{} facets\n{}", i.facets, stats_text(&i.stats))
            })
        }
    }
}

fn comparison_text(s: &ComparisonSummary) -> String {
    format!(
        "{} x {} cells, {} valid in both\n  mae:  {}\n  rmse: {}\n  corr: {}",
        s.geometry.ncols,
        s.geometry.nrows,
        s.n_valid,
        stat(s.mae),
        stat(s.rmse),
        stat(s.corr)
    )
}

fn stats_text(s: &ValueStats) -> String {
    format!(
        "  n: {}  invalid: {}\n  min: {}  max: {}  mean: {}\n  zeros: {}%",
        s.n,
        s.n_invalid,
        stat(s.min),
        stat(s.max),
        stat(s.mean),
        stat(s.pct_zeros)
    )
}
