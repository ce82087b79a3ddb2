//! Value transfer along a mapping.
//!
//! Invalid inputs (`NaN`) never take part in a reduction; a target with no
//! valid contributor is itself invalid.

use rayon::prelude::*;

use exchange_common::{PixelReducer, RasterGrid, TriangleWeighting};
use mapping_engine::{Mapping, TriangleOverlap};
use mesh_codec::ValueArray;

/// MH→SM: reduce the valid pixels under each triangle to one value.
pub fn aggregate_to_triangles(
    mapping: &Mapping,
    grid: &RasterGrid,
    weighting: TriangleWeighting,
    parallel: bool,
) -> ValueArray {
    let geometry = mapping.geometry();
    let cells = grid.cells();

    let reduce = |triangle: usize| -> f64 {
        let mut sum = 0.0;
        let mut norm = 0.0;
        for p in mapping.pixels_of(triangle) {
            let v = cells[geometry.flat_index(p.row, p.col)];
            if v.is_nan() {
                continue;
            }
            let w = match weighting {
                TriangleWeighting::Unweighted => 1.0,
                TriangleWeighting::AreaWeighted => p.weight,
            };
            sum += w * v;
            norm += w;
        }
        if norm > 0.0 {
            sum / norm
        } else {
            f64::NAN
        }
    };

    let n = mapping.triangle_count();
    let values = if parallel {
        (0..n).into_par_iter().map(reduce).collect()
    } else {
        (0..n).map(reduce).collect()
    };
    ValueArray::new(values)
}

/// SM→MH: reduce the triangles over each pixel to one cell value.
///
/// Returns row-major cells for the mapping's geometry.
pub fn aggregate_to_pixels(
    mapping: &Mapping,
    values: &ValueArray,
    reducer: PixelReducer,
    parallel: bool,
) -> Vec<f64> {
    let values = values.as_slice();
    let reduce = |index: usize| reduce_pixel(mapping.triangles_of_index(index), values, reducer);

    let n = mapping.pixel_count();
    if parallel {
        (0..n).into_par_iter().map(reduce).collect()
    } else {
        (0..n).map(reduce).collect()
    }
}

/// Reduce the triangles overlapping one pixel.
pub fn reduce_pixel(entries: &[TriangleOverlap], values: &[f64], reducer: PixelReducer) -> f64 {
    if entries.is_empty() {
        return f64::NAN;
    }
    if reducer == PixelReducer::Count {
        return entries.len() as f64;
    }

    let valid = entries
        .iter()
        .map(|e| (values[e.triangle], e))
        .filter(|(v, _)| !v.is_nan());

    match reducer {
        PixelReducer::Mean => mean(valid.map(|(v, _)| v)),
        PixelReducer::AreaWeightedMean => {
            let (sum, area) = valid.fold((0.0, 0.0), |(s, a), (v, e)| (s + v * e.area, a + e.area));
            if area > 0.0 {
                sum / area
            } else {
                f64::NAN
            }
        }
        PixelReducer::Median => median(valid.map(|(v, _)| v).collect()),
        PixelReducer::Min => valid.map(|(v, _)| v).reduce(f64::min).unwrap_or(f64::NAN),
        PixelReducer::Max => valid.map(|(v, _)| v).reduce(f64::max).unwrap_or(f64::NAN),
        PixelReducer::Sum => valid.map(|(v, _)| v).reduce(|a, b| a + b).unwrap_or(f64::NAN),
        PixelReducer::First => valid.map(|(v, _)| v).next().unwrap_or(f64::NAN),
        PixelReducer::Mode => mode(valid.map(|(v, _)| v).collect()),
        PixelReducer::Count => entries.len() as f64,
    }
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 {
        f64::NAN
    } else {
        sum / n as f64
    }
}

fn median(mut values: Vec<f64>) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}

/// Most frequent value; ties go to the smallest.
fn mode(mut values: Vec<f64>) -> f64 {
    values.sort_by(f64::total_cmp);

    let mut best = f64::NAN;
    let mut best_run = 0;
    let mut i = 0;
    while i < values.len() {
        let run = values[i..].iter().take_while(|&&v| v == values[i]).count();
        if run > best_run {
            best = values[i];
            best_run = run;
        }
        i += run;
    }
    best
}
