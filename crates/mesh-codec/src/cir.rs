//! `.cir` mesh description format.
//!
//! ```text
//! f<label> <n>          facet header, n triangles follow
//! <a> <b> <c>           optional facet attribute
//! c<k>                  contour (one per triangle)
//! 4                     point count: 3, or 4 with the ring closed
//! x y z
//! ...
//! ```
//!
//! Lines before the first facet header are a free-form preamble.

use std::path::Path;

use nalgebra::Point3;
use tracing::debug;

use crate::mesh::{Mesh, MeshBuilder};
use exchange_common::{ExchangeError, ExchangeResult};

/// Maximum distance between the first and closing point of a 4-point contour.
const RING_CLOSURE_TOLERANCE: f64 = 1e-9;

/// Read a `.cir` file.
pub fn read_cir<P: AsRef<Path>>(path: P) -> ExchangeResult<Mesh> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|e| ExchangeError::io(path, e))?;
    parse_cir(&text, &path.display().to_string())
}

/// Parse `.cir` text. `source_name` labels errors.
pub fn parse_cir(text: &str, source_name: &str) -> ExchangeResult<Mesh> {
    let mut lines = text
        .lines()
        .enumerate()
        .map(|(i, l)| (i + 1, l.trim()))
        .filter(|(_, l)| !l.is_empty())
        .peekable();
    let mut builder = MeshBuilder::new();

    while let Some((line_no, line)) = lines.next() {
        if let Some((label, declared)) = parse_facet_header(line) {
            builder.check_current()?;
            builder.begin_facet(label, declared);

            if let Some(attribute) = lines.peek().and_then(|&(_, next)| parse_triple(next)) {
                builder.set_attribute(attribute);
                lines.next();
            }
            continue;
        }

        let Some((facet, declared)) = builder.current() else {
            // Preamble
            continue;
        };

        if !line.starts_with('c') {
            return Err(ExchangeError::format(
                source_name,
                line_no,
                format!("unexpected line in facet f{}: '{}'", facet.label, line),
            ));
        }
        if facet.len == declared {
            return Err(ExchangeError::StructuralMismatch(format!(
                "{}:{}: facet f{} declares {} triangles but contains more",
                source_name, line_no, facet.label, declared
            )));
        }

        let (count_line, count_text) = lines.next().ok_or_else(|| {
            ExchangeError::format_at_end(source_name, format!("contour '{}' has no point count", line))
        })?;
        let count: usize = count_text.parse().map_err(|_| {
            ExchangeError::format(
                source_name,
                count_line,
                format!("invalid point count '{}'", count_text),
            )
        })?;
        if !(3..=4).contains(&count) {
            return Err(ExchangeError::format(
                source_name,
                count_line,
                format!(
                    "triangle must have exactly three vertices (contour '{}' declares {} points)",
                    line, count
                ),
            ));
        }

        let mut points = Vec::with_capacity(count);
        for _ in 0..count {
            let (point_line, point_text) = lines.next().ok_or_else(|| {
                ExchangeError::format_at_end(
                    source_name,
                    format!("contour '{}' ends before its {} points", line, count),
                )
            })?;
            let [x, y, z] = parse_triple(point_text).ok_or_else(|| {
                ExchangeError::format(
                    source_name,
                    point_line,
                    format!("expected 'x y z', found '{}'", point_text),
                )
            })?;
            points.push(Point3::new(x, y, z));
        }

        let vertices = triangle_from_contour(&points).ok_or_else(|| {
            ExchangeError::format(
                source_name,
                line_no,
                format!(
                    "triangle must have exactly three vertices (contour '{}' has {} points)",
                    line, count
                ),
            )
        })?;
        builder.push_triangle(vertices);
    }

    let mesh = builder.build()?;
    debug!(
        source = source_name,
        facets = mesh.facet_count(),
        triangles = mesh.triangle_count(),
        "Parsed mesh"
    );
    Ok(mesh)
}

/// `f<label> <n>` → `(label, n)`.
pub(crate) fn parse_facet_header(line: &str) -> Option<(String, usize)> {
    let rest = line.strip_prefix('f')?;
    let mut tokens = rest.split_whitespace();
    let label = tokens.next()?;
    if !label.bytes().all(|b| b.is_ascii_digit()) || !rest.starts_with(label) {
        return None;
    }
    let count = tokens.next()?.parse().ok()?;
    Some((label.to_string(), count))
}

/// First three numbers of a line; `None` if there are fewer or any is not a
/// number.
fn parse_triple(line: &str) -> Option<[f64; 3]> {
    let mut tokens = line.split_whitespace();
    let mut out = [0.0; 3];
    for slot in &mut out {
        *slot = tokens.next()?.parse().ok()?;
    }
    Some(out)
}

fn triangle_from_contour(points: &[Point3<f64>]) -> Option<[Point3<f64>; 3]> {
    match points {
        [a, b, c] => Some([*a, *b, *c]),
        [a, b, c, d] if (d - a).norm() <= RING_CLOSURE_TOLERANCE => Some([*a, *b, *c]),
        _ => None,
    }
}
