//! Planar polygon helpers: clipping against a pixel square and areas.

use nalgebra::Point2;

use exchange_common::BoundingBox;

/// Area of a simple polygon (shoelace formula), independent of orientation.
pub fn polygon_area(points: &[Point2<f64>]) -> f64 {
    let n = points.len();
    if n < 3 {
        return 0.0;
    }

    let mut area = 0.0;
    for i in 0..n {
        let j = (i + 1) % n;
        area += points[i].x * points[j].y;
        area -= points[j].x * points[i].y;
    }

    (area / 2.0).abs()
}

/// Sutherland–Hodgman clip of a polygon against an axis-aligned rectangle.
///
/// Returns the vertices of the clipped polygon (possibly fewer than three
/// when the intersection is empty or degenerate).
pub fn clip_to_rect(polygon: &[Point2<f64>], rect: &BoundingBox) -> Vec<Point2<f64>> {
    let mut output = polygon.to_vec();

    output = clip_half_plane(&output, |p| p.x >= rect.min_x, |a, b| at_x(a, b, rect.min_x));
    output = clip_half_plane(&output, |p| p.x <= rect.max_x, |a, b| at_x(a, b, rect.max_x));
    output = clip_half_plane(&output, |p| p.y >= rect.min_y, |a, b| at_y(a, b, rect.min_y));
    output = clip_half_plane(&output, |p| p.y <= rect.max_y, |a, b| at_y(a, b, rect.max_y));

    output
}

/// Area of the part of a triangle inside a rectangle.
pub fn overlap_area(triangle: &[Point2<f64>; 3], rect: &BoundingBox) -> f64 {
    polygon_area(&clip_to_rect(triangle, rect))
}

fn clip_half_plane<I, X>(input: &[Point2<f64>], inside: I, intersect: X) -> Vec<Point2<f64>>
where
    I: Fn(&Point2<f64>) -> bool,
    X: Fn(&Point2<f64>, &Point2<f64>) -> Point2<f64>,
{
    let Some(mut prev) = input.last() else {
        return Vec::new();
    };

    let mut output = Vec::with_capacity(input.len() + 2);
    for cur in input {
        match (inside(prev), inside(cur)) {
            (true, true) => output.push(*cur),
            (true, false) => output.push(intersect(prev, cur)),
            (false, true) => {
                output.push(intersect(prev, cur));
                output.push(*cur);
            }
            (false, false) => {}
        }
        prev = cur;
    }
    output
}

/// Point of segment `ab` on the vertical line `x`.
fn at_x(a: &Point2<f64>, b: &Point2<f64>, x: f64) -> Point2<f64> {
    let t = (x - a.x) / (b.x - a.x);
    Point2::new(x, a.y + t * (b.y - a.y))
}

/// Point of segment `ab` on the horizontal line `y`.
fn at_y(a: &Point2<f64>, b: &Point2<f64>, y: f64) -> Point2<f64> {
    let t = (y - a.y) / (b.y - a.y);
    Point2::new(a.x + t * (b.x - a.x), y)
}
