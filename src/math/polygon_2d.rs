use super::{Point2, Vector2};

/// Computes the signed area of a 2D polygon (shoelace formula).
///
/// Positive for counter-clockwise, negative for clockwise.
#[must_use]
pub fn signed_area(points: &[Point2]) -> f64 {
    let n = points.len();
    if n < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    for i in 0..n {
        let j = (i + 1) % n;
        sum += points[i].x * points[j].y - points[j].x * points[i].y;
    }
    sum * 0.5
}

/// Returns `true` if the polygon winds counter-clockwise.
#[must_use]
pub fn is_ccw(points: &[Point2]) -> bool {
    signed_area(points) > 0.0
}

/// Area-weighted centroid of a simple polygon.
///
/// Falls back to the vertex average for zero-area input.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn polygon_centroid(points: &[Point2]) -> Point2 {
    if points.is_empty() {
        return Point2::origin();
    }
    let area = signed_area(points);
    if area.abs() < f64::EPSILON {
        let sum = points.iter().fold(Vector2::zeros(), |acc, p| acc + p.coords);
        return Point2::from(sum / points.len() as f64);
    }
    let n = points.len();
    let mut cx = 0.0;
    let mut cy = 0.0;
    for i in 0..n {
        let p = points[i];
        let q = points[(i + 1) % n];
        let cross = p.x * q.y - q.x * p.y;
        cx += (p.x + q.x) * cross;
        cy += (p.y + q.y) * cross;
    }
    Point2::new(cx / (6.0 * area), cy / (6.0 * area))
}

/// Largest distance from the origin to any of the points.
#[must_use]
pub fn max_radius(points: &[Point2]) -> f64 {
    points
        .iter()
        .map(|p| p.coords.norm())
        .fold(0.0, f64::max)
}
