use super::{Point2, Vector2, TOLERANCE};

/// Parametric 2D line-line intersection (Cramer's rule).
///
/// Given lines `p1 + t * d1` and `p2 + u * d2`, returns `(t, u)` if not parallel.
#[must_use]
pub fn line_line_intersect_2d(
    p1: &Point2,
    d1: &Vector2,
    p2: &Point2,
    d2: &Vector2,
) -> Option<(f64, f64)> {
    let det = d1.x * d2.y - d1.y * d2.x;
    let scale = d1.norm() * d2.norm();
    if scale < TOLERANCE || det.abs() < TOLERANCE * scale.max(1.0) {
        return None;
    }
    let dx = p2.x - p1.x;
    let dy = p2.y - p1.y;
    let t = (dx * d2.y - dy * d2.x) / det;
    let u = (dx * d1.y - dy * d1.x) / det;
    Some((t, u))
}

/// Intersection point of the line through `a0, a1` with the line through
/// `b0, b1`, if they are not parallel.
#[must_use]
pub fn line_through_points_intersect_2d(
    a0: &Point2,
    a1: &Point2,
    b0: &Point2,
    b1: &Point2,
) -> Option<Point2> {
    let da = a1 - a0;
    let db = b1 - b0;
    line_line_intersect_2d(a0, &da, b0, &db).map(|(t, _)| a0 + da * t)
}
