use crate::math::intersect_2d::line_line_intersect_2d;
use crate::math::{Point2, Vector2, TOLERANCE};

/// Turns below this many radians need no shortening.
const MIN_TURN_RAD: f64 = 0.01;

/// How far a tapered loft pulls back on either side of a corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CornerSolution {
    /// Pull-back of the segment entering the corner.
    pub r_p: f64,
    /// Offset of the start of the segment leaving the corner.
    pub r_n: f64,
    /// `r_p + r_n`: path length swallowed by the corner.
    pub hidden_dist: f64,
    /// Where the two inner edges meet, in corner coordinates (x along the
    /// incoming heading, y toward the inside of the turn).
    pub intersection_point: Point2,
}

impl CornerSolution {
    /// No shortening on either side.
    #[must_use]
    pub fn none() -> Self {
        Self {
            r_p: 0.0,
            r_n: 0.0,
            hidden_dist: 0.0,
            intersection_point: Point2::origin(),
        }
    }
}

/// A corner of a tapered loft, in the plane of the incoming heading and the
/// inward normal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TaperedCorner {
    /// Profile radius at the corner.
    pub corner_radius: f64,
    /// Profile radius at the end of the loft.
    pub end_radius: f64,
    /// Path distance left after the corner.
    pub remaining: f64,
    /// Length of the incoming segment; `r_p` never exceeds it.
    pub available: f64,
    /// Turn angle in radians.
    pub angle: f64,
}

impl TaperedCorner {
    /// Corner of a cone tapering linearly from `start_radius` to zero over
    /// `total`, reached after `traveled`.
    #[must_use]
    pub fn linear(start_radius: f64, traveled: f64, total: f64, angle: f64) -> Self {
        let corner_radius = if total > TOLERANCE {
            start_radius * (1.0 - traveled / total)
        } else {
            0.0
        };
        Self {
            corner_radius,
            end_radius: 0.0,
            remaining: total - traveled,
            available: traveled,
            angle,
        }
    }
}

/// Intersects the inner edges of the cones before and after a corner.
///
/// The incoming inner edge runs from `(0, r_c)` toward `(L, r_end)`; the
/// outgoing one is the same line rotated by the turn angle and offset to the
/// outgoing segment's inner side. The intersection's coordinate along each
/// segment axis gives the pull-back on that side. Parallel edges and turns
/// under 0.01 rad need no shortening.
#[must_use]
pub fn solve_corner(corner: &TaperedCorner) -> CornerSolution {
    let TaperedCorner {
        corner_radius,
        end_radius,
        remaining,
        available,
        angle,
    } = *corner;
    let angle = angle.abs();
    let finite = [corner_radius, end_radius, remaining, available, angle]
        .iter()
        .all(|v| v.is_finite());
    if !finite || angle < MIN_TURN_RAD || remaining < TOLERANCE {
        return CornerSolution::none();
    }

    let taper = end_radius - corner_radius;
    let a0 = Point2::new(0.0, corner_radius);
    let da = Vector2::new(remaining, taper);

    let (sin, cos) = angle.sin_cos();
    let axis_b = Vector2::new(cos, sin);
    let inner_b = Vector2::new(-sin, cos);
    let b0 = Point2::from(inner_b * corner_radius);
    let db = axis_b * remaining + inner_b * taper;

    let Some((t, _)) = line_line_intersect_2d(&a0, &da, &b0, &db) else {
        return CornerSolution::none();
    };
    let x = a0 + da * t;
    let r_p = (-x.x).clamp(0.0, available.max(0.0));
    let r_n = x.coords.dot(&axis_b).clamp(0.0, remaining);
    CornerSolution {
        r_p,
        r_n,
        hidden_dist: r_p + r_n,
        intersection_point: x,
    }
}
