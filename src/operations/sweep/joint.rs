use crate::config::{JointMode, Resolution};
use crate::geometry::Ring;
use crate::math::{rotate_point_about, try_normalize, Point3, Vector3, PARALLEL_TOLERANCE};

use super::ring::{ring_centroid, translate_ring};

/// Stretch applied by tapered joints is capped for near-reversing turns.
const MAX_TAPER_STRETCH: f64 = 2.0;

/// The turn a corner joint has to bridge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Corner {
    /// Nominal corner point (where the unshortened segments meet).
    pub position: Point3,
    /// Unit heading before the turn.
    pub old_heading: Vector3,
    /// Unit heading after the turn.
    pub new_heading: Vector3,
}

impl Corner {
    /// Unit rotation axis and turn angle (radians), or `None` when the
    /// headings are parallel and there is nothing to bridge.
    #[must_use]
    pub fn axis_angle(&self) -> Option<(Vector3, f64)> {
        let cross = self.old_heading.cross(&self.new_heading);
        let sin = cross.norm();
        if sin < PARALLEL_TOLERANCE {
            return None;
        }
        let cos = self.old_heading.dot(&self.new_heading);
        Some((cross / sin, sin.atan2(cos)))
    }

    /// Unit direction from the old path toward the inside of the turn.
    #[must_use]
    pub fn inward(&self) -> Option<Vector3> {
        let (axis, _) = self.axis_angle()?;
        try_normalize(&axis.cross(&self.old_heading))
    }

    /// Point of the incoming path line in the plane of `ring`. This is the
    /// ring centroid for profiles centered on the turtle.
    #[must_use]
    pub fn axis_point(&self, ring: &[Point3]) -> Point3 {
        let ahead = self.old_heading.dot(&(self.position - ring_centroid(ring)));
        self.position - self.old_heading * ahead
    }
}

/// Synthesizes the transition rings between a segment's shortened end ring
/// and the next segment's start ring.
///
/// Returns no rings for [`JointMode::Flat`] and for corners whose headings
/// are parallel.
#[must_use]
pub fn corner_rings(
    end_ring: &[Point3],
    corner: &Corner,
    radius: f64,
    mode: JointMode,
    resolution: &Resolution,
) -> Vec<Ring> {
    let Some((axis, angle)) = corner.axis_angle() else {
        return Vec::new();
    };
    match mode {
        JointMode::Flat => Vec::new(),
        JointMode::Round => round_rings(end_ring, corner, &axis, angle, radius, resolution),
        JointMode::Tapered => vec![tapered_ring(end_ring, corner, &axis, angle)],
    }
}

/// Arc of rings obtained by rotating the end ring about a pivot `radius`
/// inside the turn from the path line, in equal steps up to the full turn
/// angle.
fn round_rings(
    end_ring: &[Point3],
    corner: &Corner,
    axis: &Vector3,
    angle: f64,
    radius: f64,
    resolution: &Resolution,
) -> Vec<Ring> {
    let Some(inward) = corner.inward() else {
        return Vec::new();
    };
    let pivot = corner.axis_point(end_ring) + inward * radius;
    let steps = resolution.segments_for(angle.to_degrees(), radius);
    tracing::trace!(steps, angle = angle.to_degrees(), "round joint");
    (1..=steps)
        .map(|k| {
            #[allow(clippy::cast_precision_loss)]
            let a = angle * k as f64 / steps as f64;
            end_ring
                .iter()
                .map(|p| rotate_point_about(p, &pivot, axis, a))
                .collect()
        })
        .collect()
}

/// One ring on the turn's bisector plane, stretched across the bisector so the
/// cross-section does not pinch.
fn tapered_ring(end_ring: &[Point3], corner: &Corner, axis: &Vector3, angle: f64) -> Ring {
    let half = angle * 0.5;
    let moved = translate_ring(end_ring, &(corner.position - corner.axis_point(end_ring)));
    let rotated: Ring = moved
        .iter()
        .map(|p| rotate_point_about(p, &corner.position, axis, half))
        .collect();

    let stretch = (1.0 / half.cos()).min(MAX_TAPER_STRETCH);
    let bisector = corner.old_heading + corner.new_heading;
    let Some(direction) = try_normalize(&axis.cross(&bisector)) else {
        return rotated;
    };
    rotated
        .iter()
        .map(|p| {
            let offset = p - corner.position;
            p + direction * (offset.dot(&direction) * (stretch - 1.0))
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::geometry::Shape;
    use crate::math::Point2;
    use crate::operations::sweep::ring::stamp;
    use crate::turtle::Pose;

    fn square_ring(pose: &Pose) -> Ring {
        let shape = Shape::new(vec![
            Point2::new(-0.5, -0.5),
            Point2::new(0.5, -0.5),
            Point2::new(0.5, 0.5),
            Point2::new(-0.5, 0.5),
        ]);
        stamp(pose, &shape)
    }

    fn quarter_turn() -> Corner {
        Corner {
            position: Point3::new(10.0, 0.0, 0.0),
            old_heading: Vector3::x(),
            new_heading: Vector3::y(),
        }
    }

    #[test]
    fn axis_angle_of_left_turn() {
        let (axis, angle) = quarter_turn().axis_angle().unwrap();
        assert_relative_eq!(axis, Vector3::z(), epsilon = 1e-12);
        assert_relative_eq!(angle, std::f64::consts::FRAC_PI_2, epsilon = 1e-12);
        assert_relative_eq!(quarter_turn().inward().unwrap(), Vector3::y(), epsilon = 1e-12);
    }

    #[test]
    fn flat_joint_adds_nothing() {
        let end = square_ring(&Pose::default().moved(9.5));
        let rings = corner_rings(&end, &quarter_turn(), 0.5, JointMode::Flat, &Resolution::default());
        assert!(rings.is_empty());
    }

    #[test]
    fn parallel_headings_add_nothing() {
        let end = square_ring(&Pose::default().moved(9.5));
        let corner = Corner { new_heading: Vector3::x(), ..quarter_turn() };
        for mode in [JointMode::Round, JointMode::Tapered] {
            assert!(corner_rings(&end, &corner, 0.5, mode, &Resolution::default()).is_empty());
        }
    }

    #[test]
    fn round_joint_ends_on_next_start_ring() {
        let r = 0.5;
        let end = square_ring(&Pose::default().moved(10.0 - r));
        let rings = corner_rings(&end, &quarter_turn(), r, JointMode::Round, &Resolution::Segments(32));
        assert_eq!(rings.len(), 8);
        let next_start = square_ring(&Pose::default().moved(10.0).yawed(90.0).moved(r));
        let last = rings.last().unwrap();
        for (p, q) in last.iter().zip(&next_start) {
            assert_relative_eq!(p, q, epsilon = 1e-9);
        }
        assert_eq!(rings.iter().map(Vec::len).collect::<Vec<_>>(), vec![4; 8]);
    }

    #[test]
    fn round_joint_rings_keep_distance_from_pivot() {
        let r = 0.5;
        let end = square_ring(&Pose::default().moved(10.0 - r));
        let pivot = Point3::new(10.0 - r, r, 0.0);
        let rings = corner_rings(&end, &quarter_turn(), r, JointMode::Round, &Resolution::MinAngle(30.0));
        assert_eq!(rings.len(), 3);
        for ring in &rings {
            assert_relative_eq!((ring_centroid(ring) - pivot).norm(), r, epsilon = 1e-9);
        }
    }

    #[test]
    fn off_center_profile_keeps_its_offset_around_the_corner() {
        let r = 0.5;
        let shape = Shape::new(vec![
            Point2::new(1.0, 1.0),
            Point2::new(2.0, 1.0),
            Point2::new(2.0, 2.0),
            Point2::new(1.0, 2.0),
        ]);
        let end = stamp(&Pose::default().moved(10.0 - r), &shape);
        let rings = corner_rings(&end, &quarter_turn(), r, JointMode::Round, &Resolution::Segments(32));
        let next_start = stamp(&Pose::default().moved(10.0).yawed(90.0).moved(r), &shape);
        for (p, q) in rings.last().unwrap().iter().zip(&next_start) {
            assert_relative_eq!(p, q, epsilon = 1e-9);
        }
    }

    #[test]
    fn tapered_joint_is_one_stretched_bisector_ring() {
        let end = square_ring(&Pose::default().moved(9.5));
        let rings = corner_rings(&end, &quarter_turn(), 0.5, JointMode::Tapered, &Resolution::default());
        assert_eq!(rings.len(), 1);
        let ring = &rings[0];
        let corner = quarter_turn().position;
        assert_relative_eq!(ring_centroid(ring), corner, epsilon = 1e-9);
        let bisector = Vector3::new(1.0, 1.0, 0.0).normalize();
        for p in ring {
            // Lies in the bisector plane.
            assert_relative_eq!((p - corner).dot(&bisector), 0.0, epsilon = 1e-9);
        }
        // Horizontal half-width 0.5 stretched by 1/cos(45deg); height unchanged.
        let width = ring.iter().map(|p| (p - corner).xy().norm()).fold(0.0, f64::max);
        assert_relative_eq!(width, 0.5 * 2.0_f64.sqrt(), epsilon = 1e-9);
        let height = ring.iter().map(|p| p.z.abs()).fold(0.0, f64::max);
        assert_relative_eq!(height, 0.5, epsilon = 1e-9);
    }

    #[test]
    fn tapered_stretch_is_capped() {
        let end = square_ring(&Pose::default().moved(9.5));
        let corner = Corner {
            new_heading: Vector3::new(-1.0, 0.01, 0.0).normalize(),
            ..quarter_turn()
        };
        let ring = &corner_rings(&end, &corner, 0.5, JointMode::Tapered, &Resolution::default())[0];
        let width = ring
            .iter()
            .map(|p| (p - corner.position).xy().norm())
            .fold(0.0, f64::max);
        assert!(width <= 0.5 * MAX_TAPER_STRETCH + 1e-9);
    }
}
