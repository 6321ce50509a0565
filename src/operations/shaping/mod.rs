mod bloft;
mod extrude;
mod loft;
mod revolve;
mod taper_corner;

pub use bloft::{allocate_steps, detect_fold_back, BezierLoft, BezierLoftOutput};
pub use extrude::{Extrude, ExtrudeClosed};
pub use loft::{Loft, LoftOutput};
pub use revolve::Revolve;
pub use taper_corner::{solve_corner, CornerSolution, TaperedCorner};

use crate::geometry::{Path, Rotation};
use crate::turtle::Pose;

use super::sweep::{leading_rotations, path_segments};

/// One forward move of a path, starting from the pose left by everything
/// before it.
#[derive(Debug, Clone, PartialEq)]
struct Leg {
    start: Pose,
    distance: f64,
    rotations_after: Vec<Rotation>,
}

impl Leg {
    /// Pose at the nominal end of the move, before the following rotations.
    fn end(&self) -> Pose {
        self.start.moved(self.distance)
    }

    /// Start pose of the next leg.
    fn next_start(&self) -> Pose {
        self.end().rotated_all(&self.rotations_after)
    }

    fn length(&self) -> f64 {
        self.distance.abs()
    }

    /// `true` when an explicit turn (not a smooth heading sample) follows.
    fn turns_after(&self) -> bool {
        self.rotations_after.iter().any(Rotation::is_corner)
    }
}

/// Splits `path` into legs walked from `start`.
fn path_legs(path: &Path, start: &Pose) -> Vec<Leg> {
    let mut pose = start.rotated_all(&leading_rotations(path));
    path_segments(path, 0.0)
        .into_iter()
        .map(|segment| {
            let leg = Leg {
                start: pose,
                distance: segment.distance,
                rotations_after: segment.rotations_after,
            };
            pose = leg.next_start();
            leg
        })
        .collect()
}

/// Angle in radians between two unit headings.
fn heading_angle(a: &Pose, b: &Pose) -> f64 {
    a.heading.dot(&b.heading).clamp(-1.0, 1.0).acos()
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::math::{Point3, Vector3};

    #[test]
    fn legs_follow_turns() {
        let path = Path::new().yaw(90.0).forward(2.0).yaw(-90.0).forward(3.0);
        let legs = path_legs(&path, &Pose::default());
        assert_eq!(legs.len(), 2);
        assert_relative_eq!(legs[0].start.heading, Vector3::y(), epsilon = 1e-12);
        assert_relative_eq!(legs[1].start.position, Point3::new(0.0, 2.0, 0.0), epsilon = 1e-12);
        assert_relative_eq!(legs[1].start.heading, Vector3::x(), epsilon = 1e-12);
        assert!(legs[0].turns_after());
        assert!(!legs[1].turns_after());
        assert_relative_eq!(heading_angle(&legs[0].start, &legs[1].start), std::f64::consts::FRAC_PI_2, epsilon = 1e-12);
    }
}
