use crate::error::{GeometryError, Result};
use crate::geometry::{Command, Path, Rotation};
use crate::math::{rotate_about_axis, try_normalize, Point2, Point3, Vector3};

/// Turtle position and orientation.
///
/// `heading` and `up` are unit length and perpendicular; every rotation
/// re-derives one of them from the other to keep it that way.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub position: Point3,
    pub heading: Vector3,
    pub up: Vector3,
}

impl Default for Pose {
    fn default() -> Self {
        Self {
            position: Point3::origin(),
            heading: Vector3::x(),
            up: Vector3::z(),
        }
    }
}

impl Pose {
    /// Creates a pose, normalizing `heading` and orthogonalizing `up` against it.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::ZeroVector`] if `heading` is zero-length or `up`
    /// is parallel to it.
    pub fn new(position: Point3, heading: Vector3, up: Vector3) -> Result<Self> {
        let (heading, up) = orthonormalize(&heading, &up).ok_or(GeometryError::ZeroVector)?;
        Ok(Self { position, heading, up })
    }

    /// The turtle's right-hand side, `heading × up`.
    #[must_use]
    pub fn right(&self) -> Vector3 {
        self.heading.cross(&self.up)
    }

    /// Moves along the heading.
    #[must_use]
    pub fn moved(&self, distance: f64) -> Self {
        Self {
            position: self.position + self.heading * distance,
            ..*self
        }
    }

    /// Same orientation at another position.
    #[must_use]
    pub fn at(&self, position: Point3) -> Self {
        Self { position, ..*self }
    }

    /// Turns the heading about `up`; positive turns left.
    #[must_use]
    pub fn yawed(&self, degrees: f64) -> Self {
        let heading = rotate_about_axis(&self.heading, &self.up, degrees);
        self.reoriented(&heading, &self.up)
    }

    /// Tilts heading and up about the right axis; positive raises the nose.
    #[must_use]
    pub fn pitched(&self, degrees: f64) -> Self {
        let right = self.right();
        let heading = rotate_about_axis(&self.heading, &right, degrees);
        let up = right.cross(&heading);
        self.reoriented(&heading, &up)
    }

    /// Spins `up` about the heading.
    #[must_use]
    pub fn rolled(&self, degrees: f64) -> Self {
        let up = rotate_about_axis(&self.up, &self.heading, degrees);
        self.reoriented(&self.heading, &up)
    }

    /// Applies one rotation command.
    #[must_use]
    pub fn rotated(&self, rotation: &Rotation) -> Self {
        match *rotation {
            Rotation::Yaw(a) => self.yawed(a),
            Rotation::Pitch(a) => self.pitched(a),
            Rotation::Roll(a) => self.rolled(a),
            Rotation::SetHeading { heading, up } => self.reoriented(&heading, &up),
        }
    }

    /// Applies a sequence of rotations in order.
    #[must_use]
    pub fn rotated_all(&self, rotations: &[Rotation]) -> Self {
        rotations.iter().fold(*self, |pose, r| pose.rotated(r))
    }

    /// Pose reached by following every move and turn of `path`.
    #[must_use]
    pub fn walked(&self, path: &Path) -> Self {
        path.commands.iter().fold(*self, |pose, command| match command {
            Command::Forward(d) => pose.moved(*d),
            Command::Mark(_) => pose,
            other => other.as_rotation().map_or(pose, |r| pose.rotated(&r)),
        })
    }

    /// Replaces the orientation, keeping the old one if the new vectors are
    /// degenerate.
    #[must_use]
    pub fn reoriented(&self, heading: &Vector3, up: &Vector3) -> Self {
        match orthonormalize(heading, up) {
            Some((heading, up)) => Self {
                position: self.position,
                heading,
                up,
            },
            None => *self,
        }
    }

    /// Orientation halfway between `self` and `other`, at `self`'s position.
    #[must_use]
    pub fn bisected(&self, other: &Pose) -> Self {
        let heading = self.heading + other.heading;
        let up = self.up + other.up;
        let blended = self.reoriented(&heading, &up);
        if blended == *self && self.heading != other.heading {
            // Opposite headings have no bisector.
            return other.at(self.position);
        }
        blended
    }

    /// Places a profile point in world space: x along `right`, y along `up`.
    #[must_use]
    pub fn to_world(&self, p: &Point2) -> Point3 {
        self.position + self.right() * p.x + self.up * p.y
    }
}

/// Unit heading plus the component of `up` perpendicular to it.
fn orthonormalize(heading: &Vector3, up: &Vector3) -> Option<(Vector3, Vector3)> {
    let h = try_normalize(heading)?;
    let u = try_normalize(&(up - h * h.dot(up)))?;
    Some((h, u))
}
