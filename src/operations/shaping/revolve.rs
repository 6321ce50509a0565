use crate::config::SweepConfig;
use crate::error::{ensure_finite, Result};
use crate::geometry::{Mesh, Ring, Shape};
use crate::math::{rotate_point_about, TOLERANCE};
use crate::operations::sweep::{build_mesh, stamp};
use crate::turtle::{Pose, TurtleState};

/// Revolves the stamped profile about the turtle's up axis through the turtle
/// position.
///
/// A full turn gives a closed mesh with no caps; anything less is capped at
/// both ends. Negative angles revolve the other way.
#[derive(Debug, Clone)]
pub struct Revolve {
    shape: Shape,
    angle_deg: f64,
}

impl Revolve {
    /// Creates a new `Revolve` operation.
    #[must_use]
    pub fn new(shape: Shape, angle_deg: f64) -> Self {
        Self { shape, angle_deg }
    }

    /// Builds the revolved mesh without touching any turtle state.
    ///
    /// Returns `Ok(None)` for a degenerate profile or a zero angle.
    ///
    /// # Errors
    ///
    /// Returns an error if the angle is not finite.
    pub fn build(&self, pose: &Pose, config: &SweepConfig) -> Result<Option<Mesh>> {
        let angle = ensure_finite("revolve", self.angle_deg)?.clamp(-360.0, 360.0);
        let profile = self.shape.prepared();
        if profile.is_degenerate() || angle.abs() < TOLERANCE {
            return Ok(None);
        }
        let full = angle.abs() >= 360.0 - TOLERANCE;

        let base = stamp(pose, &profile);
        let radius = base
            .iter()
            .map(|p| {
                let d = p - pose.position;
                (d - pose.up * d.dot(&pose.up)).norm()
            })
            .fold(0.0, f64::max);
        let mut steps = config.resolution.segments_for(angle, radius);
        if full {
            steps = steps.max(3);
        }

        let rings: Vec<Ring> = (0..=steps)
            .map(|k| {
                #[allow(clippy::cast_precision_loss)]
                let a = (angle * k as f64 / steps as f64).to_radians();
                base.iter()
                    .map(|p| rotate_point_about(p, &pose.position, &pose.up, a))
                    .collect()
            })
            .collect();

        let mesh = build_mesh(&rings, &profile.layout(), full, Some(*pose))?;
        tracing::debug!(angle, steps, full, built = mesh.is_some(), "revolved profile");
        Ok(mesh)
    }

    /// Executes the revolve at the turtle pose and appends the mesh. The
    /// turtle does not move.
    ///
    /// # Errors
    ///
    /// See [`Revolve::build`].
    pub fn execute(&self, mut state: TurtleState) -> Result<TurtleState> {
        if let Some(mesh) = self.build(&state.pose, &state.config)? {
            state.add_mesh(mesh);
        }
        Ok(state)
    }
}
