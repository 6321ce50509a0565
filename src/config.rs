use crate::error::{ensure_finite, Result, TessellationError};
use crate::geometry::Material;

/// How curved features (round joints, revolves) are subdivided.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Resolution {
    /// A full turn is split into this many segments.
    Segments(usize),
    /// One segment per this many degrees.
    MinAngle(f64),
    /// Segments no longer than this arc length at the feature's radius.
    MaxLength(f64),
}

impl Default for Resolution {
    fn default() -> Self {
        Resolution::Segments(32)
    }
}

impl Resolution {
    /// Number of segments for an arc of `degrees` at `radius` (at least 1).
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    pub fn segments_for(&self, degrees: f64, radius: f64) -> usize {
        let degrees = degrees.abs();
        let n = match *self {
            Resolution::Segments(full) => (full as f64 * degrees / 360.0).ceil(),
            Resolution::MinAngle(min) => (degrees / min).ceil(),
            Resolution::MaxLength(len) => (degrees.to_radians() * radius.abs() / len).ceil(),
        };
        if n.is_finite() && n >= 1.0 {
            n as usize
        } else {
            1
        }
    }
}

/// Corner-bridging style between two shortened segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JointMode {
    /// Connect the shortened rings directly.
    #[default]
    Flat,
    /// Arc of rings rotated about a pivot inside the turn.
    Round,
    /// One ring on the bisector, stretched to avoid pinching.
    Tapered,
}

/// Modeling settings carried on every turtle state.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepConfig {
    pub resolution: Resolution,
    pub joint_mode: JointMode,
    /// Turns summing to more than this many degrees shorten adjacent segments.
    pub corner_threshold_deg: f64,
    /// Ring subdivisions a loft spreads over its whole path.
    pub loft_steps: usize,
    /// Total steps of a bezier loft.
    pub bloft_steps: usize,
    /// Fold-back threshold as a fraction of the profile radius.
    pub fold_back_factor: f64,
    /// Exponent `k` in the bezier-loft step weight `(1 + angle / pi)^k`.
    pub turn_weight_exponent: i32,
    /// Material stamped on every new mesh.
    pub material: Option<Material>,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            resolution: Resolution::default(),
            joint_mode: JointMode::default(),
            corner_threshold_deg: 10.0,
            loft_steps: 16,
            bloft_steps: 64,
            fold_back_factor: 0.1,
            turn_weight_exponent: 2,
            material: None,
        }
    }
}

impl SweepConfig {
    /// Sets the curve resolution.
    ///
    /// # Errors
    ///
    /// Returns an error for a zero segment count or a non-positive or
    /// non-finite angle/length.
    pub fn with_resolution(mut self, resolution: Resolution) -> Result<Self> {
        let valid = match resolution {
            Resolution::Segments(n) => n > 0,
            Resolution::MinAngle(v) => ensure_finite("resolution", v)? > 0.0,
            Resolution::MaxLength(v) => ensure_finite("resolution", v)? > 0.0,
        };
        if !valid {
            return Err(TessellationError::InvalidParameters(format!(
                "resolution must be positive, got {resolution:?}"
            ))
            .into());
        }
        self.resolution = resolution;
        Ok(self)
    }

    /// Sets the corner joint style.
    #[must_use]
    pub fn with_joint_mode(mut self, joint_mode: JointMode) -> Self {
        self.joint_mode = joint_mode;
        self
    }

    /// Sets the corner significance threshold in degrees.
    ///
    /// # Errors
    ///
    /// Returns an error if `degrees` is not finite.
    pub fn with_corner_threshold(mut self, degrees: f64) -> Result<Self> {
        self.corner_threshold_deg = ensure_finite("corner_threshold", degrees)?.abs();
        Ok(self)
    }

    /// Sets the loft subdivision count.
    #[must_use]
    pub fn with_loft_steps(mut self, steps: usize) -> Self {
        self.loft_steps = steps.max(1);
        self
    }

    /// Sets the bezier-loft step count.
    #[must_use]
    pub fn with_bloft_steps(mut self, steps: usize) -> Self {
        self.bloft_steps = steps.max(1);
        self
    }

    /// Sets the fold-back threshold factor.
    ///
    /// # Errors
    ///
    /// Returns an error if `factor` is not finite.
    pub fn with_fold_back_factor(mut self, factor: f64) -> Result<Self> {
        self.fold_back_factor = ensure_finite("fold_back_factor", factor)?.abs();
        Ok(self)
    }

    /// Sets the default material.
    #[must_use]
    pub fn with_material(mut self, material: Option<Material>) -> Self {
        self.material = material;
        self
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn segment_count_scales_with_angle() {
        let res = Resolution::Segments(32);
        assert_eq!(res.segments_for(360.0, 1.0), 32);
        assert_eq!(res.segments_for(90.0, 1.0), 8);
        assert_eq!(res.segments_for(1.0, 1.0), 1);
    }

    #[test]
    fn min_angle_rounds_up() {
        let res = Resolution::MinAngle(12.0);
        assert_eq!(res.segments_for(90.0, 5.0), 8);
        assert_eq!(res.segments_for(-24.0, 5.0), 2);
    }

    #[test]
    fn max_length_uses_radius() {
        let res = Resolution::MaxLength(0.5);
        // Quarter circle of radius 2 has length pi.
        assert_eq!(res.segments_for(90.0, 2.0), 7);
    }

    #[test]
    fn zero_angle_still_yields_one_segment() {
        assert_eq!(Resolution::default().segments_for(0.0, 1.0), 1);
    }

    #[test]
    fn invalid_resolution_is_rejected() {
        assert!(SweepConfig::default().with_resolution(Resolution::Segments(0)).is_err());
        assert!(SweepConfig::default().with_resolution(Resolution::MinAngle(f64::NAN)).is_err());
        assert!(SweepConfig::default().with_resolution(Resolution::MaxLength(-1.0)).is_err());
        let cfg = SweepConfig::default().with_resolution(Resolution::MinAngle(5.0)).unwrap();
        assert_eq!(cfg.resolution, Resolution::MinAngle(5.0));
    }
}
