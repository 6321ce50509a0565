use crate::error::{ensure_finite, GeometryError, Result};
use crate::math::{try_normalize, Vector3};

/// A rotation command, as deferred by the turtle or recorded between two
/// forward moves of a path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Rotation {
    /// Rotate heading about up (degrees, positive turns left).
    Yaw(f64),
    /// Rotate heading and up about the right axis (degrees, positive noses up).
    Pitch(f64),
    /// Rotate up about heading (degrees).
    Roll(f64),
    /// Jump to an absolute orientation sampled from a smooth curve.
    SetHeading { heading: Vector3, up: Vector3 },
}

impl Rotation {
    /// Angle this rotation contributes to corner detection.
    ///
    /// `SetHeading` samples a smooth curve and never counts as a corner.
    #[must_use]
    pub fn corner_angle(&self) -> f64 {
        match *self {
            Rotation::Yaw(a) | Rotation::Pitch(a) | Rotation::Roll(a) => a,
            Rotation::SetHeading { .. } => 0.0,
        }
    }

    /// `true` for the three explicit turn commands.
    #[must_use]
    pub fn is_corner(&self) -> bool {
        !matches!(self, Rotation::SetHeading { .. })
    }
}

/// One turtle path command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Forward(f64),
    TurnYaw(f64),
    TurnPitch(f64),
    TurnRoll(f64),
    SetHeading { heading: Vector3, up: Vector3 },
    Mark(String),
}

impl Command {
    /// Name used in error messages.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Command::Forward(_) => "forward",
            Command::TurnYaw(_) => "turn_yaw",
            Command::TurnPitch(_) => "turn_pitch",
            Command::TurnRoll(_) => "turn_roll",
            Command::SetHeading { .. } => "set_heading",
            Command::Mark(_) => "mark",
        }
    }

    /// The rotation carried by this command, if any.
    #[must_use]
    pub fn as_rotation(&self) -> Option<Rotation> {
        match self {
            Command::TurnYaw(a) => Some(Rotation::Yaw(*a)),
            Command::TurnPitch(a) => Some(Rotation::Pitch(*a)),
            Command::TurnRoll(a) => Some(Rotation::Roll(*a)),
            Command::SetHeading { heading, up } => Some(Rotation::SetHeading {
                heading: *heading,
                up: *up,
            }),
            Command::Forward(_) | Command::Mark(_) => None,
        }
    }

    /// Forward distance, if this is a forward move.
    #[must_use]
    pub fn forward_distance(&self) -> Option<f64> {
        match self {
            Command::Forward(d) => Some(*d),
            _ => None,
        }
    }

    /// Checks that every numeric argument is finite.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::CommandError::InvalidNumber`] for the first
    /// non-finite argument.
    pub fn validate(&self) -> Result<()> {
        let name = self.name();
        match self {
            Command::Forward(v) | Command::TurnYaw(v) | Command::TurnPitch(v) | Command::TurnRoll(v) => {
                ensure_finite(name, *v)?;
            }
            Command::SetHeading { heading, up } => {
                for v in heading.iter().chain(up.iter()) {
                    ensure_finite(name, *v)?;
                }
            }
            Command::Mark(_) => {}
        }
        Ok(())
    }
}

/// An ordered turtle command sequence.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Path {
    pub commands: Vec<Command>,
}

impl Path {
    /// Creates an empty path.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps an existing command list.
    #[must_use]
    pub fn from_commands(commands: Vec<Command>) -> Self {
        Self { commands }
    }

    /// Appends a forward move.
    #[must_use]
    pub fn forward(mut self, distance: f64) -> Self {
        self.commands.push(Command::Forward(distance));
        self
    }

    /// Appends a yaw turn (degrees).
    #[must_use]
    pub fn yaw(mut self, degrees: f64) -> Self {
        self.commands.push(Command::TurnYaw(degrees));
        self
    }

    /// Appends a pitch turn (degrees).
    #[must_use]
    pub fn pitch(mut self, degrees: f64) -> Self {
        self.commands.push(Command::TurnPitch(degrees));
        self
    }

    /// Appends a roll turn (degrees).
    #[must_use]
    pub fn roll(mut self, degrees: f64) -> Self {
        self.commands.push(Command::TurnRoll(degrees));
        self
    }

    /// Appends an absolute orientation sample, normalizing both vectors and
    /// re-orthogonalizing `up` against `heading`.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::ZeroVector`] if `heading` is zero-length or
    /// `up` is parallel to it.
    pub fn set_heading(mut self, heading: Vector3, up: Vector3) -> Result<Self> {
        let heading = try_normalize(&heading).ok_or(GeometryError::ZeroVector)?;
        let up = try_normalize(&(up - heading * heading.dot(&up))).ok_or(GeometryError::ZeroVector)?;
        self.commands.push(Command::SetHeading { heading, up });
        Ok(self)
    }

    /// Appends a named mark.
    #[must_use]
    pub fn mark(mut self, name: impl Into<String>) -> Self {
        self.commands.push(Command::Mark(name.into()));
        self
    }

    /// Appends every command of `other`.
    #[must_use]
    pub fn then(mut self, other: &Path) -> Self {
        self.commands.extend(other.commands.iter().cloned());
        self
    }

    /// Repeats the whole command list `times` times.
    #[must_use]
    pub fn repeated(&self, times: usize) -> Self {
        let mut commands = Vec::with_capacity(self.commands.len() * times);
        for _ in 0..times {
            commands.extend(self.commands.iter().cloned());
        }
        Self { commands }
    }

    /// Sum of all forward distances.
    #[must_use]
    pub fn total_distance(&self) -> f64 {
        self.commands.iter().filter_map(Command::forward_distance).sum()
    }

    /// Number of forward moves.
    #[must_use]
    pub fn forward_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| matches!(c, Command::Forward(_)))
            .count()
    }

    /// Validates every command.
    ///
    /// # Errors
    ///
    /// Returns the first invalid-number error found.
    pub fn validate(&self) -> Result<()> {
        self.commands.iter().try_for_each(Command::validate)
    }
}
