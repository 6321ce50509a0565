use std::collections::HashMap;

use crate::config::SweepConfig;
use crate::error::{ensure_finite, CommandError, GeometryError, Result};
use crate::geometry::{Command, LineSegment, Mesh, Path, Ring, Rotation, Shape, Taper};
use crate::math::{try_normalize, Vector3, TOLERANCE};
use crate::operations::shaping::Loft;
use crate::operations::sweep::{
    build_mesh, corner_rings, push_ring, shorten_for_angle, stamp, translate_ring, turn_sum, Corner,
    SegmentAnalyzer,
};

use super::Pose;

/// What a forward move leaves behind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PenMode {
    /// Move without drawing.
    #[default]
    Off,
    /// Draw a line segment per move.
    Line,
    /// Sweep the profile given to [`TurtleState::begin_sweep`].
    Shape,
    /// Loft the profile given to [`TurtleState::begin_loft`].
    Loft,
    /// Drive the pose of an attached mesh face; no geometry is produced here.
    AttachedFace(usize),
}

impl PenMode {
    /// Name used in error messages.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            PenMode::Off => "off",
            PenMode::Line => "line",
            PenMode::Shape => "shape",
            PenMode::Loft => "loft",
            PenMode::AttachedFace(_) => "attached-face",
        }
    }

    /// `true` in the modes that defer turns until the next forward move.
    #[must_use]
    pub fn defers_turns(&self) -> bool {
        matches!(self, PenMode::Shape | PenMode::Loft)
    }
}

/// A modeling session: turtle pose, pen, accumulated geometry and any sweep
/// or loft in progress.
///
/// Commands validate their arguments before touching the state, so a failed
/// command leaves everything as it was.
#[derive(Debug, Clone, Default)]
pub struct TurtleState {
    pub pose: Pose,
    pub config: SweepConfig,
    pub pen_mode: PenMode,
    /// Line segments drawn in [`PenMode::Line`].
    pub geometry: Vec<LineSegment>,
    pub meshes: Vec<Mesh>,

    /// Rings stamped so far by the sweep in progress.
    pub sweep_rings: Vec<Ring>,
    /// Prepared profile of the sweep or loft in progress.
    pub sweep_base_shape: Option<Shape>,
    /// Pose at `begin_sweep`/`begin_loft`.
    pub sweep_creation_pose: Option<Pose>,
    /// Pose the first sweep ring was stamped at.
    pub sweep_start_pose: Option<Pose>,
    /// Signed length the last forward move covered after its start ring. A
    /// corner may pull the last ring back this far and no further, so it
    /// never crosses the ring stamped before it.
    pub sweep_run: f64,
    /// Turns waiting for the next forward move.
    pub pending_rotation: Option<Vec<Rotation>>,

    /// Moves and turns recorded by the loft in progress.
    pub loft_path: Path,
    pub taper: Option<Taper>,

    pub pose_stack: Vec<Pose>,
    pub marks: HashMap<String, Pose>,
}

impl TurtleState {
    /// Creates a state at the origin, heading +X with +Z up.
    #[must_use]
    pub fn new(config: SweepConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Appends a finished mesh, stamping the configured material on it if it
    /// carries none.
    pub fn add_mesh(&mut self, mut mesh: Mesh) {
        if mesh.material.is_none() {
            mesh.material.clone_from(&self.config.material);
        }
        self.meshes.push(mesh);
    }

    /// Moves along the heading.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::InvalidNumber`] if `distance` is not finite.
    pub fn forward(&mut self, distance: f64) -> Result<&mut Self> {
        let distance = ensure_finite("forward", distance)?;
        match self.pen_mode {
            PenMode::Off | PenMode::AttachedFace(_) => self.pose = self.pose.moved(distance),
            PenMode::Line => {
                let start = self.pose.position;
                self.pose = self.pose.moved(distance);
                self.geometry.push(LineSegment {
                    start,
                    end: self.pose.position,
                });
            }
            PenMode::Shape => self.sweep_forward(distance),
            PenMode::Loft => {
                if let Some(rotations) = self.pending_rotation.take() {
                    self.pose = self.pose.rotated_all(&rotations);
                    self.loft_path.commands.extend(rotations.iter().map(rotation_command));
                }
                self.pose = self.pose.moved(distance);
                self.loft_path.commands.push(Command::Forward(distance));
            }
        }
        Ok(self)
    }

    /// Turns left about `up` (degrees).
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::InvalidNumber`] if `degrees` is not finite.
    pub fn turn_yaw(&mut self, degrees: f64) -> Result<&mut Self> {
        let degrees = ensure_finite("turn_yaw", degrees)?;
        self.rotate(Rotation::Yaw(degrees));
        Ok(self)
    }

    /// Raises the nose about the right axis (degrees).
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::InvalidNumber`] if `degrees` is not finite.
    pub fn turn_pitch(&mut self, degrees: f64) -> Result<&mut Self> {
        let degrees = ensure_finite("turn_pitch", degrees)?;
        self.rotate(Rotation::Pitch(degrees));
        Ok(self)
    }

    /// Spins about the heading (degrees).
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::InvalidNumber`] if `degrees` is not finite.
    pub fn turn_roll(&mut self, degrees: f64) -> Result<&mut Self> {
        let degrees = ensure_finite("turn_roll", degrees)?;
        self.rotate(Rotation::Roll(degrees));
        Ok(self)
    }

    /// Jumps to an absolute orientation. In sweep and loft modes this is a
    /// smooth sample and never shortens the path around it.
    ///
    /// # Errors
    ///
    /// Returns an error for non-finite components, a zero heading, or an
    /// `up` parallel to the heading.
    pub fn set_heading(&mut self, heading: Vector3, up: Vector3) -> Result<&mut Self> {
        for v in heading.iter().chain(up.iter()) {
            ensure_finite("set_heading", *v)?;
        }
        let heading = try_normalize(&heading).ok_or(GeometryError::ZeroVector)?;
        let up = try_normalize(&(up - heading * heading.dot(&up))).ok_or(GeometryError::ZeroVector)?;
        self.rotate(Rotation::SetHeading { heading, up });
        Ok(self)
    }

    /// Records the current pose under `name`.
    pub fn mark(&mut self, name: impl Into<String>) -> &mut Self {
        self.marks.insert(name.into(), self.pose);
        self
    }

    /// Restores the pose recorded under `name`. No geometry is produced.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::UnknownMark`] if no such mark exists.
    pub fn goto_mark(&mut self, name: &str) -> Result<&mut Self> {
        let pose = *self
            .marks
            .get(name)
            .ok_or_else(|| CommandError::UnknownMark(name.to_owned()))?;
        self.pose = pose;
        Ok(self)
    }

    /// Saves the current pose.
    pub fn push_pose(&mut self) -> &mut Self {
        self.pose_stack.push(self.pose);
        self
    }

    /// Restores the most recently saved pose.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::PoseStackEmpty`] if nothing was saved.
    pub fn pop_pose(&mut self) -> Result<&mut Self> {
        self.pose = self.pose_stack.pop().ok_or(CommandError::PoseStackEmpty)?;
        Ok(self)
    }

    /// Switches the pen, finishing any sweep or loft in progress.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::ModeMismatch`] for [`PenMode::Shape`] and
    /// [`PenMode::Loft`], which need a profile and are entered through
    /// [`TurtleState::begin_sweep`] and [`TurtleState::begin_loft`], or if
    /// finishing the current mesh fails.
    pub fn pen(&mut self, mode: PenMode) -> Result<&mut Self> {
        if mode.defers_turns() {
            return Err(CommandError::ModeMismatch {
                expected: "off, line or attached-face",
                found: mode.name(),
            }
            .into());
        }
        self.finish_in_progress()?;
        self.pen_mode = mode;
        Ok(self)
    }

    /// Starts sweeping `shape` from the current pose.
    ///
    /// # Errors
    ///
    /// Returns an error if finishing a sweep or loft already in progress fails.
    pub fn begin_sweep(&mut self, shape: &Shape) -> Result<&mut Self> {
        self.finish_in_progress()?;
        let profile = shape.prepared();
        self.sweep_rings = vec![stamp(&self.pose, &profile)];
        self.sweep_base_shape = Some(profile);
        self.sweep_creation_pose = Some(self.pose);
        self.sweep_start_pose = Some(self.pose);
        self.sweep_run = 0.0;
        self.pen_mode = PenMode::Shape;
        Ok(self)
    }

    /// Caps the sweep in progress into a mesh and lifts the pen. Turns still
    /// pending are applied to the pose without geometry.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::ModeMismatch`] if no sweep is in progress, or
    /// an error if a cap cannot be triangulated.
    pub fn finalize_sweep(&mut self) -> Result<&mut Self> {
        self.expect_mode(PenMode::Shape)?;
        if let Some(shape) = &self.sweep_base_shape {
            let mesh = build_mesh(&self.sweep_rings, &shape.layout(), false, self.sweep_start_pose)?;
            tracing::debug!(rings = self.sweep_rings.len(), built = mesh.is_some(), "finalized sweep");
            if let Some(mesh) = mesh {
                let mesh = mesh.with_creation_pose(self.sweep_creation_pose);
                self.add_mesh(mesh);
            }
        }
        self.apply_pending();
        self.sweep_rings.clear();
        self.sweep_base_shape = None;
        self.sweep_creation_pose = None;
        self.sweep_start_pose = None;
        self.sweep_run = 0.0;
        self.pen_mode = PenMode::Off;
        Ok(self)
    }

    /// Starts lofting `shape` from the current pose. Moves and turns are
    /// recorded and the loft is built when it is finalized.
    ///
    /// # Errors
    ///
    /// Returns an error if finishing a sweep or loft already in progress fails.
    pub fn begin_loft(&mut self, shape: &Shape, taper: Taper) -> Result<&mut Self> {
        self.finish_in_progress()?;
        self.sweep_base_shape = Some(shape.prepared());
        self.sweep_creation_pose = Some(self.pose);
        self.loft_path = Path::new();
        self.taper = Some(taper);
        self.pen_mode = PenMode::Loft;
        Ok(self)
    }

    /// Builds the loft in progress, appends its meshes and lifts the pen.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::ModeMismatch`] if no loft is in progress, or an
    /// error if a cap cannot be triangulated. On error the loft stays in
    /// progress with everything it recorded.
    pub fn finalize_loft(&mut self) -> Result<&mut Self> {
        self.expect_mode(PenMode::Loft)?;
        if let (Some(shape), Some(start)) = (&self.sweep_base_shape, self.sweep_creation_pose) {
            let taper = self.taper.clone().unwrap_or_default();
            let output =
                Loft::new(shape.clone(), taper, self.loft_path.clone()).build(&start, &self.config)?;
            for mesh in output.meshes {
                self.add_mesh(mesh);
            }
        }
        self.apply_pending();
        self.loft_path = Path::new();
        self.sweep_base_shape = None;
        self.sweep_creation_pose = None;
        self.taper = None;
        self.pen_mode = PenMode::Off;
        Ok(self)
    }

    /// Hands the pose over to the attachment of face `face`.
    ///
    /// # Errors
    ///
    /// Returns an error if finishing a sweep or loft in progress fails.
    pub fn attach_face(&mut self, face: usize) -> Result<&mut Self> {
        self.pen(PenMode::AttachedFace(face))
    }

    /// Applies every command of `path` in order.
    ///
    /// # Errors
    ///
    /// Returns an error if any command carries a non-finite number; the
    /// whole path is checked before the first command runs.
    pub fn run(&mut self, path: &Path) -> Result<&mut Self> {
        path.validate()?;
        for command in &path.commands {
            match command {
                Command::Forward(d) => {
                    self.forward(*d)?;
                }
                Command::Mark(name) => {
                    self.mark(name.clone());
                }
                other => {
                    if let Some(rotation) = other.as_rotation() {
                        self.rotate(rotation);
                    }
                }
            }
        }
        Ok(self)
    }

    fn rotate(&mut self, rotation: Rotation) {
        if self.pen_mode.defers_turns() {
            self.pending_rotation.get_or_insert_with(Vec::new).push(rotation);
        } else {
            self.pose = self.pose.rotated(&rotation);
        }
    }

    fn apply_pending(&mut self) {
        if let Some(rotations) = self.pending_rotation.take() {
            self.pose = self.pose.rotated_all(&rotations);
        }
    }

    fn expect_mode(&self, expected: PenMode) -> Result<()> {
        if self.pen_mode == expected {
            Ok(())
        } else {
            Err(CommandError::ModeMismatch {
                expected: expected.name(),
                found: self.pen_mode.name(),
            }
            .into())
        }
    }

    fn finish_in_progress(&mut self) -> Result<()> {
        match self.pen_mode {
            PenMode::Shape => {
                self.finalize_sweep()?;
            }
            PenMode::Loft => {
                self.finalize_loft()?;
            }
            PenMode::Off | PenMode::Line | PenMode::AttachedFace(_) => {}
        }
        Ok(())
    }

    fn sweep_forward(&mut self, distance: f64) {
        let Some(shape) = self.sweep_base_shape.clone() else {
            self.pose = self.pose.moved(distance);
            return;
        };
        let pull = match self.pending_rotation.take() {
            Some(rotations) => self.resolve_corner(&shape, &rotations, distance),
            None => 0.0,
        };
        let sign = if distance < 0.0 { -1.0 } else { 1.0 };
        self.sweep_run = distance - sign * pull;

        self.pose = self.pose.moved(distance);
        if distance.abs() >= TOLERANCE {
            push_ring(&mut self.sweep_rings, stamp(&self.pose, &shape));
        }
    }

    /// Turns the pose by `rotations` and replaces the sharp corner left in the
    /// ring list with its shortened, jointed form. Returns how far the next
    /// segment's start ring was pushed forward.
    fn resolve_corner(&mut self, shape: &Shape, rotations: &[Rotation], distance: f64) -> f64 {
        let old = self.pose;
        let new = old.rotated_all(rotations);
        self.pose = new;

        if self.sweep_rings.len() <= 1 {
            // Nothing swept yet: start over in the new orientation.
            self.sweep_rings = vec![stamp(&new, shape)];
            self.sweep_start_pose = Some(new);
            return 0.0;
        }

        let radius = shape.radius();
        let turn = turn_sum(rotations);
        let analyzer = SegmentAnalyzer::new(radius).threshold(self.config.corner_threshold_deg);
        let corner = Corner {
            position: old.position,
            old_heading: old.heading,
            new_heading: new.heading,
        };
        let Some(last) = self.sweep_rings.pop() else {
            return 0.0;
        };

        if !analyzer.is_significant(turn) || corner.axis_angle().is_none() {
            if new.heading == old.heading && new.up == old.up {
                self.sweep_rings.push(last);
            } else {
                self.sweep_rings.push(stamp(&old.bisected(&new), shape));
            }
            tracing::trace!(turn, "smooth sweep junction");
            return 0.0;
        }

        let shorten = shorten_for_angle(turn, radius);
        let back = shorten.min(self.sweep_run.abs());
        let forward = shorten.min(distance.abs());
        let run_sign = if self.sweep_run < 0.0 { -1.0 } else { 1.0 };
        let end = translate_ring(&last, &(-old.heading * run_sign * back));
        let joint = corner_rings(&end, &corner, radius, self.config.joint_mode, &self.config.resolution);
        tracing::debug!(turn, back, forward, joint = joint.len(), "resolved sweep corner");

        push_ring(&mut self.sweep_rings, end);
        for ring in joint {
            push_ring(&mut self.sweep_rings, ring);
        }
        let sign = if distance < 0.0 { -1.0 } else { 1.0 };
        push_ring(&mut self.sweep_rings, stamp(&new.moved(sign * forward), shape));
        forward
    }
}

fn rotation_command(rotation: &Rotation) -> Command {
    match *rotation {
        Rotation::Yaw(a) => Command::TurnYaw(a),
        Rotation::Pitch(a) => Command::TurnPitch(a),
        Rotation::Roll(a) => Command::TurnRoll(a),
        Rotation::SetHeading { heading, up } => Command::SetHeading { heading, up },
    }
}
