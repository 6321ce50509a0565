use crate::config::SweepConfig;
use crate::error::Result;
use crate::geometry::{Mesh, Path, Ring, Shape};
use crate::operations::sweep::{
    build_mesh, corner_rings, leading_rotations, push_ring, stamp, Corner, Segment, SegmentAnalyzer,
};
use crate::turtle::{Pose, TurtleState};

/// Sweeps a profile along an open path.
///
/// Segments are pulled back around every significant corner and the gap is
/// bridged according to the configured joint mode. Both ends are capped.
#[derive(Debug, Clone)]
pub struct Extrude {
    shape: Shape,
    path: Path,
}

impl Extrude {
    /// Creates a new `Extrude` operation.
    #[must_use]
    pub fn new(shape: Shape, path: Path) -> Self {
        Self { shape, path }
    }

    /// Rings the sweep stamps when started from `pose`.
    #[must_use]
    pub fn rings(&self, pose: &Pose, config: &SweepConfig) -> Vec<Ring> {
        sweep(&self.shape, &self.path, pose, false, config)
    }

    /// Builds the swept mesh without touching any turtle state.
    ///
    /// Returns `Ok(None)` for a degenerate profile or a path without forward
    /// moves.
    ///
    /// # Errors
    ///
    /// Returns an error if the path carries a non-finite number or a cap
    /// cannot be triangulated.
    pub fn build(&self, pose: &Pose, config: &SweepConfig) -> Result<Option<Mesh>> {
        self.path.validate()?;
        build(&self.shape, &self.path, pose, false, config)
    }

    /// Executes the sweep from the turtle pose, appends the mesh and leaves the
    /// turtle at the end of the path.
    ///
    /// # Errors
    ///
    /// See [`Extrude::build`].
    pub fn execute(&self, state: TurtleState) -> Result<TurtleState> {
        let mesh = self.build(&state.pose, &state.config)?;
        Ok(finish(state, mesh, &self.path))
    }
}

/// Sweeps a profile around a closed loop.
///
/// The last segment joins the first; the mesh has torus topology and no caps.
#[derive(Debug, Clone)]
pub struct ExtrudeClosed {
    shape: Shape,
    path: Path,
}

impl ExtrudeClosed {
    /// Creates a new `ExtrudeClosed` operation.
    #[must_use]
    pub fn new(shape: Shape, path: Path) -> Self {
        Self { shape, path }
    }

    /// Rings the sweep stamps when started from `pose`.
    #[must_use]
    pub fn rings(&self, pose: &Pose, config: &SweepConfig) -> Vec<Ring> {
        sweep(&self.shape, &self.path, pose, true, config)
    }

    /// Builds the closed mesh without touching any turtle state.
    ///
    /// Returns `Ok(None)` for a degenerate profile or fewer than three rings.
    ///
    /// # Errors
    ///
    /// Returns an error if the path carries a non-finite number.
    pub fn build(&self, pose: &Pose, config: &SweepConfig) -> Result<Option<Mesh>> {
        self.path.validate()?;
        build(&self.shape, &self.path, pose, true, config)
    }

    /// Executes the sweep from the turtle pose and appends the mesh.
    ///
    /// # Errors
    ///
    /// See [`ExtrudeClosed::build`].
    pub fn execute(&self, state: TurtleState) -> Result<TurtleState> {
        let mesh = self.build(&state.pose, &state.config)?;
        Ok(finish(state, mesh, &self.path))
    }
}

fn build(shape: &Shape, path: &Path, pose: &Pose, closed: bool, config: &SweepConfig) -> Result<Option<Mesh>> {
    let profile = shape.prepared();
    if profile.is_degenerate() {
        return Ok(None);
    }
    let start = pose.rotated_all(&leading_rotations(path));
    let rings = sweep(&profile, path, pose, closed, config);
    let mesh = build_mesh(&rings, &profile.layout(), closed, Some(start))?;
    tracing::debug!(
        rings = rings.len(),
        closed,
        built = mesh.is_some(),
        "extruded profile along path"
    );
    Ok(mesh.map(|m| m.with_creation_pose(Some(*pose))))
}

fn finish(mut state: TurtleState, mesh: Option<Mesh>, path: &Path) -> TurtleState {
    if let Some(mesh) = mesh {
        state.add_mesh(mesh);
    }
    state.pose = state.pose.walked(path);
    state
}

fn sweep(shape: &Shape, path: &Path, pose: &Pose, closed: bool, config: &SweepConfig) -> Vec<Ring> {
    let profile = shape.prepared();
    let analyzer = SegmentAnalyzer::new(profile.radius()).threshold(config.corner_threshold_deg);
    let segments = if closed {
        analyzer.analyze_closed(path)
    } else {
        analyzer.analyze(path)
    };
    let start = pose.rotated_all(&leading_rotations(path));
    segment_rings(&profile, &segments, &start, closed, &analyzer, config)
}

/// Stamps the start and end ring of every shortened segment plus the joint
/// rings between them.
///
/// Junctions with no significant turn get a single ring in the bisecting
/// orientation instead, so densely sampled curves stay smooth.
fn segment_rings(
    shape: &Shape,
    segments: &[Segment],
    start: &Pose,
    closed: bool,
    analyzer: &SegmentAnalyzer,
    config: &SweepConfig,
) -> Vec<Ring> {
    let radius = shape.radius();
    let mut rings: Vec<Ring> = Vec::new();
    let mut pose = *start;
    let mut skip_start = false;

    for (i, segment) in segments.iter().enumerate() {
        let last = i + 1 == segments.len();
        let (pull_start, pull_end) = segment.clamped_shortening();
        let sign = if segment.distance < 0.0 { -1.0 } else { 1.0 };
        let corner = pose.moved(segment.distance);
        let next = if closed && last {
            start.at(corner.position)
        } else {
            corner.rotated_all(&segment.rotations_after)
        };

        if !skip_start {
            push_ring(&mut rings, stamp(&pose.moved(sign * pull_start), shape));
        }
        skip_start = false;
        let end = stamp(&pose.moved(segment.distance - sign * pull_end), shape);

        if !closed && last {
            push_ring(&mut rings, end);
        } else if analyzer.is_significant(segment.turn_after) {
            let joint = corner_rings(
                &end,
                &Corner {
                    position: corner.position,
                    old_heading: pose.heading,
                    new_heading: next.heading,
                },
                radius,
                config.joint_mode,
                &config.resolution,
            );
            push_ring(&mut rings, end);
            for ring in joint {
                push_ring(&mut rings, ring);
            }
        } else if closed && last {
            // The first ring closes the loop.
        } else if next.heading == pose.heading && next.up == pose.up {
            push_ring(&mut rings, end);
        } else {
            push_ring(&mut rings, stamp(&corner.bisected(&next), shape));
            skip_start = true;
        }
        pose = next;
    }
    rings
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::config::JointMode;
    use crate::math::{Point2, Point3, Vector3};
    use crate::operations::sweep::{ring_centroid, shorten_for_angle};

    fn square() -> Shape {
        Shape::new(vec![
            Point2::new(-0.5, -0.5),
            Point2::new(0.5, -0.5),
            Point2::new(0.5, 0.5),
            Point2::new(-0.5, 0.5),
        ])
    }

    fn elbow() -> Path {
        Path::new().forward(10.0).yaw(90.0).forward(10.0)
    }

    fn square_loop() -> Path {
        Path::new().forward(10.0).yaw(90.0).repeated(4)
    }

    #[test]
    fn flat_elbow_has_four_shortened_rings() {
        let config = SweepConfig::default();
        let rings = Extrude::new(square(), elbow()).rings(&Pose::default(), &config);
        assert_eq!(rings.len(), 4);
        assert!(rings.iter().all(|r| r.len() == 4));
        let r = square().radius();
        assert_relative_eq!(r, 0.5_f64.sqrt(), epsilon = 1e-12);
        assert_relative_eq!(ring_centroid(&rings[1]), Point3::new(10.0 - r, 0.0, 0.0), epsilon = 1e-9);
        assert_relative_eq!(ring_centroid(&rings[2]), Point3::new(10.0, r, 0.0), epsilon = 1e-9);
        assert_relative_eq!(ring_centroid(&rings[3]), Point3::new(10.0, 10.0, 0.0), epsilon = 1e-9);
    }

    #[test]
    fn flat_elbow_mesh_is_closed_and_outward() {
        let state = Extrude::new(square(), elbow()).execute(TurtleState::default()).unwrap();
        assert_eq!(state.meshes.len(), 1);
        let mesh = &state.meshes[0];
        assert!(mesh.is_watertight());
        assert!(mesh.signed_volume() > 0.0);
        assert_eq!(mesh.creation_pose, Some(Pose::default()));
        assert_relative_eq!(state.pose.position, Point3::new(10.0, 10.0, 0.0), epsilon = 1e-9);
        assert_relative_eq!(state.pose.heading, Vector3::y(), epsilon = 1e-12);
    }

    #[test]
    fn every_joint_mode_gives_a_closed_mesh() {
        for mode in [JointMode::Flat, JointMode::Round, JointMode::Tapered] {
            let config = SweepConfig::default().with_joint_mode(mode);
            let mesh = Extrude::new(square(), elbow())
                .build(&Pose::default(), &config)
                .unwrap()
                .unwrap();
            assert!(mesh.is_watertight(), "{mode:?}");
            assert!(mesh.signed_volume() > 0.0, "{mode:?}");
        }
    }

    #[test]
    fn round_elbow_adds_arc_rings() {
        let config = SweepConfig::default().with_joint_mode(JointMode::Round);
        let rings = Extrude::new(square(), elbow()).rings(&Pose::default(), &config);
        // Two segment rings each, plus eight arc rings whose last one is the
        // second segment's start ring.
        assert_eq!(rings.len(), 4 + 7);
    }

    #[test]
    fn round_elbow_volume_is_close_to_swept_area() {
        let config = SweepConfig::default()
            .with_joint_mode(JointMode::Round)
            .with_resolution(crate::config::Resolution::MinAngle(1.0))
            .unwrap();
        let mesh = Extrude::new(square(), elbow())
            .build(&Pose::default(), &config)
            .unwrap()
            .unwrap();
        // Straight runs plus a quarter torus, profile area 1.
        let r = square().radius();
        let straight = 2.0 * (10.0 - shorten_for_angle(90.0, r));
        let arc = std::f64::consts::FRAC_PI_2 * r;
        assert_relative_eq!(mesh.signed_volume(), straight + arc, max_relative = 1e-3);
    }

    #[test]
    fn backward_extrusion_is_still_outward() {
        let path = Path::new().forward(-4.0);
        let mesh = Extrude::new(square(), path)
            .build(&Pose::default(), &SweepConfig::default())
            .unwrap()
            .unwrap();
        assert!(mesh.is_watertight());
        assert_relative_eq!(mesh.signed_volume(), 4.0, epsilon = 1e-9);
    }

    #[test]
    fn clockwise_profile_with_hole_is_oriented() {
        let mut outer = square().points;
        outer.reverse();
        let hole = vec![
            Point2::new(-0.2, -0.2),
            Point2::new(0.2, -0.2),
            Point2::new(0.2, 0.2),
            Point2::new(-0.2, 0.2),
        ];
        let shape = Shape::with_holes(outer, vec![hole]);
        let mesh = Extrude::new(shape, elbow())
            .build(&Pose::default(), &SweepConfig::default())
            .unwrap()
            .unwrap();
        assert!(mesh.is_watertight());
        assert!(mesh.signed_volume() > 0.0);
    }

    #[test]
    fn smooth_heading_samples_share_one_bisecting_ring() {
        let path = Path::new()
            .forward(2.0)
            .set_heading(Vector3::new(1.0, 0.1, 0.0), Vector3::z())
            .unwrap()
            .forward(2.0);
        let rings = Extrude::new(square(), path).rings(&Pose::default(), &SweepConfig::default());
        assert_eq!(rings.len(), 3);
        assert_relative_eq!(ring_centroid(&rings[1]), Point3::new(2.0, 0.0, 0.0), epsilon = 1e-9);
    }

    #[test]
    fn degenerate_inputs_produce_no_mesh() {
        let config = SweepConfig::default();
        let line = Shape::new(vec![Point2::new(0.0, 0.0), Point2::new(1.0, 0.0)]);
        assert!(Extrude::new(line, elbow()).build(&Pose::default(), &config).unwrap().is_none());
        let turns_only = Path::new().yaw(90.0);
        assert!(Extrude::new(square(), turns_only).build(&Pose::default(), &config).unwrap().is_none());
    }

    #[test]
    fn centered_profile_is_stamped_around_the_turtle() {
        let offset = Shape::new(vec![
            Point2::new(1.0, 1.0),
            Point2::new(3.0, 1.0),
            Point2::new(3.0, 3.0),
            Point2::new(1.0, 3.0),
        ]);
        let path = Path::new().forward(5.0);
        let config = SweepConfig::default();

        let plain = Extrude::new(offset.clone(), path.clone()).rings(&Pose::default(), &config);
        assert_relative_eq!(ring_centroid(&plain[0]), Point3::new(0.0, -2.0, 2.0), epsilon = 1e-12);

        let centered = Extrude::new(offset.centered(true), path).rings(&Pose::default(), &config);
        assert_relative_eq!(ring_centroid(&centered[0]), Point3::origin(), epsilon = 1e-12);
        assert_relative_eq!(ring_centroid(&centered[1]), Point3::new(5.0, 0.0, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn invalid_numbers_fail_before_any_change() {
        let path = Path::new().forward(1.0).yaw(f64::NAN);
        let state = TurtleState::default();
        assert!(Extrude::new(square(), path).execute(state).is_err());
    }

    #[test]
    fn closed_square_loop_is_watertight_torus() {
        let op = ExtrudeClosed::new(square(), square_loop());
        let rings = op.rings(&Pose::default(), &SweepConfig::default());
        assert_eq!(rings.len(), 8);
        let state = op.execute(TurtleState::default()).unwrap();
        let mesh = &state.meshes[0];
        assert!(mesh.is_watertight());
        assert_eq!(mesh.boundary_edge_count(), 0);
        assert!(mesh.signed_volume() > 0.0);
        assert_relative_eq!(state.pose.position, Point3::origin(), epsilon = 1e-9);
    }

    #[test]
    fn closed_loop_with_implicit_last_turn() {
        let path = Path::new()
            .forward(10.0)
            .yaw(-90.0)
            .forward(10.0)
            .yaw(-90.0)
            .forward(10.0)
            .yaw(-90.0)
            .forward(10.0);
        for mode in [JointMode::Flat, JointMode::Round, JointMode::Tapered] {
            let config = SweepConfig::default().with_joint_mode(mode);
            let mesh = ExtrudeClosed::new(square(), path.clone())
                .build(&Pose::default(), &config)
                .unwrap()
                .unwrap();
            assert!(mesh.is_watertight(), "{mode:?}");
            assert!(mesh.signed_volume() > 0.0, "{mode:?}");
        }
    }
}
