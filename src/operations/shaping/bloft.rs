use std::f64::consts::PI;

use crate::config::SweepConfig;
use crate::error::Result;
use crate::geometry::{Mesh, Path, Ring, Shape, Taper};
use crate::math::{Point3, TOLERANCE};
use crate::operations::hull::HullService;
use crate::operations::sweep::{build_mesh, push_ring, ring_centroid, ring_radius, rings_coincide, stamp};
use crate::operations::union::MeshUnion;
use crate::turtle::{Pose, TurtleState};

use super::{heading_angle, path_legs, Leg};

/// Loft for densely sampled curves whose profile may be wider than the
/// curve's bend radius.
///
/// Rings are generated step by step. Whenever a new ring folds back against
/// the previous one, the rings gathered so far become one mesh, the gap is
/// filled by the convex hull of the two offending rings, and accumulation
/// restarts from the new ring. All pieces are merged at the end.
#[derive(Debug, Clone)]
pub struct BezierLoft {
    shape: Shape,
    taper: Taper,
    path: Path,
}

/// Result of a [`BezierLoft`].
#[derive(Debug, Clone)]
pub struct BezierLoftOutput {
    /// Union of every segment and bridge.
    pub mesh: Mesh,
    /// Regular swept pieces, in path order.
    pub segments: Vec<Mesh>,
    /// Hull patches spanning each detected fold-back.
    pub bridges: Vec<Mesh>,
}

impl BezierLoft {
    /// Creates a new `BezierLoft` operation.
    #[must_use]
    pub fn new(shape: Shape, taper: Taper, path: Path) -> Self {
        Self { shape, taper, path }
    }

    /// Builds the loft without touching any turtle state.
    ///
    /// Returns `Ok(None)` for a degenerate profile, a path with no length,
    /// or when no piece could be built.
    ///
    /// # Errors
    ///
    /// Returns an error if the path carries a non-finite number, a cap cannot
    /// be triangulated, or the union fails.
    pub fn build(
        &self,
        pose: &Pose,
        config: &SweepConfig,
        hull: &dyn HullService,
        union: &dyn MeshUnion,
    ) -> Result<Option<BezierLoftOutput>> {
        self.path.validate()?;
        let profile = self.shape.prepared();
        let legs = path_legs(&self.path, pose);
        let total: f64 = legs.iter().map(Leg::length).sum();
        if profile.is_degenerate() || total < TOLERANCE {
            return Ok(None);
        }

        let distances: Vec<f64> = legs.iter().map(Leg::length).collect();
        let steps = allocate_steps(
            &distances,
            &turn_angles(&legs),
            config.bloft_steps,
            config.turn_weight_exponent,
        );
        let layout = profile.layout();

        let mut segments = Vec::new();
        let mut bridges = Vec::new();
        let mut run: Vec<Ring> = Vec::new();
        // Pose of the run's first ring; side winding is judged against it.
        let mut run_pose = *pose;
        let mut arc = 0.0;

        for (i, leg) in legs.iter().enumerate() {
            let length = leg.length();
            let sign = if leg.distance < 0.0 { -1.0 } else { 1.0 };
            let next = legs.get(i + 1);
            let n = steps[i];
            let first = usize::from(i > 0);

            for k in first..=n {
                #[allow(clippy::cast_precision_loss)]
                let x = length * k as f64 / n as f64;
                let mut at = leg.start.moved(sign * x);
                if k == n {
                    if let Some(next) = next {
                        at = at.bisected(&next.start);
                    }
                }
                let ring = stamp(&at, &self.taper.apply(&profile, (arc + x) / total));

                let Some(last) = run.last() else {
                    run.push(ring);
                    run_pose = at;
                    continue;
                };
                if rings_coincide(last, &ring) {
                    continue;
                }
                let radius = ring_radius(last).max(ring_radius(&ring));
                if !detect_fold_back(last, &ring, radius, config.fold_back_factor) {
                    push_ring(&mut run, ring);
                    continue;
                }

                tracing::debug!(leg = i, step = k, "ring folds back, bridging with a hull");
                let cloud: Vec<Point3> = last.iter().chain(&ring).copied().collect();
                match hull.convex_hull(&cloud)? {
                    Some(bridge) => bridges.push(bridge),
                    None => tracing::warn!(leg = i, step = k, "fold-back bridge spans no volume"),
                }
                if let Some(mesh) = build_mesh(&run, &layout, false, Some(run_pose))? {
                    segments.push(mesh.with_creation_pose(Some(*pose)));
                }
                run.clear();
                run.push(ring);
                run_pose = at;
            }
            arc += length;
        }
        if let Some(mesh) = build_mesh(&run, &layout, false, Some(run_pose))? {
            segments.push(mesh.with_creation_pose(Some(*pose)));
        }

        tracing::debug!(
            legs = legs.len(),
            steps = steps.iter().sum::<usize>(),
            segments = segments.len(),
            bridges = bridges.len(),
            "bezier loft built"
        );
        if segments.is_empty() && bridges.is_empty() {
            return Ok(None);
        }

        let pieces: Vec<Mesh> = segments.iter().chain(&bridges).cloned().collect();
        let mesh = union.union(&pieces)?.with_creation_pose(Some(*pose));
        Ok(Some(BezierLoftOutput {
            mesh,
            segments,
            bridges,
        }))
    }

    /// Executes the loft from the turtle pose, appends the merged mesh and
    /// leaves the turtle at the end of the path.
    ///
    /// # Errors
    ///
    /// See [`BezierLoft::build`].
    pub fn execute(
        &self,
        mut state: TurtleState,
        hull: &dyn HullService,
        union: &dyn MeshUnion,
    ) -> Result<TurtleState> {
        if let Some(output) = self.build(&state.pose, &state.config, hull, union)? {
            state.add_mesh(output.mesh);
        }
        state.pose = state.pose.walked(&self.path);
        Ok(state)
    }
}

/// `true` when `next` folds back against `prev`.
///
/// The travel direction is the unit vector between ring centroids. A ring
/// folds back if any vertex moves against that direction by more than
/// `factor * radius`, or if the centroids barely move at all.
#[must_use]
pub fn detect_fold_back(prev: &[Point3], next: &[Point3], radius: f64, factor: f64) -> bool {
    let travel = ring_centroid(next) - ring_centroid(prev);
    let distance = travel.norm();
    if distance <= TOLERANCE * radius.max(1.0) {
        return true;
    }
    let u = travel / distance;
    let limit = -factor * radius;
    let folded = prev.iter().zip(next).any(|(a, b)| (b - a).dot(&u) < limit);
    tracing::trace!(distance, folded, "fold-back check");
    folded
}

/// Spreads `total_steps` over legs in proportion to
/// `(distance / total) * (1 + |angle| / pi)^exponent`.
///
/// Every leg gets at least one step. `turn_angles` are in radians; a missing
/// angle counts as zero.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
pub fn allocate_steps(distances: &[f64], turn_angles: &[f64], total_steps: usize, exponent: i32) -> Vec<usize> {
    let total: f64 = distances.iter().map(|d| d.abs()).sum();
    if total < TOLERANCE {
        return vec![1; distances.len()];
    }
    let weights: Vec<f64> = distances
        .iter()
        .enumerate()
        .map(|(i, d)| {
            let angle = turn_angles.get(i).copied().unwrap_or(0.0).abs();
            d.abs() / total * (1.0 + angle / PI).powi(exponent)
        })
        .collect();
    let sum: f64 = weights.iter().sum();

    weights
        .iter()
        .map(|w| {
            let share = (total_steps as f64 * w / sum).round();
            if share.is_finite() && share >= 1.0 {
                share as usize
            } else {
                1
            }
        })
        .collect()
}

/// Sharpest turn at either end of each leg, in radians.
fn turn_angles(legs: &[Leg]) -> Vec<f64> {
    let junctions: Vec<f64> = legs
        .windows(2)
        .map(|pair| heading_angle(&pair[0].start, &pair[1].start))
        .collect();
    (0..legs.len())
        .map(|i| {
            let before = if i > 0 { junctions[i - 1] } else { 0.0 };
            let after = junctions.get(i).copied().unwrap_or(0.0);
            before.max(after)
        })
        .collect()
}
